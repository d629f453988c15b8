//! Category-specific candidate scoring.
//!
//! Every [`Category`] maps to exactly one [`Scorer`]:
//! - `Gate`: 0 unless the candidate carries the defining `(predicate, object)`
//!   pair, else the size of its attribute set
//! - `Template`: share of a reference set of pairs the candidate carries
//! - `Neutral`: 0 for every candidate, leaving the choice to relevance order
use std::collections::HashSet;

use linker_core::config::KbSettings;
use linker_core::types::{Category, KbId};

use crate::gateway::GatewaySession;

type Pair = (&'static str, &'static str);

#[rustfmt::skip]
const NORP: &[Pair] = &[
    ("P31", "Q41710"), ("P31", "Q33829"), ("P31", "Q6266"), ("P31", "Q4392985"), ("P31", "Q16334295"),
    ("P31", "Q11499147"), ("P31", "P140"), ("P279", "Q22947"), ("P279", "Q17573152"), ("P279", "Q7140620"),
    ("P279", "Q844569"),
];

#[rustfmt::skip]
const GPE: &[Pair] = &[
    ("P31", "Q3624078"), ("P31", "Q619610"), ("P31", "Q179164"), ("P31", "Q6256"), ("P31", "Q515"),
    ("P31", "Q1549591"), ("P31", "Q208511"), ("P31", "Q2264924"), ("P31", "Q486972"), ("P31", "Q532"),
    ("P279", "Q7930989"),
];

#[rustfmt::skip]
const PRODUCT: &[Pair] = &[
    ("P31", "Q2095"), ("P31", "Q746549"), ("P31", "Q17062980"), ("P31", "Q10429667"), ("P31", "Q786820"),
    ("P279", "Q2095"), ("P279", "Q2578402"), ("P279", "Q811367"), ("P279", "Q39546"), ("P279", "Q1183543"),
    ("P452", "Q190117"),
];

#[rustfmt::skip]
const EVENT: &[Pair] = &[
    ("P31", "Q103495"), ("P31", "Q11514315"), ("P31", "Q198"), ("P31", "Q124734"), ("P31", "Q178561"),
    ("P31", "Q1261499"), ("P31", "Q18608583"), ("P31", "Q63100559"), ("P31", "Q63100584"), ("P31", "Q63100595"),
    ("P31", "Q63100601"), ("P31", "Q63100611"), ("P279", "Q44637051"), ("P179", "Q205801"),
];

#[rustfmt::skip]
const WORK_OF_ART: &[Pair] = &[
    ("P31", "Q11424"), ("P31", "Q134556"), ("P31", "Q7366"), ("P31", "Q860861"), ("P31", "Q10855061"),
    ("P31", "Q7725634"),
];

#[rustfmt::skip]
const LANGUAGE: &[Pair] = &[
    ("P31", "Q34770"), ("P31", "Q1288568"),
];

#[rustfmt::skip]
const DATE: &[Pair] = &[
    ("P31", "Q14795564"), ("P2894", "Q132"), ("P2894", "Q105"), ("P2894", "Q127"), ("P2894", "Q128"),
    ("P2894", "Q129"), ("P2894", "Q130"), ("P2894", "Q131"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scorer {
    Gate { predicate: &'static str, object: &'static str },
    Template(&'static [Pair]),
    Neutral,
}

impl Scorer {
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Person => Scorer::Gate { predicate: "P31", object: "Q5" },
            Category::Fac => Scorer::Gate { predicate: "P31", object: "Q41176" },
            Category::Org => Scorer::Gate { predicate: "P31", object: "Q4830453" },
            Category::Loc => Scorer::Gate { predicate: "P31", object: "Q2221906" },
            Category::Law => Scorer::Gate { predicate: "P31", object: "Q7748" },
            Category::Norp => Scorer::Template(NORP),
            Category::Gpe => Scorer::Template(GPE),
            Category::Product => Scorer::Template(PRODUCT),
            Category::Event => Scorer::Template(EVENT),
            Category::WorkOfArt => Scorer::Template(WORK_OF_ART),
            Category::Language => Scorer::Template(LANGUAGE),
            Category::Date => Scorer::Template(DATE),
            Category::Time => Scorer::Neutral,
        }
    }

    /// Score of the knowledge-base entity `subject` under this scorer.
    pub fn score(&self, session: &GatewaySession<'_>, vocab: &Vocabulary, subject: KbId) -> f64 {
        match self {
            Scorer::Neutral => 0.0,
            Scorer::Gate { predicate, object } => {
                let p = session.lookup_id(&vocab.predicate(predicate));
                let o = session.lookup_id(&vocab.entity(object));
                let (Some(p), Some(o)) = (p, o) else {
                    return 0.0;
                };
                if !session.exists(subject, p, o) {
                    return 0.0;
                }
                session.attributes_of(subject).len() as f64
            }
            Scorer::Template(pairs) => {
                let distinct: HashSet<&Pair> = pairs.iter().collect();
                if distinct.is_empty() {
                    return 0.0;
                }
                let attrs = session.attributes_of(subject);
                // Pairs unknown to the knowledge base still count in the denominator.
                let matched = distinct
                    .iter()
                    .filter(|(p, o)| {
                        matches!(
                            (session.lookup_id(&vocab.predicate(p)), session.lookup_id(&vocab.entity(o))),
                            (Some(pid), Some(oid)) if attrs.contains(&(pid, oid))
                        )
                    })
                    .count();
                matched as f64 / distinct.len() as f64
            }
        }
    }
}

/// Maps candidate ids and short property/item names to knowledge-base URIs.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    entity_prefix: String,
    predicate_prefix: String,
}

impl Vocabulary {
    pub fn new(entity_prefix: impl Into<String>, predicate_prefix: impl Into<String>) -> Self {
        Self { entity_prefix: entity_prefix.into(), predicate_prefix: predicate_prefix.into() }
    }

    pub fn from_settings(kb: &KbSettings) -> Self {
        Self::new(kb.entity_prefix.clone(), kb.predicate_prefix.clone())
    }

    /// `<...>` ids are taken as-is; anything else is a local name.
    pub fn entity(&self, id: &str) -> String {
        if id.starts_with('<') && id.ends_with('>') {
            id.to_string()
        } else {
            format!("<{}{}>", self.entity_prefix, id)
        }
    }

    pub fn predicate(&self, name: &str) -> String {
        format!("<{}{}>", self.predicate_prefix, name)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::from_settings(&KbSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use crate::store::TripleStore;

    fn wd(p: &str, o: &str) -> (String, String) {
        let v = Vocabulary::default();
        (v.predicate(p), v.entity(o))
    }

    #[test]
    fn every_category_has_a_scorer() {
        for c in Category::ALL {
            let scorer = Scorer::for_category(c);
            assert_eq!(scorer == Scorer::Neutral, c == Category::Time, "{c}");
        }
    }

    #[test]
    fn template_tables_hold_distinct_pairs() {
        for c in Category::ALL {
            if let Scorer::Template(pairs) = Scorer::for_category(c) {
                let distinct: HashSet<_> = pairs.iter().collect();
                assert_eq!(distinct.len(), pairs.len(), "{c}");
            }
        }
    }

    #[test]
    fn norp_template_matches_religion_property_as_class() {
        let v = Vocabulary::default();
        let sect = v.entity("Q1");
        let p31 = v.predicate("P31");
        let religion = v.entity("P140");
        let store = TripleStore::from_triples([(sect.as_str(), p31.as_str(), religion.as_str())]);
        let gateway = Gateway::new(Box::new(store));
        let session = gateway.session();
        let sect_id = session.lookup_id(&sect).unwrap();
        let score = Scorer::for_category(Category::Norp).score(&session, &v, sect_id);
        assert!((score - 1.0 / 11.0).abs() < 1e-9, "{score}");
    }

    #[test]
    fn vocabulary_expands_local_names() {
        let v = Vocabulary::default();
        assert_eq!(v.entity("Q90"), "<http://www.wikidata.org/entity/Q90>");
        assert_eq!(v.entity("<http://x/y>"), "<http://x/y>");
        assert_eq!(v.predicate("P31"), "<http://www.wikidata.org/prop/direct/P31>");
    }

    #[test]
    fn gate_scores_attribute_count_only_when_gate_holds() {
        let v = Vocabulary::default();
        let alice = v.entity("Q1");
        let bob = v.entity("Q2");
        let (p31, q5) = wd("P31", "Q5");
        let (p106, q82955) = wd("P106", "Q82955");
        let (_, q515) = wd("P31", "Q515");
        let store = TripleStore::from_triples([
            (alice.as_str(), p31.as_str(), q5.as_str()),
            (alice.as_str(), p106.as_str(), q82955.as_str()),
            (bob.as_str(), p31.as_str(), q515.as_str()),
            (bob.as_str(), p106.as_str(), q82955.as_str()),
        ]);
        let gateway = Gateway::new(Box::new(store));
        let session = gateway.session();
        let person = Scorer::for_category(Category::Person);
        let alice_id = session.lookup_id(&alice).unwrap();
        let bob_id = session.lookup_id(&bob).unwrap();
        assert_eq!(person.score(&session, &v, alice_id), 2.0);
        assert_eq!(person.score(&session, &v, bob_id), 0.0);
        assert_eq!(Scorer::Neutral.score(&session, &v, alice_id), 0.0);
    }
}
