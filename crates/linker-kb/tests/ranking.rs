use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use linker_core::traits::KnowledgeBase;
use linker_core::types::{Candidate, Category, Mention};
use linker_kb::{CandidateRanker, Gateway, TripleStore, Vocabulary};

const NT: &str = r#"# sample
<http://www.wikidata.org/entity/Q90> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q515> .
<http://www.wikidata.org/entity/Q90> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q1549591> .
<http://www.wikidata.org/entity/Q90> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q208511> .
<http://www.wikidata.org/entity/Q90> <http://www.wikidata.org/prop/direct/P17> <http://www.wikidata.org/entity/Q142> .
<http://www.wikidata.org/entity/Q12345> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q515> .
<http://www.wikidata.org/entity/Q12345> <http://www.w3.org/2000/01/rdf-schema#label> "Paris, Texas"@en .
<http://www.wikidata.org/entity/Q312> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q4830453> .
<http://www.wikidata.org/entity/Q312> <http://www.wikidata.org/prop/direct/P452> <http://www.wikidata.org/entity/Q19541> .
<http://www.wikidata.org/entity/Q312> <http://www.wikidata.org/prop/direct/P159> <http://www.wikidata.org/entity/Q49219> .
<http://www.wikidata.org/entity/Q89> <http://www.wikidata.org/prop/direct/P31> <http://www.wikidata.org/entity/Q3314483> .
<http://www.wikidata.org/entity/Q89> <http://www.wikidata.org/prop/direct/P279> <http://www.wikidata.org/entity/Q1364> .
this line is not a triple
"#;

fn candidate(id: &str, relevance: f32) -> Candidate {
    Candidate { id: id.to_string(), relevance, label: String::new(), description: String::new() }
}

fn ranker() -> CandidateRanker {
    let store = TripleStore::from_reader(NT.as_bytes()).expect("store");
    CandidateRanker::new(Arc::new(Gateway::new(Box::new(store))), Vocabulary::default())
}

#[test]
fn paris_resolves_to_the_city() {
    let ranker = ranker();
    let paris = Mention::new("Paris", Category::Gpe);
    let candidates = [candidate("Q90", 9.1), candidate("Q12345", 4.0)];
    let scores = ranker.score_all(&paris, &candidates);
    assert!((scores[0] - 3.0 / 11.0).abs() < 1e-9);
    assert!((scores[1] - 1.0 / 11.0).abs() < 1e-9);
    assert_eq!(ranker.choose(&paris, &candidates).as_deref(), Some("Q90"));
}

#[test]
fn choice_is_maximal_and_memoized() {
    let ranker = ranker();
    let apple = Mention::new("Apple", Category::Org);
    let candidates = [candidate("Q89", 8.0), candidate("Q312", 7.5), candidate("Q999999", 1.0)];
    let scores = ranker.score_all(&apple, &candidates);
    assert_eq!(scores, vec![0.0, 3.0, 0.0]);
    let chosen = ranker.choose(&apple, &candidates).expect("chosen");
    assert_eq!(chosen, "Q312");
    let chosen_score = scores[candidates.iter().position(|c| c.id == chosen).unwrap()];
    assert!(scores.iter().all(|s| chosen_score >= *s));

    // A later call for the same mention returns the cached decision.
    let reordered = [candidate("Q89", 8.0)];
    assert_eq!(ranker.choose(&apple, &reordered).as_deref(), Some("Q312"));
    assert_eq!(ranker.cached_decisions(), 1);
}

#[test]
fn ties_and_unscored_categories_keep_relevance_order() {
    let ranker = ranker();
    let noon = Mention::new("noon", Category::Time);
    let candidates = [candidate("Q12345", 3.0), candidate("Q90", 2.0)];
    assert_eq!(ranker.choose(&noon, &candidates).as_deref(), Some("Q12345"));

    let unknown = Mention::new("Nowhere", Category::Loc);
    let candidates = [candidate("Q404", 5.0), candidate("Q405", 4.0)];
    assert_eq!(ranker.choose(&unknown, &candidates).as_deref(), Some("Q404"));
}

#[test]
fn concurrent_choices_for_one_mention_agree() {
    let ranker = Arc::new(ranker());
    let paris = Mention::new("Paris", Category::Gpe);
    // Each thread sees a different candidate list; whichever decision is
    // stored first is the one every caller gets back.
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let ranker = ranker.clone();
            let paris = paris.clone();
            std::thread::spawn(move || {
                let candidates = if i % 2 == 0 {
                    vec![candidate("Q90", 9.1), candidate("Q12345", 4.0)]
                } else {
                    vec![candidate("Q12345", 4.0)]
                };
                ranker.choose(&paris, &candidates)
            })
        })
        .collect();
    let chosen: Vec<Option<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = chosen[0].clone().expect("chosen");
    assert!(chosen.iter().all(|c| c.as_deref() == Some(first.as_str())), "{chosen:?}");
    assert_eq!(ranker.choose(&paris, &[candidate("Q90", 9.1)]), Some(first));
    assert_eq!(ranker.cached_decisions(), 1);
}

#[test]
fn empty_candidates_resolve_to_nothing() {
    let ranker = ranker();
    let mention = Mention::new("Zzyzx", Category::Gpe);
    assert_eq!(ranker.choose(&mention, &[]), None);
    assert_eq!(ranker.cached_decisions(), 0);
}

#[test]
fn loads_gzipped_dump_by_extension() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("kb.nt.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
    encoder.write_all(NT.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let store = TripleStore::open(&path).expect("open");
    assert_eq!(store.num_triples(), 11);
    let q90 = store.lookup_id("<http://www.wikidata.org/entity/Q90>").unwrap().expect("Q90");
    assert_eq!(store.attributes_of(q90).unwrap().len(), 4);
    assert!(store.lookup_id("<http://www.wikidata.org/entity/Q0>").unwrap().is_none());

    assert!(TripleStore::open(&tmp.path().join("missing.nt")).is_err());
}
