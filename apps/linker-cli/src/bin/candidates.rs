use std::io;
use std::sync::Arc;
use std::{env, process};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linker_core::config::{resolve_with_base, Config};
use linker_core::types::{Category, Mention};
use linker_kb::{CandidateRanker, Gateway, TripleStore, Vocabulary};
use linker_text::{CandidateGenerator, LabelSearcher};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linker_kb=info,linker_text=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let (Some(name), Some(category)) = (args.first(), args.get(1).and_then(|c| Category::parse(c))) else {
        eprintln!("Usage: linker-candidates \"<mention>\" <CATEGORY>");
        eprintln!("Categories: {}", Category::ALL.map(Category::label).join(", "));
        process::exit(1)
    };

    let base = env::current_dir()?;
    let searcher = LabelSearcher::open(resolve_with_base(&base, &settings.search.index_dir))?;
    let generator = CandidateGenerator::new(Arc::new(searcher), settings.search.candidate_limit);
    let store = TripleStore::open(&resolve_with_base(&base, &settings.kb.path))?;
    let ranker = CandidateRanker::new(Arc::new(Gateway::new(Box::new(store))), Vocabulary::from_settings(&settings.kb));

    let mention = Mention::new(name.as_str(), category);
    let candidates = generator.generate(&mention);
    if candidates.is_empty() {
        println!("No candidates for {} ({})", mention.name, mention.category);
        return Ok(());
    }
    let scores = ranker.score_all(&mention, &candidates);
    println!("Candidates for {} ({}):", mention.name, mention.category);
    for (i, (c, score)) in candidates.iter().zip(&scores).enumerate() {
        println!(
            "{:>2}. {:<48} relevance {:>7.3}  score {:>8.3}  {} | {}",
            i + 1,
            c.id,
            c.relevance,
            score,
            c.label,
            c.description
        );
    }
    match ranker.choose(&mention, &candidates) {
        Some(id) => println!("\nChosen: {}", id),
        None => println!("\nNo candidate chosen"),
    }
    Ok(())
}
