use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::time::Duration;
use std::{env, process};

use flate2::read::MultiGzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linker_core::config::{expand_path, Config};
use linker_text::LabelIndexer;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "linker_text=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(input) = args.first().map(expand_path) else {
        eprintln!("Usage: linker-index <entities.jsonl[.gz]> [index_dir]");
        process::exit(1)
    };
    let index_dir: PathBuf = args.get(1).map(expand_path).unwrap_or_else(|| expand_path(&settings.search.index_dir));

    println!("Label index builder\n===================");
    println!("Entities:  {}", input.display());
    println!("Index dir: {}", index_dir.display());

    let file = File::open(&input).map_err(|e| anyhow::anyhow!("Failed to open {}: {}", input.display(), e))?;
    let reader: Box<dyn Read> = if input.extension().is_some_and(|ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let reader: Box<dyn BufRead> = Box::new(BufReader::new(reader));

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {pos} entities ({per_sec})")?);
    pb.enable_steady_tick(Duration::from_millis(200));

    let indexer = LabelIndexer::create(index_dir.clone())?;
    let count = indexer.index_jsonl(reader, |n| if n % 1_000 == 0 { pb.set_position(n as u64) })?;
    pb.finish_with_message("done");

    println!("\nIndexed {} entities into {}", count, index_dir.display());
    Ok(())
}
