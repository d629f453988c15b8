use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::{env, process};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linker_core::config::{expand_path, Config};
use linker_pipeline::{Pipeline, RunReport, Sink, TsvSink};

fn usage() -> ! {
    eprintln!("Usage: linker [--output <file>] [--workers <n>] <archive-or-dir>...");
    process::exit(1)
}

async fn run<S: Sink + 'static>(pipeline: &Pipeline, inputs: &[PathBuf], sink: S) -> anyhow::Result<RunReport> {
    let (mut sink, report) = pipeline.run_paths(inputs, sink).await?;
    sink.flush()?;
    Ok(report)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linker=info,linker_pipeline=info,linker_kb=info,linker_text=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let mut settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut inputs = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--output" | "-o" => {
                i += 1;
                settings.output.path = Some(args.get(i).cloned().unwrap_or_else(|| usage()));
            }
            "--workers" | "-w" => {
                i += 1;
                let workers = args.get(i).and_then(|n| n.parse().ok()).filter(|n| *n > 0);
                settings.pipeline.workers = workers.unwrap_or_else(|| {
                    eprintln!("Error: --workers requires a positive number");
                    process::exit(1)
                });
            }
            "--help" | "-h" => usage(),
            arg if !arg.starts_with('-') => inputs.push(expand_path(arg)),
            other => {
                eprintln!("Unknown option: {}", other);
                usage()
            }
        }
        i += 1;
    }
    if inputs.is_empty() {
        usage();
    }

    let base = env::current_dir()?;
    let pipeline = Pipeline::from_settings(&settings, &base)?;
    let runtime =
        tokio::runtime::Builder::new_multi_thread().worker_threads(settings.pipeline.workers).enable_all().build()?;
    let report = match &settings.output.path {
        Some(path) => {
            let path = expand_path(path);
            let file = File::create(&path)
                .map_err(|e| anyhow::anyhow!("Failed to create output {}: {}", path.display(), e))?;
            runtime.block_on(run(&pipeline, &inputs, TsvSink::new(BufWriter::new(file))))?
        }
        None => runtime.block_on(run(&pipeline, &inputs, TsvSink::new(io::stdout())))?,
    };

    tracing::info!(
        archives = report.archives,
        records = report.records,
        completed = report.completed,
        skipped = report.skipped,
        duplicates = report.duplicates,
        timed_out = report.timed_out,
        mentions = report.mentions,
        read_errors = report.read_errors,
        lines = report.lines,
        "run finished"
    );
    Ok(())
}
