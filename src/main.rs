use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use factreels::args::{Args, Mode};
use factreels::request::{Style, VideoSource};
use factreels::upload::{DEFAULT_DAILY_LIMIT, UploadLog};
use factreels::used::JsonUsedStore;
use factreels::{
    BatchEntry, ContentRotator, JobDriver, Pipeline, TokioTimer, UploadOutcome, facts, logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    if args.mode == Mode::Stats {
        print_stats(&args.upload_log);
        return Ok(());
    }

    if !args.facts.exists() {
        error!("Fact database not found: {}", args.facts.display());
        std::process::exit(1);
    }
    let pool = facts::load_pool(&args.facts)?;

    let mut master = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let rotator = ContentRotator::load(
        pool,
        Box::new(JsonUsedStore::new(&args.used)),
        StdRng::seed_from_u64(master.r#gen()),
    )?;
    info!(
        "Loaded {} facts, {} unused",
        rotator.pool_len(),
        rotator.remaining()
    );

    let style = Style {
        quality: args.quality,
        voice: args.voice.clone(),
        source: args.source,
        theme: args.theme.clone(),
        materials: match (&args.source, &args.materials_dir) {
            (VideoSource::Local, Some(dir)) => list_materials(dir)?,
            (VideoSource::Local, None) => anyhow::bail!("--source local needs --materials-dir"),
            _ => Vec::new(),
        },
        ..Style::default()
    };

    let timer = Arc::new(TokioTimer);
    let driver = JobDriver::new(&args.api_url, timer.clone(), args.driver_settings())
        .context("building HTTP client")?;
    let pipeline = Pipeline::new(
        rotator,
        driver,
        style,
        StdRng::seed_from_u64(master.r#gen()),
        timer,
        args.batch_settings(),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current step");
            on_signal.cancel();
        }
    });

    info!(
        "Rendering service at {} ({} quality)",
        args.api_url,
        args.quality.as_str()
    );
    match args.mode {
        Mode::Single => {
            let report = pipeline.run_single(&cancel).await?;
            println!("Task {} finished: fact {}", report.handle, report.item.id);
            for path in &report.local_paths {
                println!("  {}", path.display());
            }
            print_upload(&report.upload);
        }
        Mode::Batch => {
            let entries = if args.concurrency > 1 {
                pipeline
                    .run_batch_concurrent(args.count, args.concurrency, &cancel)
                    .await
            } else {
                pipeline.run_batch(args.count, &cancel).await
            };
            print_batch(&entries);
        }
        Mode::Stats => {}
    }
    Ok(())
}

fn list_materials(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() {
            files.push(fs::canonicalize(&path)?);
        }
    }
    if files.is_empty() {
        anyhow::bail!("no background files in {}", dir.display());
    }
    info!("Found {} background files in {}", files.len(), dir.display());
    Ok(files)
}

fn print_batch(entries: &[BatchEntry]) {
    let ok = entries.iter().filter(|e| e.result.is_ok()).count();
    println!("Batch finished: {}/{} videos", ok, entries.len());
    for entry in entries {
        match &entry.result {
            Ok(report) => println!(
                "  #{} task {} fact {}: {}",
                entry.index + 1,
                report.handle,
                report.item.id,
                report.artifacts.join(", ")
            ),
            Err(e) => println!("  #{} failed: {}", entry.index + 1, e),
        }
    }
}

fn print_upload(outcome: &UploadOutcome) {
    match outcome {
        UploadOutcome::NotConfigured => {}
        UploadOutcome::Uploaded(receipt) => println!("  uploaded: {}", receipt.url),
        UploadOutcome::LimitReached => println!("  upload skipped: daily limit reached"),
        UploadOutcome::Failed(e) => println!("  upload failed: {}", e),
    }
}

fn print_stats(path: &Path) {
    let log = UploadLog::open(path);
    let stats = log.stats();
    println!("Upload statistics:");
    println!("  total_uploads: {}", stats.total);
    println!("  successful_uploads: {}", stats.successful);
    println!("  failed_uploads: {}", stats.failed);
    println!("  success_rate: {:.1}%", stats.success_rate());
    println!(
        "  uploads_today: {}/{}",
        stats.uploads_today, DEFAULT_DAILY_LIMIT
    );
}
