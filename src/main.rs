use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use squeeze_zip::cli::{Args, Commands};
use squeeze_zip::constants::{COMPRESSED_SIZE_PREFIX, COMPRESSION_RATIO_PREFIX, ORIGINAL_SIZE_PREFIX};
use squeeze_zip::utils::{create_progress_bar, create_progress_spinner, format_file_size};
use squeeze_zip::{
    collect_image_files, error, info, logger, success, warn, AddReport, BundleSession,
    CompressionError, ImageKind, Quality, SessionOptions, SourceFile,
};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match args.command {
        Commands::Preview { inputs, recursive } => preview(&inputs, recursive).await,
        Commands::Bundle {
            inputs,
            output,
            quality,
            threads,
            recursive,
            exclude,
            archive_name,
        } => {
            let quality = match quality {
                Some(value) => Quality::new(value)?,
                None => Quality::default(),
            };
            let options = SessionOptions::new(threads, archive_name);
            bundle(&inputs, recursive, &exclude, quality, options, output).await
        }
    }
}

fn collect_sources(inputs: &[String], recursive: bool) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::new();
    for input in inputs {
        let files = collect_image_files(input, recursive)
            .with_context(|| format!("Failed to collect images from {}", input))?;
        if files.is_empty() {
            warn!("No image files found in {}", input);
        }
        sources.extend(files.into_iter().map(SourceFile::from_path));
    }

    if sources.is_empty() {
        return Err(CompressionError::NoImageFilesFound(inputs.join(", ")).into());
    }
    Ok(sources)
}

async fn read_into(session: &BundleSession, sources: Vec<SourceFile>) -> AddReport {
    let spinner = if logger::is_quiet() {
        ProgressBar::hidden()
    } else {
        create_progress_spinner(&format!("Reading {} file(s)...", sources.len()))
    };
    let report = session.add_files(sources).await;
    spinner.finish_and_clear();
    report
}

async fn preview(inputs: &[String], recursive: bool) -> Result<()> {
    let sources = collect_sources(inputs, recursive)?;
    let session = BundleSession::default();
    let report = read_into(&session, sources).await;

    info!("📋 {} image(s) in batch:", report.added.len());
    for summary in &report.added {
        let mime_type = session
            .item(summary.id)
            .map(|item| item.mime_type().to_string())
            .unwrap_or_default();
        let kind = ImageKind::from_mime(&mime_type)
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "not re-encodable".to_string());
        info!("  📁 {}  [{}, {}]", summary.label(), mime_type, kind);
    }
    if !report.failed.is_empty() {
        warn!("{} file(s) could not be read", report.failed.len());
    }
    Ok(())
}

async fn bundle(
    inputs: &[String],
    recursive: bool,
    exclude: &[String],
    quality: Quality,
    options: SessionOptions,
    output: PathBuf,
) -> Result<()> {
    info!("🚀 Starting batch compression...");
    let sources = collect_sources(inputs, recursive)?;

    let session = BundleSession::new(options);
    session.on_empty(|| warn!("Every image was removed from the batch"));

    let added = read_into(&session, sources).await;
    for summary in &added.added {
        info!("  📁 {}", summary.label());
    }

    for name in exclude {
        let matching: Vec<_> = session
            .summaries()
            .into_iter()
            .filter(|summary| &summary.name == name)
            .collect();
        if matching.is_empty() {
            warn!("Nothing named {} to exclude", name);
        }
        for summary in matching {
            session.remove(summary.id)?;
            info!("  🗑️  Excluded {}", summary.name);
        }
    }

    if session.is_empty() {
        bail!("No images left to compress");
    }

    let any_lossy = session.summaries().iter().any(|summary| {
        session
            .item(summary.id)
            .and_then(|item| ImageKind::from_mime(item.mime_type()))
            .is_some_and(|kind| kind.is_lossy())
    });
    if !any_lossy {
        warn!("No JPEG images in batch; quality only changes PNG optimisation effort");
    }

    info!(
        "🗜️  Compressing {} image(s) at quality {}",
        session.len(),
        quality.value()
    );
    let progress = if logger::is_quiet() {
        ProgressBar::hidden()
    } else {
        create_progress_bar(session.len() as u64)
    };
    let report = session.compress_all(quality, Some(&progress)).await?;
    progress.finish_with_message("done");

    for summary in &report.compressed {
        success!("{}", summary.label());
    }
    for failure in &report.failed {
        error!("{}: {}", failure.name, failure.error);
    }

    info!("\n📊 Batch Compression Summary:");
    info!("  📁 Compressed: {}", report.compressed.len());
    info!("  {} {}", ORIGINAL_SIZE_PREFIX, format_file_size(report.original_total));
    info!("  {} {}", COMPRESSED_SIZE_PREFIX, format_file_size(report.compressed_total));
    info!("  {} {:.1}%", COMPRESSION_RATIO_PREFIX, report.compression_ratio());
    if !report.failed.is_empty() {
        info!("  ⚠️  Failed files: {}", report.failed.len());
    }

    let path = session
        .write_archive(&output)
        .await
        .context("Failed to write archive")?;
    success!("Archive written to {}", path.display());

    Ok(())
}
