use clap::Parser;
use export_viewer::analytics::format_thousands;
use export_viewer::client::{HttpProcessingService, Upload};
use export_viewer::config::{Config, ConfigArgs};
use export_viewer::downloader::{download_filename, to_csv};
use export_viewer::notify::LogNotifier;
use export_viewer::render::{DirectorySink, Renderer};
use export_viewer::{DatasetKind, Outcome, UploadFlow};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Upload a GitLab export and write the resulting tables to disk
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Export archive (.zip, .tar, .gz, .7z)
    archive: PathBuf,

    /// Directory for the HTML documents and CSV files
    #[arg(long, default_value = "viewer-output")]
    out: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.config.apply(Config::from_env()?);

    let file_name = args
        .archive
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    let bytes = std::fs::read(&args.archive)?;

    let service = HttpProcessingService::new(&config.base_url, config.timeout)?;
    let flow = UploadFlow::new(Arc::new(service), Arc::new(LogNotifier), config.flow_options());

    if let Outcome::Failed(reason) = flow.upload(Upload::new(file_name, bytes)).await {
        return Err(reason.into());
    }

    let view = flow.snapshot();
    if let Some(summary) = &view.summary {
        info!(
            "{} commits by {} contributors, +{} / -{} lines",
            format_thousands(summary.commits),
            summary.contributors,
            format_thousands(summary.lines_added),
            format_thousands(summary.lines_removed)
        );
    }

    if let Some(datasets) = &view.datasets {
        let renderer = Renderer::new()?;
        let mut sink = DirectorySink::new(&args.out)?;
        for kind in DatasetKind::ALL {
            let dataset = datasets.get(kind);
            let csv_name = download_filename(kind.title());
            std::fs::write(args.out.join(&csv_name), to_csv(dataset))?;
            renderer.present(&mut sink, dataset, kind.title(), Some(&csv_name))?;
            info!("{}: {} rows", kind.title(), dataset.len());
        }
    }

    if let Some(url) = &view.report_url {
        info!("Git statistics report: {}", url);
    }

    Ok(())
}
