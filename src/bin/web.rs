use clap::Parser;
use export_viewer::app;
use export_viewer::config::{Config, ConfigArgs};
use log::info;

/// Serve the GitLab export viewer
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = args.config.apply(Config::from_env()?);
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    info!("Starting web server on {}", config.bind);
    app::run(config).await
}
