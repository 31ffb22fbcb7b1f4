use browserharvest::{cli::Cli, run_extraction};
use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(cli.log_level().into()),
        )
        .init();

    let config = match cli.to_extraction_config() {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    match run_extraction(&config) {
        Ok(summary) => {
            info!(
                "extraction finished: {} kinds succeeded, {} failed",
                summary.kinds_succeeded, summary.kinds_failed
            );
            for file in &summary.files {
                info!("  {}", file.display());
            }
            if summary.fatal {
                error!("a requested browser could not be extracted");
                std::process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            error!("extraction failed: {e}");
            std::process::exit(1);
        }
    }
}
