use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use instance_reconciler::cli::Cli;
use instance_reconciler::config::write_config_template;
use instance_reconciler::error::ReconcileError;
use instance_reconciler::logging::init_logging;
use instance_reconciler::orchestrator;
use instance_reconciler::util::envfile::load_dotenv_if_present;

fn main() {
    // .env must be applied before clap reads RECONCILE_* variables
    let dotenv = load_dotenv_if_present();
    init_logging();
    match dotenv {
        Ok(n) if n > 0 => info!("Loaded {} variable(s) from .env", n),
        Ok(_) => {}
        Err(e) => error!("Ignoring unreadable .env: {:#}", e),
    }

    let cli = Cli::parse();
    if let Some(path) = &cli.write_config_template {
        if let Err(e) = write_config_template(path)
            .with_context(|| format!("writing config template to {}", path.display()))
        {
            error!("{:#}", e);
            std::process::exit(1);
        }
        println!("Wrote configuration template to {}", path.display());
        return;
    }

    let cfg = match cli.to_app_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&cfg) {
        let code = match e.downcast_ref::<ReconcileError>() {
            Some(ReconcileError::Config(_)) => 2,
            _ => 1,
        };
        error!("{:#}", e);
        std::process::exit(code);
    }
}

fn run(cfg: &instance_reconciler::config::AppConfig) -> Result<()> {
    let outcome = orchestrator::run(cfg).context("reconciliation failed")?;
    info!(
        "Done: {} row(s) written in {:.1}s",
        outcome.rows_written,
        outcome.summary.duration_secs()
    );
    Ok(())
}
