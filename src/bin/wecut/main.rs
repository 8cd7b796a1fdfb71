use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spdlog::{info, warn};

use wecut::config::{Config, Repository};
use wecut::logger::configure_logger;
use wecut::server::{build_state, server_run};

use crate::config::open_config;

mod config;

const CFG_FILE_NAME: &str = "wecut.toml";

#[derive(Parser, Debug)]
#[command(version, about = "WECUT salon site: journal, shop and checkout", long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<PathBuf>,

    /// Load config, templates and stores, then exit without serving
    #[arg(long)]
    check: bool,
}

fn log_summary(config: &Config) {
    match &config.repository {
        Repository::Files { posts_dir, .. } => info!("Posts and products from {}", posts_dir.display()),
        Repository::Rest { url, .. } => info!("Posts and products from {}", url),
    }
    info!("Locale policy {:?}, {} posts per page", config.journal.locale_policy, config.journal.page_size);
    let payments = &config.payments;
    info!(
        "Checkout {}, order webhook {}",
        if payments.secret_key.is_some() { "enabled" } else { "disabled" },
        if payments.webhook_secret.is_some() { "enabled" } else { "disabled" }
    );
}

#[ntex::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = open_config(args.config_path)
        .context("Could not load the configuration. Please run wecut --help")?;

    if let Err(err) = configure_logger(config.log.as_ref()) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    log_summary(&config);
    let state = build_state(&config).context("Could not prepare the site")?;

    if args.check {
        info!("Configuration, templates and stores are usable");
        return Ok(());
    }

    info!("Starting WECUT on {}:{}", config.server.address, config.server.port);
    server_run(state, &config.server.address, config.server.port)
        .await
        .with_context(|| format!("Serving on {}:{}", config.server.address, config.server.port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["wecut", "-c", "/etc/wecut.toml", "--check"]).unwrap();
        assert_eq!(args.config_path, Some(PathBuf::from("/etc/wecut.toml")));
        assert!(args.check);

        let args = Args::try_parse_from(["wecut"]).unwrap();
        assert_eq!(args.config_path, None);
        assert!(!args.check);
    }
}
