//! CLI for autofetch.

mod report;

use anyhow::Result;
use autofetch_core::automation::{AutomationContext, ClassRegistry};
use autofetch_core::autostart::XdgAutostart;
use autofetch_core::config;
use autofetch_core::run::{self, RunError};
use clap::Parser;
use std::time::Duration;

/// Fetch a file over HTTP(S) and register it to open at next login.
#[derive(Debug, Parser)]
#[command(name = "autofetch")]
#[command(about = "autofetch: download a file and open it at next session start", long_about = None)]
pub struct Cli {
    /// HTTP/HTTPS URL to download.
    pub url: String,

    /// Seconds to wait before exiting after success (overrides `linger_secs` in config).
    #[arg(long, value_name = "SECS")]
    pub linger: Option<u64>,
}

impl Cli {
    /// Parse arguments, run, and return the process exit code.
    pub fn run_from_args() -> i32 {
        let cli = Cli::parse();
        match cli.run() {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("autofetch error: {:#}", err);
                err.downcast_ref::<RunError>()
                    .map(RunError::exit_code)
                    .unwrap_or(1)
            }
        }
    }

    fn run(&self) -> Result<()> {
        let mut cfg = config::load_or_init()?;
        if let Some(secs) = self.linger {
            cfg.linger_secs = secs;
        }
        tracing::debug!("loaded config: {:?}", cfg);

        let namespace = XdgAutostart::default_location()?;
        let ctx = AutomationContext::initialize(ClassRegistry::with_builtin_classes())?;
        let report = run::execute(&ctx, &cfg, &self.url, |k| std::env::var_os(k), &namespace)?;
        drop(ctx);

        report::print(&report);

        if cfg.linger_secs > 0 {
            tracing::debug!(secs = cfg.linger_secs, "lingering before exit");
            std::thread::sleep(Duration::from_secs(cfg.linger_secs));
        }
        Ok(())
    }
}
