//! Command line options and the validated panel configuration

use crate::table::PropertyTable;
use clap::Parser;
use maps_indi::INDI_DEFAULT_PORT;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_DELAY_MS: u64 = 2000;
pub const DEFAULT_ITEMS: usize = 25;

/// Command line shared by the status and control panels
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Args {
    /// INDI server host
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// INDI server port
    #[arg(long, default_value_t = INDI_DEFAULT_PORT as i64, allow_negative_numbers = true)]
    pub port: i64,

    /// Module to display (defaults to the last catalog module)
    #[arg(long)]
    pub module: Option<String>,

    /// Refresh delay in milliseconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MS as i64, allow_negative_numbers = true)]
    pub delay: i64,

    /// Items per page
    #[arg(long, default_value_t = DEFAULT_ITEMS as i64, allow_negative_numbers = true)]
    pub items: i64,

    /// Connect to the INDI server on start-up
    #[arg(long)]
    pub connect: bool,

    /// Page rendered after each refresh
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    /// JSON catalog replacing the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Directory for daily rolling log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Validated settings of one panel
#[derive(Debug, Clone, PartialEq)]
pub struct PanelConfig {
    pub host: String,
    pub port: u16,
    pub module: String,
    pub delay: Duration,
    pub items: usize,
    pub page: usize,
    pub connect: bool,
}

impl PanelConfig {
    /// Resolve arguments against the catalog.
    ///
    /// Blank hosts, unknown modules and non-positive numbers fall back to
    /// their defaults. Returns `None` only for an empty catalog.
    pub fn from_args(args: &Args, table: &PropertyTable) -> Option<Self> {
        let default_module = table.default_module()?;

        let host = match args.host.trim() {
            "" => DEFAULT_HOST.to_string(),
            host => host.to_string(),
        };

        let port = u16::try_from(args.port)
            .ok()
            .filter(|p| *p > 0)
            .unwrap_or(INDI_DEFAULT_PORT);

        let module = match args.module.as_deref().map(str::trim) {
            Some(name) if table.module(name).is_some() => name.to_string(),
            Some(name) => {
                tracing::warn!(
                    "Unknown module '{}', using '{}' (choices: {:?})",
                    name,
                    default_module,
                    table.names()
                );
                default_module.to_string()
            }
            None => default_module.to_string(),
        };

        let delay = u64::try_from(args.delay)
            .ok()
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_DELAY_MS);

        let items = usize::try_from(args.items)
            .ok()
            .filter(|i| *i > 0)
            .unwrap_or(DEFAULT_ITEMS);

        Some(Self {
            host,
            port,
            module,
            delay: Duration::from_millis(delay),
            items,
            page: args.page,
            connect: args.connect,
        })
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: INDI_DEFAULT_PORT,
            module: crate::catalog::ALL_MODULE.to_string(),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            items: DEFAULT_ITEMS,
            page: 0,
            connect: false,
        }
    }
}
