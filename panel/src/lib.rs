//! MAPS status and control panels
//!
//! Headless panels that follow INDI device properties of the MAPS adaptive
//! optics system. A panel lays out one catalog module as pages of labelled
//! values (and controls, for writable properties), then refreshes them every
//! tick from either a simulator or a live INDI connection.

pub mod catalog;
pub mod config;
pub mod error;
pub mod link;
pub mod logging;
pub mod paginate;
pub mod panel;
pub mod presentation;
pub mod property;
pub mod render;
pub mod simulator;
pub mod table;

pub use config::{Args, PanelConfig};
pub use error::{PanelError, PanelResult};
pub use panel::{Panel, TickOutcome};
pub use presentation::PanelKind;

use link::IndiConnector;
use simulator::RandomWalk;
use std::future::Future;
use tokio::time::MissedTickBehavior;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a panel until Ctrl-C
pub async fn run(kind: PanelKind, args: Args) -> anyhow::Result<()> {
    tracing::info!("{} v{} starting", kind.name(), VERSION);

    let table = match &args.catalog {
        Some(path) => catalog::load(path)?,
        None => catalog::builtin()?,
    };
    let config = PanelConfig::from_args(&args, &table)
        .ok_or_else(|| anyhow::anyhow!("catalog defines no modules"))?;
    tracing::info!(
        "module='{}' host={}:{} delay={:?} items={}",
        config.module,
        config.host,
        config.port,
        config.delay,
        config.items
    );

    let mut panel = Panel::new(
        kind,
        config.clone(),
        table,
        Box::new(IndiConnector::default()),
        Box::new(RandomWalk::new()),
    )?;

    if kind == PanelKind::Control && !panel.has_controls() {
        tracing::warn!("No (writeable) controls selected, exiting");
        return Ok(());
    }

    if config.connect {
        panel.connect().await;
    }

    refresh_until(&mut panel, &config, tokio::signal::ctrl_c()).await;

    if panel.is_connected() {
        panel.disconnect().await;
    }
    Ok(())
}

/// Refresh the panel every `config.delay` until `stop` resolves.
///
/// `stop` is created once, so a stop raised while a tick is running is seen
/// on the next turn of the loop.
pub async fn refresh_until<F: Future>(panel: &mut Panel, config: &PanelConfig, stop: F) {
    let mut ticker = tokio::time::interval(config.delay);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                panel.alarm().await;
                match render::render_page(panel, config.page) {
                    Some(page) => println!("{}", page),
                    None => tracing::debug!("No page {} to render", config.page),
                }
            }
            _ = &mut stop => {
                tracing::info!("Interrupted, stopping refresh");
                break;
            }
        }
    }
}
