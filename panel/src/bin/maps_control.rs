use clap::Parser;
use maps_panel::{logging, Args, PanelKind};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = logging::init("maps_control", &args.log_level, args.log_dir.as_deref());
    maps_panel::run(PanelKind::Control, args).await
}
