use std::sync::Arc;

use anyhow::Result;
use eframe::egui;
use inktex::app::OverlayApp;
use inktex::config::Settings;
use inktex::logging;
use inktex::overlay::boundary::{GeminiBoundary, RecognitionBoundary, UnconfiguredBoundary};
use inktex::overlay::clipboard::{ClipboardCapability, SystemClipboard};

fn main() -> Result<()> {
    let settings = Settings::load_default()?;
    logging::init(settings.debug_logging);

    let prompt = settings.prompt(Settings::config_dir().as_deref());
    let recognition: Arc<dyn RecognitionBoundary> = match settings.resolved_api_key() {
        Some(key) => Arc::new(GeminiBoundary::new(key, settings.model.clone())?),
        None => {
            tracing::warn!("no recognition api key configured; conversions will fail visibly");
            Arc::new(UnconfiguredBoundary)
        }
    };
    let clipboard =
        SystemClipboard::new().map(|clipboard| Box::new(clipboard) as Box<dyn ClipboardCapability>);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_fullscreen(true)
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top(),
        ..Default::default()
    };

    if let Err(err) = eframe::run_native(
        "inktex",
        native_options,
        Box::new(move |_cc| Box::new(OverlayApp::new(settings, prompt, recognition, clipboard))),
    ) {
        tracing::error!(%err, "overlay event loop failed");
    }
    Ok(())
}
