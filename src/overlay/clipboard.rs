use anyhow::{Context, Result};

/// Optional capability for copying the LaTeX buffer out on commit/dismiss.
/// Absence is a disabled feature, never an error.
pub trait ClipboardCapability: Send {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// `None` when no system clipboard is reachable (headless session,
    /// missing display server); the overlay keeps working without copy.
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(inner) => Some(Self { inner }),
            Err(err) => {
                tracing::warn!(%err, "clipboard unavailable; copy on dismiss disabled");
                None
            }
        }
    }
}

impl ClipboardCapability for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner
            .set_text(text.to_string())
            .context("copy latex to clipboard")
    }
}
