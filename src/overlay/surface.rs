use crate::overlay::boundary::{self, RecognitionBoundary};
use crate::overlay::clipboard::ClipboardCapability;
use crate::overlay::crop::{self, CropTuning};
use crate::overlay::messages::ConversionOutcome;
use crate::overlay::model::{BrushStyle, CanvasSize, Point};
use crate::overlay::orchestrator::{RecognitionOrchestrator, RecognitionState, DEFAULT_CANCEL_WAIT};
use crate::overlay::preview::{self, PreviewDebouncer, PreviewDocument, PreviewTuning};
use crate::overlay::raster::RasterCanvas;
use crate::overlay::store::StrokeStore;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Keyboard commands the front-end routes into the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Commit,
    Undo,
    Clear,
    Dismiss,
}

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    pub brush: BrushStyle,
    pub crop: CropTuning,
    pub preview: PreviewTuning,
    /// Scratch folder for the pre-recognition image copy; `None` disables it.
    pub scratch_dir: Option<PathBuf>,
    pub cancel_wait: Duration,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            brush: BrushStyle::default(),
            crop: CropTuning::default(),
            preview: PreviewTuning::default(),
            scratch_dir: Some(boundary::scratch_dir()),
            cancel_wait: DEFAULT_CANCEL_WAIT,
        }
    }
}

/// Composition root of the overlay: owns the stroke store, the raster, the
/// LaTeX buffer, and the recognition orchestrator, and reconciles background
/// results against live user edits.
///
/// All methods run on the UI thread and never block; the only blocking work
/// (the recognition call itself) happens behind the orchestrator.
pub struct OverlaySurface {
    store: StrokeStore,
    raster: RasterCanvas,
    background: Option<RgbaImage>,
    orchestrator: RecognitionOrchestrator,
    clipboard: Option<Box<dyn ClipboardCapability>>,
    latex: String,
    preview: PreviewDocument,
    debouncer: PreviewDebouncer,
    prompt: String,
    options: SurfaceOptions,
    dismissed: bool,
    repaint_needed: bool,
}

impl OverlaySurface {
    pub fn new(
        size: CanvasSize,
        recognition: Arc<dyn RecognitionBoundary>,
        clipboard: Option<Box<dyn ClipboardCapability>>,
        prompt: String,
    ) -> Self {
        Self::with_options(size, recognition, clipboard, prompt, SurfaceOptions::default())
    }

    pub fn with_options(
        size: CanvasSize,
        recognition: Arc<dyn RecognitionBoundary>,
        clipboard: Option<Box<dyn ClipboardCapability>>,
        prompt: String,
        options: SurfaceOptions,
    ) -> Self {
        Self {
            store: StrokeStore::new(size),
            raster: RasterCanvas::new(size.width, size.height),
            background: None,
            orchestrator: RecognitionOrchestrator::with_cancel_wait(
                recognition,
                options.cancel_wait,
            ),
            clipboard,
            latex: String::new(),
            preview: PreviewDocument::Placeholder,
            debouncer: PreviewDebouncer::new(options.preview.debounce),
            prompt,
            options,
            dismissed: false,
            repaint_needed: true,
        }
    }

    pub fn raster(&self) -> &RasterCanvas {
        &self.raster
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn preview(&self) -> &PreviewDocument {
        &self.preview
    }

    pub fn preview_tuning(&self) -> PreviewTuning {
        self.options.preview
    }

    pub fn latex(&self) -> &str {
        &self.latex
    }

    /// Mutable access for the editable text widget. Direct typing and
    /// recognition results share this buffer; last writer wins.
    pub fn latex_mut(&mut self) -> &mut String {
        &mut self.latex
    }

    pub fn recognition_state(&self) -> RecognitionState {
        self.orchestrator.state()
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }

    pub fn pointer_down(&mut self, point: Point) {
        if self.dismissed {
            return;
        }
        self.store.begin_stroke(point);
    }

    pub fn pointer_move(&mut self, point: Point) {
        if let Some(segment) = self.store.extend_stroke(point) {
            self.raster
                .append_segment(segment.from, segment.to, self.options.brush);
            self.repaint_needed = true;
        }
    }

    pub fn pointer_up(&mut self, point: Point) {
        self.pointer_move(point);
        if self.store.commit_stroke() {
            self.repaint_needed = true;
        }
    }

    pub fn handle_key(&mut self, command: KeyCommand) {
        match command {
            KeyCommand::Commit => {
                if let Err(err) = self.commit_sketch() {
                    tracing::error!(error = %format!("{err:#}"), "failed to dispatch recognition");
                    self.latex = format!("Error: {err:#}");
                    self.preview = PreviewDocument::Placeholder;
                    self.repaint_needed = true;
                }
            }
            KeyCommand::Undo => self.undo(),
            KeyCommand::Clear => self.clear(),
            KeyCommand::Dismiss => self.dismiss(),
        }
    }

    /// Removes the most recent stroke and rebuilds the raster from the
    /// remaining ones, so the buffer never shows a stale partial erase.
    pub fn undo(&mut self) {
        if self.store.stroke_in_progress() {
            return;
        }
        if self.store.undo() {
            self.raster
                .full_redraw(self.store.strokes(), self.background.as_ref(), self.options.brush);
            self.repaint_needed = true;
        }
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.background = None;
        self.raster.clear(None);
        self.repaint_needed = true;
    }

    /// Replaces the canvas baseline: previously drawn strokes are cleared and
    /// the image becomes the new background.
    pub fn set_background(&mut self, image: RgbaImage) {
        self.store.clear();
        self.raster.clear(Some(&image));
        self.background = Some(image);
        self.repaint_needed = true;
    }

    pub fn load_background_file(&mut self, path: &Path) -> Result<()> {
        let image = image::open(path)
            .with_context(|| format!("load background image {}", path.display()))?
            .to_rgba8();
        self.set_background(image);
        Ok(())
    }

    /// Commit: crop the sketch and hand it to the recognition pipeline.
    /// Silent no-op with zero strokes and no background image.
    pub fn commit_sketch(&mut self) -> Result<()> {
        if self.store.is_empty() && self.background.is_none() {
            return Ok(());
        }

        let bounds = crop::compute_bounds(self.store.strokes(), self.store.region(), self.options.crop);
        let cropped = crop::crop_to_image(&self.raster, bounds, self.background.as_ref());

        if let Some(dir) = &self.options.scratch_dir {
            if let Err(err) = boundary::write_scratch_image(&cropped, dir, chrono::Local::now()) {
                tracing::warn!(error = %format!("{err:#}"), "scratch image write failed");
            }
        }

        let png = boundary::encode_png(&cropped)?;
        self.orchestrator.submit(png, self.prompt.clone())?;
        Ok(())
    }

    /// Called by the text widget after the user typed into the buffer.
    pub fn note_latex_edited(&mut self, now: Instant) {
        let text = self.latex.clone();
        self.debouncer.note_edit(&text, now);
    }

    /// UI-thread tick: consumes recognition results and settled edit bursts.
    /// Returns whether a repaint is needed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if let Some(outcome) = self.orchestrator.poll() {
            match outcome {
                ConversionOutcome::Success(text) => {
                    self.latex = text;
                    self.preview = preview::render(&self.latex);
                }
                ConversionOutcome::Failure(message) => {
                    self.latex = format!("Error: {message}");
                    self.preview = PreviewDocument::Placeholder;
                }
            }
            self.repaint_needed = true;
        }

        if let Some(text) = self.debouncer.poll(now) {
            self.preview = preview::render(&text);
            self.repaint_needed = true;
        }

        std::mem::take(&mut self.repaint_needed)
    }

    pub fn copy_latex_to_clipboard(&mut self) {
        if self.latex.is_empty() {
            return;
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };
        if let Err(err) = clipboard.set_text(&self.latex) {
            tracing::warn!(error = %format!("{err:#}"), "clipboard copy failed");
        }
    }

    /// Dismissal: copy the buffer out when possible, then cancel and wait out
    /// any in-flight recognition so teardown never races a worker callback.
    pub fn dismiss(&mut self) {
        if self.dismissed {
            return;
        }
        self.copy_latex_to_clipboard();
        self.orchestrator.shutdown();
        self.dismissed = true;
        self.repaint_needed = true;
    }
}
