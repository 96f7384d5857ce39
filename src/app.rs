use crate::config::Settings;
use crate::overlay::boundary::RecognitionBoundary;
use crate::overlay::clipboard::ClipboardCapability;
use crate::overlay::model::{CanvasSize, Point};
use crate::overlay::preview::{self, PreviewDocument, PreviewLine};
use crate::overlay::surface::{KeyCommand, OverlaySurface, SurfaceOptions};
use eframe::egui;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PANEL_WIDTH: f32 = 400.0;
const PREVIEW_HEIGHT: f32 = 220.0;
const CANVAS_MARGIN: f32 = 24.0;

/// Everything needed to build the surface once the first frame reveals the
/// actual drawing-region size.
struct SurfaceSeed {
    settings: Settings,
    prompt: String,
    recognition: Arc<dyn RecognitionBoundary>,
    clipboard: Option<Box<dyn ClipboardCapability>>,
}

/// egui front-end of the overlay. All real state lives in [`OverlaySurface`];
/// this type only forwards input and paints.
pub struct OverlayApp {
    seed: Option<SurfaceSeed>,
    surface: Option<OverlaySurface>,
    canvas_texture: Option<egui::TextureHandle>,
}

impl OverlayApp {
    pub fn new(
        settings: Settings,
        prompt: String,
        recognition: Arc<dyn RecognitionBoundary>,
        clipboard: Option<Box<dyn ClipboardCapability>>,
    ) -> Self {
        Self {
            seed: Some(SurfaceSeed {
                settings,
                prompt,
                recognition,
                clipboard,
            }),
            surface: None,
            canvas_texture: None,
        }
    }

    /// The raster is fixed-size for the overlay's lifetime, so the surface is
    /// built on the first frame, once the real screen size is known.
    fn ensure_surface(&mut self, region: CanvasSize) {
        if self.surface.is_some() {
            return;
        }
        if let Some(seed) = self.seed.take() {
            let options = SurfaceOptions {
                brush: seed.settings.brush(),
                crop: seed.settings.crop_tuning(),
                preview: seed.settings.preview_tuning(),
                ..SurfaceOptions::default()
            };
            self.surface = Some(OverlaySurface::with_options(
                region,
                seed.recognition,
                seed.clipboard,
                seed.prompt,
                options,
            ));
        }
    }

    fn handle_keys(ctx: &egui::Context, surface: &mut OverlaySurface) {
        // While the text edit has focus its own key handling wins; overlay
        // shortcuts only apply when nothing is focused.
        let text_widget_focused = ctx.wants_keyboard_input();

        let commands = ctx.input(|input| {
            let mut commands = Vec::new();
            if input.key_pressed(egui::Key::Escape) {
                commands.push(KeyCommand::Dismiss);
            }
            if !text_widget_focused {
                if input.key_pressed(egui::Key::Enter) {
                    commands.push(KeyCommand::Commit);
                }
                if input.key_pressed(egui::Key::Z) && input.modifiers.ctrl {
                    commands.push(KeyCommand::Undo);
                }
            }
            commands
        });

        for command in commands {
            surface.handle_key(command);
        }
    }

    fn handle_dropped_background(ctx: &egui::Context, surface: &mut OverlaySurface) {
        let dropped: Vec<_> = ctx.input(|input| input.raw.dropped_files.clone());
        for file in dropped {
            let Some(path) = file.path else {
                continue;
            };
            if let Err(err) = surface.load_background_file(&path) {
                tracing::warn!(error = %format!("{err:#}"), "dropped background image rejected");
            }
        }
    }

    fn forward_pointer(
        response: &egui::Response,
        canvas_origin: egui::Pos2,
        surface: &mut OverlaySurface,
    ) {
        let Some(pos) = response.interact_pointer_pos() else {
            return;
        };
        let point = Point::new(
            (pos.x - canvas_origin.x).round() as i32,
            (pos.y - canvas_origin.y).round() as i32,
        );
        if response.drag_started() {
            surface.pointer_down(point);
        } else if response.dragged() {
            surface.pointer_move(point);
        }
        if response.drag_stopped() {
            surface.pointer_up(point);
        }
    }

    fn paint_preview(ui: &mut egui::Ui, surface: &OverlaySurface) {
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), PREVIEW_HEIGHT),
            egui::Sense::hover(),
        );
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, egui::Color32::from_rgba_unmultiplied(255, 255, 255, 230));

        match surface.preview() {
            PreviewDocument::Placeholder => {
                painter.text(
                    rect.left_top() + egui::vec2(8.0, 8.0),
                    egui::Align2::LEFT_TOP,
                    "Nothing to preview",
                    egui::FontId::proportional(13.0),
                    egui::Color32::GRAY,
                );
            }
            PreviewDocument::Lines(lines) => {
                let layout = preview::layout_lines(
                    lines.len(),
                    rect.height() - 16.0,
                    surface.preview_tuning(),
                );
                for (index, line) in lines.iter().take(layout.visible).enumerate() {
                    let pos = rect.left_top()
                        + egui::vec2(8.0, 8.0 + layout.step * index as f32);
                    let (font, color) = match line {
                        PreviewLine::Math(_) => {
                            (egui::FontId::monospace(15.0), egui::Color32::BLACK)
                        }
                        PreviewLine::Plain(_) => {
                            (egui::FontId::proportional(13.0), egui::Color32::DARK_GRAY)
                        }
                    };
                    painter.text(pos, egui::Align2::LEFT_TOP, line.text(), font, color);
                }
            }
        }
    }

    fn paint_canvas(
        &mut self,
        ctx: &egui::Context,
        ui: &mut egui::Ui,
        repaint: bool,
    ) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let raster = surface.raster();
        let size = egui::vec2(raster.width() as f32, raster.height() as f32);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let rect = response.rect;

        // Faint film plus a border so the drawable region is visible over the
        // desktop.
        painter.rect_filled(rect, 0.0, egui::Color32::from_white_alpha(16));
        painter.rect_stroke(rect, 0.0, egui::Stroke::new(2.0, egui::Color32::GRAY));

        Self::forward_pointer(&response, rect.min, surface);

        if repaint || self.canvas_texture.is_none() {
            let raster = surface.raster();
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [raster.width() as usize, raster.height() as usize],
                raster.pixels(),
            );
            match &mut self.canvas_texture {
                Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                None => {
                    self.canvas_texture =
                        Some(ctx.load_texture("ink-canvas", image, egui::TextureOptions::NEAREST));
                }
            }
        }
        if let Some(texture) = &self.canvas_texture {
            painter.image(
                texture.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }
}

impl eframe::App for OverlayApp {
    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let screen = ctx.screen_rect();
        let region = CanvasSize::new(
            (screen.width() - PANEL_WIDTH - CANVAS_MARGIN * 2.0).max(600.0) as u32,
            (screen.height() - CANVAS_MARGIN * 2.0).max(400.0) as u32,
        );
        self.ensure_surface(region);

        let mut repaint = false;
        if let Some(surface) = self.surface.as_mut() {
            Self::handle_keys(ctx, surface);
            Self::handle_dropped_background(ctx, surface);
            repaint = surface.poll(Instant::now());
        }

        egui::SidePanel::left("latex-panel")
            .exact_width(PANEL_WIDTH)
            .resizable(false)
            .frame(
                egui::Frame::none()
                    .fill(egui::Color32::from_rgba_unmultiplied(30, 30, 30, 220))
                    .inner_margin(egui::Margin::same(12.0)),
            )
            .show(ctx, |ui| {
                let Some(surface) = self.surface.as_mut() else {
                    return;
                };
                ui.heading("LaTeX Preview");
                Self::paint_preview(ui, surface);
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.heading("Edit");
                    if matches!(
                        surface.recognition_state(),
                        crate::overlay::orchestrator::RecognitionState::Pending(_)
                    ) {
                        ui.spinner();
                        ui.label("converting…");
                    }
                });

                let edited = ui
                    .add(
                        egui::TextEdit::multiline(surface.latex_mut())
                            .hint_text("Write LaTeX here…")
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .desired_rows(10),
                    )
                    .changed();
                if edited {
                    surface.note_latex_edited(Instant::now());
                }

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Copy").clicked() {
                        surface.copy_latex_to_clipboard();
                    }
                    if ui.button("Clear").clicked() {
                        surface.handle_key(KeyCommand::Clear);
                    }
                });
                ui.add_space(8.0);
                ui.weak("Enter converts · Ctrl+Z undoes · Esc closes · drop an image for a background");
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.add_space(CANVAS_MARGIN);
                ui.horizontal(|ui| {
                    ui.add_space(CANVAS_MARGIN);
                    self.paint_canvas(ctx, ui, repaint);
                });
            });

        if self
            .surface
            .as_ref()
            .map(OverlaySurface::is_dismissed)
            .unwrap_or(false)
        {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }

        // Debounce windows and worker results land between input events.
        ctx.request_repaint_after(Duration::from_millis(50));
    }
}
