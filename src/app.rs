use eframe::egui;
use image::DynamicImage;

use crate::config::AppConfig;
use crate::display::DisplayScale;
use crate::export::{self, DialogPrompt, SaveOutcome};
use crate::selection::{
    DragOrigin, Point, PointerEvent, PointerPhase, SelectionController, SelectionRect,
};
use crate::source::{self, LoadedImage};

const PADDING: f32 = 20.0;

impl From<egui::Pos2> for Point {
    fn from(pos: egui::Pos2) -> Self {
        Point::new(pos.x, pos.y)
    }
}

impl From<Point> for egui::Pos2 {
    fn from(p: Point) -> Self {
        egui::pos2(p.x, p.y)
    }
}

pub struct ImageSlicer {
    config: AppConfig,
    image: Option<DynamicImage>,
    texture: Option<egui::TextureHandle>,
    controller: SelectionController,
    display: DisplayScale,
    status: String,
}

/// Scaled-down size the image is drawn at, or `None` when there is no room to draw it.
fn fit_image(available_size: egui::Vec2, image_size: egui::Vec2) -> Option<egui::Vec2> {
    let max_size =
        (available_size - egui::vec2(PADDING * 2.0, PADDING * 2.0)).max(egui::Vec2::ZERO);

    // Fit inside the available space, never upscaling past 1:1
    let scale = (max_size.x / image_size.x)
        .min(max_size.y / image_size.y)
        .min(1.0);
    let display_size = image_size * scale;
    (display_size.x > 0.0 && display_size.y > 0.0).then_some(display_size)
}

/// GPU textures have a maximum side; larger images are previewed downscaled.
fn texture_image(image: &DynamicImage, max_texture_side: usize) -> egui::ColorImage {
    let max_side = u32::try_from(max_texture_side).unwrap_or(u32::MAX);
    let preview;
    let image = if image.width() > max_side || image.height() > max_side {
        log::info!(
            "{}x{} image exceeds the {max_side}px texture limit, previewing downscaled",
            image.width(),
            image.height()
        );
        preview = image.thumbnail(max_side, max_side);
        &preview
    } else {
        image
    };
    let size = [image.width() as _, image.height() as _];
    let image_buffer = image.to_rgba8();
    let pixels = image_buffer.as_flat_samples();
    egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice())
}

impl ImageSlicer {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        Self::with_config(config)
    }

    fn with_config(config: AppConfig) -> Self {
        Self {
            controller: SelectionController::new(config.default_size),
            config,
            image: None,
            texture: None,
            display: DisplayScale::default(),
            status: String::from("Open or drop an image to start"),
        }
    }

    fn set_image(&mut self, ctx: &egui::Context, loaded: LoadedImage) {
        let LoadedImage { image, bounds } = loaded;
        let max_texture_side = ctx.input(|i| i.max_texture_side);
        let color_image = texture_image(&image, max_texture_side);
        self.texture = Some(ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR));
        self.image = Some(image);

        let rect = self.controller.load_image(bounds);
        log::info!(
            "loaded {}x{} image, selection at ({}, {})",
            bounds.width,
            bounds.height,
            rect.x,
            rect.y
        );
        self.status = format!("{} × {} px", bounds.width, bounds.height);
    }

    fn open_dialog(&mut self, ctx: &egui::Context) {
        if let Some(path) = source::pick_file() {
            match source::open_path(&path) {
                Ok(loaded) => self.set_image(ctx, loaded),
                Err(e) => {
                    log::warn!("{e:#}");
                    self.status = String::from("Could not read that image");
                }
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped_files = ctx.input(|i| i.raw.dropped_files.clone());
        match source::load_dropped(&dropped_files) {
            Some(Ok(loaded)) => self.set_image(ctx, loaded),
            Some(Err(e)) => {
                log::warn!("{e:#}");
                self.status = String::from("Could not read that image");
            }
            None => {}
        }
    }

    fn save_selection(&mut self) {
        let (Some(image), Some(rect)) = (&self.image, self.controller.rect()) else {
            return;
        };
        match export::export(image, &rect, &DialogPrompt, &self.config.download_dir) {
            Ok(SaveOutcome::Saved(path)) => {
                log::info!("saved selection to {}", path.display());
                self.status = format!("Saved {}", path.display());
            }
            Ok(SaveOutcome::Downloaded(path)) => {
                log::info!("saved selection to fallback location {}", path.display());
                self.status = format!("Saved {}", path.display());
            }
            Ok(SaveOutcome::Cancelled) => {}
            Err(e) => {
                log::error!("Failed to save image: {e:#}");
                self.status = String::from("Saving failed");
            }
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            if ui.button("Open Image").clicked() {
                self.open_dialog(ctx);
            }

            ui.label("Size:");
            let mut size = self.controller.size();
            egui::ComboBox::from_id_salt("selection_size")
                .selected_text(size.to_string())
                .show_ui(ui, |ui| {
                    for option in &self.config.sizes {
                        ui.selectable_value(&mut size, *option, option.to_string());
                    }
                });
            if size != self.controller.size() {
                log::debug!("selection size changed to {size}");
                self.controller.change_size(size);
            }

            let can_save = self.controller.rect().is_some();
            if ui
                .add_enabled(can_save, egui::Button::new("Save Selection"))
                .clicked()
            {
                self.save_selection();
            }

            ui.label(&self.status);
        });
    }

    fn dispatch(&mut self, phase: PointerPhase, pos: egui::Pos2, origin: DragOrigin) {
        let event = PointerEvent {
            phase,
            position: pos.into(),
            origin,
        };
        self.controller.handle_pointer(event, &self.display);
    }

    // Feeds egui's drag lifecycle for one interactive area into the controller.
    fn forward_input(&mut self, response: &egui::Response, origin: DragOrigin) {
        if response.drag_started() {
            // Hit-test where the button went down, not where the drag threshold was crossed.
            let press = response.ctx.input(|i| i.pointer.press_origin());
            if let Some(pos) = press.or(response.interact_pointer_pos()) {
                self.dispatch(PointerPhase::Down, pos, origin);
            }
        }
        if response.dragged() {
            if let Some(pos) = response.interact_pointer_pos() {
                self.dispatch(PointerPhase::Move, pos, origin);
            }
        }
        if response.drag_stopped() {
            let pos = response.interact_pointer_pos().unwrap_or_default();
            self.dispatch(PointerPhase::Up, pos, origin);
        }
    }

    fn screen_rect(&self, rect: &SelectionRect) -> egui::Rect {
        let (min, side) = self.display.rect_to_display(rect);
        egui::Rect::from_min_size(min.into(), egui::vec2(side, side))
    }

    fn canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let hovering_files = ctx.input(|i| !i.raw.hovered_files.is_empty());

        let Some(texture) = self.texture.clone() else {
            let response = ui.allocate_rect(ui.available_rect_before_wrap(), egui::Sense::click());
            let painter = ui.painter_at(response.rect);
            let stroke_color = if hovering_files {
                ui.visuals().selection.stroke.color
            } else {
                ui.visuals().widgets.noninteractive.bg_stroke.color
            };
            painter.rect_stroke(
                response.rect.shrink(PADDING),
                8.0,
                egui::Stroke::new(2.0, stroke_color),
            );
            painter.text(
                response.rect.center(),
                egui::Align2::CENTER_CENTER,
                "Drop an image here or click to open one",
                egui::FontId::proportional(18.0),
                ui.visuals().text_color(),
            );
            if response.clicked() {
                self.open_dialog(ctx);
            }
            return;
        };

        let Some(bounds) = self.controller.bounds() else {
            return;
        };
        // Layout follows the intrinsic size; the texture may be a downscaled preview.
        let image_size = egui::vec2(bounds.width as f32, bounds.height as f32);
        let available_size = ui.available_size();
        let Some(display_size) = fit_image(available_size, image_size) else {
            return;
        };

        let x_offset = (available_size.x - display_size.x) / 2.0;
        let y_offset = (available_size.y - display_size.y) / 2.0;
        let start_pos = ui.cursor().min + egui::vec2(x_offset.max(0.0), y_offset.max(0.0));
        let image_rect = egui::Rect::from_min_size(start_pos, display_size);

        self.display = DisplayScale::new(
            image_rect.min.into(),
            display_size.x,
            bounds.width,
        );

        let canvas = ui.allocate_rect(image_rect, egui::Sense::drag());
        let painter = ui.painter_at(ui.clip_rect());

        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        let Some(rect) = self.controller.rect() else {
            return;
        };

        // The overlay is its own drag target; presses on it always grab the selection.
        let handle = ui.interact(
            self.screen_rect(&rect).intersect(image_rect),
            ui.id().with("selection_handle"),
            egui::Sense::drag(),
        );
        self.forward_input(&handle, DragOrigin::Handle);
        self.forward_input(&canvas, DragOrigin::Canvas);

        // egui keeps the pointer captured while dragging off the canvas, so unlike a
        // browser canvas, leaving the image does not release the drag; only leaving
        // the window does.
        if self.controller.drag().active && ctx.input(|i| i.pointer.hover_pos().is_none()) {
            let pos = ctx.input(|i| i.pointer.latest_pos()).unwrap_or_default();
            self.dispatch(PointerPhase::Leave, pos, DragOrigin::Canvas);
        }

        if self.controller.drag().active {
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if handle.hovered() {
            ctx.set_cursor_icon(egui::CursorIcon::Grab);
        }

        let Some(rect) = self.controller.rect() else {
            return;
        };
        let screen_crop_rect = self.screen_rect(&rect);
        self.paint_overlay(&painter, image_rect, screen_crop_rect);

        painter.text(
            screen_crop_rect.left_top() + egui::vec2(6.0, 6.0),
            egui::Align2::LEFT_TOP,
            format!("{} @ {:.0}, {:.0}", rect.size, rect.x, rect.y),
            egui::FontId::monospace(12.0),
            egui::Color32::WHITE,
        );

        if hovering_files {
            painter.rect_stroke(
                image_rect,
                0.0,
                egui::Stroke::new(3.0, ui.visuals().selection.stroke.color),
            );
        }
    }

    fn paint_overlay(&self, painter: &egui::Painter, image_rect: egui::Rect, crop: egui::Rect) {
        let overlay_color = egui::Color32::from_black_alpha(150);
        let crop = crop.intersect(image_rect);

        // Top
        painter.rect_filled(
            egui::Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, crop.min.y)),
            0.0,
            overlay_color,
        );
        // Bottom
        painter.rect_filled(
            egui::Rect::from_min_max(egui::pos2(image_rect.min.x, crop.max.y), image_rect.max),
            0.0,
            overlay_color,
        );
        // Left
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(image_rect.min.x, crop.min.y),
                egui::pos2(crop.min.x, crop.max.y),
            ),
            0.0,
            overlay_color,
        );
        // Right
        painter.rect_filled(
            egui::Rect::from_min_max(
                egui::pos2(crop.max.x, crop.min.y),
                egui::pos2(image_rect.max.x, crop.max.y),
            ),
            0.0,
            overlay_color,
        );

        painter.rect_stroke(crop, 0.0, egui::Stroke::new(1.0, egui::Color32::WHITE));
    }
}

impl eframe::App for ImageSlicer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !ctx.input(|i| i.raw.dropped_files.is_empty()) {
            self.handle_dropped_files(ctx);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(4.0);
            self.toolbar(ui, ctx);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ui, ctx);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ImageBounds;

    fn load(max_texture_side: usize, width: u32, height: u32) -> (egui::Context, ImageSlicer) {
        let ctx = egui::Context::default();
        ctx.begin_pass(egui::RawInput {
            max_texture_side: Some(max_texture_side),
            ..Default::default()
        });
        let mut app = ImageSlicer::with_config(AppConfig::default());
        let loaded = LoadedImage {
            image: DynamicImage::new_rgba8(width, height),
            bounds: ImageBounds::new(width, height),
        };
        app.set_image(&ctx, loaded);
        (ctx, app)
    }

    #[test]
    fn oversized_image_gets_downscaled_texture() {
        let (ctx, app) = load(2048, 3000, 600);
        let [w, h] = app.texture.as_ref().unwrap().size();
        assert!(w <= 2048 && h <= 2048, "{w}x{h}");

        // Geometry and export still use the full-resolution image.
        let rect = app.controller.rect().unwrap();
        assert_eq!((rect.x, rect.y), (1244.0, 44.0));
        assert_eq!(app.image.as_ref().unwrap().width(), 3000);
        let _ = ctx.end_pass();
    }

    #[test]
    fn image_within_limit_uploads_full_size() {
        let (ctx, app) = load(2048, 1000, 800);
        assert_eq!(app.texture.as_ref().unwrap().size(), [1000, 800]);
        let _ = ctx.end_pass();
    }

    #[test]
    fn fit_scales_down_but_never_up() {
        let size = fit_image(egui::vec2(540.0, 1000.0), egui::vec2(1000.0, 800.0)).unwrap();
        assert_eq!(size, egui::vec2(500.0, 400.0));

        let size = fit_image(egui::vec2(4000.0, 4000.0), egui::vec2(1000.0, 800.0)).unwrap();
        assert_eq!(size, egui::vec2(1000.0, 800.0));
    }

    #[test]
    fn no_room_means_nothing_to_draw() {
        assert_eq!(fit_image(egui::vec2(30.0, 500.0), egui::vec2(1000.0, 800.0)), None);
        assert_eq!(fit_image(egui::Vec2::ZERO, egui::vec2(1000.0, 800.0)), None);
    }
}
