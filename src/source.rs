//! Getting a decoded image into the app: the open dialog and drag-and-drop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eframe::egui;
use image::{DynamicImage, ImageFormat};

use crate::config::IMAGE_EXTENSIONS;
use crate::selection::ImageBounds;

pub struct LoadedImage {
    pub image: DynamicImage,
    pub bounds: ImageBounds,
}

impl LoadedImage {
    fn new(image: DynamicImage) -> Self {
        let bounds = ImageBounds::new(image.width(), image.height());
        Self { image, bounds }
    }
}

pub fn pick_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("Image", IMAGE_EXTENSIONS)
        .pick_file()
}

pub fn open_path(path: &Path) -> Result<LoadedImage> {
    let image =
        image::open(path).with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(LoadedImage::new(image))
}

pub fn decode_bytes(bytes: &[u8]) -> Result<LoadedImage> {
    let image = image::load_from_memory(bytes).context("failed to decode dropped image")?;
    Ok(LoadedImage::new(image))
}

/// A dropped file is taken when its MIME type says image, or, when the
/// platform reports no MIME type, when its extension is a known image format.
pub fn accepts(mime: &str, name: &Path) -> bool {
    if !mime.is_empty() {
        return mime.starts_with("image/");
    }
    ImageFormat::from_path(name).is_ok()
}

/// Only the first dropped file is considered. `None` means nothing usable was dropped.
pub fn load_dropped(files: &[egui::DroppedFile]) -> Option<Result<LoadedImage>> {
    let file = files.first()?;
    let name = file
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&file.name));
    if !accepts(&file.mime, &name) {
        log::info!("ignoring dropped file {} ({})", name.display(), file.mime);
        return None;
    }

    if let Some(bytes) = &file.bytes {
        return Some(decode_bytes(bytes));
    }
    file.path.as_deref().map(open_path)
}
