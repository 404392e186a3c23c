//! Cutting the selection out of the source image and writing it to disk as PNG.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage, imageops};

use crate::selection::{SelectionRect, SelectionSize};

/// Exactly `size × size` pixels. Parts of the square that fall outside the
/// source (selection larger than the image) stay transparent.
pub fn crop_square(image: &DynamicImage, rect: &SelectionRect) -> RgbaImage {
    let side = rect.size.side();
    let x = rect.x.round().max(0.0) as u32;
    let y = rect.y.round().max(0.0) as u32;

    let mut out = RgbaImage::new(side, side);
    if x < image.width() && y < image.height() {
        let width = side.min(image.width() - x);
        let height = side.min(image.height() - y);
        let region = image.crop_imm(x, y, width, height).to_rgba8();
        imageops::replace(&mut out, &region, 0, 0);
    }
    out
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode PNG")?;
    Ok(bytes)
}

pub fn suggested_file_name(size: SelectionSize) -> String {
    let side = size.side();
    format!("cropped-{side}x{side}.png")
}

/// Asks the user where to save. `Ok(None)` is a cancel; `Err` means the prompt
/// could not be shown at all.
pub trait SavePrompt {
    fn ask(&self, suggested_name: &str) -> Result<Option<PathBuf>>;
}

pub struct DialogPrompt;

impl SavePrompt for DialogPrompt {
    fn ask(&self, suggested_name: &str) -> Result<Option<PathBuf>> {
        Ok(rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(suggested_name)
            .save_file())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(PathBuf),
    Downloaded(PathBuf),
    Cancelled,
}

/// Writes `blob` where the user picks, falling back to `download_dir` when the
/// prompt is unavailable or the chosen location can't be written.
pub fn persist(
    blob: &[u8],
    size: SelectionSize,
    prompt: &dyn SavePrompt,
    download_dir: &Path,
) -> Result<SaveOutcome> {
    let name = suggested_file_name(size);
    match prompt.ask(&name) {
        Ok(None) => return Ok(SaveOutcome::Cancelled),
        Ok(Some(path)) => match fs::write(&path, blob) {
            Ok(()) => return Ok(SaveOutcome::Saved(path)),
            Err(e) => log::error!("Failed to save image to {}: {}", path.display(), e),
        },
        Err(e) => log::warn!("save dialog unavailable: {e:#}"),
    }

    let path = unique_path(download_dir, &name);
    fs::write(&path, blob).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(SaveOutcome::Downloaded(path))
}

/// Crops, encodes and persists the current selection.
pub fn export(
    image: &DynamicImage,
    rect: &SelectionRect,
    prompt: &dyn SavePrompt,
    download_dir: &Path,
) -> Result<SaveOutcome> {
    let blob = encode_png(&crop_square(image, rect))?;
    persist(&blob, rect.size, prompt, download_dir)
}

// "name.png", then "name (1).png", "name (2).png", ...
fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    (1..)
        .map(|n| dir.join(format!("{stem} ({n}).{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use image::{GenericImageView, Rgba};

    struct Fixed(Result<Option<PathBuf>, String>);

    impl SavePrompt for Fixed {
        fn ask(&self, _suggested_name: &str) -> Result<Option<PathBuf>> {
            self.0.clone().map_err(|e| anyhow!(e))
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("image-slicer-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    // Pixel (x, y) encodes its own coordinates so crops can be checked.
    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 7, 255])
        }))
    }

    fn rect(x: f32, y: f32, size: SelectionSize) -> SelectionRect {
        SelectionRect { x, y, size }
    }

    #[test]
    fn crop_has_exact_size_and_origin() {
        let image = gradient(1000, 800);
        let out = crop_square(&image, &rect(244.0, 144.0, SelectionSize::S512));
        assert_eq!(out.dimensions(), (512, 512));
        assert_eq!(*out.get_pixel(0, 0), Rgba([244, 144, 7, 255]));
        assert_eq!(*out.get_pixel(511, 511), image.get_pixel(755, 655));
    }

    #[test]
    fn crop_rounds_fractional_positions() {
        let image = gradient(600, 600);
        let out = crop_square(&image, &rect(10.6, 20.4, SelectionSize::S256));
        assert_eq!(*out.get_pixel(0, 0), Rgba([11, 20, 7, 255]));
    }

    #[test]
    fn oversized_selection_is_padded_with_transparency() {
        let image = gradient(300, 200);
        let out = crop_square(&image, &rect(0.0, 0.0, SelectionSize::S512));
        assert_eq!(out.dimensions(), (512, 512));
        assert_eq!(*out.get_pixel(299, 199), Rgba([43, 199, 7, 255]));
        assert_eq!(*out.get_pixel(300, 10), Rgba([0, 0, 0, 0]));
        assert_eq!(*out.get_pixel(10, 200), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn encoded_blob_is_png_of_selection_size() {
        let blob = encode_png(&crop_square(&gradient(300, 300), &rect(0.0, 0.0, SelectionSize::S256)))
            .unwrap();
        assert_eq!(image::guess_format(&blob).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&blob).unwrap();
        assert_eq!(decoded.dimensions(), (256, 256));
    }

    #[test]
    fn file_name_mentions_size() {
        assert_eq!(suggested_file_name(SelectionSize::S1024), "cropped-1024x1024.png");
    }

    #[test]
    fn chosen_location_is_written() {
        let dir = scratch_dir("chosen");
        let target = dir.join("tile.png");
        let outcome = persist(b"png", SelectionSize::S512, &Fixed(Ok(Some(target.clone()))), &dir)
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Saved(target.clone()));
        assert_eq!(fs::read(target).unwrap(), b"png");
    }

    #[test]
    fn cancel_writes_nothing() {
        let dir = scratch_dir("cancel");
        let outcome = persist(b"png", SelectionSize::S512, &Fixed(Ok(None)), &dir).unwrap();
        assert_eq!(outcome, SaveOutcome::Cancelled);
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn unavailable_prompt_falls_back_to_download() {
        let dir = scratch_dir("unavailable");
        let outcome =
            persist(b"png", SelectionSize::S256, &Fixed(Err("no portal".into())), &dir).unwrap();
        assert_eq!(outcome, SaveOutcome::Downloaded(dir.join("cropped-256x256.png")));
    }

    #[test]
    fn failed_write_falls_back_to_download() {
        let dir = scratch_dir("failed");
        let unwritable = dir.join("missing").join("tile.png");
        let outcome =
            persist(b"png", SelectionSize::S512, &Fixed(Ok(Some(unwritable))), &dir).unwrap();
        assert_eq!(outcome, SaveOutcome::Downloaded(dir.join("cropped-512x512.png")));
    }

    #[test]
    fn downloads_do_not_overwrite() {
        let dir = scratch_dir("unique");
        let prompt = Fixed(Err("no portal".into()));
        persist(b"a", SelectionSize::S512, &prompt, &dir).unwrap();
        let second = persist(b"b", SelectionSize::S512, &prompt, &dir).unwrap();
        assert_eq!(second, SaveOutcome::Downloaded(dir.join("cropped-512x512 (1).png")));
        assert_eq!(fs::read(dir.join("cropped-512x512.png")).unwrap(), b"a");
    }

    #[test]
    fn export_writes_decodable_png() {
        let dir = scratch_dir("export");
        let target = dir.join("out.png");
        let image = gradient(1000, 800);
        let selection = rect(488.0, 0.0, SelectionSize::S512);
        export(&image, &selection, &Fixed(Ok(Some(target.clone()))), &dir).unwrap();
        let written = image::open(target).unwrap();
        assert_eq!(written.dimensions(), (512, 512));
        assert_eq!(written.get_pixel(0, 0), Rgba([232, 0, 7, 255]));
    }
}
