use std::path::PathBuf;

use crate::selection::SelectionSize;

/// Extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tiff"];

pub struct AppConfig {
    /// Square sizes offered in the size selector.
    pub sizes: Vec<SelectionSize>,
    pub default_size: SelectionSize,
    /// Where exports land when the save dialog can't be used.
    pub download_dir: PathBuf,
    pub window_size: [f32; 2],
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sizes: SelectionSize::ALL.to_vec(),
            default_size: SelectionSize::S512,
            download_dir: dirs::download_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            window_size: [1024.0, 768.0],
        }
    }
}
