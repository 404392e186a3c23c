#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

mod app;
mod config;
mod display;
mod export;
mod selection;
mod source;

use eframe::egui;

use crate::app::ImageSlicer;
use crate::config::AppConfig;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::default();
    log::debug!("fallback download directory: {}", config.download_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_drag_and_drop(true),
        ..Default::default()
    };
    eframe::run_native(
        "Image Slicer",
        options,
        Box::new(|cc| Ok(Box::new(ImageSlicer::new(cc, config)))),
    )
}
