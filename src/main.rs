// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod drivers;
mod engine;
mod gui;
mod recorder;
mod serial;
mod settings;
mod types;
use eframe::egui;
use settings::SettingsStore;
// 入口函数
fn main() -> eframe::Result<()> {
    env_logger::init();
    let store = SettingsStore::new(SettingsStore::default_location());
    log::info!("settings file: {}", store.path().display());
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1000.0, 600.0])
        .with_min_inner_size([760.0, 420.0])
        .with_title("Serial Plotter");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Serial Plotter",
        options,
        Box::new(move |_cc| Box::new(gui::PlotterApp::new(store))),
    )
}
