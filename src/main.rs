mod app;
mod constants;
mod error;
mod events;
mod merge_engine;
mod merge_worker;
mod office_writer;
mod preflight;
mod settings;
mod source_collector;

use eframe::NativeOptions;
use log::info;

use app::MergeAssistantApp;

fn main() -> Result<(), eframe::Error> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting File Merge Assistant");

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 700.0])
            .with_min_inner_size([700.0, 600.0])
            .with_title("File Merge Assistant"),
        ..Default::default()
    };

    eframe::run_native(
        "File Merge Assistant",
        options,
        Box::new(|cc| Box::new(MergeAssistantApp::new(cc))),
    )
}
