mod app;
mod chart;
mod color;
mod config;
mod data;
mod mailer;
mod report;
mod session;
mod ui;

use app::ExcelInsightsApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = config::load_config();
    log::debug!("Configuration: {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Excel Insights – Business Data Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(ExcelInsightsApp::new(config)))),
    )
}
