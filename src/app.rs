use eframe::egui::{self, ScrollArea, Ui};

use crate::config::AppConfig;
use crate::session::Session;
use crate::ui::{email, panels, plot, tables};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct ExcelInsightsApp {
    pub session: Session,
}

impl ExcelInsightsApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            session: Session::new(config),
        }
    }
}

impl eframe::App for ExcelInsightsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.session);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.session);
            });

        // ---- Central panel: tables, chart, statistics, e-mail ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    dashboard(ui, &mut self.session);
                });
        });
    }
}

fn dashboard(ui: &mut Ui, session: &mut Session) {
    ui.heading("Business Data Insights");

    if let Some(raw) = &session.raw {
        panels::advisory_list(ui, session);

        ui.add_space(8.0);
        ui.strong("Loaded data");
        tables::data_table(ui, "loaded_table", raw);

        ui.add_space(8.0);
        ui.strong("Filtered data");
        tables::data_table(ui, "filtered_table", &session.filtered);
        if session.filtered.is_empty() {
            ui.weak("No rows match the current filters.");
        }

        ui.separator();
        tables::numeric_picker(ui, session);

        ui.separator();
        plot::chart_section(ui, session);

        ui.separator();
        ui.heading("Summary statistics");
        tables::stats_metrics(ui, session.stats.as_ref());

        ui.separator();
        ui.heading("Detected outliers");
        if session.numeric_column.is_some() {
            tables::outliers_section(ui, &session.outliers);
        }
    } else {
        ui.label("Open a spreadsheet to start  (File → Open…)");
    }

    ui.separator();
    email::email_form(ui, session);
}
