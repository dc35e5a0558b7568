use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::loader::{OTHER_EXTENSIONS, SPREADSHEET_EXTENSIONS};
use crate::data::model::CellValue;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, session: &mut Session) {
    ui.heading("Filters");
    ui.separator();

    if session.raw.is_none() {
        ui.label("No file loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            date_filter(ui, session);
            ui.separator();
            category_filter(ui, session);
        });
}

fn date_filter(ui: &mut Ui, session: &mut Session) {
    let Some(column) = session.classification.date_column.clone() else {
        return;
    };
    ui.strong(format!("Date ({column})"));

    let Some(bounds) = session.date_bounds else {
        ui.label(RichText::new("No valid date found.").color(Color32::YELLOW));
        return;
    };
    let current = session.date_range.unwrap_or(bounds);
    let mut start = current.start;
    let mut end = current.end;

    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Start date:");
        ui.add(DatePickerButton::new(&mut start).id_salt("date_start"));
        ui.end_row();
        ui.label("End date:");
        ui.add(DatePickerButton::new(&mut end).id_salt("date_end"));
        ui.end_row();
    });

    // The pickers are not bounded; keep the choice within the data.
    let start = start.clamp(bounds.start, bounds.end);
    let end = end.clamp(bounds.start, bounds.end);
    if start != current.start || end != current.end {
        session.set_date_range(start, end);
    }
}

fn category_filter(ui: &mut Ui, session: &mut Session) {
    let columns = session.classification.categorical_columns();
    if columns.is_empty() {
        ui.label("No categorical column.");
        return;
    }

    ui.strong("Categorical column");
    let current = session.category_column.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("category_column")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for col in &columns {
                if ui.selectable_label(current == *col, col).clicked() {
                    session.set_category_column(col);
                }
            }
        });

    let values = session.category_values();
    let header_text = format!(
        "Values  ({}/{})",
        session.category_selection.len(),
        values.len()
    );
    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt("category_values")
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    session.select_all_categories();
                }
                if ui.small_button("None").clicked() {
                    session.select_no_categories();
                }
            });

            let mut toggled: Option<CellValue> = None;
            for val in &values {
                let mut checked = session.category_selection.contains(val);
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    toggled = Some(val.clone());
                }
            }
            if let Some(val) = toggled {
                session.toggle_category(&val);
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, session: &mut Session) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(session);
                ui.close_menu();
            }
        });

        ui.separator();

        if session.raw.is_some() {
            ui.label(format!(
                "{} rows loaded, {} after filters",
                session.total_rows(),
                session.filtered.len()
            ));
        }

        if let Some(msg) = &session.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                Color32::LIGHT_GREEN
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

/// Advisories of the current session, one line each.
pub fn advisory_list(ui: &mut Ui, session: &Session) {
    if session.load_advisories.is_empty() && session.advisories.is_empty() {
        return;
    }
    ui.strong("Notices");
    for advisory in session.all_advisories() {
        ui.label(RichText::new(format!("⚠ {advisory}")).color(Color32::YELLOW));
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(session: &mut Session) {
    let all: Vec<&str> = SPREADSHEET_EXTENSIONS
        .iter()
        .chain(OTHER_EXTENSIONS)
        .copied()
        .collect();
    let file = rfd::FileDialog::new()
        .set_title("Open data file")
        .add_filter("Excel workbook", &["xlsx"])
        .add_filter("Spreadsheets", SPREADSHEET_EXTENSIONS)
        .add_filter("All supported files", &all)
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = session.load_file(&path) {
            log::error!("Failed to load file: {e:#}");
            session.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
