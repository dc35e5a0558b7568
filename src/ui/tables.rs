use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::model::Table;
use crate::data::outliers::OutlierSet;
use crate::data::stats::{format_measure, SummaryStats};
use crate::session::Session;

const ROW_HEIGHT: f32 = 18.0;
const MAX_TABLE_HEIGHT: f32 = 240.0;

// ---------------------------------------------------------------------------
// Data grids
// ---------------------------------------------------------------------------

/// Scrollable grid of every row and column of `table`.
pub fn data_table(ui: &mut Ui, id: &str, table: &Table) {
    if table.columns().is_empty() {
        ui.label("No columns.");
        return;
    }
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .id_salt(id)
            .striped(true)
            .resizable(true)
            .vscroll(true)
            .max_scroll_height(MAX_TABLE_HEIGHT)
            .columns(TableColumn::auto().at_least(60.0), table.columns().len())
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for col in table.columns() {
                    header.col(|ui: &mut Ui| {
                        ui.strong(&col.name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, table.len(), |mut row| {
                    let i = row.index();
                    for col in table.columns() {
                        row.col(|ui: &mut Ui| {
                            if col.values[i].is_null() {
                                ui.weak("—");
                            } else {
                                ui.label(col.values[i].to_string());
                            }
                        });
                    }
                });
            });
    });
}

// ---------------------------------------------------------------------------
// Statistics and outliers
// ---------------------------------------------------------------------------

/// Numeric column picker.
pub fn numeric_picker(ui: &mut Ui, session: &mut Session) {
    let columns = session.classification.numeric_columns();
    if columns.is_empty() {
        return;
    }
    let current = session.numeric_column.clone().unwrap_or_default();
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Numeric column for analysis:");
        egui::ComboBox::from_id_salt("numeric_column")
            .selected_text(&current)
            .show_ui(ui, |ui: &mut Ui| {
                for col in &columns {
                    if ui.selectable_label(current == *col, col).clicked() {
                        session.set_numeric_column(col);
                    }
                }
            });
    });
}

/// The five measures as metric tiles, two decimals each.
pub fn stats_metrics(ui: &mut Ui, stats: Option<&SummaryStats>) {
    let Some(stats) = stats else {
        ui.label("No statistics available.");
        return;
    };
    let entries = stats.entries();
    for chunk in [&entries[..3], &entries[3..]] {
        ui.columns(chunk.len(), |cols| {
            for (ui, (label, value)) in cols.iter_mut().zip(chunk) {
                ui.label(*label);
                ui.label(RichText::new(format_measure(*value)).size(22.0).strong());
            }
        });
        ui.add_space(6.0);
    }
}

pub fn outliers_section(ui: &mut Ui, outliers: &OutlierSet) {
    if outliers.is_empty() {
        ui.label("No outliers detected.");
        return;
    }
    ui.label(
        RichText::new(format!("{} outlier(s) detected:", outliers.len())).color(Color32::YELLOW),
    );
    if let Some(f) = &outliers.fences {
        ui.weak(format!(
            "Q1 {} · Q3 {} · IQR {} · fences [{}, {}]",
            format_measure(f.q1),
            format_measure(f.q3),
            format_measure(f.iqr),
            format_measure(f.lower),
            format_measure(f.upper)
        ));
    }
    data_table(ui, "outliers_table", &outliers.table);
}
