use eframe::egui::{self, Color32, RichText, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoint, PlotPoints, Points,
    Polygon, Text,
};

use crate::chart::{ChartData, ChartKind};
use crate::color::{generate_palette, ColorMap};
use crate::session::Session;

const PLOT_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Chart section (central panel)
// ---------------------------------------------------------------------------

/// Chart controls, the chart itself and the export buttons.
pub fn chart_section(ui: &mut Ui, session: &mut Session) {
    ui.heading("Chart");

    let mut enabled = session.chart.enabled;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Show a chart?");
        ui.radio_value(&mut enabled, true, "Yes");
        ui.radio_value(&mut enabled, false, "No");
    });
    if enabled != session.chart.enabled {
        session.set_chart_enabled(enabled);
    }
    if !session.chart.enabled {
        return;
    }

    let Some(raw) = &session.raw else {
        return;
    };
    let columns: Vec<String> = raw.column_names().map(str::to_string).collect();

    ui.label("Select up to 2 columns:");
    let mut toggled: Option<String> = None;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for col in &columns {
            let selected = session.chart.request.columns.contains(col);
            let mut label = ui.selectable_label(selected, col);
            if let Some(role) = session.classification.role_of(col) {
                label = label.on_hover_text(format!("{role} column"));
            }
            if label.clicked() {
                toggled = Some(col.clone());
            }
        }
    });
    if let Some(col) = toggled {
        session.toggle_chart_column(&col);
    }

    let current = session.chart.request.kind;
    egui::ComboBox::from_id_salt("chart_kind")
        .selected_text(current.label())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in ChartKind::ALL {
                if ui.selectable_label(kind == current, kind.label()).clicked() {
                    session.set_chart_kind(kind);
                }
            }
        });

    match &session.chart_result {
        None => {}
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
        }
        Some(Ok(chart)) => {
            ui.strong(format!("Visualization: {}", chart.kind()));
            chart_plot(ui, chart);
            export_buttons(ui, session);
        }
    }
}

fn export_buttons(ui: &mut Ui, session: &mut Session) {
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Export PDF").clicked() {
            if let Err(e) = session.export_report() {
                log::error!("Failed to export report: {e:#}");
                session.status_message = Some(format!("Error: {e:#}"));
            }
        }
        if ui.button("Save chart PNG").clicked() {
            let target = rfd::FileDialog::new()
                .set_title("Save chart")
                .add_filter("PNG image", &["png"])
                .set_file_name("chart.png")
                .save_file();
            if let Some(path) = target {
                if let Err(e) = session.save_chart_png(&path) {
                    log::error!("Failed to save chart: {e:#}");
                    session.status_message = Some(format!("Error: {e:#}"));
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

/// Draw a prepared chart with egui_plot.
pub fn chart_plot(ui: &mut Ui, chart: &ChartData) {
    match chart {
        ChartData::Bar {
            x_label,
            y_label,
            bars,
        } => {
            let colors = ColorMap::new(bars.iter().map(|b| b.0.clone()));
            let labels: Vec<String> = bars.iter().map(|b| b.0.clone()).collect();
            let items: Vec<Bar> = bars
                .iter()
                .enumerate()
                .map(|(i, (label, value))| {
                    Bar::new(i as f64, *value)
                        .name(label)
                        .fill(colors.color_for(label))
                        .width(0.7)
                })
                .collect();
            Plot::new("bar_chart")
                .height(PLOT_HEIGHT)
                .x_axis_label(x_label.as_str())
                .y_axis_label(y_label.as_str())
                .x_axis_formatter(move |mark, _range| category_tick(&labels, mark.value))
                .show(ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(items).name(y_label));
                });
        }
        ChartData::Line { series } => {
            let colors = ColorMap::new(series.iter().map(|s| s.name.clone()));
            Plot::new("line_chart")
                .height(PLOT_HEIGHT)
                .legend(Legend::default())
                .x_axis_label("row")
                .show(ui, |plot_ui| {
                    for s in series {
                        let points: PlotPoints = s.points.clone().into();
                        plot_ui.line(
                            Line::new(points)
                                .name(&s.name)
                                .color(colors.color_for(&s.name))
                                .width(1.5),
                        );
                    }
                });
        }
        ChartData::Pie { column, slices } => {
            let colors = ColorMap::new(slices.iter().map(|s| s.label.clone()));
            Plot::new("pie_chart")
                .height(PLOT_HEIGHT)
                .data_aspect(1.0)
                .show_axes(false)
                .show_grid(false)
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    let mut start = 0.0_f64;
                    for slice in slices {
                        let sweep = slice.fraction * std::f64::consts::TAU;
                        let steps = ((slice.fraction * 120.0).ceil() as usize).max(2);
                        let mut outline = vec![[0.0, 0.0]];
                        outline.extend((0..=steps).map(|k| {
                            let a = start + sweep * k as f64 / steps as f64;
                            [a.cos(), a.sin()]
                        }));
                        plot_ui.polygon(
                            Polygon::new(PlotPoints::new(outline))
                                .fill_color(colors.color_for(&slice.label))
                                .name(&slice.label),
                        );
                        let mid = start + sweep / 2.0;
                        plot_ui.text(Text::new(
                            PlotPoint::new(0.65 * mid.cos(), 0.65 * mid.sin()),
                            slice.percent_label(),
                        ));
                        start += sweep;
                    }
                    plot_ui.text(Text::new(PlotPoint::new(0.0, 1.15), column.as_str()));
                });
        }
        ChartData::Histogram { column, bins } => {
            let fill = generate_palette(1)[0];
            let items: Vec<Bar> = bins
                .iter()
                .map(|b| {
                    Bar::new((b.start + b.end) / 2.0, b.count as f64)
                        .width(b.end - b.start)
                        .fill(fill)
                })
                .collect();
            Plot::new("histogram")
                .height(PLOT_HEIGHT)
                .x_axis_label(column.as_str())
                .y_axis_label("frequency")
                .show(ui, |plot_ui| {
                    plot_ui.bar_chart(BarChart::new(items).name(column));
                });
        }
        ChartData::Scatter {
            x_label,
            y_label,
            points,
        } => {
            let color = generate_palette(1)[0];
            Plot::new("scatter")
                .height(PLOT_HEIGHT)
                .x_axis_label(x_label.as_str())
                .y_axis_label(y_label.as_str())
                .show(ui, |plot_ui| {
                    plot_ui.points(
                        Points::new(PlotPoints::new(points.clone()))
                            .radius(3.0)
                            .color(color),
                    );
                });
        }
        ChartData::Boxplot { column, summary } => {
            let color = generate_palette(1)[0];
            let spread = BoxSpread::new(
                summary.whisker_low,
                summary.q1,
                summary.median,
                summary.q3,
                summary.whisker_high,
            );
            let fliers: Vec<[f64; 2]> = summary.fliers.iter().map(|&v| [0.0, v]).collect();
            Plot::new("boxplot")
                .height(PLOT_HEIGHT)
                .x_axis_formatter(|_, _| String::new())
                .x_axis_label(column.as_str())
                .show(ui, |plot_ui| {
                    plot_ui.box_plot(
                        BoxPlot::new(vec![BoxElem::new(0.0, spread).name(column).fill(color.gamma_multiply(0.4))])
                            .name(column),
                    );
                    plot_ui.points(Points::new(PlotPoints::new(fliers)).radius(3.0));
                });
        }
    }
}

/// Axis tick text for integer positions of a categorical axis.
fn category_tick(labels: &[String], value: f64) -> String {
    let i = value.round();
    if (value - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}
