use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::chart::raster::{self, RasterChart};
use crate::chart::{build_chart, ChartData, ChartError, ChartKind, ChartRequest, MAX_CHART_COLUMNS};
use crate::config::AppConfig;
use crate::data::advisory::{Advisories, Advisory};
use crate::data::classify::{classify, Classification};
use crate::data::filter::{date_bounds, filter, CategoryFilter, DateRange};
use crate::data::loader;
use crate::data::model::{CellValue, Table};
use crate::data::outliers::{detect_outliers, OutlierSet};
use crate::data::stats::{summarize, SummaryStats};
use crate::mailer::{self, EmailForm, MailOutcome, ReportMailer};
use crate::report::{self, ReportInput, ReportSettings};

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Whether a chart is shown, and what it plots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartSelection {
    pub enabled: bool,
    pub request: ChartRequest,
}

/// Everything one user session holds, independent of rendering.
///
/// Selections are changed through the setters, each of which reruns the
/// pipeline; the derived fields are never edited directly.
pub struct Session {
    pub config: AppConfig,

    /// File the table came from.
    pub source: Option<PathBuf>,
    /// Loaded table with date columns normalised.
    pub raw: Option<Table>,
    pub classification: Classification,
    /// Advisories raised while loading and classifying.
    pub load_advisories: Advisories,

    pub date_bounds: Option<DateRange>,
    pub date_range: Option<DateRange>,
    pub category_column: Option<String>,
    pub category_selection: BTreeSet<CellValue>,
    pub numeric_column: Option<String>,
    pub chart: ChartSelection,

    // ---- derived ----
    pub filtered: Table,
    pub stats: Option<SummaryStats>,
    pub outliers: OutlierSet,
    pub chart_result: Option<Result<ChartData, ChartError>>,
    /// Advisories raised by the last pipeline run.
    pub advisories: Advisories,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
    pub report_path: Option<PathBuf>,
    pub email: EmailForm,
    pub mail_outcome: Option<MailOutcome>,
}

impl Session {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            source: None,
            raw: None,
            classification: Classification::default(),
            load_advisories: Advisories::new(),
            date_bounds: None,
            date_range: None,
            category_column: None,
            category_selection: BTreeSet::new(),
            numeric_column: None,
            chart: ChartSelection::default(),
            filtered: Table::default(),
            stats: None,
            outliers: OutlierSet::default(),
            chart_result: None,
            advisories: Advisories::new(),
            status_message: None,
            report_path: None,
            email: EmailForm::default(),
            mail_outcome: None,
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Load a file and start over with it.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let table = loader::load_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
        log::info!(
            "Loaded {} rows with columns {:?}",
            table.len(),
            table.column_names().collect::<Vec<_>>()
        );
        self.set_table(table, Some(path.to_path_buf()));
        Ok(())
    }

    /// Ingest a table: classify it and reset every selection.
    pub fn set_table(&mut self, mut table: Table, source: Option<PathBuf>) {
        let mut advisories = Advisories::new();
        let classification = classify(&mut table, &mut advisories);

        let date_bounds = classification
            .date_column
            .as_deref()
            .and_then(|c| date_bounds(&table, c));
        let category_column = classification.categorical_columns().into_iter().next();
        let category_selection = category_column
            .as_deref()
            .map(|c| CategoryFilter::all_values(&table, c).allowed)
            .unwrap_or_default();

        self.numeric_column = classification.numeric_columns().into_iter().next();
        self.date_bounds = date_bounds;
        self.date_range = date_bounds;
        self.category_column = category_column;
        self.category_selection = category_selection;
        self.chart = ChartSelection::default();
        self.classification = classification;
        self.load_advisories = advisories;
        self.raw = Some(table);
        self.source = source;
        self.status_message = None;
        self.report_path = None;
        self.mail_outcome = None;

        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Selection changes
    // -----------------------------------------------------------------------

    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.date_range = Some(DateRange::new(start, end));
        self.recompute();
    }

    /// Switch the categorical column; its selection starts with every value.
    pub fn set_category_column(&mut self, column: &str) {
        self.category_column = Some(column.to_string());
        self.category_selection = self.category_values();
        self.recompute();
    }

    /// All values of the current categorical column, in order.
    pub fn category_values(&self) -> BTreeSet<CellValue> {
        match (&self.raw, &self.category_column) {
            (Some(t), Some(c)) => CategoryFilter::all_values(t, c).allowed,
            _ => BTreeSet::new(),
        }
    }

    pub fn toggle_category(&mut self, value: &CellValue) {
        if !self.category_selection.remove(value) {
            self.category_selection.insert(value.clone());
        }
        self.recompute();
    }

    pub fn select_all_categories(&mut self) {
        self.category_selection = self.category_values();
        self.recompute();
    }

    pub fn select_no_categories(&mut self) {
        self.category_selection.clear();
        self.recompute();
    }

    pub fn set_numeric_column(&mut self, column: &str) {
        self.numeric_column = Some(column.to_string());
        self.recompute();
    }

    pub fn set_chart_enabled(&mut self, enabled: bool) {
        self.chart.enabled = enabled;
        self.recompute();
    }

    pub fn set_chart_kind(&mut self, kind: ChartKind) {
        self.chart.request.kind = kind;
        self.recompute();
    }

    /// Add or remove a chart column; at most two are kept, in pick order.
    pub fn toggle_chart_column(&mut self, column: &str) {
        let columns = &mut self.chart.request.columns;
        if let Some(pos) = columns.iter().position(|c| c == column) {
            columns.remove(pos);
        } else if columns.len() < MAX_CHART_COLUMNS {
            columns.push(column.to_string());
        }
        self.recompute();
    }

    // -----------------------------------------------------------------------
    // Pipeline
    // -----------------------------------------------------------------------

    /// Rerun filter → statistics → outliers → chart from the raw table.
    pub fn recompute(&mut self) {
        let mut advisories = Advisories::new();
        let Some(raw) = &self.raw else {
            return;
        };

        if let (Some(column), None) = (&self.classification.date_column, self.date_bounds) {
            advisories.push(Advisory::NoValidDates {
                column: column.clone(),
            });
        }
        let category = match &self.category_column {
            Some(column) => Some(CategoryFilter {
                column: column.clone(),
                allowed: self.category_selection.clone(),
            }),
            None => {
                advisories.push(Advisory::NoCategoricalColumn);
                None
            }
        };
        self.filtered = filter(
            raw,
            self.classification.date_column.as_deref(),
            self.date_range.as_ref(),
            category.as_ref(),
            &mut advisories,
        );

        match &self.numeric_column {
            Some(column) => {
                self.stats = summarize(&self.filtered, column);
                if self.stats.is_none() {
                    advisories.push(Advisory::NoNumericValues {
                        column: column.clone(),
                    });
                }
                self.outliers = detect_outliers(&self.filtered, column);
            }
            None => {
                advisories.push(Advisory::NoNumericColumn);
                self.stats = None;
                self.outliers = OutlierSet::default();
            }
        }

        self.chart_result = if self.chart.enabled && !self.chart.request.columns.is_empty() {
            let result = build_chart(
                &self.filtered,
                &self.chart.request,
                self.config.histogram_bins,
            );
            if let Err(e) = &result {
                log::warn!("Chart not built: {e}");
            }
            Some(result)
        } else {
            None
        };

        self.advisories = advisories;
    }

    /// Load-time and pipeline advisories, for display.
    pub fn all_advisories(&self) -> impl Iterator<Item = &Advisory> {
        self.load_advisories.iter().chain(self.advisories.iter())
    }

    pub fn total_rows(&self) -> usize {
        self.raw.as_ref().map(Table::len).unwrap_or(0)
    }

    /// The chart to draw, if one is enabled and valid.
    pub fn chart_data(&self) -> Option<&ChartData> {
        self.chart_result.as_ref().and_then(|r| r.as_ref().ok())
    }

    // -----------------------------------------------------------------------
    // Outputs
    // -----------------------------------------------------------------------

    pub fn render_chart(&self) -> Result<Option<RasterChart>> {
        self.chart_data()
            .map(|chart| {
                raster::render(chart, self.config.chart_width, self.config.chart_height)
                    .context("rendering chart")
            })
            .transpose()
    }

    pub fn save_chart_png(&mut self, path: &Path) -> Result<()> {
        let raster = self.render_chart()?.context("No chart to save")?;
        raster.save_png(path).context("saving chart")?;
        self.status_message = Some(format!("Chart saved to {}", path.display()));
        Ok(())
    }

    /// Write the PDF report to the configured path.
    pub fn export_report(&mut self) -> Result<PathBuf> {
        let chart = self.render_chart()?;
        let input = ReportInput {
            table: &self.filtered,
            columns: &self.chart.request.columns,
            chart_kind: self.chart.request.kind,
            chart: chart.as_ref(),
            numeric_column: self.numeric_column.as_deref(),
            stats: self.stats.as_ref(),
            total_rows: self.total_rows(),
        };
        let settings = ReportSettings {
            preview_rows: self.config.preview_rows,
            line_width: self.config.preview_line_width,
        };
        let path = report::write_report(&input, &settings, &self.config.report_path)
            .context("writing PDF report")?;
        self.status_message = Some(format!("Report saved to {}", path.display()));
        self.report_path = Some(path.clone());
        Ok(path)
    }

    /// Send the last report (or the configured report path) by e-mail.
    pub fn send_email(&mut self, mailer: &dyn ReportMailer) -> MailOutcome {
        let attachment = self
            .report_path
            .clone()
            .unwrap_or_else(|| self.config.report_path.clone());
        let outcome = mailer::submit(
            mailer,
            &self.email,
            &self.config.email_subject,
            &self.config.email_body,
            &attachment,
        );
        if outcome.is_success() {
            log::info!("Report e-mailed to {}", self.email.recipient);
        }
        self.mail_outcome = Some(outcome.clone());
        outcome
    }
}
