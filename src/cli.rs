use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::batch::RecordBatch;
use crate::config::Config;
use crate::export::export_to_dir;
use crate::ingest::{ingest_file, IngestReport};
use crate::privacy::{IdentifierHasher, SafeCount};
use crate::stats::{AnalyticsReport, LabelCount};
use crate::store::{Store, StoredRecord};
use crate::types::Result;

/// Rows of stored data shown in the analytics tab
const STORED_PREVIEW_ROWS: usize = 10;

/// Multi-clinic visit record ingestion with patient de-identification
#[derive(Parser, Debug)]
#[command(name = "clinic-lake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides the configuration file)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema
    Init,

    /// Anonymize a clinic file and append it to the database
    Ingest {
        /// Input file path (CSV, TSV or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// Clinic label the rows are tagged with
        #[arg(short, long)]
        clinic: String,

        /// Output JSON report path (stdout if not specified)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Anonymize a file and write the result as CSV without storing it
    Anonymize {
        /// Input file path (CSV, TSV or Excel)
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV path (stdout if not specified)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print aggregate analytics over the stored records
    Stats {
        /// Report counts as privacy ranges instead of exact values
        #[arg(long, default_value_t = false)]
        bucket_counts: bool,

        /// Output JSON file path (stdout if not specified)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Export all stored records to a timestamped CSV file
    Export {
        /// Directory for the export file (overrides the configuration file)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Launch the GUI
    Gui,
}

/// GUI tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Upload,
    Analytics,
    Export,
}

/// Upload tab state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GuiState {
    #[default]
    Ready,
    Processing,
    Done,
    Error(String),
}

/// GUI Application
pub struct GuiApp {
    config: Config,
    hasher: IdentifierHasher,
    tab: Tab,
    state: GuiState,
    spinner_shown: bool,
    dropped_file: Option<PathBuf>,
    clinic: String,
    report: Option<IngestReport>,
    bucket_counts: bool,
    analytics: Option<AnalyticsReport>,
    stored_preview: Vec<StoredRecord>,
    analytics_error: Option<String>,
    export_message: Option<String>,
}

impl GuiApp {
    pub fn new(config: Config, hasher: IdentifierHasher) -> Self {
        Self {
            config,
            hasher,
            tab: Tab::default(),
            state: GuiState::default(),
            spinner_shown: false,
            dropped_file: None,
            clinic: "Clinic_A".to_string(),
            report: None,
            bucket_counts: false,
            analytics: None,
            stored_preview: Vec::new(),
            analytics_error: None,
            export_message: None,
        }
    }

    /// The store is opened per action and closed when it goes out of scope
    fn open_store(&self) -> Result<Store> {
        Store::open(&self.config.database.path)
    }

    fn process(&mut self) {
        let Some(path) = self.dropped_file.clone() else {
            self.state = GuiState::Ready;
            return;
        };

        let result = self
            .open_store()
            .and_then(|mut store| ingest_file(&mut store, &path, &self.clinic, &self.hasher));

        match result {
            Ok(report) => {
                self.report = Some(report);
                self.state = GuiState::Done;
            }
            Err(e) => {
                self.state = GuiState::Error(e.to_string());
            }
        }
    }

    /// Advance an upload in progress. The frame after the request only draws
    /// the spinner; the file is processed on the one after. Returns whether
    /// another frame is needed.
    fn advance_processing(&mut self) -> bool {
        if self.state != GuiState::Processing {
            return false;
        }
        if self.spinner_shown {
            self.spinner_shown = false;
            self.process();
            false
        } else {
            self.spinner_shown = true;
            true
        }
    }

    fn refresh_analytics(&mut self) {
        match self.open_store().and_then(|store| store.records()) {
            Ok(records) => {
                self.analytics = Some(AnalyticsReport::from_records(&records, self.bucket_counts));
                self.stored_preview = records.into_iter().take(STORED_PREVIEW_ROWS).collect();
                self.analytics_error = None;
            }
            Err(e) => {
                self.analytics_error = Some(e.to_string());
            }
        }
    }

    fn export(&mut self, dir: PathBuf) {
        let result = self
            .open_store()
            .and_then(|store| export_to_dir(&store, &dir));

        self.export_message = Some(match result {
            Ok(Some(path)) => format!("Data exported to {}", path.display()),
            Ok(None) => "No data available for export".to_string(),
            Err(e) => format!("Export failed: {}", e),
        });
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle dropped files
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                if let Some(path) = i.raw.dropped_files[0].path.clone() {
                    self.dropped_file = Some(path);
                    self.tab = Tab::Upload;
                    self.state = GuiState::Ready;
                    self.spinner_shown = false;
                }
            }
        });

        if self.advance_processing() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Multi-Clinic Medical Data Lake");
            ui.label("Patient names and contact details are removed; patient IDs are hashed.");
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, Tab::Upload, "Data Upload");
                ui.selectable_value(&mut self.tab, Tab::Analytics, "Analytics");
                ui.selectable_value(&mut self.tab, Tab::Export, "Export");
            });
            ui.separator();

            match self.tab {
                Tab::Upload => match &self.state {
                    GuiState::Ready => self.show_ready_state(ui),
                    GuiState::Processing => {
                        ui.spinner();
                        ui.label("Processing file...");
                    }
                    GuiState::Done => self.show_done_state(ui),
                    GuiState::Error(msg) => {
                        let msg = msg.clone();
                        self.show_error_state(ui, msg);
                    }
                },
                Tab::Analytics => self.show_analytics(ui),
                Tab::Export => self.show_export(ui),
            }
        });
    }
}

impl GuiApp {
    fn show_ready_state(&mut self, ui: &mut egui::Ui) {
        // Drag and drop zone
        let drop_zone = egui::Frame::none()
            .fill(egui::Color32::from_gray(40))
            .stroke(egui::Stroke::new(2.0, egui::Color32::from_gray(100)))
            .rounding(10.0)
            .inner_margin(30.0);

        drop_zone.show(ui, |ui| {
            ui.vertical_centered(|ui| {
                match &self.dropped_file {
                    Some(path) => ui.label(format!("Selected: {}", path.display())),
                    None => ui.label("Drag and drop a visit file here (CSV, TSV, Excel)"),
                };
                ui.add_space(10.0);
                if ui.button("Browse...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Data files", &["csv", "tsv", "xlsx", "xls"])
                        .pick_file()
                    {
                        self.dropped_file = Some(path);
                    }
                }
            });
        });

        ui.add_space(15.0);

        ui.horizontal(|ui| {
            ui.label("Clinic name:");
            ui.text_edit_singleline(&mut self.clinic);
        });

        ui.add_space(10.0);

        let ready = self.dropped_file.is_some() && !self.clinic.trim().is_empty();
        if ui
            .add_enabled(ready, egui::Button::new("Process & save data"))
            .clicked()
        {
            self.state = GuiState::Processing;
            ui.ctx().request_repaint();
        }
    }

    fn show_done_state(&mut self, ui: &mut egui::Ui) {
        let mut should_reset = false;

        if let Some(report) = &self.report {
            ui.label(format!(
                "Data saved: {} records added for {}",
                report.rows_stored, report.clinic
            ));
            if !report.removed_columns.is_empty() {
                ui.label(format!("Removed columns: {}", report.removed_columns.join(", ")));
            }
            if !report.hashed_identifiers {
                ui.label("No patient_id column found; rows stored without a patient hash.");
            }

            if !report.warnings.is_empty() {
                ui.collapsing(format!("Warnings ({})", report.warnings.len()), |ui| {
                    for warning in &report.warnings {
                        ui.colored_label(egui::Color32::YELLOW, &warning.message);
                    }
                });
            }

            ui.add_space(10.0);
            ui.strong(format!("Original data preview ({} records)", report.rows_read));
            batch_grid(ui, "original_preview", &report.original_preview);

            ui.add_space(10.0);
            ui.strong("Anonymized data");
            batch_grid(ui, "anonymized_preview", &report.preview);
        }

        ui.add_space(10.0);
        if ui.button("Upload another file").clicked() {
            should_reset = true;
        }

        if should_reset {
            self.reset();
        }
    }

    fn show_error_state(&mut self, ui: &mut egui::Ui, msg: String) {
        ui.colored_label(egui::Color32::RED, format!("Error: {}", msg));
        ui.add_space(20.0);
        if ui.button("Try again").clicked() {
            self.reset();
        }
    }

    fn show_analytics(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Refresh analytics").clicked() {
                self.refresh_analytics();
            }
            ui.checkbox(&mut self.bucket_counts, "Bucket counts");
        });

        if let Some(err) = &self.analytics_error {
            ui.colored_label(egui::Color32::RED, format!("Error: {}", err));
            return;
        }

        let Some(report) = &self.analytics else {
            ui.label("Press refresh to load analytics.");
            return;
        };

        if report.is_empty() {
            ui.label("No data available. Upload data to see analytics.");
            return;
        }

        ui.add_space(10.0);
        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("overview").show(ui, |ui| {
                ui.label("Total records:");
                ui.label(report.total_records.to_string());
                ui.end_row();
                ui.label("Total clinics:");
                ui.label(report.total_clinics.to_string());
                ui.end_row();
                ui.label("Average age:");
                ui.label(
                    report
                        .age
                        .mean
                        .map(|m| format!("{:.1} years", m))
                        .unwrap_or_else(|| "n/a".to_string()),
                );
                ui.end_row();
                ui.label("Unique diagnoses:");
                ui.label(report.unique_diagnoses.to_string());
                ui.end_row();
            });

            ui.add_space(10.0);
            distribution_bars(ui, "Age distribution", &report.age_distribution);
            distribution_bars(ui, "Diagnosis distribution", &report.diagnosis_distribution);
            distribution_bars(ui, "Patients per clinic", &report.clinic_distribution);

            ui.add_space(10.0);
            ui.strong("Current database data");
            stored_grid(ui, &self.stored_preview);
        });
    }

    fn show_export(&mut self, ui: &mut egui::Ui) {
        let default_dir = self.config.export.directory.clone();

        ui.label(format!("Export directory: {}", default_dir.display()));
        ui.horizontal(|ui| {
            if ui.button("Export data to CSV").clicked() {
                self.export(default_dir.clone());
            }
            if ui.button("Export to folder...").clicked() {
                if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                    self.export(dir);
                }
            }
        });

        if let Some(msg) = &self.export_message {
            ui.add_space(10.0);
            ui.label(msg);
        }
    }

    fn reset(&mut self) {
        self.state = GuiState::Ready;
        self.dropped_file = None;
        self.report = None;
    }
}

fn batch_grid(ui: &mut egui::Ui, id: &str, batch: &RecordBatch) {
    egui::ScrollArea::horizontal().id_source(id).show(ui, |ui| {
        egui::Grid::new(id).striped(true).show(ui, |ui| {
            for column in batch.columns() {
                ui.strong(column);
            }
            ui.end_row();
            for index in 0..batch.len() {
                for value in batch.ordered_values(index) {
                    ui.label(value.to_string());
                }
                ui.end_row();
            }
        });
    });
}

fn stored_grid(ui: &mut egui::Ui, records: &[StoredRecord]) {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    egui::ScrollArea::horizontal().id_source("stored").show(ui, |ui| {
        egui::Grid::new("stored").striped(true).show(ui, |ui| {
            for header in ["id", "clinic", "patient_hash", "age", "sex", "visit_date", "diagnosis_code"] {
                ui.strong(header);
            }
            ui.end_row();
            for record in records {
                ui.label(record.id.to_string());
                ui.label(&record.clinic);
                ui.label(text(&record.patient_hash));
                ui.label(record.age.map(|a| a.to_string()).unwrap_or_default());
                ui.label(text(&record.sex));
                ui.label(text(&record.visit_date));
                ui.label(text(&record.diagnosis_code));
                ui.end_row();
            }
        });
    });
}

fn distribution_bars(ui: &mut egui::Ui, title: &str, counts: &[LabelCount]) {
    ui.collapsing(title, |ui| {
        let max = counts
            .iter()
            .filter_map(|c| c.count.exact())
            .max()
            .unwrap_or(0);

        for entry in counts {
            let text = format!("{}: {}", entry.label, entry.count);
            match &entry.count {
                SafeCount::Exact(n) if max > 0 => {
                    ui.add(egui::ProgressBar::new(*n as f32 / max as f32).text(text));
                }
                _ => {
                    ui.label(text);
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_spinner_frame_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.path = dir.path().join("lake.db");

        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        write!(file, "patient_id,age\nP001,25\n").unwrap();

        let mut app = GuiApp::new(config.clone(), IdentifierHasher::default());
        app.dropped_file = Some(file.path().to_path_buf());
        app.state = GuiState::Processing;

        assert!(app.advance_processing());
        assert_eq!(app.state, GuiState::Processing);
        assert_eq!(Store::open(&config.database.path).unwrap().count().unwrap(), 0);

        assert!(!app.advance_processing());
        assert_eq!(app.state, GuiState::Done);
        assert_eq!(app.report.as_ref().map(|r| r.rows_stored), Some(1));
        assert_eq!(Store::open(&config.database.path).unwrap().count().unwrap(), 1);

        assert!(!app.advance_processing());
    }
}
