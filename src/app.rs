use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use chrono::Local;
use egui::Context;
use log::{error, info, warn};

use crate::constants::{
    OutputFormat, DEFAULT_OUTPUT_FORMAT, PROGRESS_PERCENT_PER_FILE, REQUIRED_TOOLS,
    UI_STATUS_MESSAGE_DURATION,
};
use crate::events::AppEvent;
use crate::merge_engine::BuiltinEngine;
use crate::merge_worker::MergeWorker;
use crate::preflight;
use crate::settings::{default_output_path, MergeSettings, MergeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreflightState {
    Checking,
    Failed,
    Satisfied,
}

#[derive(Debug)]
enum MergeOutcome {
    Success(MergeStats),
    Failure(String),
}

pub struct MergeAssistantApp {
    // Form state
    input_path: String,
    output_path: String,
    output_format: OutputFormat,
    add_source_info: bool,
    recursive: bool,

    // Communication
    event_sender: mpsc::Sender<AppEvent>,
    event_receiver: mpsc::Receiver<AppEvent>,

    // At most one active worker, discarded on completion
    worker: Option<MergeWorker>,

    // Preflight dialog state
    preflight_state: PreflightState,
    preflight_message: String,

    // Progress & log pane
    progress_percent: u32,
    progress_status: String,
    log_lines: Vec<String>,

    // Dialogs & feedback
    result_dialog: Option<MergeOutcome>,
    validation_warning: Option<String>,
    status_message: Option<(String, Instant)>,
    error_message: Option<String>,
}

impl MergeAssistantApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let (event_sender, event_receiver) = mpsc::channel();

        // Startup dependency check runs immediately on its own thread
        preflight::spawn_preflight(event_sender.clone());

        Self {
            input_path: String::new(),
            output_path: String::new(),
            output_format: DEFAULT_OUTPUT_FORMAT,
            add_source_info: true,
            recursive: true,
            event_sender,
            event_receiver,
            worker: None,
            preflight_state: PreflightState::Checking,
            preflight_message: "Initializing...".to_string(),
            progress_percent: 0,
            progress_status: "Ready".to_string(),
            log_lines: Vec::new(),
            result_dialog: None,
            validation_warning: None,
            status_message: None,
            error_message: None,
        }
    }

    fn is_merging(&self) -> bool {
        self.worker.is_some()
    }

    fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
        self.error_message = None; // Clear error when showing status
    }

    fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
        self.status_message = None; // Clear status when showing error
    }

    fn clear_messages(&mut self) {
        self.status_message = None;
        self.error_message = None;
    }

    fn push_log(&mut self, line: String) {
        self.log_lines
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), line));
    }

    fn select_input_file(&mut self) {
        let dialog = rfd::FileDialog::new()
            .add_filter("All files", &["*"])
            .add_filter("Excel files", &["xlsx", "xls"])
            .add_filter("Word files", &["docx"])
            .add_filter("JSON files", &["json"])
            .add_filter("Text files", &["txt", "csv"]);
        if let Some(path) = dialog.pick_file() {
            self.apply_input_selection(path);
        }
    }

    fn select_input_folder(&mut self) {
        if let Some(path) = rfd::FileDialog::new().pick_folder() {
            self.apply_input_selection(path);
        }
    }

    fn apply_input_selection(&mut self, path: PathBuf) {
        info!("Input selected: {:?}", path);
        self.input_path = path.display().to_string();

        // Auto-fill the output path next to the input when the field is empty
        if let Some(output) = auto_filled_output(&path, &self.output_path) {
            self.output_path = output;
            self.progress_status = "Input selected".to_string();
        }
    }

    fn select_output_file(&mut self) {
        let extension = self.output_format.extension();
        let dialog = rfd::FileDialog::new()
            .add_filter(self.output_format.name(), &[extension])
            .set_file_name(&format!("merged.{}", extension));
        if let Some(path) = dialog.save_file() {
            self.output_path = path.display().to_string();
            self.progress_status = "Output path set".to_string();
        }
    }

    fn retry_preflight(&mut self) {
        self.preflight_state = PreflightState::Checking;
        self.preflight_message = "Retrying dependency check...".to_string();
        preflight::spawn_preflight(self.event_sender.clone());
    }

    fn start_merge(&mut self) {
        // Re-verify the helper tools before every run
        if self.preflight_state != PreflightState::Satisfied
            || !preflight::tools_available(REQUIRED_TOOLS)
        {
            warn!("Required tools missing at merge start, re-running preflight");
            self.retry_preflight();
            return;
        }

        if let Some(message) = validate_paths(&self.input_path, &self.output_path) {
            self.validation_warning = Some(message.to_string());
            return;
        }

        let input = PathBuf::from(self.input_path.trim());
        let output = PathBuf::from(self.output_path.trim());
        let settings = MergeSettings {
            add_source_info: self.add_source_info,
            recursive: self.recursive,
            combine_sheets: true, // the form exposes no toggle for this
            output_format: self.output_format,
        };

        self.progress_percent = 0;
        self.log_lines.clear();
        self.progress_status = "Starting to process files...".to_string();
        self.clear_messages();

        self.push_log("Merge operation started".to_string());
        self.push_log(format!("Input: {}", input.display()));
        self.push_log(format!("Output: {}", output.display()));
        self.push_log("-".repeat(40));

        self.worker = Some(MergeWorker::spawn(
            BuiltinEngine,
            input,
            output,
            settings,
            self.event_sender.clone(),
        ));
    }

    fn handle_merge_complete(&mut self, result: Result<MergeStats, crate::error::AppError>) {
        self.worker = None;

        match result {
            Ok(stats) => {
                info!("Merge completed: {:?}", stats);
                self.progress_percent = 100;
                self.progress_status = "Operation complete".to_string();
                self.push_log("Merge succeeded!".to_string());
                self.push_log(format!("Elapsed: {:.2}s", stats.elapsed_secs));
                self.push_log(format!("Files processed: {}", stats.files_processed));
                self.push_log(format!("Files merged: {}", stats.files_succeeded));
                self.result_dialog = Some(MergeOutcome::Success(stats));
            }
            Err(e) => {
                error!("Merge failed: {}", e);
                self.progress_percent = 0;
                self.progress_status = "Operation failed".to_string();
                self.push_log("Merge failed".to_string());
                self.result_dialog = Some(MergeOutcome::Failure(e.to_string()));
            }
        }
    }

    fn process_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            match event {
                AppEvent::PreflightProgress(message) => {
                    self.preflight_message = message;
                }
                AppEvent::PreflightComplete(success) => {
                    if success {
                        self.preflight_state = PreflightState::Satisfied;
                        self.set_status_message("All required tools are available".to_string());
                    } else {
                        self.preflight_state = PreflightState::Failed;
                    }
                }
                AppEvent::Log(line) => {
                    self.push_log(line);
                }
                AppEvent::FileProcessed { name, count } => {
                    self.progress_percent = progress_for_count(count);
                    self.progress_status = format!("Processing: {}", name);
                }
                AppEvent::MergeComplete(result) => {
                    self.handle_merge_complete(result);
                }
            }
        }
    }

    fn render_path_group(&mut self, ui: &mut egui::Ui) {
        ui.group(|ui| {
            ui.vertical(|ui| {
                ui.heading("File Paths");
                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.label("Input:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.input_path)
                            .hint_text("Select an input file or folder...")
                            .desired_width(420.0),
                    );
                    if ui.button("File...").clicked() {
                        self.select_input_file();
                    }
                    if ui.button("Folder...").clicked() {
                        self.select_input_folder();
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("Output:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.output_path)
                            .hint_text("Set the output file path...")
                            .desired_width(420.0),
                    );
                    if ui.button("Save As...").clicked() {
                        self.select_output_file();
                    }
                });
            });
        });
    }

    fn render_options_group(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);

        ui.group(|ui| {
            ui.vertical(|ui| {
                ui.heading("Merge Options");
                ui.add_space(5.0);

                ui.horizontal(|ui| {
                    ui.label("Output format:");
                    egui::ComboBox::from_id_source("output_format")
                        .selected_text(self.output_format.label())
                        .show_ui(ui, |ui| {
                            for format in OutputFormat::ALL {
                                ui.selectable_value(
                                    &mut self.output_format,
                                    format,
                                    format.label(),
                                );
                            }
                        });

                    ui.add_space(20.0);
                    ui.checkbox(&mut self.add_source_info, "Add source info");
                    ui.checkbox(&mut self.recursive, "Include subfolders");
                });
            });
        });
    }

    fn render_progress_group(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);

        ui.group(|ui| {
            ui.vertical(|ui| {
                ui.add(
                    egui::ProgressBar::new(self.progress_percent as f32 / 100.0)
                        .show_percentage(),
                );
                ui.vertical_centered(|ui| {
                    ui.weak(&self.progress_status);
                });
            });
        });
    }

    fn render_log_group(&mut self, ui: &mut egui::Ui) {
        ui.add_space(10.0);

        ui.group(|ui| {
            ui.vertical(|ui| {
                ui.horizontal(|ui| {
                    ui.heading("Operation Log");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("Clear Log").clicked() {
                            self.log_lines.clear();
                        }
                    });
                });
                ui.add_space(5.0);

                egui::ScrollArea::vertical()
                    .id_source("log_pane")
                    .max_height(180.0)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for line in &self.log_lines {
                            ui.monospace(line);
                        }
                    });
            });
        });
    }

    fn render_action_buttons(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        ui.add_space(10.0);

        ui.vertical_centered(|ui| {
            ui.horizontal(|ui| {
                ui.add_space(ui.available_width() / 2.0 - 140.0);

                let can_start =
                    self.preflight_state == PreflightState::Satisfied && !self.is_merging();
                let start_button =
                    egui::Button::new("Start Merge").min_size(egui::vec2(130.0, 35.0));
                if ui.add_enabled(can_start, start_button).clicked() {
                    self.start_merge();
                }

                ui.add_space(15.0);
                let quit_button = egui::Button::new("Quit").min_size(egui::vec2(130.0, 35.0));
                if ui.add(quit_button).clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn render_status_messages(&mut self, ui: &mut egui::Ui) {
        // Clean up expired status messages
        if let Some((_, timestamp)) = &self.status_message {
            if timestamp.elapsed() > UI_STATUS_MESSAGE_DURATION {
                self.status_message = None;
            }
        }

        if let Some((message, _)) = &self.status_message {
            let message = message.clone(); // Clone to avoid borrowing issues

            ui.add_space(10.0);
            egui::Frame::none()
                .fill(egui::Color32::from_rgb(240, 255, 240))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(0, 150, 0)))
                .inner_margin(egui::Margin::same(10.0))
                .rounding(egui::Rounding::same(5.0))
                .show(ui, |ui| {
                    ui.colored_label(egui::Color32::from_rgb(0, 120, 0), message);
                });
        } else if let Some(error_message) = &self.error_message {
            let error_message = error_message.clone();

            ui.add_space(10.0);
            egui::Frame::none()
                .fill(egui::Color32::from_rgb(255, 240, 240))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(200, 0, 0)))
                .inner_margin(egui::Margin::same(10.0))
                .rounding(egui::Rounding::same(5.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(egui::Color32::from_rgb(150, 0, 0), &error_message);
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("✖").clicked() {
                                self.clear_messages();
                            }
                        });
                    });
                });
        }
    }

    fn render_preflight_dialog(&mut self, ctx: &Context) {
        if self.preflight_state == PreflightState::Satisfied {
            return;
        }

        egui::Window::new("Dependency Check")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(320.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(10.0);
                    match self.preflight_state {
                        PreflightState::Checking => {
                            ui.spinner();
                            ui.add_space(8.0);
                            ui.label(&self.preflight_message);
                        }
                        PreflightState::Failed => {
                            ui.label("Dependency installation failed, install manually or retry");
                            ui.add_space(4.0);
                            ui.weak(&self.preflight_message);
                            ui.add_space(8.0);
                            ui.horizontal(|ui| {
                                ui.add_space(ui.available_width() / 2.0 - 80.0);
                                if ui.button("Retry").clicked() {
                                    self.retry_preflight();
                                }
                                ui.add_space(10.0);
                                if ui.button("Quit").clicked() {
                                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                                }
                            });
                        }
                        PreflightState::Satisfied => unreachable!(),
                    }
                    ui.add_space(10.0);
                });
            });
    }

    fn render_validation_dialog(&mut self, ctx: &Context) {
        let Some(message) = self.validation_warning.clone() else {
            return;
        };

        egui::Window::new("Input Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(10.0);
                    ui.label(message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.validation_warning = None;
                    }
                    ui.add_space(5.0);
                });
            });
    }

    fn render_result_dialog(&mut self, ctx: &Context) {
        let Some(outcome) = &self.result_dialog else {
            return;
        };

        let (title, lines) = match outcome {
            MergeOutcome::Success(stats) => (
                "Merge Succeeded",
                vec![
                    "Files merged successfully!".to_string(),
                    format!("Output file: {}", stats.output_path.display()),
                    format!("Elapsed: {:.2}s", stats.elapsed_secs),
                    format!("File count: {}", stats.files_processed),
                ],
            ),
            MergeOutcome::Failure(message) => (
                "Merge Failed",
                vec![
                    "File merge failed!".to_string(),
                    format!("Error: {}", message),
                ],
            ),
        };

        let mut close = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(10.0);
                    for line in &lines {
                        ui.label(line);
                    }
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        close = true;
                    }
                    ui.add_space(5.0);
                });
            });

        if close {
            self.result_dialog = None;
        }
    }
}

impl eframe::App for MergeAssistantApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Process background events
        self.process_events();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                ui.heading("File Merge Assistant");
                ui.weak("Merge multiple source files into one document");
                ui.add_space(10.0);
            });

            ui.separator();
            ui.add_space(8.0);

            let form_enabled =
                self.preflight_state == PreflightState::Satisfied && !self.is_merging();

            egui::ScrollArea::vertical()
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    ui.add_enabled_ui(form_enabled, |ui| {
                        self.render_path_group(ui);
                        self.render_options_group(ui);
                    });
                    self.render_progress_group(ui);
                    self.render_log_group(ui);
                    self.render_action_buttons(ui, ctx);
                    self.render_status_messages(ui);
                    ui.add_space(10.0);
                });
        });

        self.render_preflight_dialog(ctx);
        self.render_validation_dialog(ctx);
        self.render_result_dialog(ctx);

        // Keep animations and worker polling alive
        if self.is_merging() || self.preflight_state == PreflightState::Checking {
            ctx.request_repaint();
        }
    }
}

/// Validation gate run before every merge: both paths must be non-empty.
fn validate_paths(input: &str, output: &str) -> Option<&'static str> {
    if input.trim().is_empty() || output.trim().is_empty() {
        Some("Please select input and output paths")
    } else {
        None
    }
}

/// Each processed file advances the bar by a fixed step, capped at 100.
fn progress_for_count(count: usize) -> u32 {
    (count as u32).saturating_mul(PROGRESS_PERCENT_PER_FILE).min(100)
}

/// Default output proposal when an input is picked and the output field is
/// still empty.
fn auto_filled_output(input: &Path, current_output: &str) -> Option<String> {
    if current_output.trim().is_empty() {
        Some(default_output_path(input).display().to_string())
    } else {
        None
    }
}
