//! Terminal progress rendering and report file writers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use colored::Colorize;
use thiserror::Error;
use vortex_core::{CaseResult, CaseStatus, ProgressCallback, ProgressEvent, RunReport, StepStatus};

/// Verbosity level for terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Only the final one-line verdict.
    Quiet,
    /// Per-case progress.
    #[default]
    Normal,
    /// Per-step detail as cases complete.
    Verbose,
}

/// Which report artifacts to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    Json,
    Csv,
    Html,
    #[default]
    All,
}

fn status_label(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::NotRun => "not_run",
        CaseStatus::Passed => "passed",
        CaseStatus::Failed => "failed",
        CaseStatus::Errored => "errored",
    }
}

/// Colored terminal reporter driven by [`ProgressEvent`]s.
#[derive(Debug, Default)]
pub struct TerminalReporter {
    verbosity: Verbosity,
}

impl TerminalReporter {
    pub fn with_verbosity(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Handles one progress event.
    pub fn handle_progress(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { total } => {
                if self.verbosity != Verbosity::Quiet {
                    let plural = if *total == 1 { "" } else { "s" };
                    println!("\n{}", format!("Running {total} case{plural}...").bold());
                }
            }
            ProgressEvent::CaseStarted {
                index,
                total,
                case_id,
            } => {
                if self.verbosity == Verbosity::Verbose {
                    println!("{}", format!("[{}/{total}] {case_id}", index + 1).bold());
                }
            }
            ProgressEvent::ConversionWaiting { case_id, elapsed } => {
                if self.verbosity != Verbosity::Quiet {
                    println!(
                        "  {}",
                        format!("converting {case_id}... {:.0}s", elapsed.as_secs_f64()).dimmed()
                    );
                }
            }
            ProgressEvent::StepRecorded { step, .. } => {
                if self.verbosity == Verbosity::Verbose {
                    let mark = match step.status {
                        StepStatus::Passed => "✓".green(),
                        StepStatus::Failed => "✗".red(),
                    };
                    println!("    {mark} {} {}", step.name, step.detail.dimmed());
                }
            }
            ProgressEvent::CaseCompleted {
                case_id,
                status,
                duration,
                conversion_duration,
                error,
                ..
            } => {
                if self.verbosity == Verbosity::Quiet {
                    return;
                }
                let mark = match status {
                    CaseStatus::Passed => "✅",
                    CaseStatus::Failed => "❌",
                    CaseStatus::Errored | CaseStatus::NotRun => "💥",
                };
                let timing = match (duration, conversion_duration) {
                    (Some(d), Some(c)) => format!(
                        "({:.1}s, conversion {:.1}s)",
                        d.as_secs_f64(),
                        c.as_secs_f64()
                    ),
                    (Some(d), None) => format!("({:.1}s)", d.as_secs_f64()),
                    _ => String::new(),
                };
                println!("  {mark} {case_id} {}", timing.dimmed());
                if let Some(error) = error {
                    println!("     {}", error.red());
                }
            }
            ProgressEvent::RunCompleted {
                total,
                passed,
                failed,
                errored,
            } => {
                if self.verbosity == Verbosity::Quiet {
                    if failed + errored == 0 {
                        println!("{}", format!("✓ {passed}/{total} passed").green());
                    } else {
                        println!("{}", format!("✗ {}/{total} did not pass", failed + errored).red());
                    }
                }
            }
        }
    }

    /// Prints the final summary block.
    pub fn print_summary(&self, report: &RunReport) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        println!("\n{}", "━".repeat(40).dimmed());

        let (emoji, verdict, color) = if report.all_passed() {
            ("🟢", "PASSED", colored::Color::Green)
        } else if report.passed > 0 {
            ("🟡", "MIXED", colored::Color::Yellow)
        } else {
            ("🔴", "FAILED", colored::Color::Red)
        };
        println!(
            "{emoji} {}",
            format!("{verdict}: {} of {} cases", report.passed, report.total)
                .color(color)
                .bold()
        );

        let mut parts = Vec::new();
        if report.passed > 0 {
            parts.push(format!("{} passed", report.passed).green().to_string());
        }
        if report.failed > 0 {
            parts.push(format!("{} failed", report.failed).red().to_string());
        }
        if report.errored > 0 {
            parts.push(format!("{} errored", report.errored).yellow().to_string());
        }
        if !parts.is_empty() {
            println!("   {}", parts.join(", "));
        }
        println!("   pass rate {:.0}%", report.pass_rate() * 100.0);

        if let Some(stats) = report.conversion_stats() {
            println!(
                "   conversions: mean {:.1}s, min {:.1}s, max {:.1}s ({} sampled)",
                stats.mean.as_secs_f64(),
                stats.min.as_secs_f64(),
                stats.max.as_secs_f64(),
                stats.samples
            );
        }
        println!(
            "\n   {}",
            format!("Completed in {:.1}s", report.duration().as_secs_f64()).dimmed()
        );
    }

    /// Prints step-level postmortems for every case that did not pass.
    pub fn print_failures(&self, report: &RunReport) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        let failures: Vec<&CaseResult> = report.cases.iter().filter(|c| !c.passed()).collect();
        if failures.is_empty() {
            return;
        }

        println!("\n{}", "Unsuccessful cases:".red().bold());
        for case in failures {
            println!(
                "\n  {} {} {}",
                "❌".red(),
                case.config.id.red().bold(),
                format!("[{}]", status_label(case.status)).dimmed()
            );
            for step in &case.steps {
                let mark = match step.status {
                    StepStatus::Passed => "✓".green(),
                    StepStatus::Failed => "✗".red(),
                };
                println!("     {mark} {} {}", step.name, step.detail.dimmed());
            }
        }
    }
}

/// Builds a [`ProgressCallback`] backed by a shared [`TerminalReporter`].
pub fn create_progress_callback(verbosity: Verbosity) -> ProgressCallback {
    let reporter = Arc::new(Mutex::new(TerminalReporter::with_verbosity(verbosity)));
    Box::new(move |event| {
        if let Ok(mut reporter) = reporter.lock() {
            reporter.handle_progress(&event);
        }
    })
}

/// Errors writing report artifacts.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write summary csv: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes report artifacts into a directory, one timestamped file per
/// format.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the requested artifacts and returns their paths.
    pub fn write(
        &self,
        report: &RunReport,
        format: ReportFormat,
    ) -> Result<Vec<PathBuf>, ReportError> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = report.started_at.format("%Y%m%d_%H%M%S");
        let mut written = Vec::new();

        if matches!(format, ReportFormat::Json | ReportFormat::All) {
            let path = self.dir.join(format!("report_{stamp}.json"));
            std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
            written.push(path);
        }
        if matches!(format, ReportFormat::Csv | ReportFormat::All) {
            let path = self.dir.join(format!("summary_{stamp}.csv"));
            self.write_csv(report, &path)?;
            written.push(path);
        }
        if matches!(format, ReportFormat::Html | ReportFormat::All) {
            let path = self.dir.join(format!("report_{stamp}.html"));
            std::fs::write(&path, render_html(report))?;
            written.push(path);
        }
        Ok(written)
    }

    fn write_csv(&self, report: &RunReport, path: &Path) -> Result<(), ReportError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "case_id",
            "output_format",
            "thinning",
            "output_type",
            "texture",
            "denoise",
            "thickness_optimization",
            "status",
            "duration_secs",
            "conversion_secs",
            "output_folder",
            "error",
        ])?;
        for case in &report.cases {
            let config = &case.config;
            let duration = case
                .duration
                .map(|d| format!("{:.1}", d.as_secs_f64()))
                .unwrap_or_default();
            let conversion = case
                .conversion_duration
                .map(|d| format!("{:.1}", d.as_secs_f64()))
                .unwrap_or_default();
            writer.write_record([
                config.id.as_str(),
                config.output_format.ui_label(),
                if config.thinning_enabled { "enabled" } else { "disabled" },
                config.output_type.ui_label(),
                config.texture.ui_label(),
                if config.denoise_enabled { "enabled" } else { "disabled" },
                if config.thickness_optimization_enabled {
                    "enabled"
                } else {
                    "disabled"
                },
                status_label(case.status),
                duration.as_str(),
                conversion.as_str(),
                case.output_folder.as_deref().unwrap_or(""),
                case.error.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders the self-contained HTML report.
fn render_html(report: &RunReport) -> String {
    let mut cases = String::new();
    for case in &report.cases {
        let mut steps = String::new();
        for step in &case.steps {
            let mark = match step.status {
                StepStatus::Passed => "✓",
                StepStatus::Failed => "✗",
            };
            steps.push_str(&format!(
                "<li>{mark} <b>{}</b> — {}</li>\n",
                escape_html(&step.name),
                escape_html(&step.detail)
            ));
        }
        let conversion = case
            .conversion_duration
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_else(|| "—".into());
        cases.push_str(&format!(
            "<tr class=\"{status}\"><td>{id}</td><td>{status}</td>\
             <td>{format}</td><td>{output}</td><td>{texture}</td>\
             <td>{conversion}</td><td>{folder}</td></tr>\n\
             <tr><td colspan=\"7\"><ul>{steps}</ul>{error}</td></tr>\n",
            status = status_label(case.status),
            id = escape_html(&case.config.id),
            format = case.config.output_format.ui_label(),
            output = escape_html(case.config.output_type.ui_label()),
            texture = escape_html(case.config.texture.ui_label()),
            folder = escape_html(case.output_folder.as_deref().unwrap_or("—")),
            error = case
                .error
                .as_deref()
                .map(|e| format!("<p class=\"error\">{}</p>", escape_html(e)))
                .unwrap_or_default(),
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <title>Export test report</title>\n<style>\n\
         body {{ font-family: sans-serif; margin: 2em; }}\n\
         .cards span {{ display: inline-block; padding: .5em 1em; margin-right: .5em; \
         border-radius: 4px; background: #eee; }}\n\
         table {{ border-collapse: collapse; margin-top: 1em; width: 100%; }}\n\
         td, th {{ border: 1px solid #ccc; padding: .3em .6em; text-align: left; }}\n\
         tr.passed > td:nth-child(2) {{ color: #1a7f37; }}\n\
         tr.failed > td:nth-child(2), .error {{ color: #cf222e; }}\n\
         tr.errored > td:nth-child(2) {{ color: #9a6700; }}\n\
         ul {{ margin: .2em 0; }}\n\
         </style></head><body>\n\
         <h1>Export test report</h1>\n\
         <p>{started} — {ended}</p>\n\
         <div class=\"cards\">\
         <span>total {total}</span>\
         <span>passed {passed}</span>\
         <span>failed {failed}</span>\
         <span>errored {errored}</span>\
         <span>pass rate {rate:.0}%</span>\
         </div>\n\
         <table>\n<tr><th>case</th><th>status</th><th>format</th><th>output</th>\
         <th>texture</th><th>conversion</th><th>folder</th></tr>\n{cases}</table>\n\
         </body></html>\n",
        started = report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        ended = report.ended_at.format("%Y-%m-%d %H:%M:%S UTC"),
        total = report.total,
        passed = report.passed,
        failed = report.failed,
        errored = report.errored,
        rate = report.pass_rate() * 100.0,
    )
}

/// Prints one line per case for `check`.
pub fn print_case_listing(cases: &[vortex_core::TestCaseConfig], out: &mut impl Write) {
    for case in cases {
        let thinning = if case.thinning_enabled {
            match (case.voxel_thinning.is_enabled(), case.random_thinning.is_enabled()) {
                (true, true) => "thinning=voxel+random",
                (true, false) => "thinning=voxel",
                (false, true) => "thinning=random",
                (false, false) => "thinning=?",
            }
        } else {
            "thinning=off"
        };
        let _ = writeln!(
            out,
            "{}: format={} {} output={} texture={} denoise={} thickness={}",
            case.id,
            case.output_format.ui_label(),
            thinning,
            case.output_type.ui_label(),
            case.texture.ui_label(),
            if case.denoise_enabled { "on" } else { "off" },
            if case.thickness_optimization_enabled { "on" } else { "off" },
        );
    }
}
