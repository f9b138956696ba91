//! Console output formatter for task results

use super::report::SolveReport;
use colored::Colorize;
use solver_domain::OutputFormat;

/// Formats task results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format a finished run in the requested format
    pub fn format(report: &SolveReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => Self::format_text(report),
            OutputFormat::Json => Self::format_json(report),
        }
    }

    /// The final solution only
    pub fn format_text(report: &SolveReport) -> String {
        report.result.clone().unwrap_or_default()
    }

    /// Format as JSON
    pub fn format_json(report: &SolveReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    /// Banner printed before the run when progress is shown
    pub fn header(task: &str, provider: &str, model: &str) -> String {
        let line = "=".repeat(60);
        format!(
            "{}\n{} {}\n{} {} ({})\n{}",
            line.cyan(),
            "Task:".cyan().bold(),
            task,
            "Provider:".cyan().bold(),
            provider,
            model.dimmed(),
            line.cyan()
        )
    }

    /// One-line error for stderr
    pub fn format_error(error: &dyn std::fmt::Display) -> String {
        format!("{} {}", "Error:".red().bold(), error)
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
