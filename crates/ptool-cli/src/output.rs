//! Output formatting for CLI results
//!
//! Payloads (envelopes, signatures, receipts) are written to files in their
//! wire format. What is printed on stdout is a status report in one of:
//! - Table: Human-readable tables (default)
//! - JSON: Structured JSON for scripting and automation
//! - Quiet: Nothing, exit codes only

use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for scripting
    Json,
    /// Minimal output - exit codes only
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Standard JSON response wrapper for consistent schema
#[derive(Serialize)]
pub struct JsonResponse<T: Serialize> {
    /// Whether the operation was successful
    pub success: bool,
    /// The response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Command that was executed
    pub command: String,
}

impl<T: Serialize> JsonResponse<T> {
    pub fn success(data: T, command: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: command.to_string(),
        }
    }
}

impl JsonResponse<()> {
    pub fn error(message: &str, command: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
            command: command.to_string(),
        }
    }
}

/// A command result that can be shown as a table or as JSON.
pub trait Report: Serialize {
    /// Command name, e.g. `receipt verify`
    fn command(&self) -> &'static str;

    /// Field / value rows for table output
    fn rows(&self) -> Vec<(&'static str, String)>;
}

/// Formats output for different modes
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a report; empty in quiet mode.
    pub fn render<R: Report>(&self, report: &R) -> String {
        match self.format {
            OutputFormat::Table => {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Field", "Value"]);
                for (field, value) in report.rows() {
                    table.add_row(vec![field.to_string(), value]);
                }
                table.to_string()
            }
            OutputFormat::Json => to_json(&JsonResponse::success(report, report.command())),
            OutputFormat::Quiet => String::new(),
        }
    }

    /// Render an error message for `command`.
    pub fn render_error(&self, message: &str, command: &str) -> String {
        match self.format {
            OutputFormat::Table => format!("Error: {message}"),
            OutputFormat::Json => to_json(&JsonResponse::error(message, command)),
            OutputFormat::Quiet => String::new(),
        }
    }

    pub fn print<R: Report>(&self, report: &R) {
        let out = self.render(report);
        if !out.is_empty() {
            println!("{out}");
        }
    }

    /// Errors go to stderr, except JSON which scripts read from stdout.
    pub fn print_error(&self, message: &str, command: &str) {
        let out = self.render_error(message, command);
        match self.format {
            OutputFormat::Json => println!("{out}"),
            OutputFormat::Table => eprintln!("{out}"),
            OutputFormat::Quiet => {}
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"success":false,"error":"serialization failed: {e}"}}"#))
}
