//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

use cmdparity_e2e::{CaseDescriptor, CaseOutcome, CaseResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Rows that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<Cell>;
}

/// Print a list of rows
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No cases selected.");
                return;
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }
            println!("{table}");
        }
        _ => print_value(items, format),
    }
}

/// Print any serializable value as JSON or YAML; tables fall back to JSON
pub fn print_value<T: Serialize + ?Sized>(value: &T, format: OutputFormat) {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(value).map_err(|e| e.to_string()),
    };
    match rendered {
        Ok(text) => println!("{}", text.trim_end()),
        Err(e) => print_error(&format!("Could not render output: {}", e)),
    }
}

/// Print a parity report with colored section titles
pub fn print_report(report: &str) {
    for line in report.lines() {
        if line.ends_with(':') {
            println!("{}", line.yellow());
        } else if line.starts_with("    * ") {
            println!("{}", line);
        } else if line.is_empty() {
            println!();
        } else {
            println!("{}", line.bold());
        }
    }
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

impl TableDisplay for CaseResult {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Outcome", "Duration", "Message"]
    }

    fn row(&self) -> Vec<Cell> {
        let outcome = match self.outcome {
            CaseOutcome::Passed => Cell::new("passed").fg(Color::Green),
            CaseOutcome::Failed => Cell::new("failed").fg(Color::Red),
            CaseOutcome::Skipped => Cell::new("skipped").fg(Color::Yellow),
        };
        // Reports can be long; the full text is in test-results.json
        let message = self
            .message
            .as_deref()
            .map(|m| m.trim().lines().next().unwrap_or_default().to_string())
            .unwrap_or_default();

        vec![
            Cell::new(&self.id),
            outcome,
            Cell::new(format!("{} ms", self.duration_ms)),
            Cell::new(message),
        ]
    }
}

/// Listing entry for a registered case
#[derive(Debug, Serialize)]
pub struct CaseRow {
    pub id: String,
    pub description: String,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub skip: Option<String>,
    pub deselect: Option<String>,
}

impl From<&CaseDescriptor> for CaseRow {
    fn from(case: &CaseDescriptor) -> Self {
        Self {
            id: case.id.to_string(),
            description: case.description.to_string(),
            tags: case.tags.iter().map(|t| t.to_string()).collect(),
            dependencies: case.dependencies.iter().map(|d| d.to_string()).collect(),
            skip: case.skip.map(|s| format!("{:?}", s)),
            deselect: case.deselect.map(str::to_string),
        }
    }
}

impl TableDisplay for CaseRow {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Tags", "Depends on", "Skip when", "Description"]
    }

    fn row(&self) -> Vec<Cell> {
        let id = match &self.deselect {
            Some(reason) => Cell::new(format!("{} (deselected: {})", self.id, reason)).fg(Color::DarkGrey),
            None => Cell::new(&self.id),
        };
        vec![
            id,
            Cell::new(self.tags.join(", ")),
            Cell::new(self.dependencies.join(", ")),
            Cell::new(self.skip.as_deref().unwrap_or("-")),
            Cell::new(&self.description),
        ]
    }
}
