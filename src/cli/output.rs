//! CLI Output Formatting.
//!
//! Handles output formatting for different formats (text, JSON, table).

use console::style;
use serde::Serialize;
use std::collections::BTreeMap;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
    /// Minimal format (values only)
    Minimal,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            "minimal" | "min" => Ok(OutputFormat::Minimal),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    /// Output format
    format: OutputFormat,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    /// Print success message
    pub fn success(&self, message: &str) {
        if self.is_json() {
            self.status("success", message);
        } else {
            println!("{} {}", style("✓").green(), message);
        }
    }

    /// Print warning message
    pub fn warning(&self, message: &str) {
        if self.is_json() {
            self.status("warning", message);
        } else {
            println!("{} {}", style("⚠").yellow(), message);
        }
    }

    /// Print info message
    pub fn info(&self, message: &str) {
        if self.is_json() {
            self.status("info", message);
        } else {
            println!("{} {}", style("ℹ").blue(), message);
        }
    }

    fn status(&self, status: &str, message: &str) {
        self.print_json(&serde_json::json!({
            "status": status,
            "message": message
        }));
    }

    /// Print data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => self.print_json(data),
            OutputFormat::Minimal => {
                if let Ok(json) = serde_json::to_value(data) {
                    print_minimal(&json);
                }
            }
            OutputFormat::Text => {
                if let Ok(json) = serde_json::to_value(data) {
                    print_text(&json, 0);
                }
            }
        }
    }

    /// Print table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        if self.is_json() {
            let data: Vec<BTreeMap<&str, &str>> = rows
                .iter()
                .map(|row| {
                    headers
                        .iter()
                        .zip(row.iter())
                        .map(|(h, v)| (*h, v.as_str()))
                        .collect()
                })
                .collect();
            self.print_json(&data);
        } else {
            for line in render_table(headers, rows) {
                println!("{}", line);
            }
        }
    }

    /// Print key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        match self.format {
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&serde_json::json!({ key: value }));
            }
            OutputFormat::Minimal => println!("{}", value),
            OutputFormat::Text => println!("{}: {}", style(key).bold(), value),
        }
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        if self.format == OutputFormat::Text {
            println!();
            println!("{}", style(format!("=== {} ===", title)).cyan().bold());
            println!();
        }
    }

    fn print_json<T: Serialize>(&self, data: &T) {
        let output = if self.format == OutputFormat::JsonPretty {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };

        if let Ok(json) = output {
            println!("{}", json);
        }
    }
}

fn print_text(json: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);

    match json {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}{}:", prefix, style(key).bold());
                        print_text(value, indent + 1);
                    }
                    _ => println!("{}{}: {}", prefix, style(key).bold(), format_value(value)),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("{}[{}]:", prefix, i);
                print_text(item, indent + 1);
            }
        }
        _ => println!("{}{}", prefix, format_value(json)),
    }
}

fn print_minimal(json: &serde_json::Value) {
    match json {
        serde_json::Value::Object(map) => map.values().for_each(print_minimal),
        serde_json::Value::Array(arr) => arr.iter().for_each(print_minimal),
        _ => println!("{}", format_value(json)),
    }
}

/// Lay out a plain-text table, one string per line
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    if headers.is_empty() {
        return Vec::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let pad = |cells: &mut dyn Iterator<Item = (usize, String)>| -> String {
        cells
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(pad(&mut headers.iter().map(|h| h.to_string()).enumerate()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in rows {
        lines.push(pad(&mut row.iter().cloned().enumerate()));
    }
    lines
}

/// Format a JSON value for text output
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".into(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("MIN".parse::<OutputFormat>().unwrap(), OutputFormat::Minimal);
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_formatter_creation() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        assert_eq!(formatter.format(), OutputFormat::Json);
    }

    #[test]
    fn test_render_table() {
        let rows = vec![
            vec!["native".to_string(), "1.5".to_string()],
            vec!["0xabcdef".to_string(), "20".to_string()],
        ];
        let lines = render_table(&["asset", "amount"], &rows);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "asset    | amount");
        assert_eq!(lines[1], "---------+-------");
        assert_eq!(lines[2], "native   | 1.5   ");
        assert!(render_table(&[], &rows).is_empty());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&serde_json::Value::Null), "null");
        assert_eq!(format_value(&serde_json::json!(true)), "true");
        assert_eq!(format_value(&serde_json::json!(42)), "42");
        assert_eq!(format_value(&serde_json::json!("hello")), "hello");
    }
}
