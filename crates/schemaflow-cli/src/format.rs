//! Output formatting for schemactl
//!
//! - Table: bordered tables (default)
//! - JSON / YAML: machine-readable
//! - Text: one row per line, no borders

use crate::config::OutputFormat;
use anyhow::Result;
use colored::*;
use serde::Serialize;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Whether output is meant for machines (JSON or YAML)
    pub fn is_structured(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::Yaml)
    }

    pub fn print_list<T: Serialize + Tabled>(&self, items: Vec<T>) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.print_table(items),
            OutputFormat::Json => self.print_json(&items),
            OutputFormat::Yaml => self.print_yaml(&items),
            OutputFormat::Text => self.print_text(items),
        }
    }

    /// Print a structured value; only JSON and YAML render it.
    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Yaml => self.print_yaml(value),
            _ => self.print_json(value),
        }
    }

    pub fn print_success(&self, message: &str) {
        if self.colored {
            println!("{} {}", "✅".green(), message);
        } else {
            println!("✅ {}", message);
        }
    }

    pub fn print_error(&self, message: &str) {
        if self.colored {
            eprintln!("{} {}", "❌".red(), message.red());
        } else {
            eprintln!("❌ {}", message);
        }
    }

    pub fn print_warning(&self, message: &str) {
        if self.colored {
            println!("{}  {}", "⚠️".yellow(), message.yellow());
        } else {
            println!("⚠️  {}", message);
        }
    }

    pub fn print_info(&self, message: &str) {
        if self.colored {
            println!("{} {}", "ℹ️".blue(), message);
        } else {
            println!("ℹ️  {}", message);
        }
    }

    pub fn print_key_value(&self, pairs: &[(&str, String)]) {
        print_key_value(pairs, self.colored);
    }

    fn print_table<T: Tabled>(&self, items: Vec<T>) -> Result<()> {
        if items.is_empty() {
            println!("No items found");
            return Ok(());
        }

        let mut table = Table::new(items);
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        println!("{}", table);
        Ok(())
    }

    fn print_json<T: Serialize + ?Sized>(&self, items: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(items)?);
        Ok(())
    }

    fn print_yaml<T: Serialize + ?Sized>(&self, items: &T) -> Result<()> {
        print!("{}", serde_yaml::to_string(items)?);
        Ok(())
    }

    fn print_text<T: Tabled>(&self, items: Vec<T>) -> Result<()> {
        if items.is_empty() {
            println!("No items found");
            return Ok(());
        }

        let mut table = Table::new(items);
        table.with(Style::blank());
        for line in table.to_string().lines().skip(1) {
            println!("{}", line.trim());
        }
        Ok(())
    }
}

pub fn print_key_value(pairs: &[(&str, String)], colored: bool) {
    for (key, value) in pairs {
        if colored {
            println!("  {}: {}", key.bold(), value);
        } else {
            println!("  {}: {}", key, value);
        }
    }
}

/// Pretty-print a schema definition, or print it raw if it is not JSON.
pub fn pretty_schema(definition: &str) -> String {
    serde_json::from_str::<serde_json::Value>(definition)
        .and_then(|json| serde_json::to_string_pretty(&json))
        .unwrap_or_else(|_| definition.to_string())
}
