//! Command handlers for schemactl
//!
//! - schema: register, update, list, get, check-compatibility, delete
//! - compatibility: get/set global and per-subject levels

pub mod compatibility;
pub mod schema;

use crate::format::Formatter;
use anyhow::{Context as _, Result};
use schemaflow_registry::SchemaRegistryClient;
use std::io::{BufRead, Write};

/// What every handler needs
pub struct Context {
    pub client: SchemaRegistryClient,
    pub formatter: Formatter,
    /// Answer every confirmation prompt with yes
    pub assume_yes: bool,
}

impl Context {
    /// Ask a y/N question on the terminal. Anything but `y`/`yes` is no,
    /// including a closed stdin.
    pub fn confirm(&self, question: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }

        print!("{} (y/N): ", question);
        std::io::stdout().flush().context("Failed to write prompt")?;

        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read answer")?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}
