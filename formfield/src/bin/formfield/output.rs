use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use formfield::{AdditionalOptions, FieldView, RangeBounds};
use serde::Serialize;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

/// Data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, options: &GlobalOptions) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(&self.options);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.decorate(ICONS.success, message, THEME.success));
        }
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.decorate(ICONS.error, message, THEME.error));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.decorate(ICONS.warning, message, THEME.warning));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", self.decorate(ICONS.info, message, THEME.info));
        }
    }

    /// Display a bullet list item on stderr, next to the error it explains
    pub fn bullet(&self, text: &str) {
        let output = if self.options.no_color {
            format!("  {} {text}", ICONS.bullet)
        } else {
            format!("  {} {text}", ICONS.bullet.color(THEME.muted))
        };
        eprintln!("{output}");
    }

    /// Create a themed two-column table
    pub fn create_table(options: &GlobalOptions) -> Table {
        let mut table = Table::new();
        if options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        let header = ["Key", "Value"].map(|title| {
            let cell = Cell::new(title).add_attribute(Attribute::Bold);
            if options.no_color { cell } else { cell.fg(TableColor::Cyan) }
        });
        table.set_header(header);
        table
    }

    fn decorate(&self, icon: &str, message: &str, color: colored::Color) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }
}

fn format_bound(bound: Option<i64>) -> String {
    bound.map_or_else(|| "-".to_string(), |value| value.to_string())
}

fn format_range(range: &RangeBounds) -> String {
    format!("{} .. {}", format_bound(range.min), format_bound(range.max))
}

impl TableDisplay for FieldView {
    fn to_table(&self, options: &GlobalOptions) -> Table {
        let mut table = OutputManager::create_table(options);
        table.add_row(vec!["id".to_string(), self.id.clone()]);
        table.add_row(vec!["name".to_string(), self.name.clone()]);
        table.add_row(vec!["ownerId".to_string(), self.owner_id.to_string()]);
        table.add_row(vec![
            "fieldType".to_string(),
            format!("{} ({})", self.field_type.code(), self.field_type.label()),
        ]);
        if let Some(is_strict) = self.is_strict {
            table.add_row(vec!["isStrict".to_string(), is_strict.to_string()]);
        }
        table.add_row(vec!["created".to_string(), self.created.to_rfc3339()]);

        match &self.options {
            AdditionalOptions::Empty => {}
            AdditionalOptions::TextOrNumber { range, .. } => {
                table.add_row(vec!["range".to_string(), format_range(range)]);
            }
            AdditionalOptions::Choice { choice_options, range } => {
                table.add_row(vec!["choiceOptions".to_string(), choice_options.join(", ")]);
                if let Some(range) = range {
                    table.add_row(vec!["range".to_string(), format_range(range)]);
                }
            }
            AdditionalOptions::Autocomplete {
                setting_autocomplete,
                values,
            } => {
                table.add_row(vec!["dataUrl".to_string(), setting_autocomplete.data_url.clone()]);
                table.add_row(vec!["sheet".to_string(), setting_autocomplete.sheet.clone()]);
                table.add_row(vec![
                    "rows".to_string(),
                    format!("{} {} {}", setting_autocomplete.from_row, ICONS.arrow, setting_autocomplete.to_row),
                ]);
                if let Some(values) = values {
                    table.add_row(vec!["values".to_string(), values.join(", ")]);
                }
            }
        }
        table
    }

    fn to_compact(&self) -> String {
        let mut compact = format!("{} {} {} owner={}", self.id, self.field_type.label(), self.name, self.owner_id);
        if let Some(options) = self.options.choice_options() {
            compact.push_str(&format!(" options=[{}]", options.join(",")));
        }
        if let Some(range) = self.options.range() {
            compact.push_str(&format!(" range={}..{}", format_bound(range.min), format_bound(range.max)));
        }
        compact
    }
}
