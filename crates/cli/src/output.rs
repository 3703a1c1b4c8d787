//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

fn table<T: TableDisplay>(rows: impl IntoIterator<Item = Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(T::headers());
    for row in rows {
        table.add_row(row);
    }
    table
}

/// Serialize in a machine-readable format; `None` for table output
pub fn render_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> anyhow::Result<Option<String>> {
    Ok(match format {
        OutputFormat::Table => None,
        OutputFormat::Json => Some(serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(value)?),
    })
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    if let Some(text) = render_structured(items, format)? {
        println!("{}", text);
        return Ok(());
    }
    if items.is_empty() {
        println!("No items found.");
        return Ok(());
    }
    println!("{}", table::<T>(items.iter().map(TableDisplay::row)));
    Ok(())
}

/// Table for `items` without printing it
pub fn list_table<T: TableDisplay>(items: &[T]) -> Table {
    table::<T>(items.iter().map(TableDisplay::row))
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow(), message);
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!();
    println!("{}", title.bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
    }

    impl TableDisplay for Row {
        fn headers() -> Vec<&'static str> {
            vec!["Name"]
        }

        fn row(&self) -> Vec<String> {
            vec![self.name.to_string()]
        }
    }

    #[test]
    fn test_structured_formats() {
        let rows = vec![Row { name: "basic-auth" }];
        assert!(render_structured(&rows, OutputFormat::Table).unwrap().is_none());

        let json = render_structured(&rows, OutputFormat::Json).unwrap().unwrap();
        assert!(json.contains("\"name\": \"basic-auth\""));

        let yaml = render_structured(&rows, OutputFormat::Yaml).unwrap().unwrap();
        assert!(yaml.contains("name: basic-auth"));
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let rendered = list_table(&[Row { name: "a" }, Row { name: "b" }]).to_string();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains('a'));
        assert!(rendered.contains('b'));
    }
}
