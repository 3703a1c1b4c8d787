//! Scenario browsing commands

use anyhow::Result;
use autolab_common::{ApiStyle, Category, Scenario};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::Context;
use crate::output::{print_heading, print_list, render_structured, TableDisplay};

#[derive(Args)]
pub struct ListArgs {
    /// Only scenarios in this category (e.g. api-testing, iframe-testing)
    #[arg(long)]
    pub category: Option<Category>,

    /// Only scenarios offered in this API style
    #[arg(long)]
    pub style: Option<ApiStyle>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Scenario ID
    pub id: String,

    /// Only show code for this style
    #[arg(long)]
    pub style: Option<ApiStyle>,

    /// Include the reference solution
    #[arg(long)]
    pub reference: bool,
}

/// Scenario summary for list output
#[derive(Serialize)]
pub struct ScenarioRow {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: String,
    pub styles: Vec<ApiStyle>,
    pub completed: Vec<ApiStyle>,
}

impl ScenarioRow {
    fn new(scenario: &Scenario, completed: impl Fn(ApiStyle) -> bool) -> Self {
        let styles: Vec<ApiStyle> = ApiStyle::ALL.into_iter().filter(|s| scenario.supports(*s)).collect();
        Self {
            id: scenario.id.clone(),
            title: scenario.title.clone(),
            category: scenario.category.to_string(),
            difficulty: scenario.difficulty.to_string(),
            completed: styles.iter().copied().filter(|s| completed(*s)).collect(),
            styles,
        }
    }
}

fn style_list(styles: &[ApiStyle]) -> String {
    styles.iter().map(ApiStyle::as_str).collect::<Vec<_>>().join(", ")
}

impl TableDisplay for ScenarioRow {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Title", "Category", "Difficulty", "Styles", "Completed"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.title.clone(),
            self.category.clone(),
            self.difficulty.clone(),
            style_list(&self.styles),
            style_list(&self.completed),
        ]
    }
}

pub async fn list(ctx: &Context, args: ListArgs) -> Result<()> {
    let store = ctx.store().await;
    let rows: Vec<ScenarioRow> = ctx
        .catalog
        .filter(args.category, args.style)
        .into_iter()
        .map(|scenario| ScenarioRow::new(scenario, |style| store.is_completed(&scenario.id, style)))
        .collect();
    print_list(&rows, ctx.format)
}

pub fn show(ctx: &Context, args: ShowArgs) -> Result<()> {
    let scenario = ctx.scenario(&args.id)?;
    if let Some(text) = render_structured(scenario, ctx.format)? {
        println!("{}", text);
        return Ok(());
    }

    println!("{} {}", scenario.title.bold(), format!("({})", scenario.id).dimmed());
    println!("{} / {}", scenario.category, scenario.difficulty);
    println!();
    println!("{}", scenario.description);

    if !scenario.learning_objectives.is_empty() {
        print_heading("Objectives");
        for objective in &scenario.learning_objectives {
            println!("  - {}", objective);
        }
    }

    if let Some(contract) = &scenario.api_contract {
        print_heading("API Contract");
        println!("  {} {}", contract.method.cyan(), contract.endpoint);
        if let Some(body) = &contract.request_body {
            println!("  Request:  {}", body);
        }
        println!("  Expected: {}", contract.expected_response);
    }

    let styles = ApiStyle::ALL
        .into_iter()
        .filter(|s| scenario.supports(*s) && args.style.map_or(true, |only| only == *s));
    for style in styles {
        print_heading(&format!("{} starter ({})", style, style.spec_file_name()));
        println!("{}", scenario.starter_code(style));
        if args.reference {
            print_heading(&format!("{} reference", style));
            println!("{}", scenario.reference_code(style));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolab_common::Catalog;

    #[test]
    fn test_row_lists_supported_and_completed_styles() {
        let catalog = Catalog::builtin().unwrap();
        let scenario = catalog.get("basic-auth").unwrap();
        let row = ScenarioRow::new(scenario, |style| style == ApiStyle::Cypress);
        assert_eq!(row.styles, vec![ApiStyle::Playwright, ApiStyle::Cypress]);
        assert_eq!(row.row()[4], "playwright, cypress");
        assert_eq!(row.row()[5], "cypress");

        let cypress_only = ScenarioRow::new(catalog.get("cy-custom-commands").unwrap(), |_| false);
        assert_eq!(cypress_only.row()[4], "cypress");
        assert_eq!(cypress_only.row()[5], "");
    }
}
