//! Saved progress

use anyhow::Result;
use autolab_common::{ApiStyle, Catalog};
use autolab_sandbox::ProgressStore;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::output::{list_table, print_heading, print_success, render_structured, TableDisplay};

#[derive(Args)]
pub struct ProgressArgs {
    /// Forget all saved progress
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct CompletionRow {
    pub scenario: String,
    pub title: String,
    pub style: ApiStyle,
}

impl TableDisplay for CompletionRow {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Title", "Style"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.scenario.clone(), self.title.clone(), self.style.to_string()]
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    pub last_scenario: Option<String>,
    pub last_style: Option<ApiStyle>,
    pub completed: Vec<CompletionRow>,
    pub total: usize,
    pub saved_scripts: usize,
}

impl ProgressSummary {
    pub fn new(catalog: &Catalog, store: &ProgressStore) -> Self {
        let mut completed = Vec::new();
        let mut total = 0;
        for scenario in catalog.scenarios() {
            for style in ApiStyle::ALL.into_iter().filter(|s| scenario.supports(*s)) {
                total += 1;
                if store.is_completed(&scenario.id, style) {
                    completed.push(CompletionRow {
                        scenario: scenario.id.clone(),
                        title: scenario.title.clone(),
                        style,
                    });
                }
            }
        }
        Self {
            last_scenario: store.last_scenario().map(str::to_string),
            last_style: store.last_style(),
            completed,
            total,
            saved_scripts: store.saved_code().len(),
        }
    }
}

pub async fn execute(ctx: &Context, args: ProgressArgs) -> Result<()> {
    let mut store = ctx.store().await;
    if args.reset {
        store.clear();
        store.save().await?;
        print_success(&format!("Cleared progress in {}", store.path().display()));
        return Ok(());
    }

    let summary = ProgressSummary::new(&ctx.catalog, &store);
    if let Some(text) = render_structured(&summary, ctx.format)? {
        println!("{}", text);
        return Ok(());
    }

    println!("Completed {} of {} exercises", summary.completed.len(), summary.total);
    if let Some(id) = &summary.last_scenario {
        let style = summary.last_style.map(|s| s.to_string()).unwrap_or_default();
        println!("Last opened: {} {}", id, style);
    }
    println!("Saved scripts: {}", summary.saved_scripts);
    if !summary.completed.is_empty() {
        print_heading("Completed");
        println!("{}", list_table(&summary.completed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_summary_counts_supported_pairs() {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::builtin().unwrap();
        let mut store = ProgressStore::in_dir(dir.path());
        store.mark_completed("basic-auth", ApiStyle::Cypress);
        store.mark_completed("retired-scenario", ApiStyle::Cypress);
        store.set_code("basic-auth", ApiStyle::Cypress, "cy.visit('/')");
        store.set_last_scenario("basic-auth");

        let summary = ProgressSummary::new(&catalog, &store);
        assert_eq!(summary.completed.len(), 1);
        assert_eq!(summary.completed[0].title, "Login Form Submission");
        assert_eq!(summary.saved_scripts, 1);
        assert_eq!(summary.last_scenario.as_deref(), Some("basic-auth"));
        assert!(summary.total > catalog.len());

        store.clear();
        store.save().await.unwrap();
        let reloaded = ProgressStore::open(store.path()).await;
        assert!(ProgressSummary::new(&catalog, &reloaded).completed.is_empty());
    }
}
