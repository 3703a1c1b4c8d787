//! Run a script against a scenario and show its trace

use std::path::PathBuf;

use anyhow::Result;
use autolab_common::{ApiStyle, TraceStep};
use autolab_sandbox::{Lab, RunReport};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use super::{Context, Source};
use crate::output::{list_table, print_error, print_heading, print_success, render_structured, TableDisplay};

#[derive(Args)]
pub struct RunArgs {
    /// Scenario ID
    pub id: String,

    /// API style the script is written against
    #[arg(long)]
    pub style: Option<ApiStyle>,

    /// Script file, `-` for stdin; defaults to the saved code
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Run the reference solution
    #[arg(long, conflicts_with = "file")]
    pub reference: bool,

    /// Seed for generated tokens and step durations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the simulated delays
    #[arg(long)]
    pub instant: bool,

    /// Do not save the code or the last scenario
    #[arg(long)]
    pub no_save: bool,
}

/// Trace step row for the action list
pub struct StepRow<'a>(pub &'a TraceStep);

impl TableDisplay for StepRow<'_> {
    fn headers() -> Vec<&'static str> {
        vec!["#", "Action", "Target", "Frame", "Elapsed", "Duration", "Status"]
    }

    fn row(&self) -> Vec<String> {
        let step = self.0;
        let frame = if step.frame_path.is_root() {
            "main".to_string()
        } else {
            step.frame_path.segments().join(" > ")
        };
        vec![
            (step.index + 1).to_string(),
            step.action.label().to_string(),
            step.target(),
            frame,
            format!("+{}ms", step.elapsed_ms),
            format!("{}ms", step.duration_ms),
            step.status.to_string(),
        ]
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    environment: String,
}

pub async fn execute(ctx: &Context, args: RunArgs) -> Result<()> {
    let mut store = ctx.store().await;
    let scenario = ctx.scenario(&args.id)?;
    let style = ctx.style_for(scenario, args.style, &store)?;
    let code = Source::new(args.file.as_ref(), args.reference).load(scenario, style, &store)?;

    let mut config = ctx.config.clone();
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.instant {
        config.latency = autolab_common::LatencyConfig::instant();
    }

    let mut lab = Lab::new(ctx.catalog.clone(), config);
    lab.select(&scenario.id)?;
    lab.set_style(style)?;
    let report = lab.run(&code).await;
    let environment = lab.environment().render();

    if !args.no_save {
        store.set_last_scenario(&scenario.id);
        store.set_last_style(style);
        if args.file.is_some() {
            store.set_code(&scenario.id, style, &code);
        }
        store.save_best_effort().await;
    }
    info!("Recorded {} steps for {}", report.steps.len(), scenario.id);

    let output = RunOutput {
        report: &report,
        environment,
    };
    if let Some(text) = render_structured(&output, ctx.format)? {
        println!("{}", text);
        return Ok(());
    }
    print_report(&output);
    Ok(())
}

fn print_report(output: &RunOutput<'_>) {
    let report = output.report;
    println!(
        "{} {} {}",
        report.scenario_id.bold(),
        format!("[{}]", report.style).cyan(),
        format!("{} ({}ms)", report.started_at.format("%H:%M:%S"), report.duration_ms).dimmed()
    );

    if report.outcome.is_success() {
        print_success(&report.outcome.banner());
    } else {
        print_error(&report.outcome.banner());
    }

    print_heading("Trace");
    if report.steps.is_empty() {
        println!("No steps recorded.");
    } else {
        let rows: Vec<StepRow<'_>> = report.steps.iter().map(StepRow).collect();
        println!("{}", list_table(&rows));
    }

    for step in report.steps.iter().filter(|s| s.network.is_some()) {
        if let Some(network) = &step.network {
            println!(
                "  #{} {} {} -> {}",
                step.index + 1,
                network.method,
                network.url,
                status_text(network.status)
            );
            if let Some(payload) = &network.payload {
                println!("     request  {}", payload);
            }
            println!("     response {}", network.response);
        }
    }

    if !report.console.is_empty() {
        print_heading("Console");
        for line in &report.console {
            println!("  {}", line);
        }
    }

    print_heading("Environment");
    print!("{}", output.environment);
}

fn status_text(status: u16) -> String {
    let text = status.to_string();
    if status >= 400 {
        text.red().to_string()
    } else {
        text.green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolab_common::{ActionKind, FramePath, StepStatus};

    #[test]
    fn test_step_row_formats_frames_and_times() {
        let step = TraceStep {
            index: 2,
            action: ActionKind::Click,
            selector: None,
            label: Some("Submit Inner".to_string()),
            value: None,
            frame_path: FramePath::root().child("#outer-iframe").child("#inner-iframe"),
            elapsed_ms: 1300,
            duration_ms: 42,
            status: StepStatus::Passed,
            network: None,
            interception: None,
        };
        assert_eq!(
            StepRow(&step).row(),
            vec!["3", "CLICK", "Submit Inner", "#outer-iframe > #inner-iframe", "+1300ms", "42ms", "passed"]
        );
    }
}
