//! Every built-in reference solution must run cleanly and leave its
//! playground in the solved state.

use autolab_common::{ApiStyle, Catalog, LabConfig, Scenario};
use autolab_sandbox::{Lab, RunReport, SUCCESS_MESSAGE};

/// Text each playground shows once its challenge is solved
fn solved_marker(scenario_id: &str) -> &'static str {
    match scenario_id {
        "maint-cy-util-intercept" => "Test User",
        "cy-util-custom-cmd" => "Database: Ready",
        "maint-brittle-selectors" => "Thank you!",
        "maint-async-wait" => "The secret code is 42",
        "maint-text-regression" => "Checkout Successful",
        "basic-auth" | "cy-custom-commands" => "Welcome back!",
        "basic-iframe" => "Success!",
        "advanced-nested-iframe" => "Nested Success!",
        "api-key-auth" => "blue-falcon",
        "pw-trace-viewer" => "Diagnostics Panel",
        "api-oauth-token" => "Bearer",
        "api-basic-get" => "John Doe",
        "adv-api-mocking" => "Error: Server exploded",
        "basic-dropdowns" => "Selected: Playwright",
        "inter-table-data" => "Viewing details for Charlie",
        "adv-a11y-tree" => "Snapshots captured: 1",
        "inter-file-upload" => "File \"config.json\" uploaded",
        "adv-selectors-deep" => "Premium Item 3 selected",
        other => panic!("no solved marker for {}", other),
    }
}

fn styles(scenario: &Scenario) -> Vec<ApiStyle> {
    ApiStyle::ALL
        .into_iter()
        .filter(|style| scenario.supports(*style))
        .collect()
}

async fn run_reference(lab: &mut Lab, scenario: &Scenario, style: ApiStyle) -> RunReport {
    lab.select(&scenario.id).unwrap();
    lab.set_style(style).unwrap();
    lab.run(scenario.reference_code(style)).await
}

#[tokio::test(start_paused = true)]
async fn reference_solutions_solve_their_playgrounds() {
    let catalog = Catalog::builtin().unwrap();
    let config = LabConfig {
        seed: Some(2024),
        ..LabConfig::default()
    };
    let mut lab = Lab::new(catalog.clone(), config);

    for scenario in catalog.scenarios() {
        for style in styles(scenario) {
            let report = run_reference(&mut lab, scenario, style).await;
            assert!(
                report.outcome.is_success(),
                "{} ({}): {}",
                scenario.id,
                style,
                report.outcome.banner()
            );
            assert_eq!(report.outcome.banner(), SUCCESS_MESSAGE);

            let view = lab.environment().render();
            let marker = solved_marker(&scenario.id);
            assert!(
                view.contains(marker),
                "{} ({}) should show {:?}, got:\n{}",
                scenario.id,
                style,
                marker,
                view
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn starter_code_leaves_playgrounds_unsolved() {
    let catalog = Catalog::builtin().unwrap();
    let config = LabConfig {
        seed: Some(7),
        ..LabConfig::default()
    };
    let mut lab = Lab::new(catalog.clone(), config);

    for id in ["basic-auth", "basic-iframe", "maint-text-regression", "inter-table-data"] {
        let scenario = catalog.get(id).unwrap();
        for style in styles(scenario) {
            lab.select(id).unwrap();
            lab.set_style(style).unwrap();
            let report = lab.run(&scenario.starter_code(style)).await;
            assert!(report.outcome.is_success(), "{} ({}): {:?}", id, style, report.outcome);
            assert!(!lab.environment().render().contains(solved_marker(id)), "{} ({})", id, style);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn reference_traces_are_recorded() {
    let catalog = Catalog::builtin().unwrap();
    let mut lab = Lab::new(catalog.clone(), LabConfig::default());

    let scenario = catalog.get("basic-auth").unwrap();
    let report = run_reference(&mut lab, scenario, ApiStyle::Cypress).await;
    assert!(report.steps.len() >= 4);
    assert_eq!(report.steps, lab.trace());
    for (index, step) in report.steps.iter().enumerate() {
        assert_eq!(step.index, index);
    }
}
