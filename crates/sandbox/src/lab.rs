//! Run driver
//!
//! A [`Lab`] owns the catalog, the command bus and both bus subscribers (the
//! trace recorder and the active playground). Each call to [`Lab::run`] is
//! one Run: it supersedes any earlier run, clears the trace, resets the
//! playground, waits out the warm-up pause, then compiles and executes the
//! learner script.

use std::time::Duration;

use autolab_common::{ApiStyle, Catalog, Error, LabConfig, Result, Scenario, TraceStep};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::Runtime;
use crate::bus::{CommandBus, Role};
use crate::environment::{EnvironmentHandle, EnvironmentRegistry};
use crate::recorder::TraceRecorder;
use crate::script::{self, Interpreter};

/// Banner shown after a successful run
pub const SUCCESS_MESSAGE: &str = "Simulation Successful! Results updated in the Environment view.";

/// Which stage of a run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Compile,
    Execution,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    Failed { kind: FailureKind, message: String },
}

impl RunOutcome {
    fn from_error(err: Error) -> Self {
        match err {
            Error::Compile { line, column, message } => RunOutcome::Failed {
                kind: FailureKind::Compile,
                message: format!("{} (line {}, column {})", message, line, column),
            },
            Error::Execution(message) => RunOutcome::Failed {
                kind: FailureKind::Execution,
                message,
            },
            other => RunOutcome::Failed {
                kind: FailureKind::Execution,
                message: other.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Text for the result banner
    pub fn banner(&self) -> String {
        match self {
            RunOutcome::Success => SUCCESS_MESSAGE.to_string(),
            RunOutcome::Failed { message, .. } => format!(
                "Execution Error: {}. Ensure your syntax matches the lab's supported actions.",
                message
            ),
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub generation: u64,
    pub scenario_id: String,
    pub style: ApiStyle,
    pub started_at: DateTime<Utc>,
    /// Wall time from the end of warm-up to the end of execution
    pub duration_ms: u64,
    pub outcome: RunOutcome,
    pub steps: Vec<TraceStep>,
    /// Lines printed through `console.*`
    pub console: Vec<String>,
}

/// One learner session over the scenario catalog
pub struct Lab {
    catalog: Catalog,
    config: LabConfig,
    bus: CommandBus,
    recorder: TraceRecorder,
    environments: EnvironmentRegistry,
    scenario: usize,
    style: ApiStyle,
    rng: StdRng,
}

impl Lab {
    pub fn new(catalog: Catalog, config: LabConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let bus = CommandBus::new();
        let first = catalog.first();
        let style = first.default_style();
        let environments = EnvironmentRegistry::new(bus.clone(), first.environment);
        let recorder = TraceRecorder::new(config.recorder.clone(), StdRng::seed_from_u64(rng.gen()));
        bus.subscribe(Role::Recorder, Arc::new(recorder.clone()));

        Self {
            catalog,
            config,
            bus,
            recorder,
            environments,
            scenario: 0,
            style,
            rng,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn bus(&self) -> &CommandBus {
        &self.bus
    }

    pub fn scenario(&self) -> &Scenario {
        &self.catalog.scenarios()[self.scenario]
    }

    pub fn style(&self) -> ApiStyle {
        self.style
    }

    pub fn environment(&self) -> &EnvironmentHandle {
        self.environments.active()
    }

    /// Steps of the latest run
    pub fn trace(&self) -> Vec<TraceStep> {
        self.recorder.steps()
    }

    /// Make `id` the active scenario. The style falls back to the
    /// scenario's first supported style when the current one is not offered.
    pub fn select(&mut self, id: &str) -> Result<&Scenario> {
        let index = self
            .catalog
            .scenarios()
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::ScenarioNotFound(id.to_string()))?;
        self.scenario = index;
        let scenario = &self.catalog.scenarios()[index];
        self.style = scenario.resolve_style(self.style);
        self.environments.activate(scenario.environment);
        self.recorder.reset();
        info!("Selected scenario {} ({})", scenario.id, self.style);
        Ok(scenario)
    }

    pub fn set_style(&mut self, style: ApiStyle) -> Result<()> {
        let scenario = self.scenario();
        if !scenario.supports(style) {
            return Err(Error::UnsupportedStyle {
                scenario: scenario.id.clone(),
                style: style.to_string(),
            });
        }
        if style != self.style {
            self.style = style;
            self.environments.reset();
            self.recorder.reset();
        }
        Ok(())
    }

    /// Execute `code` against the active scenario
    pub async fn run(&mut self, code: &str) -> RunReport {
        let token = self.bus.begin_run();
        let run_id = Uuid::new_v4();
        let scenario_id = self.scenario().id.clone();
        info!(
            "Run {} (generation {}) for {} in {}",
            run_id,
            token.generation(),
            scenario_id,
            self.style
        );

        self.recorder.reset();
        self.environments.reset();
        let started_at = Utc::now();

        let warmup = self.config.latency.warmup();
        if !warmup.is_zero() {
            tokio::time::sleep(warmup).await;
        }
        self.recorder.mark_start();
        let clock = Instant::now();

        let runtime = Runtime::new(
            self.bus.clone(),
            token,
            self.style,
            self.config.latency.clone(),
            StdRng::seed_from_u64(self.rng.gen()),
        );
        let (outcome, console) = match script::compile(code) {
            Ok(program) => {
                let interpreter = Interpreter::new(runtime);
                let outcome = match interpreter.run(&program).await {
                    Ok(()) => RunOutcome::Success,
                    Err(e) => RunOutcome::from_error(e),
                };
                (outcome, interpreter.runtime().console_lines())
            }
            Err(e) => (RunOutcome::from_error(e), Vec::new()),
        };

        if !self.bus.is_current(token) {
            warn!("Run {} was superseded before it finished", run_id);
        }
        let duration_ms = elapsed_ms(clock.elapsed());
        match &outcome {
            RunOutcome::Success => info!("Run {} succeeded in {}ms", run_id, duration_ms),
            RunOutcome::Failed { message, .. } => info!("Run {} failed: {}", run_id, message),
        }

        RunReport {
            run_id,
            generation: token.generation(),
            scenario_id,
            style: self.style,
            started_at,
            duration_ms,
            outcome,
            steps: self.recorder.steps(),
            console,
        }
    }
}

fn elapsed_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolab_common::{ActionKind, LatencyConfig};

    fn lab() -> Lab {
        let config = LabConfig {
            seed: Some(7),
            latency: LatencyConfig::instant(),
            ..LabConfig::default()
        };
        Lab::new(Catalog::builtin().unwrap(), config)
    }

    #[test]
    fn test_select_falls_back_to_supported_style() {
        let mut lab = lab();
        lab.select("basic-auth").unwrap();
        lab.set_style(ApiStyle::Playwright).unwrap();

        lab.select("cy-custom-commands").unwrap();
        assert_eq!(lab.style(), ApiStyle::Cypress);
        assert!(matches!(
            lab.set_style(ApiStyle::Playwright),
            Err(Error::UnsupportedStyle { .. })
        ));
        assert!(matches!(lab.select("nope"), Err(Error::ScenarioNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_run_keeps_partial_steps() {
        let mut lab = lab();
        lab.select("basic-auth").unwrap();
        lab.set_style(ApiStyle::Playwright).unwrap();
        let report = lab
            .run("await page.goto('/playground/login');\nthrow new Error('boom');")
            .await;

        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.steps[0].action, ActionKind::Navigate);
        assert_eq!(
            report.outcome.banner(),
            "Execution Error: boom. Ensure your syntax matches the lab's supported actions."
        );
    }

    #[tokio::test]
    async fn test_compile_error_reports_position() {
        let mut lab = lab();
        let report = lab.run("const = 1;").await;
        match report.outcome {
            RunOutcome::Failed { kind, message } => {
                assert_eq!(kind, FailureKind::Compile);
                assert!(message.contains("line 1"));
            }
            RunOutcome::Success => panic!("expected a compile failure"),
        }
        assert!(report.steps.is_empty());
    }

    #[tokio::test]
    async fn test_generation_increases_per_run() {
        let mut lab = lab();
        let first = lab.run("").await;
        let second = lab.run("").await;
        assert!(second.generation > first.generation);
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(second.outcome.banner(), SUCCESS_MESSAGE);
    }
}
