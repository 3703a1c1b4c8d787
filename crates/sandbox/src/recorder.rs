//! Trace recorder
//!
//! Turns every dispatched [`ActionEvent`] into a [`TraceStep`] stamped with
//! the time since the run started and a synthetic display duration.

use autolab_common::{ActionEvent, NetworkExchange, RecorderConfig, StepStatus, TraceStep};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use tokio::time::Instant;

use crate::bus::Subscriber;

struct RecorderState {
    started: Instant,
    steps: Vec<TraceStep>,
    rng: StdRng,
    config: RecorderConfig,
}

/// Shared handle to the step list of the current run
#[derive(Clone)]
pub struct TraceRecorder {
    inner: Arc<Mutex<RecorderState>>,
}

impl TraceRecorder {
    pub fn new(config: RecorderConfig, rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RecorderState {
                started: Instant::now(),
                steps: Vec::new(),
                rng,
                config,
            })),
        }
    }

    /// Discard all steps and restart the run clock
    pub fn reset(&self) {
        let mut state = self.inner.lock();
        state.steps.clear();
        state.started = Instant::now();
    }

    /// Restart the run clock without touching the steps
    pub fn mark_start(&self) {
        self.inner.lock().started = Instant::now();
    }

    pub fn steps(&self) -> Vec<TraceStep> {
        self.inner.lock().steps.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().steps.is_empty()
    }

    /// Append a step for `event` and return it
    pub fn record(&self, event: &ActionEvent) -> TraceStep {
        let mut state = self.inner.lock();
        let elapsed_ms = state.started.elapsed().as_millis() as u64;
        let min = state.config.min_duration_ms;
        let spread = state.config.duration_spread_ms.max(1);
        let duration_ms = state.rng.gen_range(min..min + spread);

        let step = TraceStep {
            index: state.steps.len(),
            action: event.kind,
            selector: event.selector.clone(),
            label: event.label.clone(),
            value: event.value.clone(),
            frame_path: event.frame_path.clone(),
            elapsed_ms,
            duration_ms,
            status: StepStatus::Passed,
            network: event.network.clone().map(summarize),
            interception: event.interception.clone(),
        };
        state.steps.push(step.clone());
        step
    }
}

impl Subscriber for TraceRecorder {
    fn on_action(&self, event: &ActionEvent) {
        self.record(event);
    }
}

/// Fill in the request method when the producer left it blank
fn summarize(mut exchange: NetworkExchange) -> NetworkExchange {
    if exchange.method.is_empty() {
        exchange.method = if exchange.payload.is_some() { "POST" } else { "GET" }.to_string();
    }
    exchange
}

#[cfg(test)]
mod tests {
    use super::*;
    use autolab_common::ActionKind;
    use rand::SeedableRng;
    use serde_json::json;
    use std::time::Duration;

    fn recorder() -> TraceRecorder {
        TraceRecorder::new(RecorderConfig::default(), StdRng::seed_from_u64(11))
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_time_is_relative_to_run_start() {
        let recorder = recorder();
        tokio::time::sleep(Duration::from_millis(250)).await;
        recorder.reset();

        recorder.record(&ActionEvent::new(ActionKind::Navigate));
        tokio::time::sleep(Duration::from_millis(500)).await;
        recorder.record(&ActionEvent::new(ActionKind::Click));

        let steps = recorder.steps();
        assert_eq!(steps[0].elapsed_ms, 0);
        assert_eq!(steps[1].elapsed_ms, 500);
        assert_eq!(steps[1].index, 1);
    }

    #[test]
    fn test_durations_are_bounded() {
        let recorder = recorder();
        for _ in 0..200 {
            let step = recorder.record(&ActionEvent::new(ActionKind::Fill));
            assert!((20..70).contains(&step.duration_ms));
            assert_eq!(step.status, StepStatus::Passed);
        }
    }

    #[test]
    fn test_same_seed_same_durations() {
        let a = recorder();
        let b = recorder();
        for _ in 0..10 {
            let event = ActionEvent::new(ActionKind::Click);
            assert_eq!(a.record(&event).duration_ms, b.record(&event).duration_ms);
        }
    }

    #[test]
    fn test_infers_missing_network_method() {
        let recorder = recorder();
        let exchange = NetworkExchange {
            method: String::new(),
            url: "/api/items".to_string(),
            payload: Some(json!({"name": "x"})),
            status: 201,
            response: json!({"id": 4}),
        };
        let step = recorder.record(&ActionEvent::new(ActionKind::ApiCall).with_network(exchange));
        assert_eq!(step.network.unwrap().method, "POST");
    }

    #[test]
    fn test_reset_clears_steps() {
        let recorder = recorder();
        recorder.record(&ActionEvent::new(ActionKind::Click));
        recorder.reset();
        assert!(recorder.is_empty());
    }
}
