//! AutoLab Sandbox
//!
//! The mock automation runtime behind the lab: a small JavaScript-subset
//! interpreter bound to fake `page`/`request`/`cy` objects, a command bus
//! that carries every simulated action to the trace recorder and the active
//! playground, and the run driver tying them together.

pub mod api;
pub mod bus;
pub mod environment;
pub mod lab;
pub mod mentor;
pub mod network;
pub mod recorder;
pub mod script;
pub mod store;

pub use bus::{CommandBus, Role, RunToken, Subscriber};
pub use environment::{EnvironmentHandle, EnvironmentRegistry, NetworkEntry, Playground};
pub use lab::{FailureKind, Lab, RunOutcome, RunReport, SUCCESS_MESSAGE};
pub use mentor::{DegradingMentor, Mentor, OfflineMentor, Validation};
pub use network::resolve_mock_response;
pub use recorder::TraceRecorder;
pub use store::ProgressStore;
