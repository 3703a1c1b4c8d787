//! Mock automation API
//!
//! Script-visible objects (`page`, locators, `request`, `cy`, chainables ...)
//! are a closed set of [`Handle`] variants. The interpreter reads their
//! properties through [`Runtime::property`] and calls their methods through
//! [`Runtime::invoke`]. Methods that simulate an interaction publish an
//! [`ActionEvent`] on the command bus before any simulated latency, so every
//! subscriber has seen the event by the time the call resolves.

mod cypress;
mod expect;
mod page;
mod request;

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use autolab_common::{ActionEvent, ApiStyle, FramePath, Interception, LatencyConfig, MockResponse};
use rand::rngs::StdRng;
use rand::Rng;
use tracing::debug;

use crate::bus::{CommandBus, RunToken};
use crate::script::value::LogLevel;
use crate::script::{Thrown, Value};

pub use cypress::upload_name;

/// Element query of the locator based surface
#[derive(Debug, Clone, Default)]
pub struct Locator {
    pub frame: FramePath,
    pub selector: Option<String>,
    /// Accessible name from `getByLabel` / `getByRole`
    pub label: Option<String>,
    /// Visible text from `getByText`
    pub text: Option<String>,
}

impl Locator {
    fn event(&self, kind: autolab_common::ActionKind) -> ActionEvent {
        let mut event = ActionEvent::new(kind).with_frame(self.frame.clone());
        event.selector = self.selector.clone();
        event.label = self.label.clone();
        event.value = self.text.clone();
        event
    }

    /// Narrow this locator with a nested CSS selector
    fn scoped(&self, selector: &str) -> String {
        compose(self.selector.as_deref(), selector, " >> ")
    }
}

/// Current element target of a chainable
#[derive(Debug, Clone, Default)]
pub struct Target {
    pub frame: FramePath,
    pub selector: Option<String>,
    /// Text matched by `contains`
    pub text: Option<String>,
}

impl Target {
    fn event(&self, kind: autolab_common::ActionKind) -> ActionEvent {
        let mut event = ActionEvent::new(kind).with_frame(self.frame.clone());
        event.selector = self.selector.clone();
        event
    }

    /// Selector that includes the `contains` filter, for descendant queries
    fn qualified(&self) -> Option<String> {
        match (&self.selector, &self.text) {
            (Some(selector), Some(text)) => Some(format!("{}:contains(\"{}\")", selector, text)),
            (None, Some(text)) => Some(format!(":contains(\"{}\")", text)),
            (selector, None) => selector.clone(),
        }
    }

    /// Document inside the iframe this target points at
    fn enter_frame(&self) -> Target {
        let frame = match &self.selector {
            Some(selector) => self.frame.child(selector.clone()),
            None => self.frame.clone(),
        };
        Target {
            frame,
            selector: None,
            text: None,
        }
    }
}

/// Chainable command result: where it points and what it yields
#[derive(Debug, Clone)]
pub struct Chain {
    pub target: Target,
    pub subject: Box<Value>,
}

/// Every object the mock automation API hands to scripts
#[derive(Debug, Clone)]
pub enum Handle {
    /// Top-level page, or a frame view of it when the path is not empty
    Page(FramePath),
    Locator(Locator),
    Route { glob: String },
    Request,
    Response(MockResponse),
    Accessibility,
    Expectation(Box<Value>),
    Cy,
    Chain(Chain),
    /// jQuery-style element yielded to callbacks
    Element(Target),
    Alias,
    Cypress,
    CypressCommands,
}

impl Handle {
    pub fn type_name(&self) -> &'static str {
        match self {
            Handle::Page(frame) if frame.is_root() => "page",
            Handle::Page(_) => "frame",
            Handle::Locator(_) => "locator",
            Handle::Route { .. } => "route",
            Handle::Request => "request",
            Handle::Response(_) => "response",
            Handle::Accessibility => "accessibility",
            Handle::Expectation(_) => "expect",
            Handle::Cy => "cy",
            Handle::Chain(_) => "chainable",
            Handle::Element(_) => "element",
            Handle::Alias => "alias",
            Handle::Cypress => "Cypress",
            Handle::CypressCommands => "Cypress.Commands",
        }
    }
}

/// Result of a host method call
pub enum Reply {
    Value(Value),
    /// The interpreter must call `callee` with `args`, then hand the result
    /// to `settle` to obtain the method's return value
    Callback {
        callee: Value,
        args: Vec<Value>,
        settle: Box<dyn FnOnce(Value) -> Value>,
    },
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

type HostResult = Result<Reply, Thrown>;

/// Per-run state behind the mock automation API
pub struct Runtime {
    bus: CommandBus,
    token: RunToken,
    style: ApiStyle,
    latency: LatencyConfig,
    rng: RefCell<StdRng>,
    interceptions: RefCell<Vec<Interception>>,
    commands: RefCell<HashMap<String, Value>>,
    console: RefCell<Vec<String>>,
    url: RefCell<Option<String>>,
}

impl Runtime {
    pub fn new(bus: CommandBus, token: RunToken, style: ApiStyle, latency: LatencyConfig, rng: StdRng) -> Self {
        Self {
            bus,
            token,
            style,
            latency,
            rng: RefCell::new(rng),
            interceptions: RefCell::new(Vec::new()),
            commands: RefCell::new(HashMap::new()),
            console: RefCell::new(Vec::new()),
            url: RefCell::new(None),
        }
    }

    pub fn style(&self) -> ApiStyle {
        self.style
    }

    /// Host objects bound as globals for the selected style
    pub fn globals(&self) -> Vec<(&'static str, Value)> {
        match self.style {
            ApiStyle::Playwright => vec![
                ("page", Value::Host(Handle::Page(FramePath::root()))),
                ("request", Value::Host(Handle::Request)),
            ],
            ApiStyle::Cypress => vec![
                ("cy", Value::Host(Handle::Cy)),
                ("Cypress", Value::Host(Handle::Cypress)),
            ],
        }
    }

    /// Fixtures object passed to test callbacks
    pub fn fixtures(&self) -> Value {
        Value::object([
            ("page", Value::Host(Handle::Page(FramePath::root()))),
            ("request", Value::Host(Handle::Request)),
        ])
    }

    pub fn expect(&self, subject: Value) -> Value {
        Value::Host(Handle::Expectation(Box::new(subject)))
    }

    pub fn random(&self) -> f64 {
        self.rng.borrow_mut().gen::<f64>()
    }

    pub fn console(&self, level: LogLevel, line: String) {
        let line = match level {
            LogLevel::Log | LogLevel::Info => line,
            LogLevel::Warn => format!("[warn] {}", line),
            LogLevel::Error => format!("[error] {}", line),
        };
        self.console.borrow_mut().push(line);
    }

    /// Lines written through `console.*` during the run
    pub fn console_lines(&self) -> Vec<String> {
        self.console.borrow().clone()
    }

    /// Interceptions registered so far, oldest first
    pub fn interceptions(&self) -> Vec<Interception> {
        self.interceptions.borrow().clone()
    }

    /// Last URL passed to `goto` / `visit`
    pub fn current_url(&self) -> Option<String> {
        self.url.borrow().clone()
    }

    fn emit(&self, event: ActionEvent) {
        debug!("API {} {:?}", event.kind, event.selector.as_deref().or(event.label.as_deref()));
        self.bus.publish(self.token, &event);
    }

    async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    fn register(&self, interception: Interception) {
        self.interceptions.borrow_mut().push(interception);
    }

    /// Data property of a host object; `None` means "look it up as a method"
    pub fn property(&self, handle: &Handle, key: &str) -> Option<Value> {
        match handle {
            Handle::Page(frame) => match key {
                "accessibility" if frame.is_root() => Some(Value::Host(Handle::Accessibility)),
                "request" if frame.is_root() => Some(Value::Host(Handle::Request)),
                _ => None,
            },
            Handle::Expectation(_) => expect::is_chain_word(key).then(|| Value::Host(handle.clone())),
            Handle::Cypress => match key {
                "Commands" => Some(Value::Host(Handle::CypressCommands)),
                "version" => Some(Value::str("13.0.0")),
                _ => None,
            },
            Handle::Element(_) => match key {
                "length" => Some(Value::Number(1.0)),
                "0" => Some(Value::Host(handle.clone())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Call `method` on a host object
    pub async fn invoke(&self, handle: &Handle, method: &str, args: Vec<Value>) -> HostResult {
        match handle {
            Handle::Page(frame) => self.page_method(frame, method, args).await,
            Handle::Locator(locator) => self.locator_method(locator, method, args).await,
            Handle::Route { glob } => self.route_method(glob, method, args),
            Handle::Request => self.request_method(method, args),
            Handle::Response(response) => self.response_method(response, method),
            Handle::Accessibility => self.accessibility_method(method),
            Handle::Expectation(subject) => self.expect_method(subject, method, args),
            Handle::Cy => self.cy_method(method, args),
            Handle::Chain(chain) => self.chain_method(chain, method, args),
            Handle::Element(target) => self.element_method(target, method, args),
            Handle::Alias => match method {
                "as" => Ok(Value::Host(Handle::Cy).into()),
                _ => self.fallback(handle, method, args),
            },
            Handle::Cypress => match method {
                "env" => Ok(Value::Undefined.into()),
                _ => self.fallback(handle, method, args),
            },
            Handle::CypressCommands => self.commands_method(method, args),
        }
    }

    /// Methods every handle answers: `then` and nothing else
    fn fallback(&self, handle: &Handle, method: &str, args: Vec<Value>) -> HostResult {
        match (method, args.into_iter().next()) {
            ("then", Some(callee)) if callee.is_callable() => Ok(Reply::Callback {
                callee,
                args: vec![Value::Host(handle.clone())],
                settle: Box::new(|result| result),
            }),
            _ => Err(Thrown::type_error(format!(
                "{}.{} is not a function",
                handle.type_name(),
                method
            ))),
        }
    }
}

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

/// Display form of an argument; `undefined` becomes empty
pub(crate) fn text_arg(args: &[Value], index: usize) -> String {
    match args.get(index) {
        None | Some(Value::Undefined) => String::new(),
        Some(value) => value.to_string(),
    }
}

/// Field of an options object, skipping `undefined`/`null`
pub(crate) fn option(value: &Value, key: &str) -> Option<Value> {
    value.field(key).filter(|v| !v.is_nullish())
}

fn compose(parent: Option<&str>, child: &str, separator: &str) -> String {
    match parent {
        Some(parent) => format!("{}{}{}", parent, separator, child),
        None => child.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_enters_frame_by_one_segment() {
        let outer = Target {
            frame: FramePath::root(),
            selector: Some("#outer-iframe".to_string()),
            text: None,
        };
        let inside = outer.enter_frame();
        assert_eq!(inside.frame.segments(), ["#outer-iframe"]);
        assert!(inside.selector.is_none());

        let inner = Target {
            selector: Some("#inner-iframe".to_string()),
            ..inside
        }
        .enter_frame();
        assert_eq!(inner.frame.segments(), ["#outer-iframe", "#inner-iframe"]);
    }

    #[test]
    fn test_qualified_selector_keeps_text_filter() {
        let row = Target {
            frame: FramePath::root(),
            selector: Some("tr".to_string()),
            text: Some("Charlie".to_string()),
        };
        assert_eq!(row.qualified().as_deref(), Some("tr:contains(\"Charlie\")"));
    }

    #[test]
    fn test_locator_scoping() {
        let row = Locator {
            selector: Some("tr:has-text(\"Charlie\")".to_string()),
            ..Locator::default()
        };
        assert_eq!(row.scoped(".status-badge"), "tr:has-text(\"Charlie\") >> .status-badge");
        assert_eq!(Locator::default().scoped("#a"), "#a");
    }
}
