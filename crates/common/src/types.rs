//! Core types shared by the sandbox runtime and its front ends

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which mock automation surface a script is written against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStyle {
    /// Async, locator based surface (`page`, `request`, `expect`)
    Playwright,
    /// Chainable, promise-like surface (`cy`)
    Cypress,
}

impl ApiStyle {
    pub const ALL: [ApiStyle; 2] = [ApiStyle::Playwright, ApiStyle::Cypress];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiStyle::Playwright => "playwright",
            ApiStyle::Cypress => "cypress",
        }
    }

    /// File name the editor shows for this style
    pub fn spec_file_name(&self) -> &'static str {
        match self {
            ApiStyle::Playwright => "playwright.spec.ts",
            ApiStyle::Cypress => "cypress.cy.ts",
        }
    }
}

impl Default for ApiStyle {
    fn default() -> Self {
        Self::Playwright
    }
}

impl fmt::Display for ApiStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiStyle::Playwright => write!(f, "Playwright"),
            ApiStyle::Cypress => write!(f, "Cypress"),
        }
    }
}

impl std::str::FromStr for ApiStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "playwright" | "pw" => Ok(ApiStyle::Playwright),
            "cypress" | "cy" => Ok(ApiStyle::Cypress),
            other => Err(format!("unknown API style: {}", other)),
        }
    }
}

/// Mock playground a scenario renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnvironmentKind {
    Login,
    FeedbackForm,
    AsyncLoading,
    Checkout,
    IframeTesting,
    NestedIframes,
    ApiConsole,
    ApiMock,
    Dropdowns,
    TableData,
    AccessibilityTree,
    FileUpload,
    AdvancedSelectors,
    Performance,
    CyDbStatus,
    CyUtilRepair,
}

impl EnvironmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentKind::Login => "login",
            EnvironmentKind::FeedbackForm => "feedback-form",
            EnvironmentKind::AsyncLoading => "async-loading",
            EnvironmentKind::Checkout => "checkout",
            EnvironmentKind::IframeTesting => "iframe-testing",
            EnvironmentKind::NestedIframes => "nested-iframes",
            EnvironmentKind::ApiConsole => "api-console",
            EnvironmentKind::ApiMock => "api-mock",
            EnvironmentKind::Dropdowns => "dropdowns",
            EnvironmentKind::TableData => "table-data",
            EnvironmentKind::AccessibilityTree => "accessibility-tree",
            EnvironmentKind::FileUpload => "file-upload",
            EnvironmentKind::AdvancedSelectors => "advanced-selectors",
            EnvironmentKind::Performance => "performance",
            EnvironmentKind::CyDbStatus => "cy-db-status",
            EnvironmentKind::CyUtilRepair => "cy-util-repair",
        }
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of simulated interaction carried by an [`ActionEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Navigate,
    Click,
    Fill,
    Select,
    Upload,
    Drag,
    RouteIntercept,
    ApiCall,
    AssertVisible,
    AssertValue,
    AssertText,
    AccessibilitySnapshot,
}

impl ActionKind {
    /// Label shown in the trace viewer's action list
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "NAVIGATE",
            ActionKind::Click => "CLICK",
            ActionKind::Fill => "FILL",
            ActionKind::Select => "SELECT",
            ActionKind::Upload => "UPLOAD",
            ActionKind::Drag => "DRAG",
            ActionKind::RouteIntercept => "ROUTE",
            ActionKind::ApiCall => "API_CALL",
            ActionKind::AssertVisible => "EXPECT_VISIBLE",
            ActionKind::AssertValue => "EXPECT_VALUE",
            ActionKind::AssertText => "EXPECT_TEXT",
            ActionKind::AccessibilitySnapshot => "A11Y_SNAPSHOT",
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            ActionKind::AssertVisible | ActionKind::AssertValue | ActionKind::AssertText
        )
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ActionKind::ApiCall | ActionKind::RouteIntercept)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered iframe selectors from the outermost frame to the innermost.
///
/// The only way to grow a path is [`FramePath::child`], which appends exactly
/// one segment, so nested paths always extend their parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePath(Vec<String>);

impl FramePath {
    /// The top-level document
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, selector: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(selector.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True when any segment mentions `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|s| s.contains(needle))
    }

    pub fn innermost(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" > "))
    }
}

/// Response served by the fake backend or by an interception
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockResponse {
    pub status: u16,
    pub body: Value,
}

impl MockResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(&self) -> bool {
        self.status < 400
    }
}

/// Network interception registered by `route`/`intercept`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interception {
    pub glob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub response: MockResponse,
}

/// Request/response pair attached to network-bearing events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkExchange {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub status: u16,
    pub response: Value,
}

/// One simulated interaction, produced by the mock automation API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "FramePath::is_root")]
    pub frame_path: FramePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkExchange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interception: Option<Interception>,
}

impl ActionEvent {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            selector: None,
            label: None,
            value: None,
            frame_path: FramePath::root(),
            network: None,
            interception: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_frame(mut self, frame_path: FramePath) -> Self {
        self.frame_path = frame_path;
        self
    }

    pub fn with_network(mut self, network: NetworkExchange) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_interception(mut self, interception: Interception) -> Self {
        self.interception = Some(interception);
        self
    }

    /// True when the event targets an element named `name`, either through
    /// its accessible label or through the visible text of a click target.
    pub fn names(&self, name: &str) -> bool {
        self.label.as_deref() == Some(name)
            || (self.kind == ActionKind::Click && self.value.as_deref() == Some(name))
    }

    pub fn selector_is(&self, selector: &str) -> bool {
        self.selector.as_deref() == Some(selector)
    }

    pub fn selector_mentions(&self, needle: &str) -> bool {
        self.selector.as_deref().map_or(false, |s| s.contains(needle))
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.network.as_ref().map(|n| n.url.as_str())
    }
}

/// Outcome recorded for a trace step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::Passed
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Passed => write!(f, "passed"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Durable, timestamped record derived from one [`ActionEvent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Position within the run, starting at zero
    pub index: usize,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "FramePath::is_root")]
    pub frame_path: FramePath,
    /// Milliseconds since the run started
    pub elapsed_ms: u64,
    /// Synthetic duration, display only
    pub duration_ms: u64,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkExchange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interception: Option<Interception>,
}

impl TraceStep {
    /// Short target description for list views
    pub fn target(&self) -> String {
        if let Some(network) = &self.network {
            return format!("{} {}", network.method, network.url);
        }
        if let Some(interception) = &self.interception {
            return interception.glob.clone();
        }
        self.selector
            .clone()
            .or_else(|| self.label.clone())
            .or_else(|| self.value.clone())
            .unwrap_or_else(|| "/playground".to_string())
    }
}
