//! Virtual environment registry
//!
//! Each scenario renders into a mock playground. The active playground
//! subscribes to the command bus and mutates its view model when a matching
//! action event arrives. Switching the environment type swaps the bus
//! subscription and starts from a fresh state.

use std::fmt::Write as _;
use std::sync::Arc;

use autolab_common::{ActionEvent, ActionKind, EnvironmentKind, Interception, MockResponse};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::{Duration, Instant};
use tracing::debug;

use crate::bus::{CommandBus, Role, Subscriber};
use crate::network::{decode_body, find_interception};

/// Time the async-loading playground needs before its button shows up
pub const REVEAL_DELAY: Duration = Duration::from_millis(2500);

const PREMIUM_ITEMS: u32 = 5;

const TABLE_USERS: &[(&str, &str, &str)] = &[
    ("Alice", "Admin", "Active"),
    ("Bob", "Editor", "Inactive"),
    ("Charlie", "Viewer", "Active"),
    ("Diana", "Manager", "Pending"),
];

/// One entry of the playground's network panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkEntry {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub status: u16,
    pub body: Value,
}

/// View model of a playground
#[derive(Debug, Clone, Serialize)]
pub struct Playground {
    pub kind: EnvironmentKind,
    pub username: Option<String>,
    pub password: Option<String>,
    pub signed_in: bool,
    pub feedback_submitted: bool,
    pub secret_revealed: bool,
    pub checkout_complete: bool,
    pub iframe_clicked: bool,
    pub nested_iframe_clicked: bool,
    pub selection: Option<String>,
    pub uploaded_file: Option<String>,
    pub selected_premium: Option<u32>,
    pub viewing_user: Option<String>,
    pub snapshots: usize,
    pub db_ready: bool,
    pub profile_name: Option<String>,
    pub profile_status: Option<u16>,
    /// Latest route-intercept configuration
    pub mock: Option<Interception>,
    pub api_response: Option<MockResponse>,
    pub network_log: Vec<NetworkEntry>,
    #[serde(skip)]
    interceptions: Vec<Interception>,
    #[serde(skip)]
    mounted: Instant,
}

impl Playground {
    pub fn new(kind: EnvironmentKind) -> Self {
        Self {
            kind,
            username: None,
            password: None,
            signed_in: false,
            feedback_submitted: false,
            secret_revealed: false,
            checkout_complete: false,
            iframe_clicked: false,
            nested_iframe_clicked: false,
            selection: None,
            uploaded_file: None,
            selected_premium: None,
            viewing_user: None,
            snapshots: 0,
            db_ready: false,
            profile_name: None,
            profile_status: None,
            mock: None,
            api_response: None,
            network_log: Vec::new(),
            interceptions: Vec::new(),
            mounted: Instant::now(),
        }
    }

    /// True once the async-loading button has appeared
    pub fn reveal_button_visible(&self) -> bool {
        self.mounted.elapsed() >= REVEAL_DELAY
    }

    pub fn apply(&mut self, event: &ActionEvent) {
        match event.kind {
            ActionKind::Click => self.on_click(event),
            ActionKind::Fill => self.on_fill(event),
            ActionKind::Select if self.kind == EnvironmentKind::Dropdowns => {
                self.selection = event.value.clone();
            }
            ActionKind::Upload if self.kind == EnvironmentKind::FileUpload => {
                self.uploaded_file = event.value.clone();
            }
            ActionKind::RouteIntercept => {
                if let Some(interception) = &event.interception {
                    self.interceptions.push(interception.clone());
                    self.mock = Some(interception.clone());
                }
            }
            ActionKind::ApiCall => self.on_api_call(event),
            ActionKind::Navigate if self.kind == EnvironmentKind::CyUtilRepair => self.fetch_profile(),
            ActionKind::AccessibilitySnapshot if self.kind == EnvironmentKind::AccessibilityTree => {
                self.snapshots += 1;
            }
            _ => {}
        }
    }

    fn on_click(&mut self, event: &ActionEvent) {
        let button = event.selector_is("button");
        match self.kind {
            EnvironmentKind::AdvancedSelectors => {
                if event.selector_mentions("nth-child(3)") || event.selector_mentions("nth=2") {
                    self.selected_premium = Some(3);
                }
            }
            EnvironmentKind::TableData => {
                if event.names("View") || event.value.as_deref() == Some("Charlie") {
                    self.viewing_user = Some("Charlie".to_string());
                }
            }
            EnvironmentKind::ApiMock => {
                if event.names("Fetch Data") || button {
                    self.fetch_data();
                }
            }
            EnvironmentKind::FeedbackForm => {
                if event.names("Submit Feedback") || button {
                    self.feedback_submitted = true;
                }
            }
            EnvironmentKind::AsyncLoading => {
                if event.names("Reveal Secret") || event.selector_is("#reveal-btn") {
                    self.secret_revealed = true;
                }
            }
            EnvironmentKind::Checkout => {
                if event.names("Finalize Checkout") || button {
                    self.checkout_complete = true;
                }
            }
            EnvironmentKind::IframeTesting => {
                let in_frame =
                    event.frame_path.innermost() == Some("#my-iframe") || event.selector_mentions("my-iframe");
                if in_frame && (event.names("Click Me") || event.selector_mentions("button")) {
                    self.iframe_clicked = true;
                }
            }
            EnvironmentKind::NestedIframes => {
                if event.frame_path.mentions("inner-iframe")
                    && (event.names("Submit Inner") || event.selector_mentions("button"))
                {
                    self.nested_iframe_clicked = true;
                }
            }
            EnvironmentKind::Login => {
                let submit = event.names("Sign In") || event.selector_is("button[type=\"submit\"]") || button;
                if submit && self.username.is_some() && self.password.is_some() {
                    self.signed_in = true;
                }
            }
            _ => {}
        }
    }

    fn on_fill(&mut self, event: &ActionEvent) {
        if self.kind != EnvironmentKind::Login {
            return;
        }
        let value = event.value.clone().unwrap_or_default();
        if event.names("Password") || event.selector_mentions("pass") {
            self.password = Some(value);
        } else if event.names("Username") || event.selector_mentions("user") || event.selector_mentions("email") {
            self.username = Some(value);
        }
    }

    fn on_api_call(&mut self, event: &ActionEvent) {
        let Some(network) = &event.network else {
            return;
        };
        if self.kind == EnvironmentKind::CyDbStatus && network.url.contains("/api/database/reset") {
            self.db_ready = true;
        }
        let method = match (network.method.is_empty(), network.payload.is_some()) {
            (false, _) => network.method.clone(),
            (true, true) => "POST".to_string(),
            (true, false) => "GET".to_string(),
        };
        self.network_log.push(NetworkEntry {
            method,
            url: network.url.clone(),
            payload: network.payload.clone(),
            status: network.status,
            body: network.response.clone(),
        });
    }

    /// The api-mock "Fetch Data" button
    fn fetch_data(&mut self) {
        let response = match find_interception("GET", "/api/data", &self.interceptions) {
            Some(interception) => MockResponse::new(
                interception.response.status,
                decode_body(&interception.response.body),
            ),
            None => MockResponse::new(200, json!({ "data": "Success! Loaded real data." })),
        };
        debug!("Playground fetched /api/data -> {}", response.status);
        self.log_fetch("/api/data", &response);
        self.api_response = Some(response);
    }

    /// Profile request the cy-util-repair page makes when it loads
    fn fetch_profile(&mut self) {
        let served = self
            .interceptions
            .iter()
            .rev()
            .find(|i| i.glob.contains("v2/profile"))
            .map(|i| MockResponse::new(i.response.status, decode_body(&i.response.body)));
        let response = served.unwrap_or_else(|| MockResponse::new(404, json!({ "error": "Endpoint not found" })));

        self.profile_status = Some(response.status);
        self.profile_name = match (&response.body["name"], response.status) {
            (Value::String(name), 200) => Some(name.clone()),
            _ => None,
        };
        self.log_fetch("/api/v2/profile", &response);
    }

    fn log_fetch(&mut self, url: &str, response: &MockResponse) {
        self.network_log.push(NetworkEntry {
            method: "GET".to_string(),
            url: url.to_string(),
            payload: None,
            status: response.status,
            body: response.body.clone(),
        });
    }

    /// Text the playground currently shows
    pub fn render(&self) -> String {
        let mut out = String::new();
        match self.kind {
            EnvironmentKind::Login => {
                line(&mut out, "Member Login");
                line(&mut out, format!("[Username] {}", self.username.as_deref().unwrap_or("")));
                line(
                    &mut out,
                    format!("[Password] {}", "*".repeat(self.password.as_deref().map_or(0, str::len))),
                );
                line(&mut out, "(Sign In)");
                if self.signed_in {
                    line(&mut out, "Welcome back!");
                }
            }
            EnvironmentKind::FeedbackForm => {
                line(&mut out, "Customer Feedback");
                line(&mut out, "[Tell us what you think...]");
                line(&mut out, "(Submit Feedback)");
                if self.feedback_submitted {
                    line(&mut out, "Thank you!");
                }
            }
            EnvironmentKind::AsyncLoading => {
                line(&mut out, "Data Vault");
                if self.reveal_button_visible() || self.secret_revealed {
                    line(&mut out, "(Reveal Secret)");
                } else {
                    line(&mut out, "Authenticating Secure Connection...");
                }
                if self.secret_revealed {
                    line(&mut out, "The secret code is 42");
                }
            }
            EnvironmentKind::Checkout => {
                line(&mut out, "Shopping Cart");
                line(&mut out, "Playwright Mastery Course  $99.00");
                if self.checkout_complete {
                    line(&mut out, "Checkout Successful");
                    line(&mut out, "Confirmation #XP-9000");
                } else {
                    line(&mut out, "(Finalize Checkout)");
                }
            }
            EnvironmentKind::IframeTesting => {
                line(&mut out, "Main Content");
                line(&mut out, "  #my-iframe  IFRAME CONTEXT");
                line(&mut out, "  (Click Me)");
                if self.iframe_clicked {
                    line(&mut out, "  Success!");
                }
            }
            EnvironmentKind::NestedIframes => {
                line(&mut out, "Outer Document");
                line(&mut out, "  #outer-iframe  Outer Iframe Body");
                line(&mut out, "    #inner-iframe  (Submit Inner)");
                if self.nested_iframe_clicked {
                    line(&mut out, "    Nested Success!");
                }
            }
            EnvironmentKind::ApiConsole | EnvironmentKind::ApiMock => {
                line(&mut out, "API Test Environment");
                self.render_network(&mut out);
                if self.kind == EnvironmentKind::ApiMock {
                    line(&mut out, "UI Application  ACTIVE");
                    line(&mut out, "(Fetch Data)");
                    if let Some(response) = &self.api_response {
                        line(&mut out, response_banner(response));
                    }
                }
            }
            EnvironmentKind::Dropdowns => {
                line(&mut out, "Framework Settings");
                line(&mut out, "Select Preferred Framework [#framework-select]");
                match self.selection.as_deref().filter(|s| !s.is_empty()) {
                    Some(selection) => line(&mut out, format!("Selected: {}", capitalize(selection))),
                    None => line(&mut out, "No framework selected"),
                }
            }
            EnvironmentKind::TableData => {
                line(&mut out, "System Users");
                line(&mut out, format!("{:<10}{:<10}{:<10}{}", "Name", "Role", "Status", "Action"));
                for (name, role, status) in TABLE_USERS {
                    line(&mut out, format!("{:<10}{:<10}{:<10}(View)", name, role, status));
                }
                if let Some(user) = &self.viewing_user {
                    line(&mut out, format!("Viewing details for {}", user));
                }
            }
            EnvironmentKind::AccessibilityTree => {
                line(&mut out, "Semantic UI Preview");
                line(&mut out, "Order Quantity [1]  (Submit Order)");
                line(&mut out, "<root role=\"WebArea\" name=\"Semantic UI Preview\">");
                line(&mut out, "  <text name=\"Order Quantity\" />");
                line(&mut out, "  <spinbutton name=\"Order Quantity\" value=\"1\" />");
                line(&mut out, "  <button name=\"Submit Order\" />");
                line(&mut out, "</root>");
                if self.snapshots > 0 {
                    line(&mut out, format!("Snapshots captured: {}", self.snapshots));
                }
            }
            EnvironmentKind::FileUpload => {
                line(&mut out, "Cloud Storage");
                line(&mut out, "Click or drag files here to upload");
                if let Some(file) = &self.uploaded_file {
                    line(&mut out, format!("File \"{}\" uploaded", file));
                }
            }
            EnvironmentKind::AdvancedSelectors => {
                line(&mut out, "Item Inventory");
                for i in 1..=PREMIUM_ITEMS {
                    let marker = if self.selected_premium == Some(i) { "*" } else { " " };
                    line(&mut out, format!("{} #ITEM-00{}  Premium Listing {}", marker, i, i));
                }
                match self.selected_premium {
                    Some(i) => line(&mut out, format!("Premium Item {} selected", i)),
                    None => line(&mut out, "No selection made"),
                }
            }
            EnvironmentKind::Performance => {
                line(&mut out, "Diagnostics Panel");
                line(&mut out, "Load Event  1240ms");
                line(&mut out, "TTFB        340ms");
            }
            EnvironmentKind::CyDbStatus => {
                line(&mut out, "Service Health");
                if self.db_ready {
                    line(&mut out, "Database: Ready");
                } else {
                    line(&mut out, "Database: Unknown State");
                    line(&mut out, "Execute your custom database reset command to prepare the environment.");
                }
            }
            EnvironmentKind::CyUtilRepair => {
                line(&mut out, "Profile Settings");
                match (&self.profile_name, self.profile_status) {
                    (Some(name), _) => {
                        line(&mut out, "Display Name");
                        line(&mut out, name.as_str());
                    }
                    (None, Some(_)) => {
                        line(&mut out, "404: User Data Missing");
                        line(&mut out, "(Retry Fetch)");
                    }
                    (None, None) => line(&mut out, "Syncing with Cloud..."),
                }
            }
        }
        out
    }

    fn render_network(&self, out: &mut String) {
        line(out, "Live Network Logs");
        if self.network_log.is_empty() {
            line(out, "  Awaiting Requests...");
            return;
        }
        for entry in &self.network_log {
            line(out, format!("  {} {}  {}", entry.method, entry.url, entry.status));
            if let Some(payload) = &entry.payload {
                line(out, format!("    request  {}", payload));
            }
            if !entry.body.is_null() {
                line(out, format!("    response {}", entry.body));
            }
        }
    }
}

fn line(out: &mut String, text: impl AsRef<str>) {
    let _ = writeln!(out, "{}", text.as_ref());
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn response_banner(response: &MockResponse) -> String {
    if response.status >= 400 {
        let reason = response.body["error"].as_str().unwrap_or("Failed");
        format!("Error: {}", reason)
    } else {
        match &response.body["data"] {
            Value::String(data) => data.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Shared handle to the active playground; subscribes to the bus
#[derive(Clone)]
pub struct EnvironmentHandle {
    inner: Arc<Mutex<Playground>>,
}

impl EnvironmentHandle {
    fn new(kind: EnvironmentKind) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Playground::new(kind))),
        }
    }

    pub fn kind(&self) -> EnvironmentKind {
        self.inner.lock().kind
    }

    pub fn snapshot(&self) -> Playground {
        self.inner.lock().clone()
    }

    pub fn render(&self) -> String {
        self.inner.lock().render()
    }

    fn reset(&self) {
        let mut playground = self.inner.lock();
        *playground = Playground::new(playground.kind);
    }
}

impl Subscriber for EnvironmentHandle {
    fn on_action(&self, event: &ActionEvent) {
        self.inner.lock().apply(event);
    }
}

/// Owns the active playground and its bus subscription
pub struct EnvironmentRegistry {
    bus: CommandBus,
    active: EnvironmentHandle,
}

impl EnvironmentRegistry {
    pub fn new(bus: CommandBus, kind: EnvironmentKind) -> Self {
        let active = EnvironmentHandle::new(kind);
        bus.subscribe(Role::Environment, Arc::new(active.clone()));
        Self { bus, active }
    }

    pub fn active(&self) -> &EnvironmentHandle {
        &self.active
    }

    /// Make `kind` the active playground. A different kind replaces the
    /// subscriber; the same kind keeps it and only resets.
    pub fn activate(&mut self, kind: EnvironmentKind) {
        if self.active.kind() == kind {
            self.active.reset();
            return;
        }
        debug!("Switching environment {} -> {}", self.active.kind(), kind);
        self.active = EnvironmentHandle::new(kind);
        self.bus.subscribe(Role::Environment, Arc::new(self.active.clone()));
    }

    pub fn reset(&self) {
        self.active.reset();
    }
}
