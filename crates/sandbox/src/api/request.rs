//! Simulated HTTP requests for both styles

use autolab_common::{ActionEvent, ActionKind, MockResponse, NetworkExchange};
use serde_json::{Map, Value as Json};

use super::{arg, option, text_arg, Chain, Handle, HostResult, Runtime, Target};
use crate::network::resolve_mock_response;
use crate::script::Value;

/// Normalized request description
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Outgoing {
    pub method: String,
    pub url: String,
    pub payload: Option<Json>,
    pub headers: Map<String, Json>,
}

impl Outgoing {
    fn new(method: &str, url: String) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url,
            payload: None,
            headers: Map::new(),
        }
    }

    fn with_payload(mut self, payload: &Value) -> Self {
        if !payload.is_nullish() {
            self.payload = Some(payload.to_json());
        }
        self
    }

    fn with_headers(mut self, headers: Option<Value>) -> Self {
        if let Some(Json::Object(map)) = headers.map(|h| h.to_json()) {
            self.headers = map;
        }
        self
    }
}

impl Runtime {
    /// Resolve a request against the fake backend and publish it
    pub(super) fn exchange(&self, outgoing: Outgoing) -> MockResponse {
        let interceptions = self.interceptions();
        let response = resolve_mock_response(
            &outgoing.method,
            &outgoing.url,
            outgoing.payload.as_ref(),
            &outgoing.headers,
            &interceptions,
            &mut *self.rng.borrow_mut(),
        );
        let network = NetworkExchange {
            method: outgoing.method,
            url: outgoing.url.clone(),
            payload: outgoing.payload,
            status: response.status,
            response: response.body.clone(),
        };
        self.emit(
            ActionEvent::new(ActionKind::ApiCall)
                .with_value(outgoing.url)
                .with_network(network),
        );
        response
    }

    /// What the fake backend would answer for a GET of `url`; publishes
    /// nothing
    pub(super) fn lookup(&self, url: &str) -> MockResponse {
        resolve_mock_response(
            "GET",
            url,
            None,
            &Map::new(),
            &self.interceptions(),
            &mut *self.rng.borrow_mut(),
        )
    }

    pub(super) fn request_method(&self, method: &str, args: Vec<Value>) -> HostResult {
        let verb = match method {
            "get" | "post" | "put" | "patch" | "delete" | "head" => method,
            "fetch" => "",
            _ => return self.fallback(&Handle::Request, method, args),
        };
        let options = arg(&args, 1);
        let verb = match verb {
            "" => option(&options, "method").map_or_else(|| "GET".to_string(), |m| m.to_string()),
            other => other.to_string(),
        };
        let outgoing = Outgoing::new(&verb, text_arg(&args, 0))
            .with_payload(&option(&options, "data").unwrap_or(Value::Undefined))
            .with_headers(option(&options, "headers"));
        let response = self.exchange(outgoing);
        Ok(Value::Host(Handle::Response(response)).into())
    }

    pub(super) fn response_method(&self, response: &MockResponse, method: &str) -> HostResult {
        let value = match method {
            "ok" => Value::Bool(response.ok()),
            "status" => Value::Number(f64::from(response.status)),
            "statusText" => Value::str(if response.ok() { "OK" } else { "Error" }),
            "json" => Value::from_json(&response.body),
            "text" | "body" => Value::Str(match &response.body {
                Json::String(text) => text.clone(),
                other => other.to_string(),
            }),
            "headers" => Value::object([("content-type", Value::str("application/json"))]),
            _ => return self.fallback(&Handle::Response(response.clone()), method, Vec::new()),
        };
        Ok(value.into())
    }

    /// `cy.request` in any of its calling shapes
    pub(super) fn cy_request(&self, args: &[Value]) -> Value {
        let response = self.exchange(cy_request_shape(args));
        let subject = Value::object([
            ("status", Value::Number(f64::from(response.status))),
            ("body", Value::from_json(&response.body)),
            (
                "headers",
                Value::object([("content-type", Value::str("application/json"))]),
            ),
            ("isOkStatusCode", Value::Bool(response.ok())),
        ]);
        Value::Host(Handle::Chain(Chain {
            target: Target::default(),
            subject: Box::new(subject),
        }))
    }
}

/// `cy.request(options)`, `cy.request(method, url, body?)`, `cy.request(url)`
/// and `cy.request(url, body)`
pub(super) fn cy_request_shape(args: &[Value]) -> Outgoing {
    match (arg(args, 0), arg(args, 1)) {
        (options @ Value::Object(_), _) => {
            let method = option(&options, "method").map_or_else(|| "GET".to_string(), |m| m.to_string());
            let body = option(&options, "body")
                .or_else(|| option(&options, "data"))
                .unwrap_or(Value::Undefined);
            let url = option(&options, "url").map(|u| u.to_string()).unwrap_or_default();
            Outgoing::new(&method, url)
                .with_payload(&body)
                .with_headers(option(&options, "headers"))
        }
        (Value::Str(method), Value::Str(url)) => Outgoing::new(&method, url).with_payload(&arg(args, 2)),
        (url, Value::Undefined) => Outgoing::new("GET", url.to_string()),
        (url, body) => Outgoing::new("POST", url.to_string()).with_payload(&body),
    }
}
