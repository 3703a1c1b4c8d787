//! Chainable surface: `cy`, its chainables and `Cypress.Commands`

use autolab_common::{ActionEvent, ActionKind, Interception, MockResponse};
use serde_json::Value as Json;
use tracing::debug;

use super::{arg, compose, option, text_arg, Chain, Handle, HostResult, Reply, Runtime, Target};
use crate::network::decode_body;
use crate::script::{Thrown, Value};

/// Keys that mark an intercept response as a StaticResponse rather than a
/// plain body
const STATIC_RESPONSE_KEYS: &[&str] = &["statusCode", "body", "headers", "fixture", "delay", "forceNetworkError"];

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Commands that only affect the real browser; they yield `cy` unchanged
const PASS_THROUGH: &[&str] = &[
    "wait", "on", "log", "injectAxe", "checkA11y", "viewport", "reload", "screenshot", "fixture", "clearCookies",
    "clearLocalStorage", "go", "stub", "spy", "clock", "tick", "task", "exec",
];

/// File name for an upload spec.
///
/// Arrays use their first element, objects their `key` field, strings their
/// final path segment.
pub fn upload_name(spec: &Value, key: &str, fallback: &str) -> String {
    match spec {
        Value::Array(items) => items
            .borrow()
            .first()
            .map_or_else(|| fallback.to_string(), |first| upload_name(first, key, fallback)),
        Value::Object(_) => option(spec, key).map_or_else(|| fallback.to_string(), |name| name.to_string()),
        Value::Str(path) => path
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(fallback)
            .to_string(),
        _ => fallback.to_string(),
    }
}

fn chain(target: Target, subject: Value) -> Value {
    Value::Host(Handle::Chain(Chain {
        target,
        subject: Box::new(subject),
    }))
}

fn element_chain(target: Target) -> Value {
    let subject = Value::Host(Handle::Element(target.clone()));
    chain(target, subject)
}

fn cy() -> Value {
    Value::Host(Handle::Cy)
}

/// Target addressed by `contains(text)` or `contains(selector, text)`
fn contains_target(base: &Target, args: &[Value]) -> Target {
    let (selector, text) = match args {
        [selector, text, ..] if !text.is_nullish() && !matches!(text, Value::Object(_)) => {
            (Some(selector.to_string()), text.to_string())
        }
        _ => (None, text_arg(args, 0)),
    };
    let selector = match (base.qualified(), selector) {
        (Some(parent), Some(child)) => Some(compose(Some(&parent), &child, " ")),
        (parent, child) => child.or(parent),
    };
    Target {
        frame: base.frame.clone(),
        selector,
        text: Some(text),
    }
}

impl Runtime {
    pub(super) fn cy_method(&self, method: &str, args: Vec<Value>) -> HostResult {
        let value = match method {
            "visit" => {
                let url = text_arg(&args, 0);
                *self.url.borrow_mut() = Some(url.clone());
                self.emit(ActionEvent::new(ActionKind::Navigate).with_value(url));
                cy()
            }
            "request" => self.cy_request(&args),
            "get" => element_chain(Target {
                selector: Some(text_arg(&args, 0)),
                ..Target::default()
            }),
            "contains" => element_chain(contains_target(&Target::default(), &args)),
            "intercept" => return Ok(self.intercept(&args).into()),
            "wrap" => match arg(&args, 0) {
                Value::Host(Handle::Element(target)) => element_chain(target),
                Value::Host(Handle::Chain(existing)) => Value::Host(Handle::Chain(existing)),
                subject => chain(Target::default(), subject),
            },
            "window" | "document" => chain(Target::default(), Value::object(Vec::<(String, Value)>::new())),
            "url" | "location" => chain(
                Target::default(),
                Value::Str(self.current_url().unwrap_or_default()),
            ),
            _ if PASS_THROUGH.contains(&method) => cy(),
            _ => {
                let command = self.commands.borrow().get(method).cloned();
                return match command {
                    Some(callee) => {
                        debug!("Running custom command {}", method);
                        Ok(Reply::Callback {
                            callee,
                            args,
                            settle: Box::new(|_| cy()),
                        })
                    }
                    None => self.fallback(&Handle::Cy, method, args),
                };
            }
        };
        Ok(value.into())
    }

    /// `cy.intercept` in any of its calling shapes. Without a response it is
    /// a spy and registers nothing.
    fn intercept(&self, args: &[Value]) -> Value {
        let (method, glob, response) = match (arg(args, 0), arg(args, 1)) {
            (Value::Str(method), Value::Str(glob)) if HTTP_METHODS.contains(&method.to_ascii_uppercase().as_str()) => {
                (Some(method.to_ascii_uppercase()), glob, arg(args, 2))
            }
            (matcher @ Value::Object(_), response) => (
                option(&matcher, "method").map(|m| m.to_string().to_ascii_uppercase()),
                option(&matcher, "url").map(|u| u.to_string()).unwrap_or_default(),
                response,
            ),
            (glob, response) => (None, glob.to_string(), response),
        };

        let Some(response) = static_response(&response) else {
            debug!("Spying on {}", glob);
            return Value::Host(Handle::Alias);
        };
        let interception = Interception {
            glob: glob.clone(),
            method,
            response,
        };
        self.register(interception.clone());
        self.emit(
            ActionEvent::new(ActionKind::RouteIntercept)
                .with_value(glob)
                .with_interception(interception),
        );
        Value::Host(Handle::Alias)
    }

    pub(super) fn chain_method(&self, current: &Chain, method: &str, args: Vec<Value>) -> HostResult {
        let same = || Value::Host(Handle::Chain(current.clone()));
        let target = &current.target;

        let value = match method {
            "type" => {
                self.emit(target.event(ActionKind::Fill).with_value(text_arg(&args, 0)));
                same()
            }
            "click" | "dblclick" | "rightclick" | "check" | "uncheck" => {
                let mut event = target.event(ActionKind::Click);
                event.value = target.text.clone();
                self.emit(event);
                same()
            }
            "select" => {
                self.emit(target.event(ActionKind::Select).with_value(text_arg(&args, 0)));
                same()
            }
            "selectFile" => {
                let name = upload_name(&arg(&args, 0), "fileName", "file");
                self.emit(target.event(ActionKind::Upload).with_value(name));
                same()
            }
            "drag" => {
                let mut event = target.event(ActionKind::Drag);
                if !arg(&args, 0).is_nullish() {
                    event.value = Some(text_arg(&args, 0));
                }
                self.emit(event);
                same()
            }
            "should" | "and" => match arg(&args, 0) {
                callee if callee.is_callable() => {
                    let chained = current.clone();
                    return Ok(Reply::Callback {
                        callee,
                        args: vec![(*current.subject).clone()],
                        settle: Box::new(move |_| Value::Host(Handle::Chain(chained))),
                    });
                }
                _ => same(),
            },
            "then" | "spread" => match arg(&args, 0) {
                callee if callee.is_callable() => {
                    let chained = current.clone();
                    return Ok(Reply::Callback {
                        callee,
                        args: vec![(*current.subject).clone()],
                        settle: Box::new(move |result| match result {
                            Value::Host(Handle::Chain(next)) => Value::Host(Handle::Chain(next)),
                            Value::Undefined | Value::Host(Handle::Cy) => Value::Host(Handle::Chain(chained)),
                            subject => Value::Host(Handle::Chain(Chain {
                                target: chained.target,
                                subject: Box::new(subject),
                            })),
                        }),
                    });
                }
                _ => same(),
            },
            "within" => match arg(&args, 0) {
                callee if callee.is_callable() => {
                    let chained = current.clone();
                    return Ok(Reply::Callback {
                        callee,
                        args: vec![(*current.subject).clone()],
                        settle: Box::new(move |_| Value::Host(Handle::Chain(chained))),
                    });
                }
                _ => same(),
            },
            "its" => {
                let path = text_arg(&args, 0);
                match &*current.subject {
                    Value::Host(Handle::Element(element)) if path.contains("contentDocument") => {
                        element_chain(element.enter_frame())
                    }
                    subject => chain(target.clone(), walk_path(subject, &path)),
                }
            }
            "invoke" => {
                let name = text_arg(&args, 0);
                match &*current.subject {
                    Value::Host(Handle::Element(element)) => match name.as_str() {
                        "text" => chain(target.clone(), Value::Str(element.text.clone().unwrap_or_default())),
                        _ => same(),
                    },
                    _ => same(),
                }
            }
            "find" => element_chain(Target {
                frame: target.frame.clone(),
                selector: Some(compose(target.qualified().as_deref(), &text_arg(&args, 0), " ")),
                text: None,
            }),
            "contains" => element_chain(contains_target(target, &args)),
            "eq" | "first" | "last" => {
                let index = match method {
                    "first" => "0".to_string(),
                    "last" => "-1".to_string(),
                    _ => text_arg(&args, 0),
                };
                element_chain(Target {
                    frame: target.frame.clone(),
                    selector: Some(format!("{} >> nth={}", target.qualified().unwrap_or_else(|| "*".to_string()), index)),
                    text: None,
                })
            }
            "as" | "parent" | "parents" | "closest" | "children" | "siblings" | "next" | "prev" | "trigger"
            | "clear" | "scrollIntoView" | "focus" | "blur" | "wait" | "debug" | "log" => same(),
            _ => return self.fallback(&Handle::Chain(current.clone()), method, args),
        };
        Ok(value.into())
    }

    /// Methods of the jQuery-style element handed to callbacks
    pub(super) fn element_method(&self, target: &Target, method: &str, args: Vec<Value>) -> HostResult {
        let value = match method {
            "contents" => Value::Host(Handle::Element(target.enter_frame())),
            "find" => Value::Host(Handle::Element(Target {
                frame: target.frame.clone(),
                selector: Some(compose(target.qualified().as_deref(), &text_arg(&args, 0), " ")),
                text: None,
            })),
            "text" => Value::Str(target.text.clone().unwrap_or_default()),
            "val" => Value::str(""),
            "attr" | "prop" => Value::Undefined,
            "is" => Value::Bool(true),
            "click" => {
                let mut event = target.event(ActionKind::Click);
                event.value = target.text.clone();
                self.emit(event);
                Value::Host(Handle::Element(target.clone()))
            }
            _ => return self.fallback(&Handle::Element(target.clone()), method, args),
        };
        Ok(value.into())
    }

    pub(super) fn commands_method(&self, method: &str, args: Vec<Value>) -> HostResult {
        match method {
            "add" | "overwrite" => {
                let name = text_arg(&args, 0);
                let body = args.into_iter().skip(1).find(Value::is_callable).ok_or_else(|| {
                    Thrown::type_error(format!("Cypress.Commands.{}('{}') requires a function", method, name))
                })?;
                debug!("Registered custom command {}", name);
                self.commands.borrow_mut().insert(name, body);
                Ok(Value::Undefined.into())
            }
            _ => self.fallback(&Handle::CypressCommands, method, args),
        }
    }
}

/// Intercept response as a mock; `None` for spies
fn static_response(response: &Value) -> Option<MockResponse> {
    match response {
        Value::Undefined | Value::Null => None,
        callee if callee.is_callable() => None,
        Value::Object(map) if map.borrow().keys().any(|k| STATIC_RESPONSE_KEYS.contains(&k.as_str())) => {
            let status = option(response, "statusCode").map_or(200.0, |s| s.to_number()) as u16;
            let body = option(response, "body").map_or(Json::Null, |body| decode_body(&body.to_json()));
            Some(MockResponse::new(status, body))
        }
        other => Some(MockResponse::new(200, decode_body(&other.to_json()))),
    }
}

/// `its('a.b.0')` over plain values
fn walk_path(subject: &Value, path: &str) -> Value {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(subject.clone(), |value, segment| match &value {
            Value::Object(_) => value.field(segment),
            Value::Array(items) => match segment {
                "length" => Some(Value::Number(items.borrow().len() as f64)),
                index => index.parse::<usize>().ok().and_then(|i| items.borrow().get(i).cloned()),
            },
            Value::Str(text) if segment == "length" => Some(Value::Number(text.chars().count() as f64)),
            _ => None,
        })
        .unwrap_or(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_name_shapes() {
        let fixture = Value::object([("fileName", Value::str("config.json"))]);
        assert_eq!(upload_name(&fixture, "fileName", "file"), "config.json");
        assert_eq!(upload_name(&Value::array(vec![fixture]), "fileName", "file"), "config.json");
        assert_eq!(upload_name(&Value::str("fixtures/data/report.pdf"), "name", "file.txt"), "report.pdf");
        assert_eq!(upload_name(&Value::Number(3.0), "name", "file.txt"), "file.txt");
        assert_eq!(upload_name(&Value::object([("contents", Value::Null)]), "fileName", "file"), "file");
    }

    #[test]
    fn test_static_response_detection() {
        let spec = Value::object([
            ("statusCode", Value::Number(500.0)),
            ("body", Value::str("{\"error\":\"down\"}")),
        ]);
        assert_eq!(static_response(&spec), Some(MockResponse::new(500, json!({"error": "down"}))));

        let body_only = Value::object([("body", Value::object([("name", Value::str("Jane"))]))]);
        assert_eq!(static_response(&body_only), Some(MockResponse::new(200, json!({"name": "Jane"}))));

        let plain = Value::object([("users", Value::array(vec![]))]);
        assert_eq!(static_response(&plain), Some(MockResponse::new(200, json!({"users": []}))));

        assert_eq!(static_response(&Value::Undefined), None);
    }

    #[test]
    fn test_contains_target_shapes() {
        let text_only = contains_target(&Target::default(), &[Value::str("Charlie")]);
        assert_eq!(text_only.selector, None);
        assert_eq!(text_only.text.as_deref(), Some("Charlie"));

        let scoped = contains_target(&Target::default(), &[Value::str("tr"), Value::str("Charlie")]);
        assert_eq!(scoped.selector.as_deref(), Some("tr"));
    }

    #[test]
    fn test_walk_path() {
        let response = Value::object([
            ("status", Value::Number(200.0)),
            ("body", Value::object([("items", Value::array(vec![Value::str("a"), Value::str("b")]))])),
        ]);
        assert_eq!(walk_path(&response, "status").to_number(), 200.0);
        assert_eq!(walk_path(&response, "body.items.length").to_number(), 2.0);
        assert_eq!(walk_path(&response, "body.items.1").to_string(), "b");
        assert!(matches!(walk_path(&response, "body.missing.x"), Value::Undefined));
    }
}
