//! Locator based surface: `page`, frames, locators, routes and the
//! accessibility tree

use autolab_common::{ActionEvent, ActionKind, FramePath, Interception, MockResponse};
use tracing::debug;

use super::{arg, option, text_arg, HostResult, Handle, Locator, Reply, Runtime};
use crate::network::decode_body;
use crate::script::{Thrown, Value};

impl Runtime {
    pub(super) async fn page_method(&self, frame: &FramePath, method: &str, args: Vec<Value>) -> HostResult {
        let locator = |selector: Option<String>, label: Option<String>, text: Option<String>| {
            Value::Host(Handle::Locator(Locator {
                frame: frame.clone(),
                selector,
                label,
                text,
            }))
        };

        let value = match method {
            "goto" => {
                let url = text_arg(&args, 0);
                *self.url.borrow_mut() = Some(url.clone());
                self.emit(ActionEvent::new(ActionKind::Navigate).with_value(url));
                self.pause(self.latency.navigate()).await;
                Value::Undefined
            }
            "frameLocator" | "frame" => Value::Host(Handle::Page(frame.child(text_arg(&args, 0)))),
            "locator" => locator(Some(text_arg(&args, 0)), None, None),
            "getByLabel" | "getByPlaceholder" | "getByTitle" | "getByAltText" => {
                locator(None, Some(text_arg(&args, 0)), None)
            }
            "getByRole" => locator(None, Some(role_name(&args)), None),
            "getByText" => locator(None, None, Some(text_arg(&args, 0))),
            "getByTestId" => locator(Some(format!("[data-testid=\"{}\"]", text_arg(&args, 0))), None, None),
            "route" => {
                let glob = text_arg(&args, 0);
                let handler = arg(&args, 1);
                if !handler.is_callable() {
                    return Err(Thrown::type_error("route() requires a handler function"));
                }
                debug!("Routing {}", glob);
                return Ok(Reply::Callback {
                    callee: handler,
                    args: vec![Value::Host(Handle::Route { glob })],
                    settle: Box::new(|_| Value::Undefined),
                });
            }
            "setInputFiles" => {
                let target = Locator {
                    frame: frame.clone(),
                    selector: Some(text_arg(&args, 0)),
                    ..Locator::default()
                };
                return self.upload(&target, &arg(&args, 1)).await;
            }
            "click" | "dblclick" | "check" | "fill" | "type" | "selectOption" => {
                let target = Locator {
                    frame: frame.clone(),
                    selector: Some(text_arg(&args, 0)),
                    ..Locator::default()
                };
                return self.locator_method(&target, method, args.into_iter().skip(1).collect()).await;
            }
            "waitForTimeout" => {
                let ms = arg(&args, 0).to_number();
                if ms.is_finite() && ms > 0.0 {
                    self.pause(std::time::Duration::from_millis(ms as u64)).await;
                }
                Value::Undefined
            }
            "waitForResponse" => match arg(&args, 0) {
                Value::Str(url) => Value::Host(Handle::Response(self.lookup(&url))),
                _ => Value::Undefined,
            },
            "waitForRequest" | "waitForLoadState" | "waitForSelector" | "waitForURL" | "screenshot" | "pause" | "reload"
            | "setViewportSize" | "close" | "bringToFront" => Value::Undefined,
            "url" => Value::Str(self.current_url().unwrap_or_else(|| "about:blank".to_string())),
            "title" => Value::str("Automation Lab Playground"),
            "isVisible" => Value::Bool(true),
            _ => return self.fallback(&Handle::Page(frame.clone()), method, args),
        };
        Ok(value.into())
    }

    pub(super) async fn locator_method(&self, locator: &Locator, method: &str, args: Vec<Value>) -> HostResult {
        let derive = |selector: Option<String>, label: Option<String>, text: Option<String>| {
            Value::Host(Handle::Locator(Locator {
                frame: locator.frame.clone(),
                selector: selector.or_else(|| locator.selector.clone()),
                label,
                text,
            }))
        };

        let value = match method {
            "click" | "dblclick" | "check" | "uncheck" | "tap" | "hover" => {
                if method == "hover" {
                    return Ok(Value::Undefined.into());
                }
                self.emit(locator.event(ActionKind::Click));
                self.pause(self.latency.interaction()).await;
                Value::Undefined
            }
            "fill" | "type" | "pressSequentially" => {
                self.emit(locator.event(ActionKind::Fill).with_value(text_arg(&args, 0)));
                self.pause(self.latency.interaction()).await;
                Value::Undefined
            }
            "selectOption" => {
                self.emit(locator.event(ActionKind::Select).with_value(option_value(&arg(&args, 0))));
                self.pause(self.latency.interaction()).await;
                Value::Undefined
            }
            "dragTo" => {
                let mut event = locator.event(ActionKind::Drag);
                if let Value::Host(Handle::Locator(target)) = arg(&args, 0) {
                    event.value = target.selector.or(target.label).or(target.text);
                }
                self.emit(event);
                self.pause(self.latency.drag()).await;
                Value::Undefined
            }
            "setInputFiles" => return self.upload(locator, &arg(&args, 0)).await,
            "toBeVisible" => {
                self.emit(locator.event(ActionKind::AssertVisible));
                Value::Bool(true)
            }
            "locator" => derive(Some(locator.scoped(&text_arg(&args, 0))), None, None),
            "getByLabel" | "getByPlaceholder" | "getByTitle" => derive(None, Some(text_arg(&args, 0)), None),
            "getByRole" => derive(None, Some(role_name(&args)), None),
            "getByText" => derive(None, None, Some(text_arg(&args, 0))),
            "getByTestId" => derive(
                Some(locator.scoped(&format!("[data-testid=\"{}\"]", text_arg(&args, 0)))),
                None,
                None,
            ),
            "filter" => {
                let options = arg(&args, 0);
                let mut narrowed = locator.clone();
                if let Some(text) = option(&options, "hasText") {
                    let base = locator.selector.clone().unwrap_or_else(|| "*".to_string());
                    narrowed.selector = Some(format!("{}:has-text(\"{}\")", base, text));
                }
                Value::Host(Handle::Locator(narrowed))
            }
            "first" | "last" | "nth" => {
                let index = match method {
                    "first" => "0".to_string(),
                    "last" => "-1".to_string(),
                    _ => arg(&args, 0).to_string(),
                };
                let mut narrowed = locator.clone();
                narrowed.selector = Some(format!(
                    "{} >> nth={}",
                    locator.selector.as_deref().unwrap_or("*"),
                    index
                ));
                Value::Host(Handle::Locator(narrowed))
            }
            "frameLocator" => Value::Host(Handle::Page(locator.frame.child(locator.scoped(&text_arg(&args, 0))))),
            "textContent" | "innerText" => Value::Str(
                locator
                    .text
                    .clone()
                    .or_else(|| locator.label.clone())
                    .unwrap_or_default(),
            ),
            "inputValue" => Value::str(""),
            "getAttribute" => Value::Null,
            "isVisible" | "isEnabled" => Value::Bool(true),
            "count" => Value::Number(1.0),
            "waitFor" | "scrollIntoViewIfNeeded" | "focus" | "blur" | "press" | "clear" => Value::Undefined,
            _ => return self.fallback(&Handle::Locator(locator.clone()), method, args),
        };
        Ok(value.into())
    }

    async fn upload(&self, locator: &Locator, files: &Value) -> HostResult {
        let name = super::upload_name(files, "name", "file.txt");
        self.emit(locator.event(ActionKind::Upload).with_value(name));
        self.pause(self.latency.upload()).await;
        Ok(Value::Undefined.into())
    }

    pub(super) fn route_method(&self, glob: &str, method: &str, args: Vec<Value>) -> HostResult {
        match method {
            "fulfill" => {
                let spec = arg(&args, 0);
                let status = option(&spec, "status").map_or(200.0, |s| s.to_number()) as u16;
                let body = option(&spec, "body")
                    .or_else(|| option(&spec, "json"))
                    .map_or(serde_json::Value::Null, |b| decode_body(&b.to_json()));
                let interception = Interception {
                    glob: glob.to_string(),
                    method: None,
                    response: MockResponse::new(status, body),
                };
                self.register(interception.clone());
                self.emit(
                    ActionEvent::new(ActionKind::RouteIntercept)
                        .with_value(glob)
                        .with_interception(interception),
                );
                Ok(Value::Undefined.into())
            }
            "continue" | "abort" | "fallback" => Ok(Value::Undefined.into()),
            "request" => Ok(Value::object([("url", Value::str(glob))]).into()),
            _ => self.fallback(&Handle::Route { glob: glob.to_string() }, method, args),
        }
    }

    pub(super) fn accessibility_method(&self, method: &str) -> HostResult {
        match method {
            "snapshot" => {
                self.emit(ActionEvent::new(ActionKind::AccessibilitySnapshot));
                Ok(Value::from_json(&accessibility_tree()).into())
            }
            _ => self.fallback(&Handle::Accessibility, method, Vec::new()),
        }
    }
}

/// Semantic tree of the accessibility playground
pub fn accessibility_tree() -> serde_json::Value {
    serde_json::json!({
        "role": "WebArea",
        "name": "Semantic UI Preview",
        "children": [
            { "role": "text", "name": "Order Quantity" },
            { "role": "spinbutton", "name": "Order Quantity", "value": "1" },
            { "role": "button", "name": "Submit Order", "disabled": false }
        ]
    })
}

/// Accessible name used by `getByRole(role, { name })`
fn role_name(args: &[Value]) -> String {
    option(&arg(args, 1), "name")
        .map(|name| name.to_string())
        .unwrap_or_else(|| text_arg(args, 0))
}

/// Value picked by `selectOption`: a string, the first of an array, or the
/// `value`/`label` of an option object
fn option_value(choice: &Value) -> String {
    match choice {
        Value::Array(items) => items.borrow().first().map(option_value).unwrap_or_default(),
        Value::Object(_) => option(choice, "value")
            .or_else(|| option(choice, "label"))
            .map(|v| v.to_string())
            .unwrap_or_default(),
        Value::Undefined | Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_name_prefers_accessible_name() {
        let named = vec![Value::str("button"), Value::object([("name", Value::str("Sign In"))])];
        assert_eq!(role_name(&named), "Sign In");
        assert_eq!(role_name(&[Value::str("heading")]), "heading");
    }

    #[test]
    fn test_option_value_shapes() {
        assert_eq!(option_value(&Value::str("playwright")), "playwright");
        assert_eq!(option_value(&Value::array(vec![Value::str("cypress"), Value::str("x")])), "cypress");
        assert_eq!(option_value(&Value::object([("label", Value::str("Selenium"))])), "Selenium");
    }

    #[test]
    fn test_accessibility_tree_has_submit_button() {
        let tree = accessibility_tree();
        let children = tree["children"].as_array().unwrap();
        assert!(children
            .iter()
            .any(|n| n["name"] == "Submit Order" && n["role"] == "button" && n["disabled"] == false));
    }
}
