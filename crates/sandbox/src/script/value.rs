//! Runtime values, scopes and thrown errors

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use super::ast::FunctionDef;
use crate::api::Handle;

pub type Array = Rc<RefCell<Vec<Value>>>;
pub type Object = Rc<RefCell<BTreeMap<String, Value>>>;

/// A script value
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Array),
    Object(Object),
    Function(Rc<Closure>),
    Builtin(Builtin),
    /// Method looked up on a value, bound to its receiver
    Method { this: Box<Value>, name: String },
    /// Object of the mock automation API
    Host(Handle),
}

/// User-defined function together with its defining scope
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Env,
}

/// Native functions reachable from script globals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Test,
    Describe,
    BeforeEach,
    Skip,
    DefineConfig,
    Expect,
    Console(LogLevel),
    JsonStringify,
    JsonParse,
    BufferFrom,
    Math(MathFn),
    ErrorCtor(&'static str),
    ObjectKeys,
    ObjectValues,
    ObjectEntries,
    ArrayIsArray,
    StringCtor,
    NumberCtor,
    BooleanCtor,
    PromiseAll,
    PromiseResolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Floor,
    Ceil,
    Round,
    Abs,
    Max,
    Min,
    Random,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Object(Rc::new(RefCell::new(map)))
    }

    /// `{name, message}` object as produced by the error constructors
    pub fn error(name: &str, message: impl Into<String>) -> Self {
        Value::object([
            ("name", Value::str(name)),
            ("message", Value::Str(message.into())),
        ])
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_) | Value::Method { .. })
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Builtin(_) | Value::Method { .. } => "function",
            _ => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) => match items.borrow().as_slice() {
                [] => 0.0,
                [only] => only.to_number(),
                _ => f64::NAN,
            },
            _ => f64::NAN,
        }
    }

    /// Property key form of the value, as used by `obj[key]`
    pub fn to_key(&self) -> String {
        self.to_string()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Own property of a plain object
    pub fn field(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => map.borrow().get(key).cloned(),
            _ => None,
        }
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }

    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::Str(_))
            | (Value::Str(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    /// Structural comparison used by `toEqual` style matchers
    pub fn deep_equals(&self, other: &Value) -> bool {
        self.to_json() == other.to_json()
    }

    /// JSON form; functions, host objects and `undefined` become `null`
    /// (and are dropped from objects)
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.borrow().iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.borrow()
                    .iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined) && !v.is_callable())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Function(_) | Value::Builtin(_) | Value::Method { .. } | Value::Host(_) => Json::Null,
        }
    }

    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::object(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v)))),
        }
    }
}

fn number_to_json(n: f64) -> Json {
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Str(s) => f.write_str(s),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect();
                f.write_str(&parts.join(","))
            }
            Value::Object(map) => match (map.borrow().get("name"), map.borrow().get("message")) {
                (Some(Value::Str(name)), Some(message)) => write!(f, "{}: {}", name, message),
                _ => f.write_str("[object Object]"),
            },
            Value::Function(closure) => match &closure.def.name {
                Some(name) => write!(f, "function {}() {{ ... }}", name),
                None => f.write_str("() => { ... }"),
            },
            Value::Builtin(_) | Value::Method { .. } => f.write_str("function () { [native code] }"),
            Value::Host(handle) => write!(f, "[{}]", handle.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

// ============================================================================
// Scopes
// ============================================================================

pub type Env = Rc<Scope>;

struct Binding {
    value: Value,
    mutable: bool,
}

/// Lexical scope
pub struct Scope {
    vars: RefCell<HashMap<String, Binding>>,
    parent: Option<Env>,
}

impl Scope {
    pub fn root() -> Env {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        })
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn declare(&self, name: &str, value: Value, mutable: bool) {
        self.vars
            .borrow_mut()
            .insert(name.to_string(), Binding { value, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), Thrown> {
        if let Some(binding) = self.vars.borrow_mut().get_mut(name) {
            if !binding.mutable {
                return Err(Thrown::type_error("Assignment to constant variable."));
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(Thrown::reference_error(format!("{} is not defined", name))),
        }
    }
}

// ============================================================================
// Thrown values
// ============================================================================

/// A value raised by `throw` or by a runtime fault
#[derive(Debug, Clone)]
pub struct Thrown(pub Value);

impl Thrown {
    pub fn error(message: impl Into<String>) -> Self {
        Thrown(Value::error("Error", message))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Thrown(Value::error("TypeError", message))
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Thrown(Value::error("RangeError", message))
    }

    pub fn reference_error(message: impl Into<String>) -> Self {
        Thrown(Value::error("ReferenceError", message))
    }

    pub fn syntax_error(message: impl Into<String>) -> Self {
        Thrown(Value::error("SyntaxError", message))
    }

    /// Message text: the `message` field of error objects, the display
    /// string of anything else
    pub fn message(&self) -> String {
        match self.0.field("message") {
            Some(message) => message.to_string(),
            None => self.0.to_string(),
        }
    }
}

impl fmt::Display for Thrown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn test_json_conversion() {
        let source = json!({"status": 500, "body": {"error": "boom"}, "tags": ["a", 1.5, null]});
        let value = Value::from_json(&source);
        assert_eq!(value.to_json(), source);

        let with_fn = Value::object([("a", Value::Number(1.0)), ("f", Value::Builtin(Builtin::JsonParse))]);
        assert_eq!(with_fn.to_json(), json!({"a": 1}));
    }

    #[test]
    fn test_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(Value::str("200").loose_equals(&Value::Number(200.0)));
        let arr = Value::array(vec![]);
        assert!(arr.strict_equals(&arr.clone()));
        assert!(!arr.strict_equals(&Value::array(vec![])));
    }

    #[test]
    fn test_const_assignment_is_rejected() {
        let scope = Scope::root();
        scope.declare("a", Value::Number(1.0), false);
        let err = scope.assign("a", Value::Number(2.0)).unwrap_err();
        assert_eq!(err.message(), "Assignment to constant variable.");
        let missing = scope.assign("b", Value::Null).unwrap_err();
        assert_eq!(missing.message(), "b is not defined");
    }

    #[test]
    fn test_child_scope_shadows() {
        let root = Scope::root();
        root.declare("x", Value::Number(1.0), true);
        let child = Scope::child(&root);
        child.declare("x", Value::Number(2.0), true);
        assert_eq!(child.lookup("x").unwrap().to_number(), 2.0);
        child.assign("x", Value::Number(3.0)).unwrap();
        assert_eq!(root.lookup("x").unwrap().to_number(), 1.0);
    }

    #[test]
    fn test_thrown_message() {
        assert_eq!(Thrown::error("boom").message(), "boom");
        assert_eq!(Thrown(Value::str("plain")).message(), "plain");
    }
}
