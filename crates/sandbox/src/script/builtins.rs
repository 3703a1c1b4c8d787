//! Native functions and the methods of arrays, strings and numbers

use tracing::{debug, info};

use super::interp::{EntryPoint, Interpreter};
use super::value::{Array, Builtin, LogLevel, MathFn, Thrown, Value};
use autolab_common::ApiStyle;

type CallResult = std::result::Result<Value, Thrown>;

/// Longest string a script may build, in characters
const MAX_STRING_LENGTH: usize = 1 << 24;

pub(super) const ARRAY_METHODS: &[&str] = &[
    "push", "pop", "shift", "find", "findIndex", "filter", "map", "some", "every", "includes",
    "indexOf", "forEach", "join", "slice", "concat", "reduce", "reverse", "at", "toString",
];

pub(super) const STRING_METHODS: &[&str] = &[
    "includes", "startsWith", "endsWith", "toLowerCase", "toUpperCase", "trim", "split", "replace",
    "slice", "substring", "indexOf", "charAt", "padStart", "repeat", "at", "toString",
];

impl Interpreter {
    pub(super) async fn call_builtin(&self, builtin: Builtin, args: Vec<Value>) -> std::result::Result<Value, Thrown> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
        match builtin {
            Builtin::Test => {
                let name = arg(0).to_string();
                let callback = args.iter().skip(1).rev().find(|v| v.is_callable()).cloned();
                match callback {
                    Some(callback) => {
                        debug!("Registered test '{}'", name);
                        self.entries.borrow_mut().push(EntryPoint { name, callback });
                        Ok(Value::Undefined)
                    }
                    None => Err(Thrown::type_error(format!(
                        "test('{}') requires a callback function as its last argument",
                        name
                    ))),
                }
            }
            Builtin::Describe => match args.iter().rev().find(|v| v.is_callable()).cloned() {
                Some(body) => {
                    debug!("Entering describe block '{}'", arg(0));
                    self.call(body, Vec::new()).await?;
                    Ok(Value::Undefined)
                }
                None => Err(Thrown::type_error(format!(
                    "describe('{}') requires a callback function",
                    arg(0)
                ))),
            },
            Builtin::BeforeEach => match args.iter().rev().find(|v| v.is_callable()).cloned() {
                Some(hook) => {
                    self.hooks.borrow_mut().push(hook);
                    Ok(Value::Undefined)
                }
                None => Err(Thrown::type_error("beforeEach() requires a callback function")),
            },
            Builtin::Skip => {
                debug!("Skipping test '{}'", arg(0));
                Ok(Value::Undefined)
            }
            Builtin::DefineConfig => Ok(arg(0)),
            Builtin::Expect => Ok(self.runtime.expect(arg(0))),
            Builtin::Console(level) => {
                let line = args.iter().map(|v| match v {
                    Value::Str(s) => s.clone(),
                    other => format!("{:?}", other),
                });
                let line = line.collect::<Vec<_>>().join(" ");
                match level {
                    LogLevel::Log | LogLevel::Info => info!(target: "autolab::console", "{}", line),
                    LogLevel::Warn => tracing::warn!(target: "autolab::console", "{}", line),
                    LogLevel::Error => tracing::error!(target: "autolab::console", "{}", line),
                }
                self.runtime.console(level, line);
                Ok(Value::Undefined)
            }
            Builtin::JsonStringify => {
                let value = arg(0);
                if matches!(value, Value::Undefined) || value.is_callable() {
                    return Ok(Value::Undefined);
                }
                let json = value.to_json();
                let text = if arg(2).to_number() > 0.0 {
                    serde_json::to_string_pretty(&json)
                } else {
                    serde_json::to_string(&json)
                };
                text.map(Value::Str).map_err(|e| Thrown::type_error(e.to_string()))
            }
            Builtin::JsonParse => {
                let text = arg(0).to_string();
                serde_json::from_str::<serde_json::Value>(&text)
                    .map(|json| Value::from_json(&json))
                    .map_err(|e| Thrown::syntax_error(format!("Unexpected token in JSON: {}", e)))
            }
            // Buffers only ever feed file payloads, their text form is enough
            Builtin::BufferFrom => Ok(Value::Str(arg(0).to_string())),
            Builtin::Math(f) => Ok(Value::Number(match f {
                MathFn::Floor => arg(0).to_number().floor(),
                MathFn::Ceil => arg(0).to_number().ceil(),
                MathFn::Round => (arg(0).to_number() + 0.5).floor(),
                MathFn::Abs => arg(0).to_number().abs(),
                MathFn::Max => args.iter().map(Value::to_number).fold(f64::NEG_INFINITY, f64::max),
                MathFn::Min => args.iter().map(Value::to_number).fold(f64::INFINITY, f64::min),
                MathFn::Random => self.runtime.random(),
            })),
            Builtin::ErrorCtor(name) => {
                let message = match arg(0) {
                    Value::Undefined => String::new(),
                    other => other.to_string(),
                };
                Ok(Value::error(name, message))
            }
            Builtin::ObjectKeys | Builtin::ObjectValues | Builtin::ObjectEntries => {
                let entries: Vec<(String, Value)> = match arg(0) {
                    Value::Object(map) => map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    Value::Array(items) => items
                        .borrow()
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v.clone()))
                        .collect(),
                    _ => Vec::new(),
                };
                Ok(Value::array(
                    entries
                        .into_iter()
                        .map(|(k, v)| match builtin {
                            Builtin::ObjectKeys => Value::Str(k),
                            Builtin::ObjectValues => v,
                            _ => Value::array(vec![Value::Str(k), v]),
                        })
                        .collect(),
                ))
            }
            Builtin::ArrayIsArray => Ok(Value::Bool(matches!(arg(0), Value::Array(_)))),
            Builtin::StringCtor => Ok(Value::Str(match args.first() {
                Some(v) => v.to_string(),
                None => String::new(),
            })),
            Builtin::NumberCtor => Ok(Value::Number(args.first().map_or(0.0, Value::to_number))),
            Builtin::BooleanCtor => Ok(Value::Bool(arg(0).truthy())),
            // Host calls settle as they are evaluated, so the elements are
            // already results in source order
            Builtin::PromiseAll => match arg(0) {
                Value::Array(items) => Ok(Value::array(items.borrow().clone())),
                other => Err(Thrown::type_error(format!("{} is not iterable", other.type_of()))),
            },
            Builtin::PromiseResolve => Ok(arg(0)),
        }
    }

    /// Array methods; the callback-taking ones see a snapshot of the items
    pub(super) async fn array_method(&self, items: &Array, name: &str, args: Vec<Value>) -> CallResult {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
        let snapshot = items.borrow().clone();
        let this = Value::Array(items.clone());

        match name {
            "push" => {
                let mut items = items.borrow_mut();
                items.extend(args.iter().cloned());
                Ok(Value::Number(items.len() as f64))
            }
            "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
            "shift" => {
                let mut items = items.borrow_mut();
                Ok(if items.is_empty() { Value::Undefined } else { items.remove(0) })
            }
            "find" | "findIndex" | "filter" | "map" | "some" | "every" | "forEach" => {
                let callback = arg(0);
                if !callback.is_callable() {
                    return Err(Thrown::type_error(format!("{} is not a function", callback)));
                }
                let mut mapped = Vec::new();
                for (i, item) in snapshot.iter().enumerate() {
                    let args = vec![item.clone(), Value::Number(i as f64), this.clone()];
                    let result = self.call(callback.clone(), args).await?;
                    match name {
                        "find" if result.truthy() => return Ok(item.clone()),
                        "findIndex" if result.truthy() => return Ok(Value::Number(i as f64)),
                        "some" if result.truthy() => return Ok(Value::Bool(true)),
                        "every" if !result.truthy() => return Ok(Value::Bool(false)),
                        "filter" if result.truthy() => mapped.push(item.clone()),
                        "map" => mapped.push(result),
                        _ => {}
                    }
                }
                Ok(match name {
                    "find" | "forEach" => Value::Undefined,
                    "findIndex" => Value::Number(-1.0),
                    "some" => Value::Bool(false),
                    "every" => Value::Bool(true),
                    _ => Value::array(mapped),
                })
            }
            "reduce" => {
                let callback = arg(0);
                let mut iter = snapshot.iter().enumerate();
                let mut acc = match args.get(1) {
                    Some(initial) => initial.clone(),
                    None => match iter.next() {
                        Some((_, first)) => first.clone(),
                        None => return Err(Thrown::type_error("Reduce of empty array with no initial value")),
                    },
                };
                for (i, item) in iter {
                    let args = vec![acc, item.clone(), Value::Number(i as f64), this.clone()];
                    acc = self.call(callback.clone(), args).await?;
                }
                Ok(acc)
            }
            "includes" => {
                let needle = arg(0);
                Ok(Value::Bool(snapshot.iter().any(|v| same_value_zero(v, &needle))))
            }
            "indexOf" => {
                let needle = arg(0);
                let index = snapshot.iter().position(|v| v.strict_equals(&needle));
                Ok(Value::Number(index.map_or(-1.0, |i| i as f64)))
            }
            "join" => {
                let separator = match arg(0) {
                    Value::Undefined => ",".to_string(),
                    other => other.to_string(),
                };
                let parts: Vec<String> = snapshot
                    .iter()
                    .map(|v| if v.is_nullish() { String::new() } else { v.to_string() })
                    .collect();
                Ok(Value::Str(parts.join(&separator)))
            }
            "slice" => {
                let (start, end) = slice_bounds(snapshot.len(), args.first(), args.get(1));
                Ok(Value::array(snapshot[start..end].to_vec()))
            }
            "concat" => {
                let mut out = snapshot;
                for arg in args {
                    match arg {
                        Value::Array(more) => out.extend(more.borrow().iter().cloned()),
                        other => out.push(other),
                    }
                }
                Ok(Value::array(out))
            }
            "reverse" => {
                items.borrow_mut().reverse();
                Ok(this)
            }
            "at" => Ok(relative_index(snapshot.len(), &arg(0))
                .and_then(|i| snapshot.get(i).cloned())
                .unwrap_or(Value::Undefined)),
            "toString" => Ok(Value::Str(this.to_string())),
            other => Err(Thrown::type_error(format!("array.{} is not a function", other))),
        }
    }
}

pub(super) fn string_method(s: &str, name: &str, args: &[Value]) -> CallResult {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
    let text = |i: usize| arg(i).to_string();
    let chars: Vec<char> = s.chars().collect();

    Ok(match name {
        "includes" => Value::Bool(s.contains(&text(0))),
        "startsWith" => Value::Bool(s.starts_with(&text(0))),
        "endsWith" => Value::Bool(s.ends_with(&text(0))),
        "toLowerCase" => Value::Str(s.to_lowercase()),
        "toUpperCase" => Value::Str(s.to_uppercase()),
        "trim" => Value::Str(s.trim().to_string()),
        "split" => match arg(0) {
            Value::Undefined => Value::array(vec![Value::str(s)]),
            separator => {
                let separator = separator.to_string();
                if separator.is_empty() {
                    Value::array(chars.iter().map(|c| Value::Str(c.to_string())).collect())
                } else {
                    Value::array(s.split(separator.as_str()).map(Value::str).collect())
                }
            }
        },
        "replace" => Value::Str(s.replacen(&text(0), &text(1), 1)),
        "slice" => {
            let (start, end) = slice_bounds(chars.len(), args.first(), args.get(1));
            Value::Str(chars[start..end].iter().collect())
        }
        "substring" => {
            let clamp = |v: Option<&Value>, default: usize| match v {
                None | Some(Value::Undefined) => default,
                Some(v) => v.to_number().max(0.0).min(chars.len() as f64) as usize,
            };
            let (a, b) = (clamp(args.first(), 0), clamp(args.get(1), chars.len()));
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::Str(chars[start..end].iter().collect())
        }
        "indexOf" => Value::Number(
            s.find(&text(0))
                .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
        ),
        "charAt" => Value::Str(
            chars
                .get(arg(0).to_number().max(0.0) as usize)
                .map(|c| c.to_string())
                .unwrap_or_default(),
        ),
        "at" => relative_index(chars.len(), &arg(0))
            .and_then(|i| chars.get(i))
            .map_or(Value::Undefined, |c| Value::Str(c.to_string())),
        "padStart" => {
            let width = string_length(arg(0).to_number(), "padStart")?;
            let pad = match arg(1) {
                Value::Undefined => " ".to_string(),
                other => other.to_string(),
            };
            if chars.len() >= width || pad.is_empty() {
                Value::str(s)
            } else {
                let prefix: String = pad.chars().cycle().take(width - chars.len()).collect();
                Value::Str(format!("{}{}", prefix, s))
            }
        }
        "repeat" => {
            let count = arg(0).to_number();
            let count = if count.is_nan() { 0.0 } else { count };
            if count < 0.0 || count.is_infinite() {
                return Err(Thrown::range_error(format!("Invalid count value: {}", Value::Number(count))));
            }
            let count = count as usize;
            if chars.len().saturating_mul(count) > MAX_STRING_LENGTH {
                return Err(Thrown::range_error("Invalid string length"));
            }
            Value::Str(s.repeat(count))
        }
        "toString" => Value::str(s),
        other => return Err(Thrown::type_error(format!("string.{} is not a function", other))),
    })
}

/// Target length for string padding; NaN and negatives pad nothing
fn string_length(n: f64, method: &str) -> std::result::Result<usize, Thrown> {
    if n.is_nan() || n <= 0.0 {
        return Ok(0);
    }
    if n > MAX_STRING_LENGTH as f64 {
        return Err(Thrown::range_error(format!("Invalid string length in {}", method)));
    }
    Ok(n as usize)
}

pub(super) fn number_method(n: f64, name: &str, args: &[Value]) -> CallResult {
    match name {
        "toFixed" => {
            let digits = args.first().map_or(0.0, Value::to_number).clamp(0.0, 20.0) as usize;
            Ok(Value::Str(format!("{:.*}", digits, n)))
        }
        "toString" => Ok(Value::Str(Value::Number(n).to_string())),
        other => Err(Thrown::type_error(format!("number.{} is not a function", other))),
    }
}

fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

fn relative_index(len: usize, index: &Value) -> Option<usize> {
    let i = index.to_number();
    let i = if i.is_nan() { 0.0 } else { i.trunc() };
    let resolved = if i < 0.0 { len as f64 + i } else { i };
    (resolved >= 0.0 && resolved < len as f64).then(|| resolved as usize)
}

/// `slice(start, end)` bounds with negative offsets counted from the end
fn slice_bounds(len: usize, start: Option<&Value>, end: Option<&Value>) -> (usize, usize) {
    let resolve = |v: Option<&Value>, default: usize| match v {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 {
                (len as f64 + n).max(0.0) as usize
            } else {
                (n as usize).min(len)
            }
        }
    };
    let start = resolve(start, 0);
    let end = resolve(end, len);
    (start, end.max(start))
}

pub(super) fn common_globals() -> Vec<(&'static str, Value)> {
    let console = Value::object([
        ("log", Value::Builtin(Builtin::Console(LogLevel::Log))),
        ("info", Value::Builtin(Builtin::Console(LogLevel::Info))),
        ("debug", Value::Builtin(Builtin::Console(LogLevel::Log))),
        ("warn", Value::Builtin(Builtin::Console(LogLevel::Warn))),
        ("error", Value::Builtin(Builtin::Console(LogLevel::Error))),
    ]);
    let json = Value::object([
        ("stringify", Value::Builtin(Builtin::JsonStringify)),
        ("parse", Value::Builtin(Builtin::JsonParse)),
    ]);
    let math = Value::object([
        ("floor", Value::Builtin(Builtin::Math(MathFn::Floor))),
        ("ceil", Value::Builtin(Builtin::Math(MathFn::Ceil))),
        ("round", Value::Builtin(Builtin::Math(MathFn::Round))),
        ("abs", Value::Builtin(Builtin::Math(MathFn::Abs))),
        ("max", Value::Builtin(Builtin::Math(MathFn::Max))),
        ("min", Value::Builtin(Builtin::Math(MathFn::Min))),
        ("random", Value::Builtin(Builtin::Math(MathFn::Random))),
        ("PI", Value::Number(std::f64::consts::PI)),
    ]);
    let object = Value::object([
        ("keys", Value::Builtin(Builtin::ObjectKeys)),
        ("values", Value::Builtin(Builtin::ObjectValues)),
        ("entries", Value::Builtin(Builtin::ObjectEntries)),
    ]);
    vec![
        ("console", console),
        ("JSON", json),
        ("Math", math),
        ("Object", object),
        ("Array", Value::object([("isArray", Value::Builtin(Builtin::ArrayIsArray))])),
        ("Buffer", Value::object([("from", Value::Builtin(Builtin::BufferFrom))])),
        (
            "Promise",
            Value::object([
                ("all", Value::Builtin(Builtin::PromiseAll)),
                ("resolve", Value::Builtin(Builtin::PromiseResolve)),
            ]),
        ),
        ("Error", Value::Builtin(Builtin::ErrorCtor("Error"))),
        ("TypeError", Value::Builtin(Builtin::ErrorCtor("TypeError"))),
        ("RangeError", Value::Builtin(Builtin::ErrorCtor("RangeError"))),
        ("String", Value::Builtin(Builtin::StringCtor)),
        ("Number", Value::Builtin(Builtin::NumberCtor)),
        ("Boolean", Value::Builtin(Builtin::BooleanCtor)),
        ("NaN", Value::Number(f64::NAN)),
        ("Infinity", Value::Number(f64::INFINITY)),
        ("expect", Value::Builtin(Builtin::Expect)),
        ("defineConfig", Value::Builtin(Builtin::DefineConfig)),
    ]
}

/// Test-declaration globals of each API style
pub(super) fn style_globals(style: ApiStyle) -> Vec<(&'static str, Value)> {
    match style {
        ApiStyle::Playwright => vec![("test", Value::Builtin(Builtin::Test))],
        ApiStyle::Cypress => vec![
            ("it", Value::Builtin(Builtin::Test)),
            ("specify", Value::Builtin(Builtin::Test)),
            ("describe", Value::Builtin(Builtin::Describe)),
            ("context", Value::Builtin(Builtin::Describe)),
            ("beforeEach", Value::Builtin(Builtin::BeforeEach)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(value: Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.borrow().iter().map(|v| v.to_string()).collect(),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_string_methods() {
        let s = "Error: Server exploded";
        assert!(string_method(s, "includes", &[Value::str("exploded")]).unwrap().truthy());
        assert_eq!(strs(string_method("a,b,c", "split", &[Value::str(",")]).unwrap()), ["a", "b", "c"]);
        assert_eq!(string_method(s, "slice", &[Value::Number(-8.0)]).unwrap().to_string(), "exploded");
        assert_eq!(string_method("7", "padStart", &[Value::Number(3.0), Value::str("0")]).unwrap().to_string(), "007");
        assert_eq!(string_method(s, "indexOf", &[Value::str("Server")]).unwrap().to_number(), 7.0);
    }

    #[test]
    fn test_repeat_is_bounded() {
        assert_eq!(string_method("ab", "repeat", &[Value::Number(3.0)]).unwrap().to_string(), "ababab");
        assert_eq!(string_method("ab", "repeat", &[Value::Number(f64::NAN)]).unwrap().to_string(), "");
        assert_eq!(string_method("", "repeat", &[Value::Number(1e12)]).unwrap().to_string(), "");

        for count in [f64::INFINITY, -1.0] {
            let err = string_method("x", "repeat", &[Value::Number(count)]).unwrap_err();
            assert_eq!(err.0.field("name").map(|n| n.to_string()).as_deref(), Some("RangeError"));
        }
        let err = string_method("ab", "repeat", &[Value::Number(1e12)]).unwrap_err();
        assert_eq!(err.message(), "Invalid string length");
    }

    #[test]
    fn test_pad_start_is_bounded() {
        assert_eq!(string_method("42", "padStart", &[Value::Number(-5.0)]).unwrap().to_string(), "42");
        assert_eq!(string_method("42", "padStart", &[Value::Number(f64::NAN), Value::str("0")]).unwrap().to_string(), "42");
        assert_eq!(string_method("42", "padStart", &[Value::Number(5.0), Value::str("ab")]).unwrap().to_string(), "aba42");

        for width in [1e12, f64::INFINITY] {
            let err = string_method("7", "padStart", &[Value::Number(width), Value::str("0")]).unwrap_err();
            assert!(err.message().starts_with("Invalid string length"));
        }
    }

    #[test]
    fn test_number_methods() {
        assert_eq!(number_method(1.005, "toFixed", &[Value::Number(1.0)]).unwrap().to_string(), "1.0");
        assert_eq!(number_method(3.0, "toString", &[]).unwrap().to_string(), "3");
    }

    #[test]
    fn test_slice_bounds() {
        assert_eq!(slice_bounds(5, Some(&Value::Number(1.0)), Some(&Value::Number(-1.0))), (1, 4));
        assert_eq!(slice_bounds(5, Some(&Value::Number(10.0)), None), (5, 5));
        assert_eq!(slice_bounds(5, Some(&Value::Number(3.0)), Some(&Value::Number(1.0))), (3, 3));
    }

    #[test]
    fn test_style_globals_are_exclusive() {
        let pw: Vec<_> = style_globals(ApiStyle::Playwright).into_iter().map(|(n, _)| n).collect();
        let cy: Vec<_> = style_globals(ApiStyle::Cypress).into_iter().map(|(n, _)| n).collect();
        assert!(pw.contains(&"test") && !pw.contains(&"it"));
        assert!(cy.contains(&"it") && !cy.contains(&"test"));
    }
}
