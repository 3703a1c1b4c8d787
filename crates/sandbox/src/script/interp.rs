//! Tree-walking evaluator
//!
//! Every evaluation step returns a boxed local future so that host calls can
//! suspend on simulated latency. Values are `Rc` based, so the interpreter
//! stays on the thread that created it.

use std::cell::RefCell;
use std::rc::Rc;

use autolab_common::{ApiStyle, Error, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

use super::ast::*;
use super::builtins::{common_globals, number_method, string_method, style_globals, ARRAY_METHODS, STRING_METHODS};
use super::value::{Builtin, Closure, Env, Scope, Thrown, Value};
use super::Program;
use crate::api::{Reply, Runtime};

type Eval<'a> = LocalBoxFuture<'a, std::result::Result<Value, Thrown>>;
type Exec<'a> = LocalBoxFuture<'a, std::result::Result<Completion, Thrown>>;

/// How a statement finished
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Test registered through `test(...)` / `it(...)`
pub(super) struct EntryPoint {
    pub(super) name: String,
    pub(super) callback: Value,
}

pub struct Interpreter {
    pub(crate) runtime: Runtime,
    globals: Env,
    pub(super) entries: RefCell<Vec<EntryPoint>>,
    pub(super) hooks: RefCell<Vec<Value>>,
}

impl Interpreter {
    pub fn new(runtime: Runtime) -> Self {
        let globals = Scope::root();
        for (name, value) in common_globals() {
            globals.declare(name, value, false);
        }
        for (name, value) in style_globals(runtime.style()) {
            globals.declare(name, value, false);
        }
        for (name, value) in runtime.globals() {
            globals.declare(name, value, false);
        }
        Self {
            runtime,
            globals,
            entries: RefCell::new(Vec::new()),
            hooks: RefCell::new(Vec::new()),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Run the program: top-level code first, then every registered test
    /// preceded by the `beforeEach` hooks
    pub async fn run(&self, program: &Program) -> Result<()> {
        let scope = Scope::child(&self.globals);
        self.exec_block(&program.body, &scope).await.map_err(into_error)?;

        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        if entries.is_empty() {
            debug!("No test wrapper found, ran as top-level script");
        }
        for entry in entries {
            info!("Running test '{}'", entry.name);
            let hooks = self.hooks.borrow().clone();
            for hook in hooks {
                self.call_entry(hook).await.map_err(into_error)?;
            }
            self.call_entry(entry.callback).await.map_err(into_error)?;
        }
        Ok(())
    }

    async fn call_entry(&self, callback: Value) -> std::result::Result<Value, Thrown> {
        let args = match self.runtime.style() {
            ApiStyle::Playwright => vec![self.runtime.fixtures()],
            ApiStyle::Cypress => Vec::new(),
        };
        self.call(callback, args).await
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn hoist(&self, body: &[Stmt], env: &Env) {
        for stmt in body {
            if let Stmt::Function(def) = stmt {
                if let Some(name) = &def.name {
                    env.declare(name, self.closure(def, env), true);
                }
            }
        }
    }

    fn closure(&self, def: &Rc<FunctionDef>, env: &Env) -> Value {
        Value::Function(Rc::new(Closure {
            def: Rc::clone(def),
            env: Rc::clone(env),
        }))
    }

    pub(crate) fn exec_block<'a>(&'a self, body: &'a [Stmt], env: &'a Env) -> Exec<'a> {
        async move {
            self.hoist(body, env);
            for stmt in body {
                match self.exec(stmt, env).await? {
                    Completion::Normal => {}
                    other => return Ok(other),
                }
            }
            Ok(Completion::Normal)
        }
        .boxed_local()
    }

    fn exec<'a>(&'a self, stmt: &'a Stmt, env: &'a Env) -> Exec<'a> {
        async move {
            match stmt {
                Stmt::Expr(expr) => {
                    self.eval(expr, env).await?;
                }
                Stmt::Declare { kind, declarations } => {
                    for (pattern, init) in declarations {
                        let value = match init {
                            Some(expr) => self.eval(expr, env).await?,
                            None => Value::Undefined,
                        };
                        self.bind(pattern, value, env, *kind != DeclKind::Const).await?;
                    }
                }
                Stmt::Function(_) | Stmt::Empty => {}
                Stmt::Return(value) => {
                    let value = match value {
                        Some(expr) => self.eval(expr, env).await?,
                        None => Value::Undefined,
                    };
                    return Ok(Completion::Return(value));
                }
                Stmt::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval(test, env).await?.truthy() {
                        return self.exec_scoped(consequent, env).await;
                    } else if let Some(alternate) = alternate {
                        return self.exec_scoped(alternate, env).await;
                    }
                }
                Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                } => {
                    let iterable = self.eval(iterable, env).await?;
                    for item in iterate(&iterable)? {
                        let scope = Scope::child(env);
                        self.bind(pattern, item, &scope, *kind != DeclKind::Const).await?;
                        match self.exec_scoped(body, &scope).await? {
                            Completion::Break => break,
                            Completion::Return(v) => return Ok(Completion::Return(v)),
                            Completion::Normal | Completion::Continue => {}
                        }
                    }
                }
                Stmt::For {
                    init,
                    test,
                    update,
                    body,
                } => {
                    let scope = Scope::child(env);
                    if let Some(init) = init {
                        self.exec(init, &scope).await?;
                    }
                    loop {
                        if let Some(test) = test {
                            if !self.eval(test, &scope).await?.truthy() {
                                break;
                            }
                        }
                        match self.exec_scoped(body, &scope).await? {
                            Completion::Break => break,
                            Completion::Return(v) => return Ok(Completion::Return(v)),
                            Completion::Normal | Completion::Continue => {}
                        }
                        if let Some(update) = update {
                            self.eval(update, &scope).await?;
                        }
                    }
                }
                Stmt::While { test, body } => {
                    while self.eval(test, env).await?.truthy() {
                        match self.exec_scoped(body, env).await? {
                            Completion::Break => break,
                            Completion::Return(v) => return Ok(Completion::Return(v)),
                            Completion::Normal | Completion::Continue => {}
                        }
                    }
                }
                Stmt::Break => return Ok(Completion::Break),
                Stmt::Continue => return Ok(Completion::Continue),
                Stmt::Throw(expr) => {
                    let value = self.eval(expr, env).await?;
                    return Err(Thrown(value));
                }
                Stmt::Try {
                    block,
                    param,
                    handler,
                    finalizer,
                } => {
                    let scope = Scope::child(env);
                    let result = match (self.exec_block(block, &scope).await, handler) {
                        (Err(thrown), Some(handler)) => {
                            let scope = Scope::child(env);
                            if let Some(param) = param {
                                self.bind(param, thrown.0, &scope, true).await?;
                            }
                            self.exec_block(handler, &scope).await
                        }
                        (result, _) => result,
                    };
                    if let Some(finalizer) = finalizer {
                        let scope = Scope::child(env);
                        match self.exec_block(finalizer, &scope).await? {
                            Completion::Normal => {}
                            other => return Ok(other),
                        }
                    }
                    return result;
                }
                Stmt::Block(body) => {
                    let scope = Scope::child(env);
                    return self.exec_block(body, &scope).await;
                }
            }
            Ok(Completion::Normal)
        }
        .boxed_local()
    }

    /// Execute a nested statement, giving blocks their own scope
    fn exec_scoped<'a>(&'a self, stmt: &'a Stmt, env: &'a Env) -> Exec<'a> {
        async move {
            match stmt {
                Stmt::Block(body) => {
                    let scope = Scope::child(env);
                    self.exec_block(body, &scope).await
                }
                other => self.exec(other, env).await,
            }
        }
        .boxed_local()
    }

    fn bind<'a>(
        &'a self,
        pattern: &'a Pattern,
        value: Value,
        env: &'a Env,
        mutable: bool,
    ) -> LocalBoxFuture<'a, std::result::Result<(), Thrown>> {
        async move {
            match pattern {
                Pattern::Ident(name) => env.declare(name, value, mutable),
                Pattern::Object { properties, rest } => {
                    if value.is_nullish() {
                        return Err(Thrown::type_error(format!(
                            "Cannot destructure '{}' as it is {}.",
                            value, value
                        )));
                    }
                    for property in properties {
                        let mut item = self.get_property(&value, &property.key)?;
                        if let (Value::Undefined, Some(default)) = (&item, &property.default) {
                            item = self.eval(default, env).await?;
                        }
                        self.bind(&property.target, item, env, mutable).await?;
                    }
                    if let Some(rest) = rest {
                        let remaining = match &value {
                            Value::Object(map) => map
                                .borrow()
                                .iter()
                                .filter(|(k, _)| !properties.iter().any(|p| &p.key == *k))
                                .map(|(k, v)| (k.clone(), v.clone()))
                                .collect(),
                            _ => Vec::new(),
                        };
                        env.declare(rest, Value::object(remaining), mutable);
                    }
                }
                Pattern::Array(elements) => {
                    let items = iterate(&value)?;
                    for (i, element) in elements.iter().enumerate() {
                        let Some(param) = element else { continue };
                        let mut item = if param.rest {
                            Value::array(items.iter().skip(i).cloned().collect())
                        } else {
                            items.get(i).cloned().unwrap_or(Value::Undefined)
                        };
                        if let (Value::Undefined, Some(default)) = (&item, &param.default) {
                            item = self.eval(default, env).await?;
                        }
                        self.bind(&param.pattern, item, env, mutable).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed_local()
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(crate) fn eval<'a>(&'a self, expr: &'a Expr, env: &'a Env) -> Eval<'a> {
        async move {
            let value = match expr {
                Expr::Number(n) => Value::Number(*n),
                Expr::Str(s) => Value::Str(s.clone()),
                Expr::Bool(b) => Value::Bool(*b),
                Expr::Null => Value::Null,
                Expr::Undefined => Value::Undefined,
                Expr::Template(parts) => {
                    let mut out = String::new();
                    for part in parts {
                        match part {
                            TemplatePart::Text(text) => out.push_str(text),
                            TemplatePart::Expr(expr) => out.push_str(&self.eval(expr, env).await?.to_string()),
                        }
                    }
                    Value::Str(out)
                }
                Expr::Ident(name) => env
                    .lookup(name)
                    .ok_or_else(|| Thrown::reference_error(format!("{} is not defined", name)))?,
                Expr::Array(elements) => Value::array(self.eval_elements(elements, env).await?),
                Expr::Object(properties) => self.eval_object(properties, env).await?,
                Expr::Function(def) => self.closure(def, env),
                Expr::Member {
                    object,
                    property,
                    optional,
                } => {
                    let object = self.eval(object, env).await?;
                    if *optional && object.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    self.get_property(&object, property)?
                }
                Expr::Index {
                    object,
                    index,
                    optional,
                } => {
                    let object = self.eval(object, env).await?;
                    if *optional && object.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    let key = self.eval(index, env).await?;
                    self.get_property(&object, &key.to_key())?
                }
                Expr::Call { callee, args, optional } => {
                    let function = self.eval(callee, env).await?;
                    if *optional && function.is_nullish() {
                        return Ok(Value::Undefined);
                    }
                    if !function.is_callable() {
                        return Err(Thrown::type_error(format!("{} is not a function", callee.describe())));
                    }
                    let args = self.eval_elements(args, env).await?;
                    self.call(function, args).await?
                }
                Expr::New { callee, args } => {
                    let constructor = self.eval(callee, env).await?;
                    let args = self.eval_elements(args, env).await?;
                    match constructor {
                        Value::Builtin(Builtin::ErrorCtor(_)) | Value::Function(_) => {
                            match self.call(constructor, args).await? {
                                result @ (Value::Object(_) | Value::Array(_)) => result,
                                _ => Value::object(Vec::<(String, Value)>::new()),
                            }
                        }
                        _ => {
                            return Err(Thrown::type_error(format!(
                                "{} is not a constructor",
                                callee.describe()
                            )))
                        }
                    }
                }
                Expr::Unary { op, operand } => self.eval_unary(*op, operand, env).await?,
                Expr::Update {
                    increment,
                    prefix,
                    target,
                } => {
                    let old = self.eval(target, env).await?.to_number();
                    let new = if *increment { old + 1.0 } else { old - 1.0 };
                    self.assign(target, Value::Number(new), env).await?;
                    Value::Number(if *prefix { new } else { old })
                }
                Expr::Binary { op, left, right } => {
                    let left = self.eval(left, env).await?;
                    let right = self.eval(right, env).await?;
                    binary(*op, &left, &right)?
                }
                Expr::Logical { op, left, right } => {
                    let left = self.eval(left, env).await?;
                    let short_circuit = match op {
                        LogicalOp::And => !left.truthy(),
                        LogicalOp::Or => left.truthy(),
                        LogicalOp::Nullish => !left.is_nullish(),
                    };
                    if short_circuit {
                        left
                    } else {
                        self.eval(right, env).await?
                    }
                }
                Expr::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    if self.eval(test, env).await?.truthy() {
                        self.eval(consequent, env).await?
                    } else {
                        self.eval(alternate, env).await?
                    }
                }
                Expr::Assign { op, target, value } => {
                    let value = self.eval(value, env).await?;
                    let value = match op {
                        AssignOp::Assign => value,
                        AssignOp::Add => binary(BinaryOp::Add, &self.eval(target, env).await?, &value)?,
                        AssignOp::Sub => binary(BinaryOp::Sub, &self.eval(target, env).await?, &value)?,
                        AssignOp::Mul => binary(BinaryOp::Mul, &self.eval(target, env).await?, &value)?,
                        AssignOp::Div => binary(BinaryOp::Div, &self.eval(target, env).await?, &value)?,
                    };
                    self.assign(target, value.clone(), env).await?;
                    value
                }
                // Host calls complete before they return, so awaiting is a no-op
                Expr::Await(expr) => self.eval(expr, env).await?,
            };
            Ok(value)
        }
        .boxed_local()
    }

    async fn eval_elements(&self, elements: &[Element], env: &Env) -> std::result::Result<Vec<Value>, Thrown> {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Element::Item(expr) => out.push(self.eval(expr, env).await?),
                Element::Spread(expr) => {
                    let value = self.eval(expr, env).await?;
                    out.extend(iterate(&value)?);
                }
            }
        }
        Ok(out)
    }

    async fn eval_object(&self, properties: &[ObjectProperty], env: &Env) -> std::result::Result<Value, Thrown> {
        let mut entries: Vec<(String, Value)> = Vec::with_capacity(properties.len());
        for property in properties {
            match property {
                ObjectProperty::KeyValue(key, expr) => {
                    let key = match key {
                        PropertyKey::Static(name) => name.clone(),
                        PropertyKey::Computed(expr) => self.eval(expr, env).await?.to_key(),
                    };
                    let value = self.eval(expr, env).await?;
                    entries.push((key, value));
                }
                ObjectProperty::Spread(expr) => match self.eval(expr, env).await? {
                    Value::Object(map) => {
                        entries.extend(map.borrow().iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    Value::Array(items) => {
                        entries.extend(
                            items
                                .borrow()
                                .iter()
                                .enumerate()
                                .map(|(i, v)| (i.to_string(), v.clone())),
                        );
                    }
                    _ => {}
                },
            }
        }
        Ok(Value::object(entries))
    }

    async fn eval_unary(&self, op: UnaryOp, operand: &Expr, env: &Env) -> std::result::Result<Value, Thrown> {
        Ok(match op {
            UnaryOp::Typeof => {
                if let Expr::Ident(name) = operand {
                    if env.lookup(name).is_none() {
                        return Ok(Value::str("undefined"));
                    }
                }
                Value::str(self.eval(operand, env).await?.type_of())
            }
            UnaryOp::Delete => {
                if let Expr::Member { object, property, .. } = operand {
                    if let Value::Object(map) = self.eval(object, env).await? {
                        map.borrow_mut().remove(property);
                    }
                }
                Value::Bool(true)
            }
            UnaryOp::Not => Value::Bool(!self.eval(operand, env).await?.truthy()),
            UnaryOp::Neg => Value::Number(-self.eval(operand, env).await?.to_number()),
            UnaryOp::Plus => Value::Number(self.eval(operand, env).await?.to_number()),
            UnaryOp::Void => {
                self.eval(operand, env).await?;
                Value::Undefined
            }
        })
    }

    async fn assign(&self, target: &Expr, value: Value, env: &Env) -> std::result::Result<(), Thrown> {
        match target {
            Expr::Ident(name) => env.assign(name, value),
            Expr::Member { object, property, .. } => {
                let object = self.eval(object, env).await?;
                set_property(&object, property, value)
            }
            Expr::Index { object, index, .. } => {
                let object = self.eval(object, env).await?;
                let key = self.eval(index, env).await?;
                set_property(&object, &key.to_key(), value)
            }
            _ => Err(Thrown::syntax_error("Invalid left-hand side in assignment")),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Invoke any callable value
    pub(crate) fn call<'a>(&'a self, function: Value, args: Vec<Value>) -> Eval<'a> {
        async move {
            match function {
                Value::Function(closure) => self.call_closure(&closure, args).await,
                Value::Builtin(builtin) => self.call_builtin(builtin, args).await,
                Value::Method { this, name } => self.call_method(*this, &name, args).await,
                other => Err(Thrown::type_error(format!("{} is not a function", other))),
            }
        }
        .boxed_local()
    }

    async fn call_closure(&self, closure: &Closure, args: Vec<Value>) -> std::result::Result<Value, Thrown> {
        let scope = Scope::child(&closure.env);
        let def = &closure.def;
        for (i, param) in def.params.iter().enumerate() {
            let mut value = if param.rest {
                Value::array(args.iter().skip(i).cloned().collect())
            } else {
                args.get(i).cloned().unwrap_or(Value::Undefined)
            };
            if let (Value::Undefined, Some(default)) = (&value, &param.default) {
                value = self.eval(default, &scope).await?;
            }
            self.bind(&param.pattern, value, &scope, true).await?;
        }
        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope).await,
            FunctionBody::Block(body) => match self.exec_block(body, &scope).await? {
                Completion::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    async fn call_method(&self, this: Value, name: &str, args: Vec<Value>) -> std::result::Result<Value, Thrown> {
        match this {
            Value::Host(handle) => match self.runtime.invoke(&handle, name, args).await? {
                Reply::Value(value) => Ok(value),
                Reply::Callback { callee, args, settle } => {
                    let result = self.call(callee, args).await?;
                    Ok(settle(result))
                }
            },
            Value::Array(items) => self.array_method(&items, name, args).await,
            Value::Str(s) => string_method(&s, name, &args),
            Value::Number(n) => number_method(n, name, &args),
            Value::Object(map) if name == "hasOwnProperty" => Ok(Value::Bool(
                args.first()
                    .map_or(false, |key| map.borrow().contains_key(&key.to_key())),
            )),
            other if name == "toString" => Ok(Value::Str(other.to_string())),
            other => Err(Thrown::type_error(format!("{}.{} is not a function", other.type_of(), name))),
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub(crate) fn get_property(&self, object: &Value, key: &str) -> std::result::Result<Value, Thrown> {
        let method = || Value::Method {
            this: Box::new(object.clone()),
            name: key.to_string(),
        };
        Ok(match object {
            Value::Undefined | Value::Null => {
                return Err(Thrown::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    object, key
                )))
            }
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.borrow().len() as f64)
                } else if let Ok(index) = key.parse::<usize>() {
                    items.borrow().get(index).cloned().unwrap_or(Value::Undefined)
                } else if ARRAY_METHODS.contains(&key) {
                    method()
                } else {
                    Value::Undefined
                }
            }
            Value::Str(s) => {
                if key == "length" {
                    Value::Number(s.chars().count() as f64)
                } else if let Ok(index) = key.parse::<usize>() {
                    s.chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::Str(c.to_string()))
                } else if STRING_METHODS.contains(&key) {
                    method()
                } else {
                    Value::Undefined
                }
            }
            Value::Object(map) => match map.borrow().get(key) {
                Some(value) => value.clone(),
                None if key == "hasOwnProperty" || key == "toString" => method(),
                None => Value::Undefined,
            },
            Value::Host(handle) => self.runtime.property(handle, key).unwrap_or_else(method),
            Value::Builtin(Builtin::Test) => match key {
                "describe" => Value::Builtin(Builtin::Describe),
                "beforeEach" => Value::Builtin(Builtin::BeforeEach),
                "only" | "slow" => Value::Builtin(Builtin::Test),
                "skip" | "fixme" => Value::Builtin(Builtin::Skip),
                _ => Value::Undefined,
            },
            Value::Builtin(Builtin::Describe) => match key {
                "only" | "serial" | "parallel" => Value::Builtin(Builtin::Describe),
                "skip" => Value::Builtin(Builtin::Skip),
                _ => Value::Undefined,
            },
            Value::Builtin(Builtin::Expect) if key == "soft" || key == "poll" => Value::Builtin(Builtin::Expect),
            Value::Number(_) if key == "toFixed" || key == "toString" => method(),
            _ => Value::Undefined,
        })
    }
}

fn set_property(object: &Value, key: &str, value: Value) -> std::result::Result<(), Thrown> {
    match object {
        Value::Undefined | Value::Null => Err(Thrown::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            object, key
        ))),
        Value::Object(map) => {
            map.borrow_mut().insert(key.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            if let Ok(index) = key.parse::<usize>() {
                let mut items = items.borrow_mut();
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Items of an iterable value
pub(crate) fn iterate(value: &Value) -> std::result::Result<Vec<Value>, Thrown> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(Thrown::type_error(format!("{} is not iterable", other))),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> std::result::Result<Value, Thrown> {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let compare = |f: fn(std::cmp::Ordering) -> bool| match (left, right) {
        (Value::Str(a), Value::Str(b)) => Value::Bool(f(a.cmp(b))),
        _ => {
            let (a, b) = (left.to_number(), right.to_number());
            Value::Bool(a.partial_cmp(&b).map_or(false, f))
        }
    };
    Ok(match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            (l, r) if is_stringy(l) || is_stringy(r) => Value::Str(format!("{}{}", l, r)),
            _ => num(|a, b| a + b),
        },
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Rem => num(|a, b| a % b),
        BinaryOp::Pow => num(f64::powf),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => compare(|o| o.is_lt()),
        BinaryOp::Gt => compare(|o| o.is_gt()),
        BinaryOp::LtEq => compare(|o| o.is_le()),
        BinaryOp::GtEq => compare(|o| o.is_ge()),
        BinaryOp::In => match right {
            Value::Object(map) => Value::Bool(map.borrow().contains_key(&left.to_key())),
            Value::Array(items) => Value::Bool(
                left.to_key()
                    .parse::<usize>()
                    .map_or(left.to_key() == "length", |i| i < items.borrow().len()),
            ),
            other => {
                return Err(Thrown::type_error(format!(
                    "Cannot use 'in' operator to search for '{}' in {}",
                    left, other
                )))
            }
        },
        BinaryOp::InstanceOf => match (left.field("name"), right) {
            (Some(name), Value::Builtin(Builtin::ErrorCtor(kind))) => {
                Value::Bool(*kind == "Error" || name.as_str() == Some(*kind))
            }
            (_, Value::Builtin(Builtin::ArrayIsArray)) => Value::Bool(matches!(left, Value::Array(_))),
            _ => Value::Bool(false),
        },
    })
}

fn is_stringy(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::Array(_) | Value::Object(_))
}

fn into_error(thrown: Thrown) -> Error {
    Error::Execution(thrown.message())
}

