//! Tree-walking evaluator.
//!
//! Identifiers resolve through the local scope chain, then the render
//! helpers, then the owning [`Instance`] (computed, data, methods), then the
//! built-in globals. An unresolved name warns and reads as `undefined`.
//!
//! Function expressions evaluate to closures that capture their scope and a
//! weak handle to the instance, so a handler stored in a render tree never
//! keeps its instance alive.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::ast::*;
use super::builtins;
use crate::error::EvalError;
use crate::reactive::{Instance, Record, Runtime, Sequence, WeakInstance};
use crate::render::{call_helper, is_helper};
use crate::value::{parse_index, Callable, Value};

/// A lexical scope: function parameters and `var` declarations.
#[derive(Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    pub fn declare(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }
}

enum Flow {
    Normal,
    Return(Value),
}

/// An assignable location.
enum Place {
    Name(String),
    Member(Value, String),
}

/// Run a statement list against `vm` and return the value of its `return`,
/// or `undefined`.
pub fn run_program(program: &Program, vm: &Instance) -> Result<Value, EvalError> {
    let scope = Scope::root();
    match Evaluator::new(vm).exec_block(&program.body, &scope)? {
        Flow::Return(value) => Ok(value),
        Flow::Normal => Ok(Value::Undefined),
    }
}

/// Evaluate one expression in `scope`.
pub fn evaluate(expr: &Expr, vm: &Instance, scope: &Rc<Scope>) -> Result<Value, EvalError> {
    Evaluator::new(vm).eval(expr, scope)
}

struct Evaluator<'a> {
    vm: &'a Instance,
}

impl<'a> Evaluator<'a> {
    fn new(vm: &'a Instance) -> Self {
        Self { vm }
    }

    fn exec_block(&self, body: &[Stmt], scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        for stmt in body {
            if let Flow::Return(value) = self.exec(stmt, scope)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&self, stmt: &Stmt, scope: &Rc<Scope>) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.exec(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, scope)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(body) => self.exec_block(body, &Scope::child(scope)),
            Stmt::Var(decls) => {
                for (name, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    scope.declare(name, value);
                }
                Ok(Flow::Normal)
            }
            Stmt::Empty => Ok(Flow::Normal),
        }
    }

    fn eval(&self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(lit) => Ok(literal(lit)),
            Expr::Ident(name) => self.lookup(name, scope),
            Expr::This => Err(EvalError::Unsupported("'this' outside of with(this)".into())),
            Expr::Array(items) => Ok(Value::Sequence(Sequence::from_vec(
                self.eval_args(items, scope)?,
            ))),
            Expr::Object(props) => {
                let mut pairs = Vec::with_capacity(props.len());
                for (key, value) in props {
                    let key = match key {
                        PropKey::Static(name) => name.clone(),
                        PropKey::Computed(expr) => self.eval(expr, scope)?.to_js_string(),
                        PropKey::Spread => {
                            spread_entries(self.eval(value, scope)?, &mut pairs);
                            continue;
                        }
                    };
                    pairs.push((key, self.eval(value, scope)?));
                }
                Ok(Value::Record(pairs.into_iter().collect::<Record>()))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let target = self.eval(object, scope)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let key = self.eval(property, scope)?.to_js_string();
                target.get_member(&key)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, scope),
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, scope)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::from(value.type_of()),
                    UnaryOp::Void => Value::Undefined,
                })
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.place(target, scope)?;
                let old = self.read(&place, scope)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write(&place, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                binary(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            Expr::Assign { op, target, value } => {
                let place = self.place(target, scope)?;
                let rhs = self.eval(value, scope)?;
                let result = match op.binary() {
                    None => rhs,
                    Some(bin) => binary(bin, &self.read(&place, scope)?, &rhs)?,
                };
                self.write(&place, result.clone(), scope)?;
                Ok(result)
            }
            Expr::Function(def) => Ok(Value::Function(Rc::new(Closure {
                def: Arc::clone(def),
                scope: scope.clone(),
                vm: self.vm.downgrade(),
            }))),
            Expr::Sequence(items) => {
                let mut last = Value::Undefined;
                for item in items {
                    last = self.eval(item, scope)?;
                }
                Ok(last)
            }
            Expr::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        out.push_str(&self.eval(expr, scope)?.to_js_string());
                    }
                }
                Ok(Value::from(out))
            }
            Expr::Spread(_) => Err(EvalError::Unsupported(
                "spread outside of a list or argument list".into(),
            )),
        }
    }

    fn lookup(&self, name: &str, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        if is_helper(name) {
            return Ok(Value::Function(Rc::new(BoundHelper {
                name: name.to_string(),
                vm: self.vm.downgrade(),
            })));
        }
        if let Some(value) = self.vm.lookup(name)? {
            return Ok(value);
        }
        if let Some(value) = builtins::global(name) {
            return Ok(value);
        }
        Runtime::warn(&format!(
            "Property or method \"{name}\" is not defined on the instance but referenced during render. Make sure that this property is reactive, by declaring it in the data option."
        ));
        Ok(Value::Undefined)
    }

    fn eval_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        optional: bool,
        scope: &Rc<Scope>,
    ) -> Result<Value, EvalError> {
        if let Expr::Member {
            object,
            property,
            optional: member_optional,
        } = callee
        {
            let target = self.eval(object, scope)?;
            if *member_optional && target.is_nullish() {
                return Ok(Value::Undefined);
            }
            let key = self.eval(property, scope)?.to_js_string();
            let args = self.eval_args(args, scope)?;
            return call_method(&target, &key, &args, optional, || describe(callee));
        }

        let function = self.eval(callee, scope)?;
        if optional && function.is_nullish() {
            return Ok(Value::Undefined);
        }
        let args = self.eval_args(args, scope)?;
        match &function {
            Value::Function(f) => f.call(&args),
            _ => Err(EvalError::NotCallable(describe(callee))),
        }
    }

    /// Evaluate list items or call arguments, expanding `...spread`.
    fn eval_args(&self, args: &[Expr], scope: &Rc<Scope>) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expr::Spread(inner) => spread_items(self.eval(inner, scope)?, &mut values)?,
                _ => values.push(self.eval(arg, scope)?),
            }
        }
        Ok(values)
    }

    fn bind(&self, param: &Param, arg: Value, scope: &Rc<Scope>) -> Result<(), EvalError> {
        match param {
            Param::Ident(name) | Param::Rest(name) => scope.declare(name, arg),
            Param::Object(pairs) => {
                for (key, binding) in pairs {
                    scope.declare(binding, arg.get_member(key)?);
                }
            }
            Param::Array(names) => {
                for (j, name) in names.iter().enumerate() {
                    scope.declare(name, arg.get_member(&j.to_string())?);
                }
            }
            Param::Default(inner, default) => {
                let arg = if arg.is_undefined() {
                    self.eval(default, scope)?
                } else {
                    arg
                };
                self.bind(inner, arg, scope)?;
            }
        }
        Ok(())
    }

    fn place(&self, target: &Expr, scope: &Rc<Scope>) -> Result<Place, EvalError> {
        match target {
            Expr::Ident(name) => Ok(Place::Name(name.clone())),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                let key = self.eval(property, scope)?.to_js_string();
                Ok(Place::Member(object, key))
            }
            other => Err(EvalError::InvalidAssignment(describe(other))),
        }
    }

    fn read(&self, place: &Place, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        match place {
            Place::Name(name) => self.lookup(name, scope),
            Place::Member(object, key) => object.get_member(key),
        }
    }

    fn write(&self, place: &Place, value: Value, scope: &Rc<Scope>) -> Result<(), EvalError> {
        match place {
            Place::Name(name) => {
                if !scope.assign(name, value.clone()) {
                    self.vm.set(name, value);
                }
                Ok(())
            }
            Place::Member(object, key) => match object {
                Value::Record(record) => {
                    record.set(key, value);
                    Ok(())
                }
                Value::Sequence(seq) => {
                    if let Some(index) = parse_index(key) {
                        seq.write_silently(index, value);
                    }
                    Ok(())
                }
                Value::Undefined | Value::Null => Err(EvalError::NullishAccess {
                    property: key.clone(),
                    target: if object.is_undefined() { "undefined" } else { "null" },
                }),
                _ => Ok(()),
            },
        }
    }
}

/// Append the items `...value` expands to in a list.
fn spread_items(value: Value, out: &mut Vec<Value>) -> Result<(), EvalError> {
    match value {
        Value::Sequence(seq) => out.extend(seq.to_vec()),
        Value::String(s) => out.extend(s.chars().map(|c| Value::from(c.to_string()))),
        other => {
            return Err(EvalError::thrown(format!(
                "{} is not iterable",
                other.to_js_string()
            )))
        }
    }
    Ok(())
}

/// Append the own entries `...value` contributes to an object literal.
/// Anything but a record or a list contributes nothing.
fn spread_entries(value: Value, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Record(record) => {
            for key in record.keys() {
                let value = record.get(&key);
                out.push((key, value));
            }
        }
        Value::Sequence(seq) => {
            out.extend(seq.to_vec().into_iter().enumerate().map(|(i, v)| (i.to_string(), v)));
        }
        _ => {}
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::String(Rc::from(&**s)),
    }
}

/// Dotted source text of a callee, for error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => match &**property {
            Expr::Literal(Literal::Str(key)) => format!("{}.{}", describe(object), key),
            _ => format!("{}[...]", describe(object)),
        },
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

fn call_method(
    target: &Value,
    key: &str,
    args: &[Value],
    optional: bool,
    describe: impl FnOnce() -> String,
) -> Result<Value, EvalError> {
    let builtin = match target {
        Value::Sequence(seq) => builtins::sequence_method(seq, key, args),
        Value::String(s) => builtins::string_method(s, key, args),
        Value::Number(n) => builtins::number_method(*n, key, args),
        Value::Record(record) if key == "hasOwnProperty" && !record.has(key) => {
            let name = args.first().map(Value::to_js_string).unwrap_or_default();
            Some(Ok(Value::Bool(record.has(&name))))
        }
        Value::Function(f) if key == "call" || key == "apply" => {
            let rest = if key == "call" {
                args.iter().skip(1).cloned().collect()
            } else {
                match args.get(1) {
                    Some(Value::Sequence(seq)) => seq.to_vec(),
                    _ => Vec::new(),
                }
            };
            Some(f.call(&rest))
        }
        _ => None,
    };
    if let Some(result) = builtin {
        return result;
    }

    let method = target.get_member(key)?;
    match &method {
        Value::Function(f) => f.call(args),
        Value::Undefined | Value::Null if optional => Ok(Value::Undefined),
        _ => Err(EvalError::NotCallable(describe())),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let value = match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::String(_)) || v.is_object();
            if stringy(left) || stringy(right) || matches!(left, Value::Function(_)) {
                Value::from(format!("{}{}", left.to_js_string(), right.to_js_string()))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Exp => Value::Number(left.to_number().powf(right.to_number())),
        BinaryOp::Eq => Value::Bool(left.abstract_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.abstract_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            Value::Bool(compare(op, left, right))
        }
        BinaryOp::In => {
            let key = left.to_js_string();
            match right {
                Value::Record(record) => Value::Bool(record.has(&key)),
                Value::Sequence(seq) => Value::Bool(
                    key == "length" || parse_index(&key).is_some_and(|i| i < seq.len()),
                ),
                other => {
                    return Err(EvalError::thrown(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        other.to_js_string()
                    )))
                }
            }
        }
    };
    Ok(value)
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::LtEq => a <= b,
            _ => a >= b,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Gt => a > b,
        BinaryOp::LtEq => a <= b,
        _ => a >= b,
    }
}

/// A function value created by a function expression.
struct Closure {
    def: Arc<FunctionDef>,
    scope: Rc<Scope>,
    vm: WeakInstance,
}

impl Callable for Closure {
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let vm = self.vm.upgrade().ok_or(EvalError::InstanceGone)?;
        let scope = Scope::child(&self.scope);
        scope.declare("arguments", Value::Sequence(Sequence::from_vec(args.to_vec())));
        let evaluator = Evaluator::new(&vm);
        for (i, param) in self.def.params.iter().enumerate() {
            let arg = match param {
                Param::Rest(_) => {
                    let rest = args.get(i..).unwrap_or_default().to_vec();
                    Value::Sequence(Sequence::from_vec(rest))
                }
                _ => args.get(i).cloned().unwrap_or_default(),
            };
            evaluator.bind(param, arg, &scope)?;
        }

        match &self.def.body {
            FunctionBody::Expr(expr) => evaluator.eval(expr, &scope),
            FunctionBody::Block(body) => match evaluator.exec_block(body, &scope)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }
}

/// A render helper bound to the instance it was looked up on.
struct BoundHelper {
    name: String,
    vm: WeakInstance,
}

impl Callable for BoundHelper {
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let vm = self.vm.upgrade().ok_or(EvalError::InstanceGone)?;
        call_helper(&vm, &self.name, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
