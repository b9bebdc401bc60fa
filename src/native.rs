//! Host-provided primitives exposed to Yellow programs as callable values.
//!
//! The bridge is a fixed set of plain function pointers installed into the
//! global environment at interpreter startup: console I/O (`__print__`,
//! `__println__`, `__input__`), a wall clock (`clock`), and the list/map
//! primitives (`__list__*`, `__map__*`) operating on the opaque sequence and
//! mapping values.
//!
//! Natives fail with [`NativeError`], a kind of their own so bridge failures
//! are distinguishable from evaluator bugs; the call site converts them into
//! ordinary runtime errors carrying the call's line, so scripts observe one
//! uniform error shape.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use thiserror::Error;

use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::value::{NativeFn, Value};

/// Failure raised by a native operation: receiver type mismatch, index out
/// of range, non-string map key, or a host I/O fault.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
    fn new(msg: impl Into<String>) -> Self {
        NativeError(msg.into())
    }
}

type NativeResult = std::result::Result<Value, NativeError>;

/// Install every native into the global environment.
pub fn install(globals: &Rc<RefCell<Environment>>) {
    let mut globals = globals.borrow_mut();

    let mut define = |name: &'static str, arity: usize, func: NativeFn| {
        debug!("Defining native function '{}'", name);

        globals.define(name, Value::NativeFunction { name, arity, func });
    };

    define("__print__", 1, native_print);
    define("__println__", 1, native_println);
    define("__input__", 1, native_input);
    define("clock", 0, native_clock);

    define("__list__", 0, list_new);
    define("__list__append__", 2, list_append);
    define("__list__get__", 2, list_get);
    define("__list__set__", 3, list_set);
    define("__list__delete__", 2, list_delete);
    define("__list__len__", 1, list_len);

    define("__map__", 0, map_new);
    define("__map__set__", 3, map_set);
    define("__map__get__", 2, map_get);
    define("__map__delete__", 2, map_delete);
    define("__map__len__", 1, map_len);
}

// ───────────────────────────── system natives ───────────────────────────────

fn native_print(interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    write!(interpreter.out(), "{}", args[0]).map_err(write_error)?;

    Ok(Value::Nil)
}

fn native_println(interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    writeln!(interpreter.out(), "{}", args[0]).map_err(write_error)?;

    Ok(Value::Nil)
}

/// Write the prompt, then read one line from standard input.  End-of-input
/// yields `nil`; otherwise the line without its trailing newline.
fn native_input(interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let out = interpreter.out();
    write!(out, "{}", args[0]).map_err(write_error)?;
    out.flush().map_err(write_error)?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| NativeError::new(format!("Invalid input operation: {}", e)))?;

    if read == 0 {
        return Ok(Value::Nil);
    }

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }

    Ok(Value::String(line))
}

fn native_clock(_interpreter: &mut Interpreter, _args: &[Value]) -> NativeResult {
    let timestamp: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| NativeError::new(format!("Clock error: {}", e)))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

fn write_error(e: io::Error) -> NativeError {
    NativeError::new(format!("Invalid write operation: {}", e))
}

// ────────────────────────────── list natives ────────────────────────────────

fn list_new(_interpreter: &mut Interpreter, _args: &[Value]) -> NativeResult {
    Ok(Value::List(Rc::new(RefCell::new(Vec::new()))))
}

fn list_append(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let list = as_list(&args[0], "append")?;
    list.borrow_mut().push(args[1].clone());

    Ok(Value::Bool(true))
}

fn list_get(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let list = as_list(&args[0], "get")?;
    let list = list.borrow();
    let index = as_index(&args[1], "get", list.len())?;

    Ok(list[index].clone())
}

fn list_set(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let list = as_list(&args[0], "set")?;
    let mut list = list.borrow_mut();
    let index = as_index(&args[1], "set", list.len())?;

    // Returns the element previously at `index`.
    Ok(std::mem::replace(&mut list[index], args[2].clone()))
}

fn list_delete(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let list = as_list(&args[0], "delete")?;
    let mut list = list.borrow_mut();
    let index = as_index(&args[1], "delete", list.len())?;

    Ok(list.remove(index))
}

fn list_len(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let list = as_list(&args[0], "len")?;
    let len = list.borrow().len();

    Ok(Value::Number(len as f64))
}

fn as_list(value: &Value, op: &str) -> std::result::Result<Rc<RefCell<Vec<Value>>>, NativeError> {
    match value {
        Value::List(list) => Ok(list.clone()),

        _ => Err(NativeError::new(format!(
            "Invalid list {op} operation: Not a list object"
        ))),
    }
}

/// Validate a list index: must be a number, truncated toward zero, within
/// `0..len`.
fn as_index(value: &Value, op: &str, len: usize) -> std::result::Result<usize, NativeError> {
    let n: f64 = match value {
        Value::Number(n) => *n,

        _ => {
            return Err(NativeError::new(format!(
                "Invalid list {op} operation: Index must be a number"
            )));
        }
    };

    let index = n as i64;
    if index < 0 || index as usize >= len {
        return Err(NativeError::new(format!(
            "Invalid list {op} operation: index out of bounds"
        )));
    }

    Ok(index as usize)
}

// ────────────────────────────── map natives ─────────────────────────────────

fn map_new(_interpreter: &mut Interpreter, _args: &[Value]) -> NativeResult {
    Ok(Value::Map(Rc::new(RefCell::new(BTreeMap::new()))))
}

fn map_set(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let map = as_map(&args[0], "set")?;
    let key = as_key(&args[1], "set")?;
    map.borrow_mut().insert(key, args[2].clone());

    Ok(Value::Nil)
}

fn map_get(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let map = as_map(&args[0], "get")?;
    let key = as_key(&args[1], "get")?;
    let value = map.borrow().get(&key).cloned();

    // A missing key reads as nil, matching field-free map semantics.
    Ok(value.unwrap_or(Value::Nil))
}

fn map_delete(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let map = as_map(&args[0], "delete")?;
    let key = as_key(&args[1], "delete")?;
    let removed = map.borrow_mut().remove(&key);

    Ok(removed.unwrap_or(Value::Nil))
}

fn map_len(_interpreter: &mut Interpreter, args: &[Value]) -> NativeResult {
    let map = as_map(&args[0], "len")?;
    let len = map.borrow().len();

    Ok(Value::Number(len as f64))
}

fn as_map(
    value: &Value,
    op: &str,
) -> std::result::Result<Rc<RefCell<BTreeMap<String, Value>>>, NativeError> {
    match value {
        Value::Map(map) => Ok(map.clone()),

        _ => Err(NativeError::new(format!(
            "Invalid map {op} operation: Not a map object"
        ))),
    }
}

fn as_key(value: &Value, op: &str) -> std::result::Result<String, NativeError> {
    match value {
        Value::String(key) => Ok(key.clone()),

        _ => Err(NativeError::new(format!(
            "Invalid map {op} operation: Key not a string"
        ))),
    }
}
