use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::interpreter::Interpreter;
use crate::native::NativeError;
use crate::stmt::FunctionDecl;

/// Signature of a host-provided native function.  Natives receive the
/// interpreter so the system primitives can reach its output sink.
pub type NativeFn = fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, NativeError>;

/// A runtime value.
///
/// `Nil`/`Bool`/`Number`/`String` compare structurally; every other variant
/// is a reference value and compares by identity.
#[derive(Clone)]
pub enum Value {
    Nil,

    Bool(bool),

    Number(f64),

    String(String),

    /// Host-provided primitive installed into the global environment.
    NativeFunction {
        name: &'static str,
        arity: usize,
        func: NativeFn,
    },

    /// Interpreted function or bound method.
    Function(Rc<YellowFunction>),

    Class(Rc<YellowClass>),

    Instance(Rc<RefCell<YellowInstance>>),

    /// Opaque ordered sequence, manipulated through the `__list__*` natives.
    List(Rc<RefCell<Vec<Value>>>),

    /// Opaque key-ordered mapping with string keys, manipulated through the
    /// `__map__*` natives.
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction { name: a, .. }, Value::NativeFunction { name: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Number(n) => {
                if n.fract() == 0.0 {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::String(s) => write!(f, "{}", s),

            Value::NativeFunction { name, .. } => write!(f, "<native fn {}>", name),

            Value::Function(func) => write!(f, "<fn {}>", func.declaration.name.lexeme),

            Value::Class(class) => write!(f, "<class {}>", class.name),

            Value::Instance(instance) => {
                write!(f, "<instance <class {}>>", instance.borrow().class.name)
            }

            Value::List(list) => {
                write!(f, "[")?;
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }

            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, item)) in map.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, item)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// Debug delegates to Display: deriving would recurse through closure
// environments, which contain the functions that hold them.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// An interpreted function value: a shared declaration plus the environment
/// captured at its declaration point.
pub struct YellowFunction {
    pub declaration: Rc<FunctionDecl>,

    /// Environment active when the function was declared; calls build their
    /// frame as a child of this, never of the caller's environment.
    pub closure: Rc<RefCell<Environment>>,

    /// Set exactly for methods named `init`; changes return semantics.
    pub is_initializer: bool,
}

impl YellowFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method closing over a fresh one-slot frame that
    /// binds the receiver as `this`.  The resolver's fixed distance for
    /// `this` works uniformly because the extra frame always sits directly
    /// inside the method's closure.
    pub fn bind(&self, instance: Rc<RefCell<YellowInstance>>) -> YellowFunction {
        let mut env = Environment::with_enclosing(self.closure.clone());
        env.define("this", Value::Instance(instance));

        YellowFunction {
            declaration: self.declaration.clone(),
            closure: Rc::new(RefCell::new(env)),
            is_initializer: self.is_initializer,
        }
    }
}

/// A class value: method table plus optional superclass.  Immutable after
/// declaration.
pub struct YellowClass {
    pub name: String,
    pub methods: HashMap<String, Rc<YellowFunction>>,
    pub superclass: Option<Rc<YellowClass>>,
}

impl YellowClass {
    /// Method lookup, walking the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<YellowFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Arity of the class as a callable: its `init` method's arity, or zero.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

/// An instance: a class reference plus mutable fields created on first
/// assignment.
pub struct YellowInstance {
    pub class: Rc<YellowClass>,
    fields: HashMap<String, Value>,
}

impl YellowInstance {
    pub fn new(class: Rc<YellowClass>) -> Self {
        YellowInstance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Read an own field.  Method fallback lives in the interpreter, which
    /// holds the `Rc` needed to bind the receiver.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Create or overwrite an own field.  Fields never shadow methods for
    /// writes, but a field shadows an inherited method name on reads.
    pub fn set_field(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
