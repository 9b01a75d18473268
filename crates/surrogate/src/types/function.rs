//! Host functions and bound methods.

use std::{fmt, rc::Rc};

use super::class::Method;
use crate::{exception::RunResult, value::Value};

type HostFn = Rc<dyn Fn(&[Value]) -> RunResult<Value>>;

/// A callable host closure.
pub struct Function {
    name: String,
    func: HostFn,
}

impl Function {
    pub fn new(name: &str, func: impl Fn(&[Value]) -> RunResult<Value> + 'static) -> Self {
        Self {
            name: name.to_owned(),
            func: Rc::new(func),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> RunResult<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// A class member bound to the receiver it was looked up on.
pub struct BoundMethod {
    receiver: Value,
    name: String,
    func: Method,
}

impl BoundMethod {
    #[must_use]
    pub fn new(receiver: Value, name: &str, func: Method) -> Self {
        Self {
            receiver,
            name: name.to_owned(),
            func,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn receiver(&self) -> &Value {
        &self.receiver
    }

    pub fn call(&self, args: &[Value]) -> RunResult<Value> {
        (self.func)(&self.receiver, args)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<bound method {}>", self.name)
    }
}
