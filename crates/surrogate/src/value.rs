use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    sync::Arc,
};

use crate::{
    exception::Exception,
    proxy::ProxyInstance,
    types::{
        self, BoundMethod, Class, Function, Instance, SeqIter,
        dict::{DictKey, DictMap},
    },
};

/// Shared, mutable list storage. Cloning a `Value::List` shares the same list.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable dict storage. Cloning a `Value::Dict` shares the same dict.
pub type DictRef = Rc<RefCell<DictMap>>;

/// A dynamically typed value of the host object model.
///
/// Immediate values (`None`, `Bool`, `Int`, `Float`) are stored inline; everything else is
/// reference counted so that cloning a `Value` shares the referent, the way every name
/// binding shares its object in a dynamic language. Proxies hold wrapped values by
/// cloning them, which therefore never copies the wrapped object.
#[derive(Clone)]
pub enum Value {
    None,
    /// Returned by binary protocol members to signal that the operation is not supported
    /// for the given operand types, so the reflected member on the other operand is tried.
    NotImplemented,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bytes(Rc<[u8]>),
    Tuple(Rc<[Value]>),
    List(ListRef),
    Dict(DictRef),
    /// An instance of a user-defined class.
    Instance(Rc<Instance>),
    /// A host function.
    Function(Rc<Function>),
    /// A class member bound to its receiver, produced by attribute access.
    BoundMethod(Rc<BoundMethod>),
    Class(Arc<Class>),
    Iterator(Rc<SeqIter>),
    Exception(Rc<Exception>),
    /// A proxy instance; every operation on it runs through the dispatch router.
    Proxy(Rc<ProxyInstance>),
}

impl Value {
    /// Creates a string value.
    #[must_use]
    pub fn str(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    /// Creates a bytes value.
    #[must_use]
    pub fn bytes(b: &[u8]) -> Self {
        Self::Bytes(Rc::from(b))
    }

    /// Creates a new list holding `items`.
    #[must_use]
    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn tuple(items: Vec<Self>) -> Self {
        Self::Tuple(Rc::from(items))
    }

    /// Creates a dict from string keys, preserving the given order.
    #[must_use]
    pub fn dict<'a>(pairs: impl IntoIterator<Item = (&'a str, Self)>) -> Self {
        let map: DictMap = pairs
            .into_iter()
            .map(|(k, v)| (DictKey::Str(Rc::from(k)), v))
            .collect();
        Self::Dict(Rc::new(RefCell::new(map)))
    }

    /// Wraps a host closure as a callable function value.
    #[must_use]
    pub fn function(name: &str, func: impl Fn(&[Self]) -> crate::RunResult<Self> + 'static) -> Self {
        Self::Function(Rc::new(Function::new(name, func)))
    }

    /// Creates an iterator over a snapshot of `items`.
    #[must_use]
    pub fn iterator(items: Vec<Self>) -> Self {
        Self::Iterator(Rc::new(SeqIter::new(items)))
    }

    /// Returns the class of this value.
    ///
    /// For a proxy this is the synthesized proxy class, not the wrapped value's class;
    /// `ops::isinstance` and `__class__` report the wrapped class instead.
    #[must_use]
    pub fn class(&self) -> Arc<Class> {
        match self {
            Self::None => types::none_type(),
            Self::NotImplemented => types::not_implemented_type(),
            Self::Bool(_) => types::bool_type(),
            Self::Int(_) => types::int_type(),
            Self::Float(_) => types::float_type(),
            Self::Str(_) => types::str_type(),
            Self::Bytes(_) => types::bytes_type(),
            Self::Tuple(_) => types::tuple_type(),
            Self::List(_) => types::list_type(),
            Self::Dict(_) => types::dict_type(),
            Self::Instance(inst) => Arc::clone(inst.class()),
            Self::Function(_) => types::function_type(),
            Self::BoundMethod(_) => types::method_type(),
            Self::Class(_) => types::type_type(),
            Self::Iterator(_) => types::iterator_type(),
            Self::Exception(_) => types::exception_type(),
            Self::Proxy(inst) => Arc::clone(inst.proxy_type().class()),
        }
    }

    /// Name of this value's class, as used in error messages.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::None => "NoneType".to_owned(),
            Self::Bool(_) => "bool".to_owned(),
            Self::Int(_) => "int".to_owned(),
            Self::Float(_) => "float".to_owned(),
            Self::Str(_) => "str".to_owned(),
            Self::List(_) => "list".to_owned(),
            Self::Instance(inst) => inst.class().name().to_owned(),
            _ => self.class().name().to_owned(),
        }
    }

    /// The innermost non-proxy value: `self` unless it is a proxy, else whatever the
    /// chain of proxies ultimately wraps.
    #[must_use]
    pub fn unwrapped(&self) -> &Self {
        let mut current = self;
        while let Self::Proxy(inst) = current {
            current = inst.original();
        }
        current
    }

    /// Address-like identity of reference values; immediates map to fixed tags.
    #[must_use]
    pub fn identity(&self) -> usize {
        match self {
            Self::None => 0x10,
            Self::NotImplemented => 0x20,
            Self::Bool(b) => 0x30 + usize::from(*b),
            Self::Int(i) => *i as usize,
            Self::Float(f) => f.to_bits() as usize,
            Self::Str(s) => s.as_ptr() as usize,
            Self::Bytes(b) => b.as_ptr() as usize,
            Self::Tuple(t) => t.as_ptr() as usize,
            Self::List(l) => Rc::as_ptr(l) as *const u8 as usize,
            Self::Dict(d) => Rc::as_ptr(d) as *const u8 as usize,
            Self::Instance(i) => Rc::as_ptr(i) as *const u8 as usize,
            Self::Function(f) => Rc::as_ptr(f) as *const u8 as usize,
            Self::BoundMethod(m) => Rc::as_ptr(m) as *const u8 as usize,
            Self::Class(c) => Arc::as_ptr(c) as *const u8 as usize,
            Self::Iterator(i) => Rc::as_ptr(i) as *const u8 as usize,
            Self::Exception(e) => Rc::as_ptr(e) as *const u8 as usize,
            Self::Proxy(p) => Rc::as_ptr(p) as *const u8 as usize,
        }
    }

    /// Identity comparison (`a is b`).
    ///
    /// Reference values are the same object when they share their allocation; immediates
    /// compare by value, mirroring small-int and singleton interning.
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => Rc::ptr_eq(a, b),
            (Self::Bytes(a), Self::Bytes(b)) => Rc::ptr_eq(a, b),
            (Self::Tuple(a), Self::Tuple(b)) => Rc::ptr_eq(a, b),
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b),
            (Self::Instance(a), Self::Instance(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::BoundMethod(a), Self::BoundMethod(b)) => Rc::ptr_eq(a, b),
            (Self::Class(a), Self::Class(b)) => Arc::ptr_eq(a, b),
            (Self::Iterator(a), Self::Iterator(b)) => Rc::ptr_eq(a, b),
            (Self::Exception(a), Self::Exception(b)) => Rc::ptr_eq(a, b),
            (Self::Proxy(a), Self::Proxy(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented)
    }

    #[must_use]
    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    /// Integer view of `Int` and `Bool` values.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of numeric values.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_class(&self) -> Option<&Arc<Class>> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::NotImplemented => f.write_str("NotImplemented"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Bytes(b) => write!(f, "Bytes({b:?})"),
            Self::Tuple(items) => f.debug_tuple("Tuple").field(items).finish(),
            Self::List(items) => match items.try_borrow() {
                Ok(items) => f.debug_tuple("List").field(&*items).finish(),
                Err(_) => f.write_str("List(<borrowed>)"),
            },
            Self::Dict(map) => match map.try_borrow() {
                Ok(map) => f.debug_tuple("Dict").field(&*map).finish(),
                Err(_) => f.write_str("Dict(<borrowed>)"),
            },
            Self::Instance(inst) => write!(f, "Instance({})", inst.class().name()),
            Self::Function(func) => write!(f, "Function({})", func.name()),
            Self::BoundMethod(method) => write!(f, "BoundMethod({})", method.name()),
            Self::Class(class) => write!(f, "Class({})", class.name()),
            Self::Iterator(_) => f.write_str("Iterator"),
            Self::Exception(exc) => write!(f, "Exception({exc})"),
            Self::Proxy(inst) => write!(f, "Proxy({})", inst.id()),
        }
    }
}

/// Structural equality for host-side assertions.
///
/// This is not the protocol `==` (that is `ops::eq`, which dispatches through `__eq__`);
/// proxies and other reference values compare by identity here.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) | (Self::NotImplemented, Self::NotImplemented) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Exception(a), Self::Exception(b)) => a == b,
            _ => self.is(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Self::bytes(b)
    }
}

impl From<Vec<Self>> for Value {
    fn from(items: Vec<Self>) -> Self {
        Self::list(items)
    }
}

impl From<Arc<Class>> for Value {
    fn from(class: Arc<Class>) -> Self {
        Self::Class(class)
    }
}

impl From<Exception> for Value {
    fn from(exc: Exception) -> Self {
        Self::Exception(Rc::new(exc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_lists() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        b.as_list().unwrap().borrow_mut().push(Value::Int(2));
        assert!(a.is(&b));
        assert_eq!(a.as_list().unwrap().borrow().len(), 2);
    }

    #[test]
    fn distinct_lists_are_equal_but_not_identical() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = Value::list(vec![Value::Int(1)]);
        assert!(!a.is(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn type_names_follow_builtin_classes() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::dict([("a", Value::Int(1))]).type_name(), "dict");
        assert_eq!(Value::None.type_name(), "NoneType");
    }
}
