//! Runtime classes and instances of user-defined classes.
//!
//! `Class` is the runtime type of every value: a name, ordered bases and a member table.
//! `Instance` is a value created by calling a user class.
//!
//! # Member lookup
//!
//! - Own members are checked first, then the linearized bases (depth-first, left to
//!   right, with shared ancestors such as `object` moved behind their last subclass)
//! - A `Blocked` member hides an inherited one, e.g. `list.__hash__`
//! - Protocol operations are ordinary members with double-underscore names, so a class
//!   supports an operation iff lookup of its name succeeds

use std::{
    cell::{Ref, RefCell},
    fmt,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use indexmap::IndexMap;

use crate::{
    exception::{ExcType, RunResult},
    value::Value,
};

/// A class member callable: receives the receiver and the positional arguments.
pub type Method = Arc<dyn Fn(&Value, &[Value]) -> RunResult<Value> + Send + Sync>;

/// An entry in a class member table.
#[derive(Clone)]
pub enum Member {
    /// Called with the receiver; attribute access yields it bound to the receiver.
    Method(Method),
    /// Computed attribute: attribute access calls the getter with the receiver.
    Property(Method),
    /// Hides a member inherited from a base class.
    Blocked,
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(_) => f.write_str("Method"),
            Self::Property(_) => f.write_str("Property"),
            Self::Blocked => f.write_str("Blocked"),
        }
    }
}

/// Process-unique class identifier, stable for the lifetime of the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    fn next() -> Self {
        static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A runtime class.
pub struct Class {
    id: ClassId,
    name: String,
    bases: Vec<Arc<Class>>,
    /// Linearized ancestors, excluding the class itself.
    mro: Vec<Arc<Class>>,
    members: IndexMap<String, Member>,
    /// Instance attribute names the class declares (its data interface).
    attributes: Vec<String>,
    /// Built-in classes cannot be instantiated by calling them.
    native: bool,
}

impl Class {
    /// Starts building a class; classes without explicit bases derive from `object`.
    #[must_use]
    pub fn builder(name: &str) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    #[must_use]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bases(&self) -> &[Arc<Self>] {
        &self.bases
    }

    /// Linearized ancestors, nearest first, excluding the class itself.
    #[must_use]
    pub fn mro(&self) -> &[Arc<Self>] {
        &self.mro
    }

    /// Declared instance attribute names.
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Members defined directly on this class, in definition order.
    pub fn own_members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Finds the first definition of `name` along the MRO, including `Blocked` entries.
    fn find(&self, name: &str) -> Option<&Member> {
        self.members
            .get(name)
            .or_else(|| self.mro.iter().find_map(|base| base.members.get(name)))
    }

    /// Resolves `name` to a callable or computed member; blocked names resolve to nothing.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Member> {
        self.find(name).filter(|member| !matches!(member, Member::Blocked))
    }

    /// Resolves `name` to a method, skipping properties.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Method> {
        match self.lookup(name) {
            Some(Member::Method(method)) => Some(Arc::clone(method)),
            _ => None,
        }
    }

    #[must_use]
    pub fn has_member(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Every member name resolvable on this class, sorted.
    #[must_use]
    pub fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::iter::once(self)
            .chain(self.mro.iter().map(|base| &**base))
            .flat_map(|class| class.members.keys())
            .filter(|name| self.has_member(name))
            .cloned()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Whether this class is `other` or derives from it.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Self) -> bool {
        self.id == other.id || self.mro.iter().any(|base| base.id == other.id)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("members", &self.members.len())
            .finish_non_exhaustive()
    }
}

/// Builder for user and built-in classes.
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    bases: Vec<Arc<Class>>,
    members: IndexMap<String, Member>,
    attributes: Vec<String>,
    inherit_object: bool,
    native: bool,
}

impl ClassBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            bases: Vec::new(),
            members: IndexMap::new(),
            attributes: Vec::new(),
            inherit_object: true,
            native: false,
        }
    }

    /// Appends a base class. Bases are searched in the order they were added.
    #[must_use]
    pub fn base(mut self, base: &Arc<Class>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    /// Defines a method; a later definition of the same name replaces the earlier one.
    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        func: impl Fn(&Value, &[Value]) -> RunResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.members.insert(name.to_owned(), Member::Method(Arc::new(func)));
        self
    }

    /// Defines a method from an already shared callable.
    #[must_use]
    pub fn method_arc(mut self, name: &str, func: Method) -> Self {
        self.members.insert(name.to_owned(), Member::Method(func));
        self
    }

    /// Defines a computed attribute.
    #[must_use]
    pub fn property(mut self, name: &str, getter: impl Fn(&Value) -> RunResult<Value> + Send + Sync + 'static) -> Self {
        let getter: Method = Arc::new(move |this: &Value, _args: &[Value]| getter(this));
        self.members.insert(name.to_owned(), Member::Property(getter));
        self
    }

    /// Hides an inherited member.
    #[must_use]
    pub fn block(mut self, name: &str) -> Self {
        self.members.insert(name.to_owned(), Member::Blocked);
        self
    }

    /// Declares an instance attribute name as part of the class's interface.
    #[must_use]
    pub fn attribute(mut self, name: &str) -> Self {
        self.attributes.push(name.to_owned());
        self
    }

    /// Builds a root class that does not implicitly derive from `object`.
    #[must_use]
    pub(crate) fn without_bases(mut self) -> Self {
        self.inherit_object = false;
        self
    }

    /// Marks the class as built-in: calling it raises instead of instantiating.
    #[must_use]
    pub(crate) fn native(mut self) -> Self {
        self.native = true;
        self
    }

    #[must_use]
    pub fn build(mut self) -> Arc<Class> {
        if self.bases.is_empty() && self.inherit_object {
            self.bases.push(super::object_type());
        }
        let mro = linearize(&self.bases);
        Arc::new(Class {
            id: ClassId::next(),
            name: self.name,
            bases: self.bases,
            mro,
            members: self.members,
            attributes: self.attributes,
            native: self.native,
        })
    }
}

/// Depth-first, left-to-right walk keeping each class at its last position, which puts
/// shared ancestors behind every class that derives from them.
fn linearize(bases: &[Arc<Class>]) -> Vec<Arc<Class>> {
    let mut walk: Vec<Arc<Class>> = Vec::new();
    for base in bases {
        walk.push(Arc::clone(base));
        walk.extend(base.mro.iter().cloned());
    }
    let mut mro: Vec<Arc<Class>> = Vec::with_capacity(walk.len());
    for (i, class) in walk.iter().enumerate() {
        let seen_later = walk[i + 1..].iter().any(|later| later.id == class.id);
        if !seen_later {
            mro.push(Arc::clone(class));
        }
    }
    mro
}

/// An instance of a user-defined class with its own attribute namespace.
pub struct Instance {
    class: Arc<Class>,
    attrs: RefCell<IndexMap<String, Value>>,
}

impl Instance {
    #[must_use]
    pub fn new(class: &Arc<Class>) -> Self {
        Self {
            class: Arc::clone(class),
            attrs: RefCell::new(IndexMap::new()),
        }
    }

    /// Creates an instance value with preset attributes, without running `__init__`.
    #[must_use]
    pub fn create<'a>(class: &Arc<Class>, attrs: impl IntoIterator<Item = (&'a str, Value)>) -> Value {
        let instance = Self::new(class);
        instance
            .attrs
            .borrow_mut()
            .extend(attrs.into_iter().map(|(k, v)| (k.to_owned(), v)));
        Value::Instance(Rc::new(instance))
    }

    #[must_use]
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Borrow of the attribute namespace; released before any call back into user code.
    #[must_use]
    pub fn attrs(&self) -> Ref<'_, IndexMap<String, Value>> {
        self.attrs.borrow()
    }

    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    pub fn set_attr(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_owned(), value);
    }

    /// Removes an attribute, raising `AttributeError` when it is absent.
    pub fn del_attr(&self, name: &str) -> RunResult<()> {
        match self.attrs.borrow_mut().shift_remove(name) {
            Some(_) => Ok(()),
            None => Err(ExcType::attribute_error(self.class.name(), name)),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("class", &self.class.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_this: &Value, _args: &[Value]) -> RunResult<Value> {
        Ok(Value::None)
    }

    #[test]
    fn lookup_walks_bases_and_respects_blocking() {
        let base = Class::builder("Base").method("greet", noop).method("__len__", noop).build();
        let child = Class::builder("Child").base(&base).block("__len__").build();
        assert!(child.has_member("greet"));
        assert!(!child.has_member("__len__"));
        assert!(child.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&child));
    }

    #[test]
    fn diamond_puts_shared_ancestor_last() {
        let a = Class::builder("A").build();
        let b = Class::builder("B").build();
        let c = Class::builder("C").base(&a).base(&b).build();
        let names: Vec<&str> = c.mro().iter().map(|class| class.name()).collect();
        assert_eq!(names, vec!["A", "B", "object"]);
    }

    #[test]
    fn member_names_are_sorted_and_unique() {
        let base = Class::builder("Base").method("b", noop).method("a", noop).build();
        let child = Class::builder("Child").base(&base).method("a", noop).build();
        let names = child.member_names();
        let a_pos = names.iter().position(|n| n == "a").unwrap();
        let b_pos = names.iter().position(|n| n == "b").unwrap();
        assert!(a_pos < b_pos);
        assert_eq!(names.iter().filter(|n| *n == "a").count(), 1);
    }
}
