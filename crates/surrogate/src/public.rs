//! Public views: masking proxies that expose only the members of chosen interfaces.
//!
//! `public_view(value, ifaces)` masks every member of the value's api that no interface
//! names. Everything an interface names stays reachable, and everything else reports
//! as missing.

use indexmap::IndexSet;

use crate::{
    exception::RunResult,
    proxy::{ProxyFactory, state},
    types::Class,
    value::Value,
};

/// A named set of member names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    members: IndexSet<String>,
}

impl Interface {
    pub fn new<S: Into<String>>(name: &str, members: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.to_owned(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    /// The interface of everything `class` provides: its [`api`].
    #[must_use]
    pub fn from_class(class: &Class) -> Self {
        Self {
            name: class.name().to_owned(),
            members: api(class),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn members(&self) -> &IndexSet<String> {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }
}

/// Every member name resolvable on `class`, ancestors included and blocked names
/// excluded, plus its declared instance attributes.
#[must_use]
pub fn api(class: &Class) -> IndexSet<String> {
    let mut names: IndexSet<String> = class.member_names().into_iter().collect();
    names.extend(class.attributes().iter().cloned());
    names
}

/// The api of a value: its class's [`api`] plus the attributes set on the instance.
/// For a proxy this is the api of the value it wraps plus the names of its overrides.
pub fn api_of(value: &Value) -> RunResult<IndexSet<String>> {
    match value {
        Value::Proxy(inst) => {
            let mut names = api_of(inst.original())?;
            names.extend(state(value)?.overrides().keys().cloned());
            Ok(names)
        }
        Value::Instance(inst) => {
            let mut names = api(inst.class());
            names.extend(inst.attrs().keys().cloned());
            Ok(names)
        }
        other => Ok(api(&other.class())),
    }
}

/// The members of `value`'s api that none of `ifaces` names.
pub fn private_api(value: &Value, ifaces: &[Interface]) -> RunResult<IndexSet<String>> {
    let mut names = api_of(value)?;
    names.retain(|name| !ifaces.iter().any(|iface| iface.contains(name)));
    Ok(names)
}

impl ProxyFactory {
    /// Wraps `value` in a masking proxy that hides everything outside `ifaces`.
    pub fn public_view(&self, value: Value, ifaces: &[Interface]) -> RunResult<Value> {
        let hidden = private_api(&value, ifaces)?;
        Ok(self.mask_proxy(value, hidden))
    }
}

/// [`ProxyFactory::public_view`] on the global factory.
pub fn public_view(value: Value, ifaces: &[Interface]) -> RunResult<Value> {
    ProxyFactory::global().public_view(value, ifaces)
}
