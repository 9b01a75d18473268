//! Protocol operations and capability inspection.
//!
//! Every protocol operation of the object model is a class member with a
//! double-underscore name. [`Op`] enumerates them, [`Category`] groups them the way
//! consumers probe for them ("is it iterable?", "is it callable?"), and
//! [`CapabilitySet`] records which operations a class supports.
//!
//! A proxy type mirrors exactly the capability set of the class it wraps, so
//! `hasattr(proxy, "__len__")` agrees with `hasattr(original, "__len__")` for every
//! operation.
//!
//! # Usage
//!
//! ```
//! use surrogate::{Category, Op, inspect, types::list_type};
//!
//! let caps = inspect(&list_type());
//! assert!(caps.contains(Op::Len));
//! assert!(caps.has_category(Category::Iteration));
//! assert!(!caps.contains(Op::Hash));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    types::{Class, Member},
    value::Value,
};

/// A protocol operation, identified by its double-underscore member name.
///
/// `Display`/`FromStr` use the member name (`Op::Add` <-> `"__add__"`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    IntoStaticStr,
    EnumIter,
    EnumCount,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum Op {
    // --- representation and conversion to text ---
    #[strum(serialize = "__repr__")]
    Repr,
    #[strum(serialize = "__str__")]
    Str,
    #[strum(serialize = "__bytes__")]
    Bytes,
    #[strum(serialize = "__format__")]
    Format,

    // --- rich comparison ---
    #[strum(serialize = "__lt__")]
    Lt,
    #[strum(serialize = "__le__")]
    Le,
    #[strum(serialize = "__eq__")]
    Eq,
    #[strum(serialize = "__ne__")]
    Ne,
    #[strum(serialize = "__gt__")]
    Gt,
    #[strum(serialize = "__ge__")]
    Ge,

    #[strum(serialize = "__hash__")]
    Hash,
    #[strum(serialize = "__bool__")]
    Bool,

    // --- attribute access ---
    #[strum(serialize = "__getattribute__")]
    GetAttribute,
    /// Fallback consulted when regular lookup fails.
    #[strum(serialize = "__getattr__")]
    GetAttr,
    #[strum(serialize = "__setattr__")]
    SetAttr,
    #[strum(serialize = "__delattr__")]
    DelAttr,
    #[strum(serialize = "__dir__")]
    Dir,

    #[strum(serialize = "__call__")]
    Call,

    // --- containers ---
    #[strum(serialize = "__len__")]
    Len,
    #[strum(serialize = "__length_hint__")]
    LengthHint,
    #[strum(serialize = "__getitem__")]
    GetItem,
    #[strum(serialize = "__setitem__")]
    SetItem,
    #[strum(serialize = "__delitem__")]
    DelItem,
    #[strum(serialize = "__iter__")]
    Iter,
    #[strum(serialize = "__next__")]
    Next,
    #[strum(serialize = "__reversed__")]
    Reversed,
    #[strum(serialize = "__contains__")]
    Contains,

    // --- binary arithmetic ---
    #[strum(serialize = "__add__")]
    Add,
    #[strum(serialize = "__sub__")]
    Sub,
    #[strum(serialize = "__mul__")]
    Mul,
    #[strum(serialize = "__matmul__")]
    MatMul,
    #[strum(serialize = "__truediv__")]
    TrueDiv,
    #[strum(serialize = "__floordiv__")]
    FloorDiv,
    #[strum(serialize = "__mod__")]
    Mod,
    #[strum(serialize = "__divmod__")]
    DivMod,
    #[strum(serialize = "__pow__")]
    Pow,
    #[strum(serialize = "__lshift__")]
    LShift,
    #[strum(serialize = "__rshift__")]
    RShift,
    #[strum(serialize = "__and__")]
    And,
    #[strum(serialize = "__xor__")]
    Xor,
    #[strum(serialize = "__or__")]
    Or,

    // --- reflected binary arithmetic ---
    #[strum(serialize = "__radd__")]
    RAdd,
    #[strum(serialize = "__rsub__")]
    RSub,
    #[strum(serialize = "__rmul__")]
    RMul,
    #[strum(serialize = "__rmatmul__")]
    RMatMul,
    #[strum(serialize = "__rtruediv__")]
    RTrueDiv,
    #[strum(serialize = "__rfloordiv__")]
    RFloorDiv,
    #[strum(serialize = "__rmod__")]
    RMod,
    #[strum(serialize = "__rdivmod__")]
    RDivMod,
    #[strum(serialize = "__rpow__")]
    RPow,
    #[strum(serialize = "__rlshift__")]
    RLShift,
    #[strum(serialize = "__rrshift__")]
    RRShift,
    #[strum(serialize = "__rand__")]
    RAnd,
    #[strum(serialize = "__rxor__")]
    RXor,
    #[strum(serialize = "__ror__")]
    ROr,

    // --- in-place arithmetic ---
    #[strum(serialize = "__iadd__")]
    IAdd,
    #[strum(serialize = "__isub__")]
    ISub,
    #[strum(serialize = "__imul__")]
    IMul,
    #[strum(serialize = "__imatmul__")]
    IMatMul,
    #[strum(serialize = "__itruediv__")]
    ITrueDiv,
    #[strum(serialize = "__ifloordiv__")]
    IFloorDiv,
    #[strum(serialize = "__imod__")]
    IMod,
    #[strum(serialize = "__ipow__")]
    IPow,
    #[strum(serialize = "__ilshift__")]
    ILShift,
    #[strum(serialize = "__irshift__")]
    IRShift,
    #[strum(serialize = "__iand__")]
    IAnd,
    #[strum(serialize = "__ixor__")]
    IXor,
    #[strum(serialize = "__ior__")]
    IOr,

    // --- unary arithmetic ---
    #[strum(serialize = "__neg__")]
    Neg,
    #[strum(serialize = "__pos__")]
    Pos,
    #[strum(serialize = "__abs__")]
    Abs,
    #[strum(serialize = "__invert__")]
    Invert,

    // --- numeric conversion ---
    #[strum(serialize = "__int__")]
    Int,
    #[strum(serialize = "__float__")]
    Float,
    #[strum(serialize = "__index__")]
    Index,

    // --- context scope ---
    #[strum(serialize = "__enter__")]
    Enter,
    #[strum(serialize = "__exit__")]
    Exit,

    // --- legacy protocol variants, detected as distinct operations ---
    #[strum(serialize = "__nonzero__")]
    Nonzero,
    #[strum(serialize = "__unicode__")]
    Unicode,
    #[strum(serialize = "__cmp__")]
    Cmp,
    #[strum(serialize = "__div__")]
    Div,
    #[strum(serialize = "__rdiv__")]
    RDiv,
    #[strum(serialize = "__idiv__")]
    IDiv,
    #[strum(serialize = "__coerce__")]
    Coerce,
    #[strum(serialize = "__long__")]
    Long,
    #[strum(serialize = "__oct__")]
    Oct,
    #[strum(serialize = "__hex__")]
    Hex,
}

/// Consumer-visible grouping of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
pub enum Category {
    Representation,
    StringConversion,
    BytesConversion,
    Formatting,
    Comparison,
    Hashing,
    BoolConversion,
    AttributeAccess,
    AttributeEnumeration,
    Callable,
    Length,
    ItemAccess,
    Iteration,
    Containment,
    Numeric,
    NumericConversion,
    ContextScope,
}

impl Op {
    /// The member name, e.g. `"__add__"`.
    #[must_use]
    pub fn dunder(self) -> &'static str {
        self.into()
    }

    /// Parses a member name into an operation.
    #[must_use]
    pub fn from_dunder(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Self::Repr => Category::Representation,
            Self::Str | Self::Unicode => Category::StringConversion,
            Self::Bytes => Category::BytesConversion,
            Self::Format => Category::Formatting,
            Self::Lt | Self::Le | Self::Eq | Self::Ne | Self::Gt | Self::Ge | Self::Cmp => Category::Comparison,
            Self::Hash => Category::Hashing,
            Self::Bool | Self::Nonzero => Category::BoolConversion,
            Self::GetAttribute | Self::GetAttr | Self::SetAttr | Self::DelAttr => Category::AttributeAccess,
            Self::Dir => Category::AttributeEnumeration,
            Self::Call => Category::Callable,
            Self::Len | Self::LengthHint => Category::Length,
            Self::GetItem | Self::SetItem | Self::DelItem => Category::ItemAccess,
            Self::Iter | Self::Next | Self::Reversed => Category::Iteration,
            Self::Contains => Category::Containment,
            Self::Int | Self::Float | Self::Index | Self::Long | Self::Oct | Self::Hex => Category::NumericConversion,
            Self::Enter | Self::Exit => Category::ContextScope,
            _ => Category::Numeric,
        }
    }

    /// Whether this is a legacy protocol variant.
    #[must_use]
    pub fn is_legacy(self) -> bool {
        matches!(
            self,
            Self::Nonzero
                | Self::Unicode
                | Self::Cmp
                | Self::Div
                | Self::RDiv
                | Self::IDiv
                | Self::Coerce
                | Self::Long
                | Self::Oct
                | Self::Hex
        )
    }

    /// Whether this is an in-place arithmetic operation (`__iadd__`, ...).
    #[must_use]
    pub fn is_inplace(self) -> bool {
        BinaryOp::iter().any(|op| op.inplace() == Some(self)) || self == Self::IDiv
    }

    fn bit(self) -> u128 {
        1u128 << (self as u8)
    }
}

/// The set of operations a class supports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet {
    bits: u128,
}

impl CapabilitySet {
    /// The empty set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Every operation, legacy variants included.
    #[must_use]
    pub fn all() -> Self {
        Op::iter().collect()
    }

    #[must_use]
    pub fn contains(self, op: Op) -> bool {
        self.bits & op.bit() != 0
    }

    pub fn insert(&mut self, op: Op) {
        self.bits |= op.bit();
    }

    pub fn remove(&mut self, op: Op) {
        self.bits &= !op.bit();
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// The legacy variants in this set.
    #[must_use]
    pub fn legacy(self) -> Self {
        self.iter().filter(|op| op.is_legacy()).collect()
    }

    /// This set with every legacy variant removed.
    #[must_use]
    pub fn without_legacy(self) -> Self {
        self.difference(self.legacy())
    }

    #[must_use]
    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Operations in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Op> {
        Op::iter().filter(move |op| self.contains(*op))
    }

    #[must_use]
    pub fn has_category(self, category: Category) -> bool {
        self.iter().any(|op| op.category() == category)
    }

    /// The categories with at least one supported operation.
    #[must_use]
    pub fn categories(self) -> Vec<Category> {
        Category::iter().filter(|c| self.has_category(*c)).collect()
    }
}

impl FromIterator<Op> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Op>>(iter: I) -> Self {
        let mut set = Self::none();
        for op in iter {
            set.insert(op);
        }
        set
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Op::dunder)).finish()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("CapabilitySet(none)");
        }
        let names: Vec<&str> = self.iter().map(Op::dunder).collect();
        write!(f, "CapabilitySet({})", names.join(", "))
    }
}

/// Determines which operations instances of `class` support.
///
/// An operation is present iff the class or an ancestor defines its member and the
/// member is not blocked. Properties do not count: a protocol member must be callable.
#[must_use]
pub fn inspect(class: &Class) -> CapabilitySet {
    Op::iter()
        .filter(|op| matches!(class.lookup(op.dunder()), Some(Member::Method(_))))
        .collect()
}

/// Capability set of a value's runtime class.
#[must_use]
pub fn inspect_value(value: &Value) -> CapabilitySet {
    inspect(&value.class())
}

/// Binary arithmetic operators, each with a forward, reflected and (mostly) in-place member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    MatMul,
    TrueDiv,
    FloorDiv,
    Mod,
    DivMod,
    Pow,
    LShift,
    RShift,
    And,
    Xor,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub fn forward(self) -> Op {
        match self {
            Self::Add => Op::Add,
            Self::Sub => Op::Sub,
            Self::Mul => Op::Mul,
            Self::MatMul => Op::MatMul,
            Self::TrueDiv => Op::TrueDiv,
            Self::FloorDiv => Op::FloorDiv,
            Self::Mod => Op::Mod,
            Self::DivMod => Op::DivMod,
            Self::Pow => Op::Pow,
            Self::LShift => Op::LShift,
            Self::RShift => Op::RShift,
            Self::And => Op::And,
            Self::Xor => Op::Xor,
            Self::Or => Op::Or,
        }
    }

    #[must_use]
    pub fn reflected(self) -> Op {
        match self {
            Self::Add => Op::RAdd,
            Self::Sub => Op::RSub,
            Self::Mul => Op::RMul,
            Self::MatMul => Op::RMatMul,
            Self::TrueDiv => Op::RTrueDiv,
            Self::FloorDiv => Op::RFloorDiv,
            Self::Mod => Op::RMod,
            Self::DivMod => Op::RDivMod,
            Self::Pow => Op::RPow,
            Self::LShift => Op::RLShift,
            Self::RShift => Op::RRShift,
            Self::And => Op::RAnd,
            Self::Xor => Op::RXor,
            Self::Or => Op::ROr,
        }
    }

    /// The in-place member; `divmod` has none.
    #[must_use]
    pub fn inplace(self) -> Option<Op> {
        match self {
            Self::Add => Some(Op::IAdd),
            Self::Sub => Some(Op::ISub),
            Self::Mul => Some(Op::IMul),
            Self::MatMul => Some(Op::IMatMul),
            Self::TrueDiv => Some(Op::ITrueDiv),
            Self::FloorDiv => Some(Op::IFloorDiv),
            Self::Mod => Some(Op::IMod),
            Self::DivMod => None,
            Self::Pow => Some(Op::IPow),
            Self::LShift => Some(Op::ILShift),
            Self::RShift => Some(Op::IRShift),
            Self::And => Some(Op::IAnd),
            Self::Xor => Some(Op::IXor),
            Self::Or => Some(Op::IOr),
        }
    }

    /// Operator text used in `unsupported operand type(s)` errors.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::MatMul => "@",
            Self::TrueDiv => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::DivMod => "divmod()",
            Self::Pow => "** or pow()",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::And => "&",
            Self::Xor => "^",
            Self::Or => "|",
        }
    }

    /// Operator text for the in-place form, e.g. `+=`.
    #[must_use]
    pub fn inplace_symbol(self) -> String {
        match self {
            Self::Pow => "**=".to_owned(),
            Self::DivMod => self.symbol().to_owned(),
            _ => format!("{}=", self.symbol()),
        }
    }
}

/// Rich comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
}

impl CompareOp {
    #[must_use]
    pub fn op(self) -> Op {
        match self {
            Self::Lt => Op::Lt,
            Self::Le => Op::Le,
            Self::Eq => Op::Eq,
            Self::Ne => Op::Ne,
            Self::Gt => Op::Gt,
            Self::Ge => Op::Ge,
        }
    }

    /// The operator tried on the right operand when the left one declines.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Whether an ordering satisfies this operator.
    #[must_use]
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }
}

/// Unary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum UnaryOp {
    Neg,
    Pos,
    Abs,
    Invert,
}

impl UnaryOp {
    #[must_use]
    pub fn op(self) -> Op {
        match self {
            Self::Neg => Op::Neg,
            Self::Pos => Op::Pos,
            Self::Abs => Op::Abs,
            Self::Invert => Op::Invert,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "unary -",
            Self::Pos => "unary +",
            Self::Abs => "abs()",
            Self::Invert => "unary ~",
        }
    }
}
