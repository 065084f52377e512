use chrono::NaiveDateTime;

use crate::entity::Attributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }

    pub(super) fn compare<T: Ord>(self, lhs: T, rhs: T) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Modified,
    Created,
    Accessed,
}

/// One node of a parsed selection expression. Leaves test a single
/// entity field; `And`/`Or` combine exactly two children. The parser
/// guarantees `Name` and `Attr` only ever carry `Eq` or `Ne`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Name { op: CompareOp, pattern: String },
    Size { op: CompareOp, bytes: i64 },
    Time { field: TimeField, op: CompareOp, when: NaiveDateTime },
    Attr { op: CompareOp, flag: Attributes },
    And(Box<Criterion>, Box<Criterion>),
    Or(Box<Criterion>, Box<Criterion>),
}
