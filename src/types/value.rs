// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Literal scalar values as they appear in query text.

use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::ScalarKind;

/// A literal scalar value.
///
/// Constant values flow into call-site fingerprints and accepted-value
/// checks, so equality and hashing must be total; `Real` hashes its bits.
#[derive(Clone, Debug, PartialOrd)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Real(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Timespan(Duration),
    Guid(String),
    /// The raw text of a `dynamic(...)` literal.
    Dynamic(String),
}

impl PartialEq for DataValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(l), Self::Bool(r)) => l == r,
            (Self::Int(l), Self::Int(r)) => l == r,
            (Self::Long(l), Self::Long(r)) => l == r,
            (Self::Real(l), Self::Real(r)) => l.to_bits() == r.to_bits(),
            (Self::Decimal(l), Self::Decimal(r)) => l == r,
            (Self::String(l), Self::String(r)) => l == r,
            (Self::DateTime(l), Self::DateTime(r)) => l == r,
            (Self::Timespan(l), Self::Timespan(r)) => l == r,
            (Self::Guid(l), Self::Guid(r)) => l == r,
            (Self::Dynamic(l), Self::Dynamic(r)) => l == r,
            _ => false,
        }
    }
}

impl Eq for DataValue {}

impl Hash for DataValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Long(i) => i.hash(state),
            Self::Real(f) => f.to_bits().hash(state),
            Self::Decimal(d) => d.hash(state),
            Self::String(s) => s.hash(state),
            Self::DateTime(t) => t.hash(state),
            Self::Timespan(t) => {
                t.num_seconds().hash(state);
                t.subsec_nanos().hash(state);
            }
            Self::Guid(g) => g.hash(state),
            Self::Dynamic(d) => d.hash(state),
        }
    }
}

impl DataValue {
    /// The scalar kind of this value. `None` means null.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            Self::Null => return None,
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Long(_) => ScalarKind::Long,
            Self::Real(_) => ScalarKind::Real,
            Self::Decimal(_) => ScalarKind::Decimal,
            Self::String(_) => ScalarKind::String,
            Self::DateTime(_) => ScalarKind::DateTime,
            Self::Timespan(_) => ScalarKind::Timespan,
            Self::Guid(_) => ScalarKind::Guid,
            Self::Dynamic(_) => ScalarKind::Dynamic,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty_string(&self) -> bool {
        matches!(self, Self::String(s) if s.is_empty())
    }

    /// Compare against an accepted literal value, honoring the parameter's
    /// case-sensitivity flag for strings.
    pub fn matches_accepted(&self, accepted: &DataValue, case_sensitive: bool) -> bool {
        match (self, accepted) {
            (Self::String(l), Self::String(r)) if !case_sensitive => l.eq_ignore_ascii_case(r),
            _ => self == accepted,
        }
    }
}

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(i) => write!(f, "{i}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::DateTime(t) => write!(f, "datetime({t})"),
            Self::Timespan(t) => write!(f, "timespan({t})"),
            Self::Guid(g) => write!(f, "guid({g})"),
            Self::Dynamic(d) => write!(f, "dynamic({d})"),
        }
    }
}

/// The error type of literal value parsing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("failed to parse {0:?} as {1}")]
    Parse(String, &'static str),
    #[error("numeric literal {0:?} out of range for {1}")]
    OutOfRange(String, &'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_value_case_rules() {
        let v = DataValue::String("Inner".into());
        assert!(v.matches_accepted(&DataValue::String("inner".into()), false));
        assert!(!v.matches_accepted(&DataValue::String("inner".into()), true));
        assert!(v.matches_accepted(&DataValue::String("Inner".into()), true));
    }

    #[test]
    fn value_kinds() {
        assert_eq!(DataValue::Long(1).scalar_kind(), Some(ScalarKind::Long));
        assert_eq!(DataValue::Null.scalar_kind(), None);
    }
}
