// Copyright 2024 Lucent Project Authors. Licensed under Apache-2.0.

//! Scalar type kinds and the widening lattice used for overload resolution.

use serde::{Deserialize, Serialize};

mod value;

pub use self::value::{DataValue, ValueError};

/// A scalar type of the query language.
///
/// `Type` is the kind of `typeof(...)` literals. `Dynamic` is the untyped
/// property-bag type that every scalar converts to and from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Long,
    Real,
    Decimal,
    String,
    DateTime,
    Timespan,
    Guid,
    Dynamic,
    Type,
}

/// How far apart an argument type may be from a parameter type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Conversion {
    /// Identity only.
    None,
    /// The target must be strictly wider.
    Promotable,
    /// Promotable in either direction.
    Compatible,
    /// Always allowed.
    Any,
}

impl ScalarKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Long => "long",
            Self::Real => "real",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Timespan => "timespan",
            Self::Guid => "guid",
            Self::Dynamic => "dynamic",
            Self::Type => "type",
        }
    }

    /// Parse a type name as written in a `typeof` or `datatable` clause.
    pub fn from_name(name: &str) -> Option<ScalarKind> {
        Some(match name {
            "bool" | "boolean" => Self::Bool,
            "int" | "int32" => Self::Int,
            "long" | "int64" => Self::Long,
            "real" | "double" | "float64" => Self::Real,
            "decimal" => Self::Decimal,
            "string" => Self::String,
            "datetime" | "date" => Self::DateTime,
            "timespan" | "time" => Self::Timespan,
            "guid" | "uuid" => Self::Guid,
            "dynamic" => Self::Dynamic,
            _ => return None,
        })
    }

    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }

    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Long | Self::Real | Self::Decimal)
    }

    /// Summable types can be added and aggregated by `sum`-like functions.
    pub const fn is_summable(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Long | Self::Real | Self::Decimal | Self::DateTime | Self::Timespan
        )
    }

    pub const fn is_orderable(self) -> bool {
        !matches!(self, Self::Dynamic | Self::Type)
    }

    /// Whether `self` widens to `to` in the scalar lattice.
    ///
    /// The order is strict: `widens_to` is false for identical kinds.
    pub fn widens_to(self, to: ScalarKind) -> bool {
        match (self, to) {
            (Self::Int, Self::Long) => true,
            (Self::Int, Self::Real) => true,
            (Self::Long, Self::Real) => true,
            (Self::Decimal, Self::Real) => true,
            _ => false,
        }
    }

    /// The promoted form of this kind: one step up the lattice.
    pub fn promoted(self) -> ScalarKind {
        match self {
            Self::Int => Self::Long,
            Self::Decimal => Self::Real,
            other => other,
        }
    }

    /// Whether a value of kind `self` is usable where `to` is expected,
    /// under the given conversion level.
    pub fn convertible_to(self, to: ScalarKind, conversion: Conversion) -> bool {
        match conversion {
            Conversion::None => self == to,
            Conversion::Promotable => self == to || self.widens_to(to),
            Conversion::Compatible => self == to || self.widens_to(to) || to.widens_to(self),
            Conversion::Any => true,
        }
    }

    /// The widest of two numeric kinds, if both are numeric.
    pub fn widest(self, other: ScalarKind) -> Option<ScalarKind> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        if self == other || other.widens_to(self) {
            Some(self)
        } else if self.widens_to(other) {
            Some(other)
        } else {
            // decimal vs long and the like meet at real
            Some(Self::Real)
        }
    }
}

impl std::fmt::Debug for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The widest numeric kind among `kinds`, ignoring non-numeric entries.
pub fn widest_numeric(kinds: impl IntoIterator<Item = ScalarKind>) -> Option<ScalarKind> {
    let mut widest: Option<ScalarKind> = None;
    for kind in kinds {
        if !kind.is_numeric() {
            continue;
        }
        widest = Some(match widest {
            None => kind,
            Some(cur) => cur.widest(kind).unwrap_or(ScalarKind::Real),
        });
    }
    widest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_strict() {
        assert!(ScalarKind::Int.widens_to(ScalarKind::Long));
        assert!(ScalarKind::Decimal.widens_to(ScalarKind::Real));
        assert!(!ScalarKind::Long.widens_to(ScalarKind::Long));
        assert!(!ScalarKind::Long.widens_to(ScalarKind::Int));
        assert!(!ScalarKind::String.widens_to(ScalarKind::Dynamic));
    }

    #[test]
    fn conversion_levels() {
        use Conversion::*;
        assert!(ScalarKind::Int.convertible_to(ScalarKind::Int, None));
        assert!(!ScalarKind::Int.convertible_to(ScalarKind::Long, None));
        assert!(ScalarKind::Int.convertible_to(ScalarKind::Long, Promotable));
        assert!(!ScalarKind::Long.convertible_to(ScalarKind::Int, Promotable));
        assert!(ScalarKind::Long.convertible_to(ScalarKind::Int, Compatible));
        assert!(ScalarKind::String.convertible_to(ScalarKind::Bool, Any));
    }

    #[test]
    fn widest_of_mixed_numerics() {
        assert_eq!(
            widest_numeric([ScalarKind::Int, ScalarKind::Long]),
            Some(ScalarKind::Long)
        );
        assert_eq!(
            widest_numeric([ScalarKind::Decimal, ScalarKind::Long]),
            Some(ScalarKind::Real)
        );
        assert_eq!(
            widest_numeric([ScalarKind::String, ScalarKind::Bool]),
            None
        );
        assert_eq!(
            widest_numeric([ScalarKind::Int, ScalarKind::String]),
            Some(ScalarKind::Int)
        );
    }
}
