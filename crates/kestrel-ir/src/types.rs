//! Optimistic type lattice.
//!
//! Types are ordered by narrowness: an optimistic site starts at the
//! narrowest type and widens on de-optimization until it reaches `Object`,
//! which can never be invalidated.

use serde::{Deserialize, Serialize};

/// Static types assignable to expressions and symbols.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum JsType {
    #[default]
    Unknown,
    Boolean,
    Int,
    Long,
    Number,
    Object,
}

impl JsType {
    /// The narrowest type optimistic sites start out at.
    pub const NARROWEST: JsType = JsType::Int;

    pub fn is_numeric(self) -> bool {
        matches!(self, JsType::Int | JsType::Long | JsType::Number)
    }

    /// The next wider type on the de-optimization chain.
    ///
    /// `Object` is a fixed point; non-numeric types widen straight to it.
    pub fn widen(self) -> JsType {
        match self {
            JsType::Int => JsType::Long,
            JsType::Long => JsType::Number,
            _ => JsType::Object,
        }
    }

    pub fn widest(self, other: JsType) -> JsType {
        self.max(other)
    }

    pub fn is_narrower_than(self, other: JsType) -> bool {
        self < other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_chain_reaches_object() {
        let mut ty = JsType::NARROWEST;
        let mut steps = 0;
        while ty != JsType::Object {
            ty = ty.widen();
            steps += 1;
            assert!(steps < 8);
        }
        assert_eq!(steps, 3);
    }

    #[test]
    fn widest_is_commutative() {
        assert_eq!(JsType::Int.widest(JsType::Number), JsType::Number);
        assert_eq!(JsType::Number.widest(JsType::Int), JsType::Number);
        assert_eq!(JsType::Boolean.widest(JsType::Unknown), JsType::Boolean);
    }
}
