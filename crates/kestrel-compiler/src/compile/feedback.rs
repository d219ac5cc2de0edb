//! Optimistic-type feedback store.
//!
//! Records, per function and program point, the narrowest type proven too
//! narrow by a de-optimization. The typer asks for the narrowest type not
//! yet invalidated; sites never de-optimized start at the narrowest type of
//! the lattice. Reads take `&self`, so compilations running in parallel can
//! share one store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use kestrel_ir::node::FnId;
use kestrel_ir::JsType;

/// Per-compilation type feedback, keyed by function id and program point.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeFeedback {
    invalidated: IndexMap<(u32, u32), JsType>,
}

impl TypeFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// The narrowest type not yet invalidated for a program point.
    pub fn narrowest_valid_type(&self, function: FnId, point: u32) -> JsType {
        match self.invalidated.get(&(function.as_u32(), point)) {
            Some(ty) => ty.widen(),
            None => JsType::NARROWEST,
        }
    }

    /// Record a de-optimization: `ty` proved too narrow at this point.
    /// Invalidation only ever widens.
    pub fn invalidate(&mut self, function: FnId, point: u32, ty: JsType) {
        let key = (function.as_u32(), point);
        let entry = self.invalidated.entry(key).or_insert(ty);
        *entry = entry.widest(ty);
    }

    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_points_start_narrowest() {
        let feedback = TypeFeedback::new();
        assert_eq!(
            feedback.narrowest_valid_type(FnId::from_raw(0), 1),
            JsType::NARROWEST
        );
    }

    #[test]
    fn invalidation_widens_monotonically() {
        let mut feedback = TypeFeedback::new();
        let f = FnId::from_raw(0);
        feedback.invalidate(f, 1, JsType::Int);
        assert_eq!(feedback.narrowest_valid_type(f, 1), JsType::Long);
        feedback.invalidate(f, 1, JsType::Number);
        assert_eq!(feedback.narrowest_valid_type(f, 1), JsType::Object);
        // A stale narrower report never narrows the record back.
        feedback.invalidate(f, 1, JsType::Int);
        assert_eq!(feedback.narrowest_valid_type(f, 1), JsType::Object);
    }
}
