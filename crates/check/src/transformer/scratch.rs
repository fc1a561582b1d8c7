//! Per-call working state of the transformer.

use alloc::vec::Vec;
use tessera_core::{Level, Node, Projection};

/// Reusable buffers describing which columns a transformation rewrites.
///
/// Owned by the caller and passed into every call, so one scratch can serve
/// many checks without reallocating.
#[derive(Clone, Debug, Default)]
pub struct TransformScratch {
    columns: Vec<usize>,
    levels: Vec<Level>,
}

impl TransformScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills in the columns outside `projection` and their target levels.
    pub(crate) fn prepare(&mut self, node: &Node, projection: Projection) {
        self.columns.clear();
        self.levels.clear();
        for column in projection.active_columns(node.len()) {
            self.columns.push(column);
            self.levels.push(node.levels()[column]);
        }
    }

    /// Columns rewritten by the current transformation.
    pub fn active_columns(&self) -> &[usize] {
        &self.columns
    }

    /// Target level per active column.
    pub fn active_levels(&self) -> &[Level] {
        &self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_prepare() {
        let mut scratch = TransformScratch::new();
        scratch.prepare(&Node::new(vec![3, 1, 2]), Projection::from_bits(0b010));
        assert_eq!(scratch.active_columns(), &[0, 2]);
        assert_eq!(scratch.active_levels(), &[3, 2]);

        scratch.prepare(&Node::new(vec![3, 1, 2]), Projection::from_bits(0b111));
        assert!(scratch.active_columns().is_empty());
    }
}
