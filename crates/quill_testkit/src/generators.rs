//! Property-based test generators.
//!
//! Strategies that produce edit-bracket scripts, plus a reference model of
//! the edit-level counter to check the engine against.

use proptest::prelude::*;
use quill_core::Instance;

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// `begin_edit`.
    Begin,
    /// `commit_edit`.
    Commit,
}

/// Strategy for a single edit step.
pub fn edit_op() -> impl Strategy<Value = EditOp> {
    prop_oneof![Just(EditOp::Begin), Just(EditOp::Commit)]
}

/// Strategy for an arbitrary, possibly unbalanced, edit script.
pub fn edit_script(max_len: usize) -> impl Strategy<Value = Vec<EditOp>> {
    prop::collection::vec(edit_op(), 0..max_len)
}

/// Strategy for a balanced script: `depth` begins followed by `depth` commits.
pub fn balanced_script(max_depth: usize) -> impl Strategy<Value = Vec<EditOp>> {
    (1..=max_depth).prop_map(|depth| {
        let mut ops = vec![EditOp::Begin; depth];
        ops.extend(std::iter::repeat(EditOp::Commit).take(depth));
        ops
    })
}

/// Reference model of the edit-level counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditModel {
    /// Current level.
    pub level: i32,
    /// Number of commits that found no open session.
    pub unbalanced: usize,
}

impl EditModel {
    /// Applies `op` and returns what the engine call should return.
    pub fn apply(&mut self, op: EditOp) -> bool {
        match op {
            EditOp::Begin => {
                let outermost = self.level <= 0;
                self.level = if outermost { 1 } else { self.level + 1 };
                outermost
            }
            EditOp::Commit => {
                self.level -= 1;
                if self.level < 0 {
                    self.unbalanced += 1;
                    self.level = 0;
                }
                self.level == 0
            }
        }
    }
}

/// Runs `op` against `instance` and returns the engine's result.
pub fn run_op(instance: &Instance, op: EditOp) -> bool {
    match op {
        EditOp::Begin => instance.begin_edit(),
        EditOp::Commit => instance.commit_edit(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_clamps_over_commit() {
        let mut model = EditModel::default();
        assert!(model.apply(EditOp::Begin));
        assert!(model.apply(EditOp::Commit));
        assert!(model.apply(EditOp::Commit));
        assert_eq!(model.level, 0);
        assert_eq!(model.unbalanced, 1);
    }

    proptest! {
        #[test]
        fn balanced_script_is_balanced(script in balanced_script(20)) {
            let begins = script.iter().filter(|op| **op == EditOp::Begin).count();
            prop_assert_eq!(begins * 2, script.len());
        }
    }
}
