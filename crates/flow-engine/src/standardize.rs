//! Output standardization
//!
//! Nodes return positional branch results; the engine pairs them with
//! the declared output names before routing. Missing trailing branches
//! become empty sets, and the legacy single-output shape is accepted
//! only from nodes declaring exactly one output.

use crate::contract::NodeOutput;
use crate::error::{EngineError, Result};
use crate::types::{BranchName, ItemSet};

/// A node's output keyed by declared branch name, in declaration order
#[derive(Debug, Clone, Default)]
pub struct BranchOutputs {
    branches: Vec<(BranchName, ItemSet)>,
}

impl BranchOutputs {
    /// Items for a named branch, if declared
    pub fn get(&self, name: &str) -> Option<&ItemSet> {
        self.branches
            .iter()
            .find(|(branch, _)| branch == name)
            .map(|(_, items)| items)
    }

    /// Iterate branches in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ItemSet)> {
        self.branches
            .iter()
            .map(|(name, items)| (name.as_str(), items))
    }

    /// Item count per branch, in declaration order
    pub fn lengths(&self) -> Vec<usize> {
        self.branches.iter().map(|(_, items)| items.len()).collect()
    }

    /// Item count keyed by branch name, for progress events
    pub fn length_map(&self) -> std::collections::BTreeMap<String, usize> {
        self.branches
            .iter()
            .map(|(name, items)| (name.clone(), items.len()))
            .collect()
    }

    /// Number of declared branches
    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Whether every branch is empty
    pub fn all_empty(&self) -> bool {
        self.branches.iter().all(|(_, items)| items.is_empty())
    }
}

/// Pair a node's positional result with its declared output names
///
/// Positional results zip with declared names left to right. A node may
/// omit trailing branches, which standardize to empty sets; it may never
/// return more branches than it declares.
pub fn standardize_outputs(declared: &[&str], output: NodeOutput) -> Result<BranchOutputs> {
    let sets = match output {
        NodeOutput::Branches(sets) => sets,
        NodeOutput::Single(items) => {
            if declared.len() != 1 {
                return Err(EngineError::OutputArity {
                    declared: declared.len(),
                });
            }
            vec![items]
        }
    };

    if sets.len() > declared.len() {
        return Err(EngineError::OutputArity {
            declared: declared.len(),
        });
    }

    let mut sets = sets.into_iter();
    let branches = declared
        .iter()
        .map(|name| (name.to_string(), sets.next().unwrap_or_default()))
        .collect();

    Ok(BranchOutputs { branches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use serde_json::json;

    fn items(values: &[i64]) -> ItemSet {
        values.iter().map(|v| Item::new(json!(v))).collect()
    }

    #[test]
    fn test_zip_with_declared_names() {
        let out = NodeOutput::Branches(vec![items(&[1, 2]), items(&[3])]);
        let std = standardize_outputs(&["true", "false"], out).unwrap();
        assert_eq!(std.get("true").unwrap().len(), 2);
        assert_eq!(std.get("false").unwrap().len(), 1);
        assert!(std.get("other").is_none());
    }

    #[test]
    fn test_missing_trailing_branches_are_empty() {
        let out = NodeOutput::Branches(vec![items(&[1])]);
        let std = standardize_outputs(&["iteration", "complete"], out).unwrap();
        assert_eq!(std.get("iteration").unwrap().len(), 1);
        assert!(std.get("complete").unwrap().is_empty());
    }

    #[test]
    fn test_single_fallback_for_one_output() {
        let std = standardize_outputs(&["main"], NodeOutput::Single(items(&[1, 2, 3]))).unwrap();
        assert_eq!(std.get("main").unwrap().len(), 3);
    }

    #[test]
    fn test_single_rejected_for_multi_output() {
        let err = standardize_outputs(&["true", "false"], NodeOutput::Single(items(&[1])));
        assert!(matches!(
            err,
            Err(EngineError::OutputArity { declared: 2 })
        ));
    }

    #[test]
    fn test_excess_branches_rejected() {
        let out = NodeOutput::Branches(vec![items(&[1]), items(&[2])]);
        let err = standardize_outputs(&["main"], out);
        assert!(matches!(err, Err(EngineError::OutputArity { declared: 1 })));
    }

    #[test]
    fn test_lengths_follow_declaration_order() {
        let out = NodeOutput::Branches(vec![items(&[1, 2]), Vec::new()]);
        let std = standardize_outputs(&["true", "false"], out).unwrap();
        assert_eq!(std.lengths(), vec![2, 0]);
        assert!(!std.all_empty());
    }
}
