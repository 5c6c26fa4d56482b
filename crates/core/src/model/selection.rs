use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A candidate's recorded answer for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Selection {
    Single(usize),
    Multi(BTreeSet<usize>),
}

impl Selection {
    /// Returns true if the given option index is part of this selection.
    #[must_use]
    pub fn contains(&self, option: usize) -> bool {
        match self {
            Selection::Single(index) => *index == option,
            Selection::Multi(set) => set.contains(&option),
        }
    }

    /// Selected option indices in ascending order.
    #[must_use]
    pub fn indices(&self) -> Vec<usize> {
        match self {
            Selection::Single(index) => vec![*index],
            Selection::Multi(set) => set.iter().copied().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Selection::Single(_) => false,
            Selection::Multi(set) => set.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_selection_reports_sorted_indices() {
        let selection = Selection::Multi([2, 0].into_iter().collect());
        assert_eq!(selection.indices(), vec![0, 2]);
        assert!(selection.contains(2));
        assert!(!selection.contains(1));
    }
}
