use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_SLUG_LEN: usize = 128;

/// Lowercases `name` and collapses every run of non-alphanumeric characters
/// into a single hyphen, trimming hyphens at both ends.
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

pub fn is_valid_slug(value: &str) -> bool {
    !value.is_empty() && value.len() <= MAX_SLUG_LEN && generate_slug(value) == value
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDraft {
    pub step_number: i32,
    pub title: String,
    pub description: String,
    pub is_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    #[error("Order must list each of the {expected} steps exactly once")]
    NotAPermutation { expected: usize },
}

/// Ordered steps of one airdrop. Every mutation renumbers the steps so that
/// step numbers always run `1..=len` in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepList {
    steps: Vec<StepDraft>,
}

impl StepList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list in iteration order; incoming step numbers are ignored.
    pub fn from_steps(steps: impl IntoIterator<Item = StepDraft>) -> Self {
        let mut list = Self {
            steps: steps.into_iter().collect(),
        };
        list.resequence();
        list
    }

    pub fn push(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        is_required: bool,
    ) -> &StepDraft {
        self.steps.push(StepDraft {
            step_number: 0,
            title: title.into(),
            description: description.into(),
            is_required,
        });
        self.resequence();
        let last = self.steps.len() - 1;
        &self.steps[last]
    }

    pub fn remove(&mut self, index: usize) -> Option<StepDraft> {
        if index >= self.steps.len() {
            return None;
        }
        let removed = self.steps.remove(index);
        self.resequence();
        Some(removed)
    }

    /// Swaps the step at `index` with its neighbour. Returns `false` when the
    /// step is already at that edge of the list.
    pub fn move_step(&mut self, index: usize, direction: MoveDirection) -> bool {
        let target = match direction {
            MoveDirection::Up if index > 0 => index - 1,
            MoveDirection::Down if index + 1 < self.steps.len() => index + 1,
            _ => return false,
        };
        if index >= self.steps.len() {
            return false;
        }
        self.steps.swap(index, target);
        self.resequence();
        true
    }

    /// `order[i]` names the current index of the step that should end up at
    /// position `i`.
    pub fn reorder(&mut self, order: &[usize]) -> Result<(), ReorderError> {
        let expected = self.steps.len();
        if order.len() != expected {
            return Err(ReorderError::NotAPermutation { expected });
        }
        let mut seen = vec![false; expected];
        for &index in order {
            if index >= expected || seen[index] {
                return Err(ReorderError::NotAPermutation { expected });
            }
            seen[index] = true;
        }
        let mut slots: Vec<Option<StepDraft>> = self.steps.drain(..).map(Some).collect();
        self.steps = order
            .iter()
            .filter_map(|&index| slots[index].take())
            .collect();
        assert_eq!(self.steps.len(), expected, "Reorder lost steps");
        self.resequence();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StepDraft> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[StepDraft] {
        &self.steps
    }

    fn resequence(&mut self) {
        for (position, step) in self.steps.iter_mut().enumerate() {
            step.step_number = i32::try_from(position + 1).unwrap_or(i32::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(list: &StepList) -> Vec<i32> {
        list.iter().map(|step| step.step_number).collect()
    }

    fn titles(list: &StepList) -> Vec<&str> {
        list.iter().map(|step| step.title.as_str()).collect()
    }

    fn three_steps() -> StepList {
        let mut list = StepList::new();
        list.push("Bridge funds", "", true);
        list.push("Swap tokens", "", true);
        list.push("Provide liquidity", "", false);
        list
    }

    #[test]
    fn slug_from_name() {
        assert_eq!(generate_slug("My Project!!"), "my-project");
        assert_eq!(generate_slug("  LayerZero -- Season 2 "), "layerzero-season-2");
        assert_eq!(generate_slug("zkSync Era"), "zksync-era");
        assert_eq!(generate_slug("Ünïcode Ñame"), "n-code-ame");
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn slug_validity() {
        assert!(is_valid_slug("my-project"));
        assert!(!is_valid_slug("My-Project"));
        assert!(!is_valid_slug("-leading"));
        assert!(!is_valid_slug("double--hyphen"));
        assert!(!is_valid_slug(""));
    }

    #[test]
    fn from_steps_ignores_incoming_numbers() {
        let list = StepList::from_steps(vec![
            StepDraft {
                step_number: 7,
                title: "a".into(),
                description: String::new(),
                is_required: true,
            },
            StepDraft {
                step_number: 3,
                title: "b".into(),
                description: String::new(),
                is_required: true,
            },
        ]);
        assert_eq!(numbers(&list), vec![1, 2]);
        assert_eq!(titles(&list), vec!["a", "b"]);
    }

    #[test]
    fn removing_middle_step_resequences() {
        let mut list = three_steps();
        let removed = list.remove(1).unwrap();
        assert_eq!(removed.title, "Swap tokens");
        assert_eq!(numbers(&list), vec![1, 2]);
        assert_eq!(titles(&list), vec!["Bridge funds", "Provide liquidity"]);
        assert!(list.remove(5).is_none());
    }

    #[test]
    fn moving_steps_respects_edges() {
        let mut list = three_steps();
        assert!(!list.move_step(0, MoveDirection::Up));
        assert!(!list.move_step(2, MoveDirection::Down));
        assert!(list.move_step(2, MoveDirection::Up));
        assert_eq!(
            titles(&list),
            vec!["Bridge funds", "Provide liquidity", "Swap tokens"]
        );
        assert_eq!(numbers(&list), vec![1, 2, 3]);
    }

    #[test]
    fn reorder_by_permutation() {
        let mut list = three_steps();
        list.reorder(&[2, 0, 1]).unwrap();
        assert_eq!(
            titles(&list),
            vec!["Provide liquidity", "Bridge funds", "Swap tokens"]
        );
        assert_eq!(numbers(&list), vec![1, 2, 3]);
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let mut list = three_steps();
        assert_eq!(
            list.reorder(&[0, 0, 1]),
            Err(ReorderError::NotAPermutation { expected: 3 })
        );
        assert!(list.reorder(&[0, 1]).is_err());
        assert!(list.reorder(&[0, 1, 3]).is_err());
        assert_eq!(numbers(&list), vec![1, 2, 3]);
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut list = StepList::new();
        list.push("Join Discord", "Say hi", false);
        let wire = serde_json::to_value(&list).unwrap();
        assert_eq!(
            wire,
            serde_json::json!([{
                "stepNumber": 1,
                "title": "Join Discord",
                "description": "Say hi",
                "isRequired": false
            }])
        );
    }
}
