//! Sequence strategy that runs its operations one at a time.

use super::{PhaseStep, Sequence};
use crate::core::{CancelSignal, Progress, StateTree};

/// Runs phase operations strictly in list order.
///
/// Operation *i + 1* is not begun until operation *i* has been observed
/// complete, so within the phase every operation's side effects are fully
/// visible before its successor starts. A freshly begun operation is first
/// polled on the next update, never within the update that began it.
pub struct SequentialPhase {
    steps: Vec<PhaseStep>,
    cancel: CancelSignal,
    cursor: usize,
    current: Option<usize>,
    done: bool,
}

impl SequentialPhase {
    pub fn new(steps: Vec<PhaseStep>, cancel: CancelSignal) -> Self {
        Self {
            steps,
            cancel,
            cursor: 0,
            current: None,
            done: false,
        }
    }

    /// Begin the next operation, or observe completion when none remain.
    fn advance<C>(&mut self, tree: &mut StateTree<C>) {
        if self.cursor >= self.steps.len() {
            self.current = None;
            self.done = true;
            return;
        }
        let index = self.cursor;
        self.cursor += 1;
        self.steps[index].begin(tree, &self.cancel);
        self.current = Some(index);
    }
}

impl<C> Sequence<C> for SequentialPhase {
    fn is_done(&self) -> bool {
        self.done
    }

    fn start(&mut self, tree: &mut StateTree<C>) {
        self.advance(tree);
    }

    fn update(&mut self, tree: &mut StateTree<C>) -> bool {
        if self.done {
            return true;
        }
        if let Some(index) = self.current {
            if self.steps[index].poll(tree, &self.cancel) == Progress::Pending {
                return false;
            }
        }
        self.advance(tree);
        self.done
    }
}
