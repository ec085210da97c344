//! Sequence strategy that runs its operations concurrently.

use super::{PhaseStep, Sequence, StepProgress};
use crate::core::{CancelSignal, Progress, StateTree};

/// Begins every phase operation within `start`, before any poll.
///
/// Completion is observed on the first poll where every operation reports
/// done; there is no ordering guarantee between the operations themselves.
/// Operations that have settled are never re-polled.
pub struct ParallelPhase {
    steps: Vec<PhaseStep>,
    cancel: CancelSignal,
    progress: Vec<StepProgress>,
    done: bool,
}

impl ParallelPhase {
    pub fn new(steps: Vec<PhaseStep>, cancel: CancelSignal) -> Self {
        let progress = vec![StepProgress::NotStarted; steps.len()];
        Self {
            steps,
            cancel,
            progress,
            done: false,
        }
    }
}

impl<C> Sequence<C> for ParallelPhase {
    fn is_done(&self) -> bool {
        self.done
    }

    fn start(&mut self, tree: &mut StateTree<C>) {
        if self.steps.is_empty() {
            self.done = true;
            return;
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.begin(tree, &self.cancel);
            self.progress[index] = StepProgress::Running;
        }
    }

    fn update(&mut self, tree: &mut StateTree<C>) -> bool {
        if self.done {
            return true;
        }
        let mut all_done = true;
        for index in 0..self.steps.len() {
            if self.progress[index] == StepProgress::Done {
                continue;
            }
            match self.steps[index].poll(tree, &self.cancel) {
                Progress::Done => self.progress[index] = StepProgress::Done,
                Progress::Pending => all_done = false,
            }
        }
        self.done = all_done;
        self.done
    }
}
