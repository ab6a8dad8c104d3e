// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `BatTask`: the execution tree built from a profile, used to report kill
//! progress ratios.

/// What kind of leaf or composite node a `BatTask` represents.
#[derive(Debug, Clone, PartialEq)]
pub enum BatTaskKind {
    Delay,
    ParallelTask,
    HomogeneousParallel,
    MpiReplay,
    HomogeneousPfs,
    DataStaging,
    SchedulerSend,
    SchedulerRecv,
    /// A `Sequence` composite; progress comes from the currently active child.
    Sequence,
}

/// One node of the execution tree rooted on a job.
#[derive(Debug, Clone)]
pub struct BatTask {
    pub kind: BatTaskKind,
    pub profile_name: String,
    /// Total duration in seconds, when known ahead of time (`None` for a
    /// `Sequence`, whose duration depends on which children actually run).
    pub total_duration: Option<f64>,
    pub elapsed: f64,
    pub children: Vec<BatTask>,
    /// Index of the currently running child, for `Sequence` nodes.
    pub active_child: usize,
}

impl BatTask {
    pub fn leaf(kind: BatTaskKind, profile_name: impl Into<String>, total_duration: f64) -> Self {
        Self {
            kind,
            profile_name: profile_name.into(),
            total_duration: Some(total_duration),
            elapsed: 0.0,
            children: Vec::new(),
            active_child: 0,
        }
    }

    pub fn sequence(profile_name: impl Into<String>) -> Self {
        Self {
            kind: BatTaskKind::Sequence,
            profile_name: profile_name.into(),
            total_duration: None,
            elapsed: 0.0,
            children: Vec::new(),
            active_child: 0,
        }
    }

    pub fn push_child(&mut self, child: BatTask) {
        self.children.push(child);
    }

    /// Append `leaf` and make it the active child, used by the executor when
    /// it descends into the next step of a running sequence.
    pub fn begin_next_child(&mut self, leaf: BatTask) {
        self.children.push(leaf);
        self.active_child = self.children.len() - 1;
    }

    pub fn tick(&mut self, elapsed: f64) {
        self.elapsed += elapsed;
        if let Some(child) = self.children.get_mut(self.active_child) {
            child.tick(elapsed);
        }
    }

    /// The ratio of this task's completed work, in `[0, 1]`. A `Sequence`
    /// defers to whichever child is currently running; a leaf with unknown
    /// duration (shouldn't normally happen) reports 0.
    pub fn current_task_progress_ratio(&self) -> f64 {
        match self.kind {
            BatTaskKind::Sequence => self
                .children
                .get(self.active_child)
                .map(BatTask::current_task_progress_ratio)
                .unwrap_or(0.0),
            _ => match self.total_duration {
                Some(total) if total > 0.0 => (self.elapsed / total).clamp(0.0, 1.0),
                Some(_) => 1.0,
                None => 0.0,
            },
        }
    }

    /// Advance a `Sequence` node to its next child, returning `false` once
    /// there is nothing left to advance to.
    pub fn advance_sequence(&mut self) -> bool {
        if self.active_child + 1 < self.children.len() {
            self.active_child += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_progress_ratio_tracks_elapsed_over_total() {
        let mut task = BatTask::leaf(BatTaskKind::Delay, "d", 10.0);
        assert_eq!(task.current_task_progress_ratio(), 0.0);
        task.tick(5.0);
        assert!((task.current_task_progress_ratio() - 0.5).abs() < 1e-9);
        task.tick(5.0);
        assert!((task.current_task_progress_ratio() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_leaf_is_immediately_complete() {
        let task = BatTask::leaf(BatTaskKind::Delay, "d", 0.0);
        assert_eq!(task.current_task_progress_ratio(), 1.0);
    }

    #[test]
    fn sequence_reports_active_child_progress() {
        let mut seq = BatTask::sequence("seq");
        seq.push_child(BatTask::leaf(BatTaskKind::Delay, "a", 4.0));
        seq.push_child(BatTask::leaf(BatTaskKind::Delay, "b", 4.0));
        seq.tick(2.0);
        assert!((seq.current_task_progress_ratio() - 0.5).abs() < 1e-9);

        assert!(seq.advance_sequence());
        seq.tick(1.0);
        assert!((seq.current_task_progress_ratio() - 0.25).abs() < 1e-9);
        assert!(!seq.advance_sequence());
    }
}
