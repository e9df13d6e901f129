use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    StoppingRequested,
}

/// What can happen to a run, from the foreground's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTrigger {
    Start,
    Stop,
    /// The background loop returned.
    LoopExited,
}

impl RunState {
    /// The legal transitions. `None` means the trigger is a no-op in this state.
    pub fn next(self, trigger: RunTrigger) -> Option<RunState> {
        match (self, trigger) {
            (RunState::Idle, RunTrigger::Start) => Some(RunState::Running),
            (RunState::Running, RunTrigger::Stop) => Some(RunState::StoppingRequested),
            (RunState::StoppingRequested, RunTrigger::LoopExited) => Some(RunState::Idle),
            _ => None,
        }
    }

    pub fn is_idle(self) -> bool {
        self == RunState::Idle
    }
}

/// Control requests raised by hotkeys and the tray, consumed on the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlSignal {
    Start,
    Stop,
}

/// The only state shared with the background loop. Raised while a run may
/// proceed; the loop polls it between steps.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn lower(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_transitions_are_legal() {
        assert_eq!(RunState::Idle.next(RunTrigger::Start), Some(RunState::Running));
        assert_eq!(
            RunState::Running.next(RunTrigger::Stop),
            Some(RunState::StoppingRequested)
        );
        assert_eq!(
            RunState::StoppingRequested.next(RunTrigger::LoopExited),
            Some(RunState::Idle)
        );

        assert_eq!(RunState::Running.next(RunTrigger::Start), None);
        assert_eq!(RunState::Idle.next(RunTrigger::Stop), None);
        assert_eq!(RunState::Idle.next(RunTrigger::LoopExited), None);
        assert_eq!(RunState::Running.next(RunTrigger::LoopExited), None);
        assert_eq!(RunState::StoppingRequested.next(RunTrigger::Start), None);
    }

    #[test]
    fn flag_clones_share_state() {
        let flag = RunFlag::new();
        let seen_by_worker = flag.clone();
        assert!(!seen_by_worker.is_raised());
        flag.raise();
        assert!(seen_by_worker.is_raised());
        flag.lower();
        assert!(!seen_by_worker.is_raised());
    }
}
