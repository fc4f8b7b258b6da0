//! Completion gate
//!
//! Counts resolved units of work and decides when the attempt has all of
//! its data. The feedback delay that follows is armed by the orchestrator.

/// Result of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Still waiting for more ticks
    Pending,
    /// Threshold crossed on this tick; arm the feedback timer
    Fire,
}

/// Monotonic completion counter with a one-shot threshold
#[derive(Debug, Clone)]
pub struct CompletionGate {
    counter: usize,
    declared: usize,
    fired: bool,
}

impl CompletionGate {
    /// Gate for `declared` declared resources
    pub fn new(declared: usize) -> Self {
        Self {
            counter: 0,
            declared,
            fired: false,
        }
    }

    /// Count one resolved unit
    ///
    /// The comparison runs after the increment and is a strict `>` against
    /// the declared count: the media batch tick is needed on top of every
    /// declared resource. Fires at most once.
    pub fn tick(&mut self) -> GateDecision {
        self.counter += 1;

        if self.counter > self.declared && !self.fired {
            self.fired = true;
            GateDecision::Fire
        } else {
            GateDecision::Pending
        }
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn declared(&self) -> usize {
        self.declared
    }

    /// Ticks needed before the gate fires
    pub fn required(&self) -> usize {
        self.declared + 1
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }
}
