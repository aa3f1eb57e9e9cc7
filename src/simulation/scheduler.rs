/// Opaque handle to one of the two grid regions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    A,
    B,
}

impl BufferId {
    /// Position of the region in the store's backing pair
    pub fn slot(self) -> usize {
        match self {
            BufferId::A => 0,
            BufferId::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            BufferId::A => BufferId::B,
            BufferId::B => BufferId::A,
        }
    }
}

/// Step state: which region holds the last committed result
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepState {
    /// A is read, B is write
    #[default]
    StateA,
    /// B is read, A is write
    StateB,
}

/// Read/write assignment for one step. Only built by `resolve_roles`, so the
/// two roles always name different regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roles {
    read: BufferId,
    write: BufferId,
}

impl Roles {
    /// Region the kernel consumes (previous step's result)
    pub fn read(&self) -> BufferId {
        self.read
    }

    /// Region the kernel produces into
    pub fn write(&self) -> BufferId {
        self.write
    }
}

pub fn resolve_roles(state: StepState) -> Roles {
    match state {
        StepState::StateA => Roles {
            read: BufferId::A,
            write: BufferId::B,
        },
        StepState::StateB => Roles {
            read: BufferId::B,
            write: BufferId::A,
        },
    }
}

pub fn advance(state: StepState) -> StepState {
    match state {
        StepState::StateA => StepState::StateB,
        StepState::StateB => StepState::StateA,
    }
}

/// Proof that a step's dispatch and its barrier have both completed.
///
/// Only `KernelDispatch::barrier` implementations can mint one, and
/// `StepScheduler::advance` consumes it, so roles cannot flip while a write
/// is still in flight.
#[derive(Debug)]
#[must_use = "the step is not committed until the scheduler advances"]
pub struct StepCommitted {
    pub(crate) written: BufferId,
}

impl StepCommitted {
    pub(crate) fn new(written: BufferId) -> Self {
        Self { written }
    }

    /// Region that now holds the step's result
    pub fn written(&self) -> BufferId {
        self.written
    }
}

/// Ping-pong scheduler: a two-state machine with no terminal state
#[derive(Debug, Default)]
pub struct StepScheduler {
    state: StepState,
    steps_completed: u64,
}

impl StepScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    pub fn steps_completed(&self) -> u64 {
        self.steps_completed
    }

    /// Roles for the step about to run
    pub fn roles(&self) -> Roles {
        resolve_roles(self.state)
    }

    /// Region holding the latest committed result
    pub fn latest(&self) -> BufferId {
        self.roles().read()
    }

    /// Toggle after a committed step
    pub fn advance(&mut self, committed: StepCommitted) {
        debug_assert_eq!(
            committed.written(),
            self.roles().write(),
            "committed step wrote a region other than the scheduled write target"
        );
        self.state = advance(self.state);
        self.steps_completed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(scheduler: &mut StepScheduler) {
        let written = scheduler.roles().write();
        scheduler.advance(StepCommitted::new(written));
    }

    #[test]
    fn test_role_mapping() {
        let a = resolve_roles(StepState::StateA);
        assert_eq!((a.read(), a.write()), (BufferId::A, BufferId::B));
        let b = resolve_roles(StepState::StateB);
        assert_eq!((b.read(), b.write()), (BufferId::B, BufferId::A));
    }

    #[test]
    fn test_advance_toggles() {
        assert_eq!(advance(StepState::StateA), StepState::StateB);
        assert_eq!(advance(StepState::StateB), StepState::StateA);
    }

    #[test]
    fn test_roles_never_coincide() {
        let mut scheduler = StepScheduler::new();
        for _ in 0..16 {
            let roles = scheduler.roles();
            assert_ne!(roles.read(), roles.write());
            commit(&mut scheduler);
        }
    }

    #[test]
    fn test_ping_pong_invariant() {
        let mut scheduler = StepScheduler::new();
        for _ in 0..32 {
            let before = scheduler.roles();
            commit(&mut scheduler);
            let after = scheduler.roles();
            assert_eq!(before.write(), after.read());
            assert_eq!(before.read(), after.write());
        }
        assert_eq!(scheduler.steps_completed(), 32);
    }

    #[test]
    fn test_even_step_parity() {
        let mut scheduler = StepScheduler::new();
        assert_eq!(scheduler.state(), StepState::StateA);
        commit(&mut scheduler);
        assert_eq!(scheduler.state(), StepState::StateB);
        commit(&mut scheduler);
        assert_eq!(scheduler.state(), StepState::StateA);
    }

    #[test]
    fn test_latest_follows_last_write() {
        let mut scheduler = StepScheduler::new();
        let written = scheduler.roles().write();
        scheduler.advance(StepCommitted::new(written));
        assert_eq!(scheduler.latest(), written);
    }
}
