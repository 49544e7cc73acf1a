use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControlFlow {
    Return,
    Continue,
    Break,
}

impl ControlFlow {
    fn bit(self) -> u8 {
        match self {
            ControlFlow::Return => 1,
            ControlFlow::Continue => 1 << 1,
            ControlFlow::Break => 1 << 2,
        }
    }
}

/// Pending control transfers, checked after every statement of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlowState {
    bits: u8,
}

impl ControlFlowState {
    pub fn set(&mut self, flow: ControlFlow) {
        self.bits |= flow.bit();
    }

    pub fn clear(&mut self, flow: ControlFlow) {
        self.bits &= !flow.bit();
    }

    pub fn is_set(&self, flow: ControlFlow) -> bool {
        self.bits & flow.bit() != 0
    }

    /// Whether the current sequence has to stop.
    pub fn is_interrupted(&self) -> bool {
        self.bits != 0
    }

    /// The loop-only transfer that is pending, if any.
    pub fn loop_transfer(&self) -> Option<ControlFlow> {
        [ControlFlow::Break, ControlFlow::Continue]
            .into_iter()
            .find(|flow| self.is_set(*flow))
    }

    pub fn reset(&mut self) {
        self.bits = 0;
    }
}

/// Outcome of trying the arms of an `if` or `when`; kept apart from
/// [`ControlFlowState`] so a taken arm is never mistaken for a `return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Taken,
    Skipped,
}

/// Whether an `if`/`when` is used as a statement or for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Statement,
    Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_independent() {
        let mut state = ControlFlowState::default();
        assert!(!state.is_interrupted());
        state.set(ControlFlow::Return);
        state.set(ControlFlow::Break);
        assert!(state.is_set(ControlFlow::Return));
        assert_eq!(state.loop_transfer(), Some(ControlFlow::Break));
        state.clear(ControlFlow::Break);
        assert_eq!(state.loop_transfer(), None);
        assert!(state.is_interrupted());
        state.reset();
        assert!(!state.is_interrupted());
    }
}
