//! Transfer state machine states

use std::fmt;

/// Lifecycle of one file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferState {
    Start,
    ConditionalCheck,
    NotModified,
    PreconditionFailed,
    RangeSelect,
    Full,
    Partial,
    Streaming,
    End,
    Error,
}

impl TransferState {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Error)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::ConditionalCheck => "CONDITIONAL_CHECK",
            Self::NotModified => "NOT_MODIFIED",
            Self::PreconditionFailed => "PRECONDITION_FAILED",
            Self::RangeSelect => "RANGE_SELECT",
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
            Self::Streaming => "STREAMING",
            Self::End => "END",
            Self::Error => "ERROR",
        }
    }

    /// Whether `next` is a legal successor of `self`
    ///
    /// Every non-terminal state may fail; `Start` ends directly on a
    /// directory redirect and `Full`/`Partial` end directly on HEAD.
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Self::Error) {
            return true;
        }
        matches!(
            (self, next),
            (Self::Start, Self::ConditionalCheck | Self::End)
                | (
                    Self::ConditionalCheck,
                    Self::NotModified | Self::PreconditionFailed | Self::RangeSelect
                )
                | (Self::NotModified, Self::End)
                | (Self::RangeSelect, Self::Full | Self::Partial)
                | (Self::Full | Self::Partial, Self::Streaming | Self::End)
                | (Self::Streaming, Self::End)
        )
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::End.is_terminal());
        assert!(TransferState::Error.is_terminal());
        assert!(!TransferState::Streaming.is_terminal());
    }

    #[test]
    fn test_transitions() {
        use TransferState::*;
        assert!(Start.can_advance_to(ConditionalCheck));
        assert!(ConditionalCheck.can_advance_to(NotModified));
        assert!(PreconditionFailed.can_advance_to(Error));
        assert!(Partial.can_advance_to(End));
        assert!(Streaming.can_advance_to(Error));

        assert!(!Start.can_advance_to(Streaming));
        assert!(!NotModified.can_advance_to(Streaming));
        assert!(!End.can_advance_to(Error));
        assert!(!Error.can_advance_to(End));
    }
}
