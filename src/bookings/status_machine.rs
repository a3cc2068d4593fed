use crate::bookings::error::BookingError;
use crate::bookings::models::BookingStatus;

/// Service for managing booking status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → InProgress, Cancelled, NoShow
    /// - InProgress → Completed
    /// - Completed, Cancelled, NoShow → (terminal, no transitions)
    /// - Any status → Same status (idempotent)
    pub fn is_valid_transition(from: BookingStatus, to: BookingStatus) -> bool {
        // Same status is always valid (idempotent)
        if from == to {
            return true;
        }

        match (from, to) {
            // From Pending
            (BookingStatus::Pending, BookingStatus::Confirmed) => true,
            (BookingStatus::Pending, BookingStatus::Cancelled) => true,

            // From Confirmed
            (BookingStatus::Confirmed, BookingStatus::InProgress) => true,
            (BookingStatus::Confirmed, BookingStatus::Cancelled) => true,
            (BookingStatus::Confirmed, BookingStatus::NoShow) => true,

            // From InProgress
            (BookingStatus::InProgress, BookingStatus::Completed) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    pub fn transition(
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<BookingStatus, BookingError> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(BookingError::InvalidStatusTransition { from, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    #[test]
    fn pending_transitions() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::Confirmed
        ));
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::Cancelled
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::InProgress
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::Completed
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Pending,
            BookingStatus::NoShow
        ));
    }

    #[test]
    fn confirmed_transitions() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::InProgress
        ));
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::Cancelled
        ));
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::NoShow
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::Completed
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::Confirmed,
            BookingStatus::Pending
        ));
    }

    #[test]
    fn in_progress_transitions() {
        assert!(StatusMachine::is_valid_transition(
            BookingStatus::InProgress,
            BookingStatus::Completed
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::InProgress,
            BookingStatus::Cancelled
        ));
        assert!(!StatusMachine::is_valid_transition(
            BookingStatus::InProgress,
            BookingStatus::NoShow
        ));
    }

    #[test]
    fn terminal_statuses_admit_no_exits() {
        for terminal in [
            BookingStatus::Completed,
            BookingStatus::Cancelled,
            BookingStatus::NoShow,
        ] {
            for to in ALL_STATUSES {
                if to != terminal {
                    assert!(
                        !StatusMachine::is_valid_transition(terminal, to),
                        "{} should not transition to {}",
                        terminal,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn same_status_is_idempotent() {
        for status in ALL_STATUSES {
            assert!(StatusMachine::is_valid_transition(status, status));
        }
    }

    #[test]
    fn transition_returns_target_or_error() {
        assert_eq!(
            StatusMachine::transition(BookingStatus::Pending, BookingStatus::Confirmed).unwrap(),
            BookingStatus::Confirmed
        );
        let err = StatusMachine::transition(BookingStatus::Completed, BookingStatus::Pending)
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidStatusTransition {
                from: BookingStatus::Completed,
                to: BookingStatus::Pending,
            }
        ));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = BookingStatus> {
        prop_oneof![
            Just(BookingStatus::Pending),
            Just(BookingStatus::Confirmed),
            Just(BookingStatus::InProgress),
            Just(BookingStatus::Completed),
            Just(BookingStatus::Cancelled),
            Just(BookingStatus::NoShow),
        ]
    }

    /// Terminal statuses never transition to a different status
    #[test]
    fn prop_terminal_statuses_are_absorbing() {
        proptest!(|(to in status_strategy())| {
            for terminal in [
                BookingStatus::Completed,
                BookingStatus::Cancelled,
                BookingStatus::NoShow,
            ] {
                if to != terminal {
                    prop_assert!(!StatusMachine::is_valid_transition(terminal, to));
                }
            }
        });
    }

    /// A valid transition target is either the same status or a forward step
    #[test]
    fn prop_no_transition_reenters_pending() {
        proptest!(|(from in status_strategy())| {
            if from != BookingStatus::Pending {
                prop_assert!(!StatusMachine::is_valid_transition(from, BookingStatus::Pending));
            }
        });
    }
}
