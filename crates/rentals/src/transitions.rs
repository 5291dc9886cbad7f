//! The rental state machine as one explicit, testable table.
//!
//! Every guarded transition in the lifecycle consults this module, so illegal
//! transitions are rejected by a single authority instead of ad hoc status
//! comparisons scattered across call sites.

use rentloop_auth::Role;

use crate::rental::RentalStatus;

/// Action that moves a rental between states.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum RentalAction {
    Approve,
    Reject,
    MarkReturned,
    ConfirmReturn,
}

impl core::fmt::Display for RentalAction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            RentalAction::Approve => "approve",
            RentalAction::Reject => "reject",
            RentalAction::MarkReturned => "mark_returned",
            RentalAction::ConfirmReturn => "confirm_return",
        };
        f.write_str(s)
    }
}

/// Legal transitions: (source status, action) → target status.
///
/// `Rented` is a pure alias of `Approved` for the return guard; nothing in
/// the engine produces it.
const TRANSITIONS: &[(RentalStatus, RentalAction, RentalStatus)] = &[
    (RentalStatus::Pending, RentalAction::Approve, RentalStatus::Approved),
    (RentalStatus::Pending, RentalAction::Reject, RentalStatus::Rejected),
    (RentalStatus::Approved, RentalAction::MarkReturned, RentalStatus::ReturnedPending),
    (RentalStatus::Rented, RentalAction::MarkReturned, RentalStatus::ReturnedPending),
    (RentalStatus::ReturnedPending, RentalAction::ConfirmReturn, RentalStatus::ReturnedConfirmed),
];

/// Target status for `(from, action)`, or `None` when the transition is illegal.
pub fn next_status(from: RentalStatus, action: RentalAction) -> Option<RentalStatus> {
    TRANSITIONS
        .iter()
        .find(|(src, act, _)| *src == from && *act == action)
        .map(|(_, _, dst)| *dst)
}

/// Role an actor must hold to perform `action`.
pub fn required_role(action: RentalAction) -> Role {
    match action {
        RentalAction::Approve | RentalAction::Reject | RentalAction::ConfirmReturn => Role::Store,
        RentalAction::MarkReturned => Role::Customer,
    }
}

/// A status with no outgoing transitions.
pub fn is_terminal(status: RentalStatus) -> bool {
    !TRANSITIONS.iter().any(|(src, _, _)| *src == status)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [RentalStatus; 6] = [
        RentalStatus::Pending,
        RentalStatus::Approved,
        RentalStatus::Rejected,
        RentalStatus::Rented,
        RentalStatus::ReturnedPending,
        RentalStatus::ReturnedConfirmed,
    ];

    const ALL_ACTIONS: [RentalAction; 4] = [
        RentalAction::Approve,
        RentalAction::Reject,
        RentalAction::MarkReturned,
        RentalAction::ConfirmReturn,
    ];

    #[test]
    fn approved_is_reachable_only_from_pending() {
        for status in ALL_STATUSES {
            for action in ALL_ACTIONS {
                if next_status(status, action) == Some(RentalStatus::Approved) {
                    assert_eq!(status, RentalStatus::Pending);
                    assert_eq!(action, RentalAction::Approve);
                }
            }
        }
    }

    #[test]
    fn rejected_and_returned_confirmed_are_terminal() {
        assert!(is_terminal(RentalStatus::Rejected));
        assert!(is_terminal(RentalStatus::ReturnedConfirmed));
        assert!(!is_terminal(RentalStatus::Pending));
        assert!(!is_terminal(RentalStatus::Approved));
        assert!(!is_terminal(RentalStatus::ReturnedPending));
    }

    #[test]
    fn rented_aliases_approved_for_returns() {
        assert_eq!(
            next_status(RentalStatus::Rented, RentalAction::MarkReturned),
            Some(RentalStatus::ReturnedPending)
        );
        assert_eq!(
            next_status(RentalStatus::Approved, RentalAction::MarkReturned),
            Some(RentalStatus::ReturnedPending)
        );
        // But Rented cannot be approved or rejected.
        assert_eq!(next_status(RentalStatus::Rented, RentalAction::Approve), None);
        assert_eq!(next_status(RentalStatus::Rented, RentalAction::Reject), None);
    }

    #[test]
    fn no_cycles_in_the_table() {
        // Every transition strictly advances: its target never transitions
        // back to its source directly or transitively. The table is tiny, so
        // brute-force reachability is fine.
        fn reachable(from: RentalStatus, to: RentalStatus, depth: u8) -> bool {
            if depth == 0 {
                return false;
            }
            ALL_ACTIONS.iter().any(|&a| match next_status(from, a) {
                Some(next) => next == to || reachable(next, to, depth - 1),
                None => false,
            })
        }

        for status in ALL_STATUSES {
            assert!(!reachable(status, status, 8), "cycle through {status:?}");
        }
    }

    #[test]
    fn store_actions_require_store_role() {
        use rentloop_auth::Role;
        assert_eq!(required_role(RentalAction::Approve), Role::Store);
        assert_eq!(required_role(RentalAction::Reject), Role::Store);
        assert_eq!(required_role(RentalAction::ConfirmReturn), Role::Store);
        assert_eq!(required_role(RentalAction::MarkReturned), Role::Customer);
    }
}
