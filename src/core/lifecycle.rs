use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::core::error::HrError;
use crate::core::ledger::LeaveCategory;

/// Status of an approvable request. Every kind starts `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// Decision submitted by an approver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApprovalAction {
    Approved,
    Rejected,
}

/// Parse the raw action string. Runs before any lookup so a bad action
/// never costs a storage round trip.
pub fn parse_action(raw: &str) -> Result<ApprovalAction, HrError> {
    raw.trim()
        .parse()
        .map_err(|_| HrError::InvalidAction(raw.trim().to_string()))
}

/// The five request kinds sharing the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    Leave,
    Allowance,
    FixedAllowance,
    TravelExpenditure,
    Ltc,
}

impl RequestKind {
    /// Only Leave supports the approved -> rejected reversal path; the
    /// financial kinds are terminal once decided.
    pub fn reversible(&self) -> bool {
        matches!(self, RequestKind::Leave)
    }

    /// Whether an approval of this kind touches the leave ledger. The
    /// financial kinds never do: their gating happens in the CTC
    /// aggregator's status filter instead.
    pub fn affects_ledger(&self) -> bool {
        matches!(self, RequestKind::Leave)
    }
}

/// Ledger side effect a transition carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerEffect {
    None,
    /// Signed day delta on one ledger column, applied in the same
    /// transaction as the status write. `days` is already signed: negative
    /// for a deduction-type approval, positive for a credit-type approval,
    /// negated again on reversal. Appliers add it as-is.
    Adjust { category: LeaveCategory, days: f64 },
}

/// A validated transition: target status plus its ledger effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub to: RequestStatus,
    pub effect: LedgerEffect,
}

/// Decide what a given action does to a request in its current status.
///
/// `leave` carries the category/days of a Leave request and must be `None`
/// for the other kinds. Duplicate actions on an already-decided request are
/// an explicit `InvalidAction`, not a silent no-op.
pub fn plan_transition(
    kind: RequestKind,
    current: RequestStatus,
    action: ApprovalAction,
    leave: Option<(LeaveCategory, f64)>,
) -> Result<Transition, HrError> {
    match (current, action) {
        (RequestStatus::Pending, ApprovalAction::Approved) => Ok(Transition {
            to: RequestStatus::Approved,
            effect: approval_effect(kind, leave),
        }),
        (RequestStatus::Pending, ApprovalAction::Rejected) => Ok(Transition {
            to: RequestStatus::Rejected,
            effect: LedgerEffect::None,
        }),
        (RequestStatus::Approved, ApprovalAction::Rejected) if kind.reversible() => {
            // reversal: give back what was deducted, take back what was credited
            let effect = match leave {
                Some((category, days)) => LedgerEffect::Adjust {
                    category,
                    days: -category.approval_delta(days),
                },
                None => LedgerEffect::None,
            };
            Ok(Transition {
                to: RequestStatus::Rejected,
                effect,
            })
        }
        (current, action) => Err(HrError::InvalidAction(format!(
            "cannot apply `{action}` to a request already {current}"
        ))),
    }
}

fn approval_effect(kind: RequestKind, leave: Option<(LeaveCategory, f64)>) -> LedgerEffect {
    match (kind.affects_ledger(), leave) {
        (true, Some((category, days))) => LedgerEffect::Adjust {
            category,
            days: category.approval_delta(days),
        },
        _ => LedgerEffect::None,
    }
}

/// Ledger effect of deleting a request outright. Deleting an approved Leave
/// reverses its balance effect; anything still pending or rejected never
/// touched the ledger.
pub fn deletion_effect(
    kind: RequestKind,
    current: RequestStatus,
    leave: Option<(LeaveCategory, f64)>,
) -> LedgerEffect {
    match (kind.affects_ledger(), current, leave) {
        (true, RequestStatus::Approved, Some((category, days))) => LedgerEffect::Adjust {
            category,
            days: -category.approval_delta(days),
        },
        _ => LedgerEffect::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parsing_guards_unknown_strings() {
        assert_eq!(parse_action("approved").unwrap(), ApprovalAction::Approved);
        assert_eq!(parse_action("REJECTED").unwrap(), ApprovalAction::Rejected);
        assert_eq!(parse_action(" Approved ").unwrap(), ApprovalAction::Approved);

        for bad in ["approve!", "cancel", "", "pending"] {
            match parse_action(bad) {
                Err(HrError::InvalidAction(_)) => {}
                other => panic!("expected InvalidAction for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn pending_leave_approval_deducts() {
        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Pending,
            ApprovalAction::Approved,
            Some((LeaveCategory::El, 3.0)),
        )
        .unwrap();

        assert_eq!(t.to, RequestStatus::Approved);
        // deduction-type approval carries a negative delta
        assert_eq!(
            t.effect,
            LedgerEffect::Adjust { category: LeaveCategory::El, days: -3.0 }
        );
    }

    #[test]
    fn credit_type_approval_carries_positive_delta() {
        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Pending,
            ApprovalAction::Approved,
            Some((LeaveCategory::Od, 2.0)),
        )
        .unwrap();

        assert_eq!(
            t.effect,
            LedgerEffect::Adjust { category: LeaveCategory::Od, days: 2.0 }
        );
    }

    #[test]
    fn pending_rejection_never_touches_ledger() {
        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Pending,
            ApprovalAction::Rejected,
            Some((LeaveCategory::El, 3.0)),
        )
        .unwrap();

        assert_eq!(t.to, RequestStatus::Rejected);
        assert_eq!(t.effect, LedgerEffect::None);
    }

    #[test]
    fn approved_leave_can_be_reversed() {
        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Approved,
            ApprovalAction::Rejected,
            Some((LeaveCategory::Od, 2.0)),
        )
        .unwrap();

        assert_eq!(t.to, RequestStatus::Rejected);
        // credit-type reversal removes what the approval added
        assert_eq!(
            t.effect,
            LedgerEffect::Adjust { category: LeaveCategory::Od, days: -2.0 }
        );

        // deduction-type reversal gives the days back
        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Approved,
            ApprovalAction::Rejected,
            Some((LeaveCategory::El, 3.0)),
        )
        .unwrap();
        assert_eq!(
            t.effect,
            LedgerEffect::Adjust { category: LeaveCategory::El, days: 3.0 }
        );
    }

    /// Applying the planned deltas the way the storage layer does (plain
    /// addition) must walk the balance 5 -> 2 -> 5 for a 3-day el leave.
    #[test]
    fn planned_deltas_drive_a_stored_balance_additively() {
        let mut el = 5.0;

        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Pending,
            ApprovalAction::Approved,
            Some((LeaveCategory::El, 3.0)),
        )
        .unwrap();
        let LedgerEffect::Adjust { days, .. } = t.effect else {
            panic!("approval must adjust the ledger");
        };
        el += days;
        assert_eq!(el, 2.0);

        let t = plan_transition(
            RequestKind::Leave,
            RequestStatus::Approved,
            ApprovalAction::Rejected,
            Some((LeaveCategory::El, 3.0)),
        )
        .unwrap();
        let LedgerEffect::Adjust { days, .. } = t.effect else {
            panic!("reversal must adjust the ledger");
        };
        el += days;
        assert_eq!(el, 5.0);
    }

    #[test]
    fn financial_kinds_are_terminal_once_decided() {
        for kind in [
            RequestKind::Allowance,
            RequestKind::FixedAllowance,
            RequestKind::TravelExpenditure,
            RequestKind::Ltc,
        ] {
            let err = plan_transition(kind, RequestStatus::Approved, ApprovalAction::Rejected, None)
                .unwrap_err();
            assert!(matches!(err, HrError::InvalidAction(_)), "kind {kind}");
        }
    }

    #[test]
    fn duplicate_action_is_invalid() {
        let err = plan_transition(
            RequestKind::Leave,
            RequestStatus::Approved,
            ApprovalAction::Approved,
            Some((LeaveCategory::El, 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, HrError::InvalidAction(_)));

        let err = plan_transition(
            RequestKind::Allowance,
            RequestStatus::Rejected,
            ApprovalAction::Rejected,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, HrError::InvalidAction(_)));
    }

    #[test]
    fn financial_approval_has_no_ledger_effect() {
        let t = plan_transition(
            RequestKind::FixedAllowance,
            RequestStatus::Pending,
            ApprovalAction::Approved,
            None,
        )
        .unwrap();
        assert_eq!(t.effect, LedgerEffect::None);
    }

    #[test]
    fn deleting_approved_leave_reverses_its_effect() {
        let effect = deletion_effect(
            RequestKind::Leave,
            RequestStatus::Approved,
            Some((LeaveCategory::Sl, 4.0)),
        );
        // sl is deduction-type: deletion credits the days back
        assert_eq!(
            effect,
            LedgerEffect::Adjust { category: LeaveCategory::Sl, days: 4.0 }
        );
        assert_eq!(
            deletion_effect(
                RequestKind::Leave,
                RequestStatus::Approved,
                Some((LeaveCategory::Od, 2.0))
            ),
            LedgerEffect::Adjust { category: LeaveCategory::Od, days: -2.0 }
        );

        assert_eq!(
            deletion_effect(RequestKind::Leave, RequestStatus::Pending, Some((LeaveCategory::Sl, 4.0))),
            LedgerEffect::None
        );
        assert_eq!(
            deletion_effect(RequestKind::Allowance, RequestStatus::Approved, None),
            LedgerEffect::None
        );
    }
}
