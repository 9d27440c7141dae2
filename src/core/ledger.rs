use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::core::error::HrError;

/// The seven leave categories tracked on the employee ledger.
///
/// `el`, `sl` and `cl` are deduction-type: approval subtracts `days` from the
/// balance and submission requires enough balance to cover the request.
/// `od`, `lwp`, `lhd` and `others` are credit-type: approval adds `days`
/// instead. The asymmetry is a recorded business rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LeaveCategory {
    El,
    Sl,
    Cl,
    Od,
    Lwp,
    Lhd,
    Others,
}

impl LeaveCategory {
    pub fn parse(raw: &str) -> Result<Self, HrError> {
        raw.trim().parse().map_err(|_| {
            HrError::Validation(format!(
                "unknown leave category `{}`: expected one of el, sl, cl, od, lwp, lhd, others",
                raw
            ))
        })
    }

    pub fn is_deduction(&self) -> bool {
        matches!(self, LeaveCategory::El | LeaveCategory::Sl | LeaveCategory::Cl)
    }

    /// Ledger column on the `employees` table. Fixed identifiers, never
    /// interpolated from user input.
    pub fn column(&self) -> &'static str {
        match self {
            LeaveCategory::El => "el",
            LeaveCategory::Sl => "sl",
            LeaveCategory::Cl => "cl",
            LeaveCategory::Od => "od",
            LeaveCategory::Lwp => "lwp",
            LeaveCategory::Lhd => "lhd",
            LeaveCategory::Others => "others",
        }
    }

    /// Signed balance change applied when a leave of this category is
    /// approved. Reversal applies the negation.
    pub fn approval_delta(&self, days: f64) -> f64 {
        if self.is_deduction() { -days } else { days }
    }
}

/// Per-employee leave counters, in days.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub el: f64,
    pub sl: f64,
    pub cl: f64,
    pub od: f64,
    pub lwp: f64,
    pub lhd: f64,
    pub others: f64,
}

impl LeaveBalance {
    pub fn get(&self, category: LeaveCategory) -> f64 {
        match category {
            LeaveCategory::El => self.el,
            LeaveCategory::Sl => self.sl,
            LeaveCategory::Cl => self.cl,
            LeaveCategory::Od => self.od,
            LeaveCategory::Lwp => self.lwp,
            LeaveCategory::Lhd => self.lhd,
            LeaveCategory::Others => self.others,
        }
    }

    fn get_mut(&mut self, category: LeaveCategory) -> &mut f64 {
        match category {
            LeaveCategory::El => &mut self.el,
            LeaveCategory::Sl => &mut self.sl,
            LeaveCategory::Cl => &mut self.cl,
            LeaveCategory::Od => &mut self.od,
            LeaveCategory::Lwp => &mut self.lwp,
            LeaveCategory::Lhd => &mut self.lhd,
            LeaveCategory::Others => &mut self.others,
        }
    }

    /// Submission-time check. Credit-type categories always pass.
    pub fn covers(&self, category: LeaveCategory, days: f64) -> bool {
        !category.is_deduction() || self.get(category) >= days
    }

    /// Apply the ledger effect of an approval. Fails with
    /// `InsufficientBalance` instead of driving a deduction-type counter
    /// negative; the balance is checked against its *current* value, not a
    /// value read earlier.
    pub fn apply_approval(&mut self, category: LeaveCategory, days: f64) -> Result<(), HrError> {
        if !self.covers(category, days) {
            return Err(HrError::InsufficientBalance {
                category: category.to_string(),
                available: self.get(category),
                requested: days,
            });
        }
        *self.get_mut(category) += category.approval_delta(days);
        Ok(())
    }

    /// First category holding a negative counter, if any. Used to vet
    /// caller-supplied opening balances.
    pub fn negative_category(&self) -> Option<(LeaveCategory, f64)> {
        use strum::IntoEnumIterator;
        LeaveCategory::iter()
            .map(|c| (c, self.get(c)))
            .find(|(_, v)| *v < 0.0)
    }

    /// Undo a previously applied approval (approved -> rejected reversal, or
    /// deletion of an approved request). Unconditional: reversal restores
    /// the pre-approval value exactly.
    pub fn reverse_approval(&mut self, category: LeaveCategory, days: f64) {
        *self.get_mut(category) -= category.approval_delta(days);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn category_codes_parse_case_insensitive() {
        assert_eq!(LeaveCategory::parse("el").unwrap(), LeaveCategory::El);
        assert_eq!(LeaveCategory::parse("EL").unwrap(), LeaveCategory::El);
        assert_eq!(LeaveCategory::parse(" Sl ").unwrap(), LeaveCategory::Sl);
        assert_eq!(LeaveCategory::parse("OTHERS").unwrap(), LeaveCategory::Others);
        assert!(LeaveCategory::parse("annual").is_err());
        assert!(LeaveCategory::parse("").is_err());
    }

    #[test]
    fn deduction_and_credit_split() {
        let deduction: Vec<_> = LeaveCategory::iter().filter(|c| c.is_deduction()).collect();
        assert_eq!(
            deduction,
            vec![LeaveCategory::El, LeaveCategory::Sl, LeaveCategory::Cl]
        );
        assert!(!LeaveCategory::Od.is_deduction());
        assert!(!LeaveCategory::Lwp.is_deduction());
        assert!(!LeaveCategory::Lhd.is_deduction());
        assert!(!LeaveCategory::Others.is_deduction());
    }

    #[test]
    fn approval_deducts_and_reversal_restores() {
        let mut balance = LeaveBalance { el: 5.0, ..Default::default() };

        balance.apply_approval(LeaveCategory::El, 3.0).unwrap();
        assert_eq!(balance.el, 2.0);

        balance.reverse_approval(LeaveCategory::El, 3.0);
        assert_eq!(balance.el, 5.0);
    }

    #[test]
    fn credit_type_symmetry() {
        let mut balance = LeaveBalance::default();

        balance.apply_approval(LeaveCategory::Od, 2.5).unwrap();
        assert_eq!(balance.od, 2.5);

        balance.reverse_approval(LeaveCategory::Od, 2.5);
        assert_eq!(balance.od, 0.0);
    }

    #[test]
    fn insufficient_balance_rejected_before_mutation() {
        let mut balance = LeaveBalance { cl: 1.0, ..Default::default() };

        let err = balance.apply_approval(LeaveCategory::Cl, 2.0).unwrap_err();
        match err {
            HrError::InsufficientBalance { available, requested, .. } => {
                assert_eq!(available, 1.0);
                assert_eq!(requested, 2.0);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
        // untouched on failure
        assert_eq!(balance.cl, 1.0);
    }

    #[test]
    fn balance_conservation_over_action_sequence() {
        let mut balance = LeaveBalance { el: 10.0, ..Default::default() };
        let before = balance.el;

        let approvals = [3.0, 2.0, 4.0];
        for days in approvals {
            balance.apply_approval(LeaveCategory::El, days).unwrap();
        }
        // one of them reversed
        balance.reverse_approval(LeaveCategory::El, 2.0);

        let approved: f64 = approvals.iter().sum();
        // 10 - 9 + 2 = 3
        assert_eq!(balance.el, before - approved + 2.0);

        // the remaining 3 days cover a 2-day request but not a 4-day one
        assert!(balance.covers(LeaveCategory::El, 2.0));
        assert!(!balance.covers(LeaveCategory::El, 4.0));
        assert!(balance.apply_approval(LeaveCategory::El, 4.0).is_err());
    }

    #[test]
    fn negative_counters_are_flagged() {
        let balance = LeaveBalance { sl: -0.5, ..Default::default() };
        assert_eq!(balance.negative_category(), Some((LeaveCategory::Sl, -0.5)));
        assert_eq!(LeaveBalance::default().negative_category(), None);
    }

    #[test]
    fn credit_categories_ignore_available_balance() {
        let balance = LeaveBalance::default();
        assert!(balance.covers(LeaveCategory::Lwp, 30.0));
        assert!(!balance.covers(LeaveCategory::Sl, 0.5));
    }
}
