use crate::core::error::HrError;

/// Who may decide a request.
///
/// Leave carries an explicit approver list frozen at submission time; the
/// financial kinds have no stored ACL and fall back to the caller's role.
#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalPolicy {
    /// Exactly the employee ids named in `applied_to` at submission.
    Listed(Vec<u64>),
    /// Any holder of an approval-capable role (Admin or Accounts).
    ApprovalRole,
}

/// The caller, reduced to what the router needs. Built from the JWT claims
/// by the HTTP layer; the router itself never looks at tokens.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub employee_id: Option<u64>,
    pub has_approval_role: bool,
}

/// Gate a transition call. Performs no notification and no lookup; it only
/// answers whether this actor may decide under this policy.
pub fn authorize(actor: Actor, policy: &ApprovalPolicy) -> Result<(), HrError> {
    match policy {
        ApprovalPolicy::Listed(approvers) => match actor.employee_id {
            Some(id) if approvers.contains(&id) => Ok(()),
            _ => Err(HrError::Forbidden(
                "only the approvers named on this request may decide it",
            )),
        },
        ApprovalPolicy::ApprovalRole => {
            if actor.has_approval_role {
                Ok(())
            } else {
                Err(HrError::Forbidden("approval-capable role required"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(employee_id: Option<u64>, has_approval_role: bool) -> Actor {
        Actor { employee_id, has_approval_role }
    }

    #[test]
    fn listed_policy_admits_only_named_approvers() {
        let policy = ApprovalPolicy::Listed(vec![10, 20]);

        assert!(authorize(actor(Some(10), false), &policy).is_ok());
        assert!(authorize(actor(Some(20), true), &policy).is_ok());

        // an approval-capable role does not bypass the explicit list
        assert!(matches!(
            authorize(actor(Some(30), true), &policy),
            Err(HrError::Forbidden(_))
        ));
        // caller without an employee profile can never be on the list
        assert!(matches!(
            authorize(actor(None, true), &policy),
            Err(HrError::Forbidden(_))
        ));
    }

    #[test]
    fn role_policy_ignores_identity() {
        let policy = ApprovalPolicy::ApprovalRole;

        assert!(authorize(actor(None, true), &policy).is_ok());
        assert!(authorize(actor(Some(99), true), &policy).is_ok());
        assert!(matches!(
            authorize(actor(Some(10), false), &policy),
            Err(HrError::Forbidden(_))
        ));
    }
}
