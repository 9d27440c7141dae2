#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Accounts = 3,
    Employee = 4,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Accounts),
            4 => Some(Role::Employee),
            _ => None,
        }
    }

    /// Roles entitled to decide financial requests (Allowance,
    /// FixedAllowance, TravelExpenditure, LTC). No stored ACL for those.
    pub fn can_approve_financial(&self) -> bool {
        matches!(self, Role::Admin | Role::Accounts)
    }
}
