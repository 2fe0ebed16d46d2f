//! Authenticated caller identity
//!
//! Supplied by the identity layer and passed explicitly into every
//! scheduler and payment call.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub is_admin: bool,
}

impl Principal {
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: i64) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    /// Owners and administrators may act on a resource.
    pub fn can_act_for(&self, owner_id: i64) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}
