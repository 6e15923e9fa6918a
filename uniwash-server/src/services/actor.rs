use crate::models::BusinessRole;

/// Verified identity a core operation runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// A customer acting on their own reservations.
    EndUser { user_id: i32 },
    /// A member of the business that owns the device.
    BusinessAgent {
        user_id: i32,
        business_id: i32,
        role: BusinessRole,
    },
}

impl Actor {
    pub fn user_id(&self) -> i32 {
        match self {
            Actor::EndUser { user_id } => *user_id,
            Actor::BusinessAgent { user_id, .. } => *user_id,
        }
    }

    /// Whether the actor may act on a resource of `business_id` owned by `owner_id`.
    pub fn may_access(&self, business_id: i32, owner_id: i32) -> bool {
        match self {
            Actor::EndUser { user_id } => *user_id == owner_id,
            Actor::BusinessAgent {
                business_id: agent_business,
                ..
            } => *agent_business == business_id,
        }
    }

    pub fn can_manage_devices(&self) -> bool {
        matches!(
            self,
            Actor::BusinessAgent {
                role: BusinessRole::Owner | BusinessRole::Admin,
                ..
            }
        )
    }
}
