//! Advisory table of standard action names.
//!
//! These constants are a naming convention, not a closed set: the store never
//! validates `action` against them, and arbitrary dot-namespaced strings stay
//! legal. The first segment is a display category only.

/// User lifecycle and authentication.
pub mod user {
    /// A user signed in.
    pub const SIGNED_IN: &str = "user.signed_in";
    /// A user signed out.
    pub const SIGNED_OUT: &str = "user.signed_out";
    /// A user account was created.
    pub const CREATED: &str = "user.created";
    /// A user account was updated.
    pub const UPDATED: &str = "user.updated";
    /// A user account was deleted.
    pub const DELETED: &str = "user.deleted";
    /// A password was changed.
    pub const PASSWORD_CHANGED: &str = "user.password_changed";
    /// A sign-in attempt failed.
    pub const SIGN_IN_FAILED: &str = "user.sign_in_failed";
}

/// API key management.
pub mod api_key {
    /// An API key was created.
    pub const CREATED: &str = "api_key.created";
    /// An API key was revoked.
    pub const REVOKED: &str = "api_key.revoked";
    /// An API key was rotated.
    pub const ROTATED: &str = "api_key.rotated";
}

/// Organization membership and settings.
pub mod organization {
    /// An organization was created.
    pub const CREATED: &str = "organization.created";
    /// Organization settings changed.
    pub const UPDATED: &str = "organization.updated";
    /// An organization was deleted.
    pub const DELETED: &str = "organization.deleted";
    /// A member was invited.
    pub const MEMBER_INVITED: &str = "organization.member_invited";
    /// A member was removed.
    pub const MEMBER_REMOVED: &str = "organization.member_removed";
    /// A member's role changed.
    pub const MEMBER_ROLE_CHANGED: &str = "organization.member_role_changed";
}

/// Generic resource CRUD.
pub mod resource {
    /// A resource was created.
    pub const CREATED: &str = "resource.created";
    /// A resource was read.
    pub const READ: &str = "resource.read";
    /// A resource was updated.
    pub const UPDATED: &str = "resource.updated";
    /// A resource was deleted.
    pub const DELETED: &str = "resource.deleted";
    /// A resource was exported.
    pub const EXPORTED: &str = "resource.exported";
}

/// System-originated events.
pub mod system {
    /// A scheduled job ran.
    pub const JOB_RAN: &str = "system.job_ran";
    /// Configuration was reloaded.
    pub const CONFIG_RELOADED: &str = "system.config_reloaded";
    /// A maintenance window started.
    pub const MAINTENANCE_STARTED: &str = "system.maintenance_started";
}

/// Returns the display category of an action: everything before the first dot,
/// or the whole string when there is no dot.
pub fn category(action: &str) -> &str {
    action.split('.').next().unwrap_or(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_first_segment() {
        assert_eq!(category(user::SIGNED_IN), "user");
        assert_eq!(category("billing.invoice.paid"), "billing");
        assert_eq!(category("custom_action"), "custom_action");
        assert_eq!(category(""), "");
    }

    #[test]
    fn standard_actions_are_dot_namespaced() {
        for action in [
            user::SIGNED_IN,
            user::SIGNED_OUT,
            api_key::CREATED,
            organization::MEMBER_INVITED,
            resource::EXPORTED,
            system::JOB_RAN,
        ] {
            assert!(action.contains('.'), "{action} should be dot-namespaced");
            assert!(action.starts_with(category(action)));
        }
    }
}
