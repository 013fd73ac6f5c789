//! Role-based access control.

use store::Role;

/// A discrete capability granted to a role.
///
/// Privileged routes check a permission, never the role name, so roles
/// can be re-cut without touching the route handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Deactivate and reactivate other accounts.
    ManageUsers,
    /// Archive any product listing.
    ModerateCatalog,
}

/// Permissions granted to a role.
pub fn permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::User => &[],
        Role::Admin => &[Permission::ManageUsers, Permission::ModerateCatalog],
    }
}

/// True when `role` carries `permission`.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    permissions(role).contains(&permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_hold_no_permissions() {
        assert!(permissions(Role::User).is_empty());
        assert!(!has_permission(Role::User, Permission::ManageUsers));
        assert!(!has_permission(Role::User, Permission::ModerateCatalog));
    }

    #[test]
    fn admins_manage_users_and_catalog() {
        assert!(has_permission(Role::Admin, Permission::ManageUsers));
        assert!(has_permission(Role::Admin, Permission::ModerateCatalog));
    }
}
