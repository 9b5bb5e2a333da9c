//! Who may change a student's activity registration.

use crate::auth::User;

/// Whether `actor` may sign `target_email` up for, or unregister them from,
/// an activity.
///
/// Administrators and club leaders may manage anyone. Everyone else,
/// teachers included, may only manage their own registration. Anonymous
/// callers may manage nobody's.
pub fn can_manage_registration(actor: Option<&User>, target_email: &str) -> bool {
    match actor {
        Some(user) => user.role.manages_registrations() || user.email == target_email,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn actor(email: &str, role: Role) -> User {
        User {
            email: email.into(),
            name: "Test".into(),
            role,
            password_hash: String::new(),
        }
    }

    #[test]
    fn anonymous_is_always_denied() {
        assert!(!can_manage_registration(None, "emma@mergington.edu"));
        assert!(!can_manage_registration(None, ""));
    }

    #[test]
    fn privileged_roles_manage_anyone() {
        for role in [Role::Administrator, Role::ClubLeader] {
            let user = actor("staff@mergington.edu", role);
            assert!(can_manage_registration(Some(&user), "emma@mergington.edu"));
            assert!(can_manage_registration(Some(&user), "staff@mergington.edu"));
        }
    }

    #[test]
    fn students_and_teachers_only_manage_themselves() {
        for role in [Role::Student, Role::Teacher] {
            let user = actor("emma@mergington.edu", role);
            assert!(can_manage_registration(Some(&user), "emma@mergington.edu"));
            assert!(!can_manage_registration(Some(&user), "liam@mergington.edu"));
        }
    }

    #[test]
    fn self_service_match_is_exact() {
        let user = actor("emma@mergington.edu", Role::Student);
        assert!(!can_manage_registration(Some(&user), "EMMA@mergington.edu"));
        assert!(!can_manage_registration(Some(&user), " emma@mergington.edu"));
    }
}
