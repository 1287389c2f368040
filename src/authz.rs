//! Pure authorization decisions over already-fetched data.

use crate::models::{CurrentUser, FileRecord};

/// Whether a record shows up for this user at all: owners always see their
/// own files, everyone sees files whose shared flag is set.
pub fn visible_to(user: &CurrentUser, record: &FileRecord) -> bool {
    record.uploaded_by == user.id || record.shared
}

/// Only the owner may flip the shared flag. Admins are deliberately not
/// included here.
pub fn can_toggle_share(user: &CurrentUser, record: &FileRecord) -> bool {
    record.uploaded_by == user.id
}

/// Deletion is restricted to admins.
pub fn can_delete(user: &CurrentUser) -> bool {
    user.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn user(id: &str, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            role,
        }
    }

    fn record(owner: &str, shared: bool) -> FileRecord {
        FileRecord {
            id: "f1".to_string(),
            original_filename: "report.pdf".to_string(),
            stored_filename: "1700000000000-abc123-report.pdf".to_string(),
            path: "uploads/1700000000000-abc123-report.pdf".to_string(),
            uploaded_by: owner.to_string(),
            size: 1024,
            shared,
            uploaded_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn owner_always_sees_own_file() {
        let owner = user("u1", UserRole::User);
        assert!(visible_to(&owner, &record("u1", false)));
        assert!(visible_to(&owner, &record("u1", true)));
    }

    #[test]
    fn non_owner_sees_only_shared() {
        let other = user("u2", UserRole::User);
        assert!(!visible_to(&other, &record("u1", false)));
        assert!(visible_to(&other, &record("u1", true)));
    }

    #[test]
    fn only_owner_toggles_share() {
        let owner = user("u1", UserRole::User);
        let other = user("u2", UserRole::User);
        let admin = user("a1", UserRole::Admin);
        let rec = record("u1", true);

        assert!(can_toggle_share(&owner, &rec));
        assert!(!can_toggle_share(&other, &rec));
        assert!(!can_toggle_share(&admin, &rec));
    }

    #[test]
    fn only_admin_deletes() {
        assert!(can_delete(&user("a1", UserRole::Admin)));
        assert!(!can_delete(&user("u1", UserRole::User)));
    }
}
