//! Role → permission table
//!
//! Permission strings are `action:resource` (e.g. `delete:students`). The
//! table is built once at startup, shared behind an `Arc` and never mutated.

use std::collections::{BTreeSet, HashMap};

use crate::models::user::Role;

pub const READ_BOOKS: &str = "read:books";
pub const WRITE_BOOKS: &str = "write:books";
pub const DELETE_BOOKS: &str = "delete:books";
pub const READ_STUDENTS: &str = "read:students";
pub const WRITE_STUDENTS: &str = "write:students";
pub const DELETE_STUDENTS: &str = "delete:students";
pub const READ_BORROWS: &str = "read:borrows";
pub const CREATE_BORROWS: &str = "create:borrows";
pub const WRITE_BORROWS: &str = "write:borrows";
pub const READ_PAYMENTS: &str = "read:payments";
pub const WRITE_PAYMENTS: &str = "write:payments";
pub const READ_NOTIFICATIONS: &str = "read:notifications";
pub const WRITE_NOTIFICATIONS: &str = "write:notifications";
pub const READ_REPORTS: &str = "read:reports";

const LIBRARY_OWNER_PERMISSIONS: &[&str] = &[
    READ_BOOKS,
    WRITE_BOOKS,
    DELETE_BOOKS,
    READ_STUDENTS,
    WRITE_STUDENTS,
    DELETE_STUDENTS,
    READ_BORROWS,
    CREATE_BORROWS,
    WRITE_BORROWS,
    READ_PAYMENTS,
    WRITE_PAYMENTS,
    READ_NOTIFICATIONS,
    WRITE_NOTIFICATIONS,
    READ_REPORTS,
];

const STUDENT_PERMISSIONS: &[&str] = &[
    READ_BOOKS,
    CREATE_BORROWS,
    READ_BORROWS,
    READ_PAYMENTS,
    READ_NOTIFICATIONS,
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PermissionTableError {
    #[error("role {0} has an empty permission set")]
    EmptyRole(String),
    #[error("permission {0:?} is not of the form action:resource")]
    InvalidPermission(String),
}

/// Immutable mapping from canonical role to its permission set
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: HashMap<Role, BTreeSet<String>>,
}

impl PermissionTable {
    /// Build a table, rejecting empty sets and malformed permission strings
    pub fn new<I, P>(entries: I) -> Result<Self, PermissionTableError>
    where
        I: IntoIterator<Item = (Role, P)>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut grants = HashMap::new();
        for (role, permissions) in entries {
            let set: BTreeSet<String> = permissions.into_iter().map(Into::into).collect();
            if set.is_empty() {
                return Err(PermissionTableError::EmptyRole(role.to_string()));
            }
            if let Some(bad) = set.iter().find(|p| !is_well_formed(p)) {
                return Err(PermissionTableError::InvalidPermission(bad.clone()));
            }
            grants.insert(role, set);
        }
        Ok(Self { grants })
    }

    /// The library's built-in grants
    pub fn standard() -> Result<Self, PermissionTableError> {
        Self::new([
            (Role::LibraryOwner, LIBRARY_OWNER_PERMISSIONS.iter().copied()),
            (Role::Student, STUDENT_PERMISSIONS.iter().copied()),
        ])
    }

    /// Roles missing from the table have no permissions at all
    pub fn allows(&self, role: &Role, permission: &str) -> bool {
        self.grants
            .get(role)
            .map(|set| set.contains(permission))
            .unwrap_or(false)
    }
}

fn is_well_formed(permission: &str) -> bool {
    matches!(
        permission.split_once(':'),
        Some((action, resource)) if !action.is_empty() && !resource.is_empty() && !resource.contains(':')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_holds_every_listed_permission() {
        let table = PermissionTable::standard().unwrap();
        for permission in LIBRARY_OWNER_PERMISSIONS.iter().chain(STUDENT_PERMISSIONS) {
            assert!(table.allows(&Role::LibraryOwner, permission), "{}", permission);
        }
    }

    #[test]
    fn student_is_denied_owner_only_permissions() {
        let table = PermissionTable::standard().unwrap();
        assert!(!table.allows(&Role::Student, DELETE_STUDENTS));
        assert!(!table.allows(&Role::Student, WRITE_BOOKS));
        assert!(table.allows(&Role::Student, READ_BOOKS));
    }

    #[test]
    fn unknown_roles_are_always_denied() {
        let table = PermissionTable::standard().unwrap();
        let guest = Role::Unrecognized("guest".to_string());
        for permission in LIBRARY_OWNER_PERMISSIONS {
            assert!(!table.allows(&guest, permission), "{}", permission);
        }
    }

    #[test]
    fn standard_table_passes_construction_checks() {
        let table = PermissionTable::standard().unwrap();
        assert_eq!(table.grants.len(), 2);
        assert!(table.grants.values().all(|set| !set.is_empty()));
    }

    #[test]
    fn construction_rejects_empty_and_malformed_sets() {
        let empty: Vec<&str> = Vec::new();
        assert_eq!(
            PermissionTable::new([(Role::Student, empty)]).unwrap_err(),
            PermissionTableError::EmptyRole("STUDENT".to_string())
        );
        assert!(matches!(
            PermissionTable::new([(Role::Student, vec!["readbooks"])]),
            Err(PermissionTableError::InvalidPermission(_))
        ));
        assert!(PermissionTable::new([(Role::Student, vec![READ_BOOKS])]).is_ok());
    }
}
