use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{
    auth::Role,
    db::entities::{profile, role_assignment},
};

/// A directory entry as shown on the admin users page.
#[derive(Debug, Clone, Serialize)]
pub struct AdminUserRow {
    #[serde(flatten)]
    pub profile: profile::Model,
    pub role_assignment: Option<role_assignment::Model>,
    pub effective_role: Role,
    pub is_admin: bool,
}

impl AdminUserRow {
    pub fn new(profile: profile::Model, assignment: Option<role_assignment::Model>) -> Self {
        let effective_role = Role::of_assignment(assignment.as_ref());
        Self {
            profile,
            is_admin: assignment.is_some(),
            role_assignment: assignment,
            effective_role,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleFilter {
    #[default]
    All,
    User,
    Admin,
    SuperAdmin,
}

impl RoleFilter {
    fn matches(&self, role: Role) -> bool {
        match self {
            RoleFilter::All => true,
            RoleFilter::User => role == Role::User,
            RoleFilter::Admin => role == Role::Admin,
            RoleFilter::SuperAdmin => role == Role::SuperAdmin,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Joined,
    Email,
    Role,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Filter and ordering applied to the admin users list. The default view is
/// every role, newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListView {
    pub role: RoleFilter,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl ListView {
    /// Stable, so applying the same view twice changes nothing.
    pub fn apply(&self, rows: Vec<AdminUserRow>) -> Vec<AdminUserRow> {
        let mut rows: Vec<_> = rows
            .into_iter()
            .filter(|row| self.role.matches(row.effective_role))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = self.compare(a, b);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
        rows
    }

    fn compare(&self, a: &AdminUserRow, b: &AdminUserRow) -> Ordering {
        match self.sort {
            SortKey::Joined => a.profile.created_at.cmp(&b.profile.created_at),
            SortKey::Email => a
                .profile
                .email
                .to_lowercase()
                .cmp(&b.profile.email.to_lowercase()),
            SortKey::Role => a.effective_role.rank().cmp(&b.effective_role.rank()),
        }
    }
}
