use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::role_store::{AuditAction, ChangeOutcome, RoleChange, RoleMutation, RoleStore};
use super::role_view::AdminUserRow;
use crate::{
    auth::{Caller, Role},
    config::DirectoryConfig,
    db::{dao::DaoLayerError, entities::profile},
};

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Storage(#[from] DaoLayerError),
}

pub type GateResult<T> = Result<T, GateError>;

const SUPER_ADMIN_REQUIRED: &str = "Only super admins can change user roles";
const ADMIN_REQUIRED: &str = "Only admins can view admin users";
const SUPER_ADMIN_PROTECTED: &str = "Cannot modify super admin users";

pub fn parse_role(raw: &str) -> GateResult<Role> {
    Role::try_from(raw).map_err(|_| GateError::InvalidArgument(format!("Invalid role: {raw}")))
}

/// Guarded role transitions over the role registry.
///
/// Every operation authorizes against the caller's own assignment, which is
/// read fresh on each call. `super_admin` assignments are absorbing: no
/// operation here changes or removes one.
#[derive(Clone)]
pub struct RoleGate {
    store: Arc<dyn RoleStore>,
    search_min_chars: usize,
    search_limit: u64,
}

impl RoleGate {
    pub fn new(store: Arc<dyn RoleStore>, cfg: &DirectoryConfig) -> Self {
        Self {
            store,
            search_min_chars: cfg.search_min_chars,
            search_limit: cfg.search_limit,
        }
    }

    pub async fn promote(&self, caller: &Caller, target: Uuid, role: Role) -> GateResult<()> {
        self.require_super_admin(caller).await?;

        if self.store.find_profile(target).await?.is_none() {
            return Err(GateError::NotFound(format!("User {target} not found")));
        }
        self.ensure_mutable(target).await?;

        let mutation = match role {
            Role::User => RoleMutation::Clear,
            elevated => RoleMutation::Assign(elevated),
        };
        let outcome = self
            .store
            .apply_change(RoleChange {
                actor: Some(caller.user_id),
                target,
                mutation,
                action: AuditAction::Promote,
            })
            .await?;
        ensure_applied(outcome)?;

        info!(actor = %caller.user_id, %target, %role, "user role changed");
        Ok(())
    }

    /// Idempotent: demoting a user without an assignment succeeds.
    pub async fn demote(&self, caller: &Caller, target: Uuid) -> GateResult<()> {
        self.require_super_admin(caller).await?;
        self.ensure_mutable(target).await?;

        let outcome = self
            .store
            .apply_change(RoleChange {
                actor: Some(caller.user_id),
                target,
                mutation: RoleMutation::Clear,
                action: AuditAction::Demote,
            })
            .await?;
        ensure_applied(outcome)?;

        info!(actor = %caller.user_id, %target, role = %Role::User, "user demoted");
        Ok(())
    }

    pub async fn list_all_with_roles(&self, caller: &Caller) -> GateResult<Vec<AdminUserRow>> {
        if !self.role_of(caller.user_id).await?.is_admin() {
            return Err(GateError::Unauthorized(ADMIN_REQUIRED.to_string()));
        }

        let rows = self.store.list_with_roles().await?;
        Ok(rows
            .into_iter()
            .map(|(profile, assignment)| AdminUserRow::new(profile, assignment))
            .collect())
    }

    /// Unassigned directory entries whose email contains `query`. Queries
    /// shorter than the configured minimum return nothing without a lookup.
    pub async fn search_directory(&self, query: &str) -> GateResult<Vec<profile::Model>> {
        let query = query.trim();
        if query.chars().count() < self.search_min_chars {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .search_unassigned(query, self.search_limit)
            .await?)
    }

    pub async fn role_of(&self, user_id: Uuid) -> GateResult<Role> {
        let assignment = self.store.find_assignment(user_id).await?;
        Ok(Role::of_assignment(assignment.as_ref()))
    }

    async fn require_super_admin(&self, caller: &Caller) -> GateResult<()> {
        if self.role_of(caller.user_id).await? != Role::SuperAdmin {
            return Err(GateError::Unauthorized(SUPER_ADMIN_REQUIRED.to_string()));
        }
        Ok(())
    }

    async fn ensure_mutable(&self, target: Uuid) -> GateResult<()> {
        if self.role_of(target).await? == Role::SuperAdmin {
            return Err(GateError::Forbidden(SUPER_ADMIN_PROTECTED.to_string()));
        }
        Ok(())
    }
}

/// A concurrent `super_admin` grant can land between `ensure_mutable` and the
/// write; the store then reports the row as protected.
fn ensure_applied(outcome: ChangeOutcome) -> GateResult<()> {
    match outcome {
        ChangeOutcome::Applied(_) => Ok(()),
        ChangeOutcome::Protected => Err(GateError::Forbidden(SUPER_ADMIN_PROTECTED.to_string())),
    }
}
