use sea_orm::{DatabaseConnection, TransactionTrait};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::Role,
    db::{
        dao::{
            AuditLogDao, DaoBase, DaoContext, DaoResult, IdentityUpsert, NewAuditEntry,
            RoleAssignmentDao,
        },
        entities::{profile, role_assignment},
    },
};

pub type ProfileWithRole = (profile::Model, Option<role_assignment::Model>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMutation {
    Assign(Role),
    Clear,
}

impl RoleMutation {
    pub fn resulting_role(&self) -> Role {
        match self {
            RoleMutation::Assign(role) => *role,
            RoleMutation::Clear => Role::User,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Promote,
    Demote,
    Bootstrap,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Promote => "promote_user",
            AuditAction::Demote => "demote_user",
            AuditAction::Bootstrap => "bootstrap_super_admin",
        }
    }
}

/// Result of [`RoleStore::apply_change`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Committed with its audit entry; carries the assignment rows written.
    Applied(u64),
    /// The target holds `super_admin`; nothing was written or audited.
    Protected,
}

/// One role mutation together with the audit entry that records it.
#[derive(Debug, Clone)]
pub struct RoleChange {
    pub actor: Option<Uuid>,
    pub target: Uuid,
    pub mutation: RoleMutation,
    pub action: AuditAction,
}

impl RoleChange {
    pub fn audit_entry(&self) -> NewAuditEntry {
        NewAuditEntry {
            actor_id: self.actor,
            action: self.action.as_str(),
            target_id: self.target,
            payload: json!({ "role": self.mutation.resulting_role().as_str() }),
        }
    }
}

/// Storage seen by the role gate and the directory service.
///
/// `apply_change` is atomic: the role write and its audit entry land together
/// or not at all. A target holding `super_admin` at write time yields
/// `ChangeOutcome::Protected` and leaves no trace. A `Clear` on a user without
/// an assignment is still applied and audited.
#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> DaoResult<Option<profile::Model>>;

    async fn find_profile_by_email(&self, email: &str) -> DaoResult<Option<profile::Model>>;

    async fn find_assignment(&self, user_id: Uuid)
    -> DaoResult<Option<role_assignment::Model>>;

    async fn apply_change(&self, change: RoleChange) -> DaoResult<ChangeOutcome>;

    async fn list_with_roles(&self) -> DaoResult<Vec<ProfileWithRole>>;

    async fn search_unassigned(&self, fragment: &str, limit: u64)
    -> DaoResult<Vec<profile::Model>>;

    async fn upsert_profile(&self, identity: IdentityUpsert) -> DaoResult<profile::Model>;
}

#[derive(Clone)]
pub struct DbRoleStore {
    daos: DaoContext,
}

impl DbRoleStore {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self {
            daos: DaoContext::new(db),
        }
    }
}

#[async_trait::async_trait]
impl RoleStore for DbRoleStore {
    async fn find_profile(&self, id: Uuid) -> DaoResult<Option<profile::Model>> {
        self.daos.profile().find_optional(id).await
    }

    async fn find_profile_by_email(&self, email: &str) -> DaoResult<Option<profile::Model>> {
        self.daos.profile().find_by_email(email).await
    }

    async fn find_assignment(
        &self,
        user_id: Uuid,
    ) -> DaoResult<Option<role_assignment::Model>> {
        self.daos.role_assignment().find_by_user(user_id).await
    }

    async fn apply_change(&self, change: RoleChange) -> DaoResult<ChangeOutcome> {
        let txn = self.daos.connection().begin().await?;

        let written = match change.mutation {
            RoleMutation::Assign(role) => {
                RoleAssignmentDao::upsert_unprotected(&txn, change.target, role, change.actor)
                    .await?
            }
            RoleMutation::Clear => RoleAssignmentDao::delete_unprotected(&txn, change.target).await?,
        };

        // Zero rows is either "nothing to clear" or a protected row.
        let protected = written == 0
            && match change.mutation {
                RoleMutation::Assign(_) => true,
                RoleMutation::Clear => {
                    RoleAssignmentDao::holds_super_admin(&txn, change.target).await?
                }
            };
        if protected {
            txn.rollback().await?;
            return Ok(ChangeOutcome::Protected);
        }

        AuditLogDao::record(&txn, change.audit_entry()).await?;
        txn.commit().await?;
        Ok(ChangeOutcome::Applied(written))
    }

    async fn list_with_roles(&self) -> DaoResult<Vec<ProfileWithRole>> {
        self.daos.profile().list_with_roles().await
    }

    async fn search_unassigned(
        &self,
        fragment: &str,
        limit: u64,
    ) -> DaoResult<Vec<profile::Model>> {
        self.daos.profile().search_unassigned(fragment, limit).await
    }

    async fn upsert_profile(&self, identity: IdentityUpsert) -> DaoResult<profile::Model> {
        self.daos.profile().upsert_identity(identity).await
    }
}
