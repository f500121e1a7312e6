use crate::{
    config::AuthConfig,
    services::role_store::{AuditAction, ChangeOutcome, RoleChange, RoleMutation, RoleStore},
};

use super::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Disabled,
    /// The configured identity has not signed in yet.
    Pending,
    AlreadyPresent,
    Granted,
}

/// Grants `super_admin` to the configured identity. This is the only path that
/// grants `super_admin` without a creator.
pub async fn ensure_super_admin(
    cfg: &AuthConfig,
    store: &dyn RoleStore,
) -> anyhow::Result<BootstrapOutcome> {
    let Some(email) = cfg.super_admin_email.as_deref() else {
        return Ok(BootstrapOutcome::Disabled);
    };

    let Some(profile) = store.find_profile_by_email(email).await? else {
        tracing::warn!(%email, "super admin bootstrap pending: no profile with that email yet");
        return Ok(BootstrapOutcome::Pending);
    };

    let current = store.find_assignment(profile.id).await?;
    if Role::of_assignment(current.as_ref()) == Role::SuperAdmin {
        tracing::info!(user_id = %profile.id, "super admin already present");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    let outcome = store
        .apply_change(RoleChange {
            actor: None,
            target: profile.id,
            mutation: RoleMutation::Assign(Role::SuperAdmin),
            action: AuditAction::Bootstrap,
        })
        .await?;
    if outcome == ChangeOutcome::Protected {
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    tracing::info!(user_id = %profile.id, %email, "bootstrapped super admin");
    Ok(BootstrapOutcome::Granted)
}
