use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::role_store::RoleStore;
use crate::{
    auth::{Caller, Role},
    db::{
        dao::{DaoLayerError, IdentityUpsert},
        entities::profile,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    InvalidIdentity(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] DaoLayerError),
}

/// Optional profile fields supplied by the client on sign-in.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub metadata: Option<JsonValue>,
}

/// Mirror of the identity provider's user records.
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn RoleStore>,
}

impl DirectoryService {
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self { store }
    }

    pub async fn sync_identity(
        &self,
        caller: &Caller,
        input: ProfileInput,
    ) -> Result<profile::Model, DirectoryError> {
        let email = caller
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                DirectoryError::InvalidIdentity("Token does not carry an email".to_string())
            })?;

        if let Some(metadata) = input.metadata.as_ref() {
            if !metadata.is_object() {
                return Err(DirectoryError::InvalidIdentity(
                    "metadata must be a JSON object".to_string(),
                ));
            }
        }

        let profile = self
            .store
            .upsert_profile(IdentityUpsert {
                id: caller.user_id,
                email: email.to_string(),
                full_name: input.full_name,
                avatar_url: input.avatar_url,
                phone: input.phone,
                metadata: input.metadata,
            })
            .await?;
        tracing::debug!(user_id = %profile.id, "directory entry synced");
        Ok(profile)
    }

    pub async fn me(&self, caller: &Caller) -> Result<(profile::Model, Role), DirectoryError> {
        let profile = self
            .store
            .find_profile(caller.user_id)
            .await?
            .ok_or_else(|| DirectoryError::NotFound("Profile not found".to_string()))?;
        let assignment = self.store.find_assignment(caller.user_id).await?;
        Ok((profile, Role::of_assignment(assignment.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use uuid::Uuid;

    use super::{DirectoryError, DirectoryService, ProfileInput};
    use crate::{
        auth::{Caller, Role},
        test_helpers::InMemoryRoleStore,
    };

    fn caller(email: Option<&str>) -> Caller {
        Caller {
            user_id: Uuid::new_v4(),
            email: email.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn sync_creates_then_updates_profile() {
        let store = Arc::new(InMemoryRoleStore::default());
        let service = DirectoryService::new(store.clone());
        let caller = caller(Some("Ana@Example.com"));

        let created = service
            .sync_identity(
                &caller,
                ProfileInput {
                    full_name: Some("Ana".to_string()),
                    ..ProfileInput::default()
                },
            )
            .await
            .expect("sync succeeds");
        assert_eq!(created.id, caller.user_id);
        assert_eq!(created.email, "ana@example.com");
        assert!(created.last_sign_in_at.is_some());

        let updated = service
            .sync_identity(&caller, ProfileInput::default())
            .await
            .expect("second sync succeeds");
        assert_eq!(updated.full_name.as_deref(), Some("Ana"));
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn sync_requires_email_and_object_metadata() {
        let service = DirectoryService::new(Arc::new(InMemoryRoleStore::default()));

        let err = service
            .sync_identity(&caller(None), ProfileInput::default())
            .await
            .expect_err("email is required");
        assert!(matches!(err, DirectoryError::InvalidIdentity(_)));

        let err = service
            .sync_identity(
                &caller(Some("ana@example.com")),
                ProfileInput {
                    metadata: Some(json!(["not", "an", "object"])),
                    ..ProfileInput::default()
                },
            )
            .await
            .expect_err("metadata must be an object");
        assert!(matches!(err, DirectoryError::InvalidIdentity(_)));
    }

    #[tokio::test]
    async fn me_reports_effective_role() {
        let store = Arc::new(InMemoryRoleStore::default());
        let service = DirectoryService::new(store.clone());
        let id = store.add_profile("admin@x.com");
        store.seed_assignment(id, Role::Admin, None);

        let (profile, role) = service
            .me(&Caller {
                user_id: id,
                email: None,
            })
            .await
            .expect("profile exists");
        assert_eq!(profile.email, "admin@x.com");
        assert_eq!(role, Role::Admin);

        let err = service
            .me(&caller(Some("ghost@x.com")))
            .await
            .expect_err("unsynced caller has no profile");
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }
}
