use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use axum::Router;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use sea_orm::DbErr;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::{Claims, Role},
    config::{AppConfig, AuthConfig},
    db::{
        dao::{DaoLayerError, DaoResult, IdentityUpsert, NewAuditEntry, profile_dao::normalize_email},
        entities::{profile, role_assignment},
    },
    routes::app,
    services::role_store::{ChangeOutcome, ProfileWithRole, RoleChange, RoleMutation, RoleStore},
    state::AppState,
};

pub const TEST_SECRET: &str = "test-secret";

#[derive(Default)]
struct Inner {
    profiles: Vec<profile::Model>,
    assignments: HashMap<Uuid, role_assignment::Model>,
    audit: Vec<NewAuditEntry>,
    ticks: i64,
    failing: bool,
    grant_before_next_write: bool,
}

impl Inner {
    fn next_timestamp(&mut self) -> DateTime<FixedOffset> {
        self.ticks += 1;
        base_timestamp() + Duration::minutes(self.ticks)
    }
}

/// Role store kept in memory. Writes follow the same rules as the database
/// store, including the protected `super_admin` rows.
#[derive(Default)]
pub struct InMemoryRoleStore {
    inner: Mutex<Inner>,
}

impl InMemoryRoleStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guard(&self) -> DaoResult<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.failing {
            return Err(DaoLayerError::Db(DbErr::Custom(
                "storage unavailable".to_string(),
            )));
        }
        Ok(inner)
    }

    /// Adds a directory entry; later entries join later.
    pub fn add_profile(&self, email: &str) -> Uuid {
        let mut inner = self.lock();
        let joined = inner.next_timestamp();
        let id = Uuid::new_v4();
        inner.profiles.push(profile::Model {
            id,
            email: normalize_email(email),
            full_name: None,
            avatar_url: None,
            phone: None,
            created_at: joined,
            updated_at: joined,
            last_sign_in_at: None,
            is_active: true,
            metadata: json!({}),
        });
        id
    }

    /// Writes an assignment directly, bypassing the protection rules.
    pub fn seed_assignment(&self, user_id: Uuid, role: Role, created_by: Option<Uuid>) {
        let mut inner = self.lock();
        let now = inner.next_timestamp();
        inner.assignments.insert(
            user_id,
            role_assignment::Model {
                id: Uuid::new_v4(),
                user_id,
                role: role.as_str().to_string(),
                created_at: now,
                updated_at: now,
                created_by,
            },
        );
    }

    pub fn assignment(&self, user_id: Uuid) -> Option<role_assignment::Model> {
        self.lock().assignments.get(&user_id).cloned()
    }

    pub fn role_of(&self, user_id: Uuid) -> Role {
        Role::of_assignment(self.assignment(user_id).as_ref())
    }

    pub fn audit_actions(&self) -> Vec<&'static str> {
        self.lock().audit.iter().map(|entry| entry.action).collect()
    }

    pub fn audit_entries(&self) -> Vec<NewAuditEntry> {
        self.lock().audit.clone()
    }

    /// Makes every storage call fail until switched off.
    pub fn fail_storage(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// The next `apply_change` finds its target already holding `super_admin`,
    /// as if a concurrent grant committed after the gate's checks.
    pub fn grant_super_admin_before_next_write(&self) {
        self.lock().grant_before_next_write = true;
    }
}

#[async_trait::async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn find_profile(&self, id: Uuid) -> DaoResult<Option<profile::Model>> {
        let inner = self.guard()?;
        Ok(inner.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn find_profile_by_email(&self, email: &str) -> DaoResult<Option<profile::Model>> {
        let email = normalize_email(email);
        let inner = self.guard()?;
        Ok(inner.profiles.iter().find(|p| p.email == email).cloned())
    }

    async fn find_assignment(
        &self,
        user_id: Uuid,
    ) -> DaoResult<Option<role_assignment::Model>> {
        let inner = self.guard()?;
        Ok(inner.assignments.get(&user_id).cloned())
    }

    async fn apply_change(&self, change: RoleChange) -> DaoResult<ChangeOutcome> {
        let mut guard = self.guard()?;
        let inner = &mut *guard;
        if std::mem::take(&mut inner.grant_before_next_write) {
            let now = inner.next_timestamp();
            let granted = inner
                .assignments
                .entry(change.target)
                .or_insert_with(|| role_assignment::Model {
                    id: Uuid::new_v4(),
                    user_id: change.target,
                    role: String::new(),
                    created_at: now,
                    updated_at: now,
                    created_by: None,
                });
            granted.role = Role::SuperAdmin.as_str().to_string();
            granted.updated_at = now;
        }

        let protected = inner
            .assignments
            .get(&change.target)
            .is_some_and(|a| a.role == Role::SuperAdmin.as_str());
        if protected {
            return Ok(ChangeOutcome::Protected);
        }

        let written = match change.mutation {
            RoleMutation::Assign(role) => {
                let now = inner.next_timestamp();
                match inner.assignments.get_mut(&change.target) {
                    Some(existing) => {
                        existing.role = role.as_str().to_string();
                        existing.created_by = change.actor;
                        existing.updated_at = now;
                    }
                    None => {
                        inner.assignments.insert(
                            change.target,
                            role_assignment::Model {
                                id: Uuid::new_v4(),
                                user_id: change.target,
                                role: role.as_str().to_string(),
                                created_at: now,
                                updated_at: now,
                                created_by: change.actor,
                            },
                        );
                    }
                }
                1
            }
            RoleMutation::Clear => u64::from(inner.assignments.remove(&change.target).is_some()),
        };

        inner.audit.push(change.audit_entry());
        Ok(ChangeOutcome::Applied(written))
    }

    async fn list_with_roles(&self) -> DaoResult<Vec<ProfileWithRole>> {
        let inner = self.guard()?;
        let mut rows: Vec<_> = inner
            .profiles
            .iter()
            .map(|p| (p.clone(), inner.assignments.get(&p.id).cloned()))
            .collect();
        rows.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));
        Ok(rows)
    }

    async fn search_unassigned(
        &self,
        fragment: &str,
        limit: u64,
    ) -> DaoResult<Vec<profile::Model>> {
        let fragment = fragment.to_lowercase();
        let inner = self.guard()?;
        let mut found: Vec<_> = inner
            .profiles
            .iter()
            .filter(|p| !inner.assignments.contains_key(&p.id))
            .filter(|p| p.email.contains(&fragment))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn upsert_profile(&self, identity: IdentityUpsert) -> DaoResult<profile::Model> {
        let mut inner = self.guard()?;
        let now = Utc::now().fixed_offset();
        let email = normalize_email(&identity.email);

        if let Some(existing) = inner.profiles.iter_mut().find(|p| p.id == identity.id) {
            existing.email = email;
            existing.updated_at = now;
            existing.last_sign_in_at = Some(now);
            if identity.full_name.is_some() {
                existing.full_name = identity.full_name;
            }
            if identity.avatar_url.is_some() {
                existing.avatar_url = identity.avatar_url;
            }
            if identity.phone.is_some() {
                existing.phone = identity.phone;
            }
            if let Some(metadata) = identity.metadata {
                existing.metadata = metadata;
            }
            return Ok(existing.clone());
        }

        let created = profile::Model {
            id: identity.id,
            email,
            full_name: identity.full_name,
            avatar_url: identity.avatar_url,
            phone: identity.phone,
            created_at: now,
            updated_at: now,
            last_sign_in_at: Some(now),
            is_active: true,
            metadata: identity.metadata.unwrap_or_else(|| json!({})),
        };
        inner.profiles.push(created.clone());
        Ok(created)
    }
}

pub fn base_timestamp() -> DateTime<FixedOffset> {
    FixedOffset::east_opt(0)
        .and_then(|offset| offset.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single())
        .unwrap_or_else(|| Utc::now().fixed_offset())
}

pub fn test_config() -> AppConfig {
    AppConfig {
        auth: Some(AuthConfig {
            jwt_secret: TEST_SECRET.to_string(),
            leeway_secs: 0,
            super_admin_email: None,
        }),
        ..AppConfig::default()
    }
}

pub fn test_state(store: Arc<InMemoryRoleStore>) -> Arc<AppState> {
    AppState::new(test_config(), store).expect("test state should build")
}

pub fn test_router(store: Arc<InMemoryRoleStore>) -> Router {
    app(test_state(store))
}

pub fn claims_for(user_id: Uuid, email: Option<&str>, ttl_secs: i64) -> Claims {
    let iat = Utc::now().timestamp();
    Claims {
        sub: user_id.to_string(),
        email: email.map(str::to_string),
        iat: iat.max(0) as usize,
        exp: (iat + ttl_secs).max(0) as usize,
    }
}

/// HS256 token signed with `secret`, shaped like the identity provider's.
pub fn mint_token(claims: &Claims, secret: &str) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());
    encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
        .expect("test token should encode")
}

pub fn bearer_token(user_id: Uuid, email: Option<&str>) -> String {
    let token = mint_token(&claims_for(user_id, email, 600), TEST_SECRET);
    format!("Bearer {token}")
}
