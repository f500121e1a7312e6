use chrono::Utc;
use sea_orm::sea_query::{Expr, IntoCondition, LikeExpr, OnConflict};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::db::entities::prelude::{Profile, RoleAssignment};
use crate::db::entities::{profile, role_assignment};

const LIKE_ESCAPE: char = '\\';

/// Identity claims copied into the directory on sign-in. Optional fields left
/// as `None` keep whatever the directory already holds.
#[derive(Debug, Clone)]
pub struct IdentityUpsert {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub metadata: Option<JsonValue>,
}

#[derive(Clone)]
pub struct ProfileDao {
    db: DatabaseConnection,
}

impl DaoBase for ProfileDao {
    type Entity = Profile;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl ProfileDao {
    pub async fn find_by_email(&self, email: &str) -> DaoResult<Option<profile::Model>> {
        let email = normalize_email(email);
        self.find(1, 1, None, move |query| {
            query.filter(profile::Column::Email.eq(email))
        })
        .await
        .map(|response| response.data.into_iter().next())
    }

    /// Every profile paired with its role assignment, newest first.
    pub async fn list_with_roles(
        &self,
    ) -> DaoResult<Vec<(profile::Model, Option<role_assignment::Model>)>> {
        Profile::find()
            .find_also_related(RoleAssignment)
            .order_by_desc(profile::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DaoLayerError::Db)
    }

    /// Profiles without a role assignment whose email contains `fragment`.
    pub async fn search_unassigned(
        &self,
        fragment: &str,
        limit: u64,
    ) -> DaoResult<Vec<profile::Model>> {
        let condition = email_contains(fragment);
        self.find(1, limit, None, move |query| {
            query
                .left_join(RoleAssignment)
                .filter(role_assignment::Column::Id.is_null())
                .filter(condition)
        })
        .await
        .map(|response| response.data)
    }

    pub async fn upsert_identity(&self, identity: IdentityUpsert) -> DaoResult<profile::Model> {
        let now = Utc::now().fixed_offset();
        let id = identity.id;

        let mut update_columns = vec![
            profile::Column::Email,
            profile::Column::LastSignInAt,
            profile::Column::UpdatedAt,
        ];
        if identity.full_name.is_some() {
            update_columns.push(profile::Column::FullName);
        }
        if identity.avatar_url.is_some() {
            update_columns.push(profile::Column::AvatarUrl);
        }
        if identity.phone.is_some() {
            update_columns.push(profile::Column::Phone);
        }
        if identity.metadata.is_some() {
            update_columns.push(profile::Column::Metadata);
        }

        let model = profile::ActiveModel {
            id: Set(id),
            email: Set(normalize_email(&identity.email)),
            full_name: Set(identity.full_name),
            avatar_url: Set(identity.avatar_url),
            phone: Set(identity.phone),
            created_at: Set(now),
            updated_at: Set(now),
            last_sign_in_at: Set(Some(now)),
            is_active: Set(true),
            metadata: Set(identity
                .metadata
                .unwrap_or_else(|| JsonValue::Object(Default::default()))),
            ..Default::default()
        };

        Profile::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::Id)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(DaoLayerError::Db)?;

        self.find_by_id(id).await
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == LIKE_ESCAPE || ch == '%' || ch == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

fn email_contains(fragment: &str) -> impl IntoCondition {
    use sea_orm::sea_query::ExprTrait;

    let pattern = format!("%{}%", escape_like(&fragment.to_lowercase()));
    Expr::col((Profile, profile::Column::Email)).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))
}
