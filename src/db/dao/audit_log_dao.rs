use chrono::Utc;
use sea_orm::{ConnectionTrait, EntityTrait, Set};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{DaoLayerError, DaoResult};
use crate::db::entities::audit_log;
use crate::db::entities::prelude::AuditLog;

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: &'static str,
    pub target_id: Uuid,
    pub payload: JsonValue,
}

/// Append-only writer; entries are recorded on the caller's connection so they
/// commit or roll back with the change they describe.
pub struct AuditLogDao;

impl AuditLogDao {
    pub async fn record<C: ConnectionTrait>(conn: &C, entry: NewAuditEntry) -> DaoResult<()> {
        let now = Utc::now().fixed_offset();
        let model = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            actor_id: Set(entry.actor_id),
            action: Set(entry.action.to_string()),
            target_id: Set(entry.target_id),
            payload: Set(entry.payload),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        AuditLog::insert(model)
            .exec_without_returning(conn)
            .await
            .map(|_| ())
            .map_err(DaoLayerError::Db)
    }
}
