use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{DaoBase, DaoLayerError, DaoResult};
use crate::auth::Role;
use crate::db::entities::prelude::RoleAssignment;
use crate::db::entities::role_assignment;

#[derive(Clone)]
pub struct RoleAssignmentDao {
    db: DatabaseConnection,
}

impl DaoBase for RoleAssignmentDao {
    type Entity = RoleAssignment;

    fn from_db(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl RoleAssignmentDao {
    pub async fn find_by_user(&self, user_id: Uuid) -> DaoResult<Option<role_assignment::Model>> {
        self.find(1, 1, None, move |query| {
            query.filter(role_assignment::Column::UserId.eq(user_id))
        })
        .await
        .map(|response| response.data.into_iter().next())
    }

    /// Inserts or rewrites the assignment for `user_id`. A `super_admin` row is
    /// never overwritten: the statement then writes nothing and returns 0.
    pub async fn upsert_unprotected<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
        role: Role,
        created_by: Option<Uuid>,
    ) -> DaoResult<u64> {
        let now = Utc::now().fixed_offset();
        let model = role_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            role: Set(role.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(created_by),
            ..Default::default()
        };

        let on_conflict = {
            use sea_orm::sea_query::ExprTrait;

            OnConflict::column(role_assignment::Column::UserId)
                .update_columns([
                    role_assignment::Column::Role,
                    role_assignment::Column::CreatedBy,
                    role_assignment::Column::UpdatedAt,
                ])
                .action_and_where(
                    Expr::col((RoleAssignment, role_assignment::Column::Role))
                        .ne(Role::SuperAdmin.as_str()),
                )
                .to_owned()
        };

        RoleAssignment::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DaoLayerError::Db)
    }

    /// Removes the assignment for `user_id` unless it is `super_admin`.
    pub async fn delete_unprotected<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> DaoResult<u64> {
        RoleAssignment::delete_many()
            .filter(role_assignment::Column::UserId.eq(user_id))
            .filter(role_assignment::Column::Role.ne(Role::SuperAdmin.as_str()))
            .exec(conn)
            .await
            .map(|result| result.rows_affected)
            .map_err(DaoLayerError::Db)
    }

    pub async fn holds_super_admin<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> DaoResult<bool> {
        RoleAssignment::find()
            .filter(role_assignment::Column::UserId.eq(user_id))
            .filter(role_assignment::Column::Role.eq(Role::SuperAdmin.as_str()))
            .one(conn)
            .await
            .map(|found| found.is_some())
            .map_err(DaoLayerError::Db)
    }
}
