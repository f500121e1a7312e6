use sea_orm::entity::prelude::*;

use crate::db::dao::HasCreatedAtColumn;

/// Directory entry mirrored from the identity provider. `id` is the provider's
/// subject, so rows are never keyed by a locally generated id.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(default_expr = "Expr::current_timestamp()")]
    pub updated_at: DateTimeWithTimeZone,
    pub last_sign_in_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(default_value = true)]
    pub is_active: bool,
    pub metadata: Json,
    #[sea_orm(has_one)]
    pub role_assignment: HasOne<super::role_assignment::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}

impl HasCreatedAtColumn for Entity {
    fn created_at_column() -> Column {
        Column::CreatedAt
    }
}
