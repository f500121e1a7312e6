use sea_orm::DatabaseConnection;

use super::{DaoBase, ProfileDao, RoleAssignmentDao};

#[derive(Clone)]
pub struct DaoContext {
    db: DatabaseConnection,
}

impl DaoContext {
    pub fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn profile(&self) -> ProfileDao {
        DaoBase::new(&self.db)
    }

    pub fn role_assignment(&self) -> RoleAssignmentDao {
        DaoBase::new(&self.db)
    }
}
