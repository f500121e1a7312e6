pub mod audit_log_dao;
pub mod base;
pub mod base_traits;
mod context;
pub mod error;
pub mod profile_dao;
pub mod role_assignment_dao;

pub use audit_log_dao::{AuditLogDao, NewAuditEntry};
pub use base::{DaoBase, PaginatedResponse};
pub use base_traits::HasCreatedAtColumn;
pub use context::DaoContext;
pub use error::{DaoLayerError, DaoResult};
pub use profile_dao::{IdentityUpsert, ProfileDao};
pub use role_assignment_dao::RoleAssignmentDao;
