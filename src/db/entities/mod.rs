#[allow(unused_imports)]
pub mod prelude {
    pub use super::audit_log::Entity as AuditLog;
    pub use super::profile::Entity as Profile;
    pub use super::role_assignment::Entity as RoleAssignment;
}

pub mod audit_log;
pub mod profile;
pub mod role_assignment;
