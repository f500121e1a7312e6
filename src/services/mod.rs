pub mod directory_service;
pub mod role_gate;
pub mod role_store;
pub mod role_view;

pub use directory_service::{DirectoryError, DirectoryService, ProfileInput};
pub use role_gate::{GateError, GateResult, RoleGate};
pub use role_store::{ChangeOutcome, DbRoleStore, RoleStore};
pub use role_view::{AdminUserRow, ListView};
