pub mod bootstrap;
pub mod jwt;
mod types;

pub use types::{Caller, Claims, Role};
