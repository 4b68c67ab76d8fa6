pub mod auth;

pub use auth::{User, UserRole};
