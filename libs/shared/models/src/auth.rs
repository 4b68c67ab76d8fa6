use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role attached to an authenticated principal by the (external) auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Patient,
    Doctor,
    Admin,
}

/// Authenticated principal handed to the booking core by the auth layer.
/// Token verification happens upstream; the core only consumes id + role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub role: UserRole,
}

impl User {
    pub fn new(id: Uuid, role: UserRole) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn patient(id: Uuid) -> Self {
        Self::new(id, UserRole::Patient)
    }

    pub fn doctor(id: Uuid) -> Self {
        Self::new(id, UserRole::Doctor)
    }
}
