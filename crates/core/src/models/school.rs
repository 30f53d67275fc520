use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entry of the external school directory. Read-only to the booking core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    pub id: Uuid,
    pub name: String,
}
