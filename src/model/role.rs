use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Closed role set. Stored as lowercase text in the users table and in
/// token claims.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
}

impl Role {
    /// Counter row this role mints human-readable ids from.
    pub fn counter_name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    /// Prefix of the human-readable id, e.g. EMP-1000 / ADM-5000.
    pub fn code_prefix(&self) -> &'static str {
        match self {
            Role::Admin => "ADM",
            Role::Employee => "EMP",
        }
    }
}
