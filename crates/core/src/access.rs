use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown role `{0}` (expected SUBMITTER|APPROVER)")]
pub struct UnknownRole(String);

/// The two recognized capabilities. There is no hierarchy: holding
/// `Approver` does not imply `Submitter`, and a user may hold both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Submitter,
    Approver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitter => "SUBMITTER",
            Self::Approver => "APPROVER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUBMITTER" => Ok(Self::Submitter),
            "APPROVER" => Ok(Self::Approver),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// The authenticated caller as supplied by the external identity provider.
/// The core never sees credentials, only the resolved email and role set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(email: impl Into<String>, roles: Vec<Role>) -> Self {
        Self { email: email.into(), roles }
    }

    pub fn has_role(&self, role: Role) -> bool {
        permits(&self.roles, role)
    }
}

/// The access policy: a pure capability-set membership check, independent of
/// how roles are stored upstream.
pub fn permits(roles: &[Role], required: Role) -> bool {
    roles.contains(&required)
}
