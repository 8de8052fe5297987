//! Login Status
//!
//! Tri-state authentication status published by the token lifecycle manager.

use serde::{Deserialize, Serialize};

/// Authentication status of the client session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum LoginStatus {
    /// No outcome known yet, or a token acquisition is in progress.
    #[default]
    Unknown,
    /// A valid access token is held in memory.
    Authenticated,
    /// Logged out, or the last acquisition failed.
    NotAuthenticated,
}

impl LoginStatus {
    /// Numeric wire value: 0, 1 or -1.
    pub fn as_i8(&self) -> i8 {
        match self {
            Self::Unknown => 0,
            Self::Authenticated => 1,
            Self::NotAuthenticated => -1,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl From<LoginStatus> for i8 {
    fn from(status: LoginStatus) -> Self {
        status.as_i8()
    }
}

impl TryFrom<i8> for LoginStatus {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Authenticated),
            -1 => Ok(Self::NotAuthenticated),
            other => Err(format!("invalid login status: {}", other)),
        }
    }
}

impl std::fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Authenticated => write!(f, "AUTHENTICATED"),
            Self::NotAuthenticated => write!(f, "NOT_AUTHENTICATED"),
        }
    }
}
