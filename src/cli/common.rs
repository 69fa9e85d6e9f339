use std::fmt;

use serde::{Deserialize, Serialize};

use crate::credentials::MirrorCredentials;

/// One side of a migration: where to send requests and with which token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceEndpoint {
    pub base_url: String,
    pub token: String,
}

impl fmt::Debug for InstanceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceEndpoint")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Source,
    Destination,
}

impl Side {
    /// Prefix used in snapshot file names.
    pub fn prefix(&self) -> &'static str {
        match self {
            Side::Source => "s",
            Side::Destination => "d",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MigrationConfig {
    pub source: InstanceEndpoint,
    pub destination: InstanceEndpoint,
    pub mirror_credentials: Option<MirrorCredentials>,
}
