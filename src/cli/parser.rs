use reqwest::Url;

use super::{
    common::{InstanceEndpoint, MigrationConfig},
    reader,
};
use crate::{credentials::MirrorCredentials, error::ConfigError};

/// Validate the raw file into endpoints. Nothing is defaulted: a blank URL or
/// token is rejected before any request is made.
pub fn parse_config(config: &reader::Config) -> Result<MigrationConfig, ConfigError> {
    let source_base_url = required("source_base_url", &config.source_base_url)?;
    let source_token = required("source_access_token", &config.source_access_token)?;
    let destination_base_url = required("destination_base_url", &config.destination_base_url)?;
    let destination_token = required("destination_access_token", &config.destination_access_token)?;

    validate_url("source_base_url", source_base_url)?;
    validate_url("destination_base_url", destination_base_url)?;

    Ok(MigrationConfig {
        source: InstanceEndpoint {
            base_url: source_base_url.to_string(),
            token: source_token.to_string(),
        },
        destination: InstanceEndpoint {
            base_url: destination_base_url.to_string(),
            token: destination_token.to_string(),
        },
        mirror_credentials: parse_mirror_credentials(config),
    })
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(field));
    }

    Ok(trimmed)
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |message: &str| ConfigError::InvalidUrl {
        field,
        url: value.to_string(),
        message: message.to_string(),
    };

    let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(invalid("URL must use HTTP or HTTPS protocol")),
    }
}

fn parse_mirror_credentials(config: &reader::Config) -> Option<MirrorCredentials> {
    let user = config.auth_user.as_deref().map(str::trim).unwrap_or("");
    let password = config.auth_password.as_deref().unwrap_or("");

    if user.is_empty() || password.is_empty() {
        return None;
    }

    Some(MirrorCredentials {
        user: user.to_string(),
        password: password.to_string(),
    })
}
