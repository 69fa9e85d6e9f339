//! Mirror credentials and where they come from.
//!
//! Mirroring embeds a user and password into the push URL. Workflows ask a
//! `CredentialProvider` for them instead of talking to the terminal directly.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::reader::{self, Config};
use crate::error::ConfigError;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorCredentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for MirrorCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("could not read mirror {what}: {source}")]
    Prompt {
        what: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("mirror {0} must not be empty")]
    Empty(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub trait CredentialProvider {
    fn mirror_credentials(&mut self) -> Result<MirrorCredentials, CredentialError>;
}

/// Credentials known up front, e.g. from the config file.
#[derive(Clone, Debug)]
pub struct StaticCredentials(pub MirrorCredentials);

impl CredentialProvider for StaticCredentials {
    fn mirror_credentials(&mut self) -> Result<MirrorCredentials, CredentialError> {
        Ok(self.0.clone())
    }
}

type Prompt = dyn FnMut() -> Result<MirrorCredentials, CredentialError>;

/// Asks on the terminal the first time and saves the answer into the config
/// file so later runs don't ask again.
pub struct PromptingCredentials {
    config_path: PathBuf,
    config: Config,
    prompt: Box<Prompt>,
    cached: Option<MirrorCredentials>,
}

impl PromptingCredentials {
    pub fn new(config_path: PathBuf, config: Config) -> Self {
        Self {
            config_path,
            config,
            prompt: Box::new(prompt_terminal),
            cached: None,
        }
    }

    /// Replace the terminal prompt, e.g. with canned answers.
    pub fn with_prompt<F>(mut self, prompt: F) -> Self
    where
        F: FnMut() -> Result<MirrorCredentials, CredentialError> + 'static,
    {
        self.prompt = Box::new(prompt);
        self
    }

    fn persist(&mut self, credentials: &MirrorCredentials) -> Result<(), CredentialError> {
        self.config.auth_user = Some(credentials.user.clone());
        self.config.auth_password = Some(credentials.password.clone());
        reader::write_config(&self.config, &self.config_path)?;

        tracing::info!("saved mirror credentials to {:?}", self.config_path);
        Ok(())
    }
}

impl CredentialProvider for PromptingCredentials {
    fn mirror_credentials(&mut self) -> Result<MirrorCredentials, CredentialError> {
        if let Some(credentials) = &self.cached {
            return Ok(credentials.clone());
        }

        let credentials = (self.prompt)()?;
        self.persist(&credentials)?;
        self.cached = Some(credentials.clone());

        Ok(credentials)
    }
}

/// Username from stdin, password without echo.
fn prompt_terminal() -> Result<MirrorCredentials, CredentialError> {
    let mut stdout = io::stdout();
    write!(stdout, "Enter mirror username: ")
        .and_then(|_| stdout.flush())
        .map_err(|source| CredentialError::Prompt {
            what: "username",
            source,
        })?;

    let mut user = String::new();
    io::stdin()
        .lock()
        .read_line(&mut user)
        .map_err(|source| CredentialError::Prompt {
            what: "username",
            source,
        })?;

    let password = rpassword::prompt_password("Enter mirror password: ").map_err(|source| {
        CredentialError::Prompt {
            what: "password",
            source,
        }
    })?;

    let user = user.trim();
    if user.is_empty() {
        return Err(CredentialError::Empty("username"));
    }
    if password.is_empty() {
        return Err(CredentialError::Empty("password"));
    }

    Ok(MirrorCredentials {
        user: user.to_string(),
        password,
    })
}
