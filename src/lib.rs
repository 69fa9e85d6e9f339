pub mod cli;
pub mod credentials;
pub mod error;
pub mod fixtures;
pub mod gitlab_provider;
pub mod http;
pub mod migrator;
pub mod mirror;
pub mod pagination;
pub mod provider;
pub mod record;
pub mod resolver;
pub mod retry;
pub mod snapshot;
pub mod transfer;
