pub mod backport;
pub mod config;
pub mod error;
pub mod github;
pub mod webhooks;

pub use error::BackportError;
