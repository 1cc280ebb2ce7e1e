//! Error types shared by the storage and auth layers.
//!
//! HTTP-facing errors live in [`crate::rest::ApiError`]; these convert into it.

use thiserror::Error;

/// Errors raised by the Sled-backed entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Sled storage error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Patch for {collection}/{id} must be a JSON object")]
    InvalidPatch { collection: &'static str, id: String },

    #[error("Update of {collection}/{id} tried to change the record id")]
    IdChanged { collection: &'static str, id: String },

    #[error("{collection} with {key} '{value}' already exists")]
    Conflict {
        collection: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("{collection}/{id} disappeared during update")]
    Missing { collection: &'static str, id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by password hashing and token handling.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("System clock is before the Unix epoch")]
    Clock,
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Errors raised by tenant onboarding and lifecycle rules.
#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("Invalid slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: &'static str },

    #[error("Cannot move tenant from {from} to {to}")]
    InvalidTransition {
        from: crate::models::TenantStatus,
        to: crate::models::TenantStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
