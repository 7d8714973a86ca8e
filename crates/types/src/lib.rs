//! Core types and traits for the letterbox workspace.
//!
//! This crate defines the shared abstractions used across all layers of the
//! letterbox service: the error taxonomy, the verified [`Principal`], the
//! delegated-auth [`TokenPair`], owned [`Draft`] resources, and the async
//! traits that each storage and provider layer implements.

pub mod document;
pub mod draft;
pub mod error;
pub mod principal;
pub mod token;
pub mod traits;

pub use document::{ExportRecord, NewDocument, RemoteDocument};
pub use draft::{Draft, DraftInput, DraftUpdate};
pub use error::LetterboxError;
pub use principal::Principal;
pub use token::{AuthorizedClient, TokenPair, TokenState, now_millis};
pub use traits::{DocumentStore, DraftStore, ExportLog, OAuthProvider, TokenVault};
