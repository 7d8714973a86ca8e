//! Identity verification and delegated Google authorization.
//!
//! [`IdentityVerifier`] turns an inbound bearer credential into a
//! [`letterbox_types::Principal`]. [`DelegatedAuthManager`] owns the lifecycle
//! of the per-principal Google tokens kept in a [`letterbox_types::TokenVault`]:
//! consent URLs, code exchange, refresh-on-expiry and revocation.

pub mod google;
pub mod identity;
pub mod jwks;
pub mod manager;
pub mod oauth;

pub use identity::{IdentityVerifier, KeySet, SHARED_SECRET_KID, bearer_credential};
pub use manager::{ConnectionStatus, ConsentReason, DelegatedAuthManager, Delegation};
pub use oauth::GoogleOAuthClient;
