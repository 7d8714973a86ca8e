//! Bearer-credential verification.
//!
//! Credentials are JWTs issued by the identity provider. Signing keys are
//! loaded once into a [`KeySet`] (see [`crate::jwks`]); verification itself is
//! purely local and never touches storage or the network.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use letterbox_types::{LetterboxError, Principal, traits::Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Key id used for the locally configured HS256 secret.
pub const SHARED_SECRET_KID: &str = "local";

/// Claims read from a verified credential.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Signing keys trusted for inbound credentials, indexed by key id.
#[derive(Debug, Default)]
pub struct KeySet {
    keys: HashMap<String, (DecodingKey, Algorithm)>,
}

impl KeySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an RSA public key from its base64url modulus and exponent.
    ///
    /// # Errors
    ///
    /// Returns [`LetterboxError::Config`] if the components are not valid base64url.
    pub fn insert_rsa_components(
        &mut self,
        kid: impl Into<String>,
        n: &str,
        e: &str,
        alg: Algorithm,
    ) -> Result<()> {
        let key = DecodingKey::from_rsa_components(n, e)
            .map_err(|e| LetterboxError::Config(format!("invalid RSA key components: {e}")))?;
        self.keys.insert(kid.into(), (key, alg));
        Ok(())
    }

    /// Add an HS256 shared secret under `kid`.
    pub fn insert_shared_secret(&mut self, kid: impl Into<String>, secret: &[u8]) {
        self.keys
            .insert(kid.into(), (DecodingKey::from_secret(secret), Algorithm::HS256));
    }

    /// Merge all keys of `other` into this set.
    pub fn extend(&mut self, other: KeySet) {
        self.keys.extend(other.keys);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Find the key for a credential header.
    ///
    /// With a `kid`, the key must exist and be registered for `alg`. Without
    /// one, exactly one key registered for `alg` must exist.
    fn resolve(&self, kid: Option<&str>, alg: Algorithm) -> Option<&DecodingKey> {
        match kid {
            Some(kid) => self
                .keys
                .get(kid)
                .filter(|(_, key_alg)| *key_alg == alg)
                .map(|(key, _)| key),
            None => {
                let mut candidates = self.keys.values().filter(|(_, key_alg)| *key_alg == alg);
                match (candidates.next(), candidates.next()) {
                    (Some((key, _)), None) => Some(key),
                    _ => None,
                }
            }
        }
    }
}

/// Extract the credential from the request's `Authorization` header.
///
/// # Errors
///
/// Returns [`LetterboxError::InvalidCredential`] when the header is absent,
/// not valid ASCII, uses another scheme, or carries no token.
pub fn bearer_credential(headers: &http::HeaderMap) -> Result<&str> {
    let value = headers
        .get(http::header::AUTHORIZATION)
        .map(|v| {
            v.to_str().map_err(|_| {
                LetterboxError::InvalidCredential("Authorization header is not ASCII".into())
            })
        })
        .transpose()?;
    parse_bearer(value)
}

/// Parse an `Authorization` header value. The scheme is matched
/// case-insensitively and must be followed by a non-empty token.
///
/// # Errors
///
/// Returns [`LetterboxError::InvalidCredential`] for anything but `Bearer <token>`.
pub fn parse_bearer(header: Option<&str>) -> Result<&str> {
    let value = header.ok_or_else(|| {
        LetterboxError::InvalidCredential("missing Authorization header".into())
    })?;
    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| LetterboxError::InvalidCredential("malformed Authorization header".into()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(LetterboxError::InvalidCredential(
            "Authorization scheme must be Bearer".into(),
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(LetterboxError::InvalidCredential("empty bearer token".into()));
    }
    Ok(token)
}

/// Verifies bearer credentials against a fixed [`KeySet`].
pub struct IdentityVerifier {
    keys: KeySet,
    issuer: Option<String>,
    audience: Option<String>,
    leeway_secs: u64,
}

impl IdentityVerifier {
    #[must_use]
    pub fn new(keys: KeySet) -> Self {
        Self {
            keys,
            issuer: None,
            audience: None,
            leeway_secs: 60,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    #[must_use]
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Require the `aud` claim to contain `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    #[must_use]
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Verify `credential` and return the caller's identity.
    ///
    /// # Errors
    ///
    /// - [`LetterboxError::ExpiredCredential`] when only the expiry check fails.
    /// - [`LetterboxError::InvalidCredential`] for every other failure: bad
    ///   structure, unknown key, algorithm mismatch, signature, issuer or audience.
    pub fn verify(&self, credential: &str) -> Result<Principal> {
        let header = decode_header(credential)
            .map_err(|e| LetterboxError::InvalidCredential(format!("malformed credential: {e}")))?;

        let key = self
            .keys
            .resolve(header.kid.as_deref(), header.alg)
            .ok_or_else(|| {
                LetterboxError::InvalidCredential(format!(
                    "no trusted {:?} key for kid {:?}",
                    header.alg, header.kid
                ))
            })?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = self.leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let data = decode::<Claims>(credential, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => LetterboxError::ExpiredCredential,
            _ => LetterboxError::InvalidCredential(e.to_string()),
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(LetterboxError::InvalidCredential("empty subject".into()));
        }
        Ok(Principal {
            id: claims.sub,
            email: claims.email,
            display_name: claims.name,
            picture_url: claims.picture,
        })
    }
}
