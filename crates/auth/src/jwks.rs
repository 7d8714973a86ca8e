//! Loading identity-provider signing keys from a JWKS document.

use crate::identity::KeySet;
use jsonwebtoken::Algorithm;
use letterbox_types::{LetterboxError, traits::Result};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Parse a JWKS document into a [`KeySet`].
///
/// Only RSA keys are kept; a key without `alg` is assumed to be RS256.
///
/// # Errors
///
/// Returns [`LetterboxError::Config`] if the document is not a JWKS.
pub fn parse_jwks(body: &str) -> Result<KeySet> {
    let jwks: JwksResponse = serde_json::from_str(body)
        .map_err(|e| LetterboxError::Config(format!("failed to parse JWKS: {e}")))?;

    let mut keys = KeySet::new();
    for key in jwks.keys {
        if key.kty != "RSA" {
            tracing::debug!(kid = %key.kid, kty = %key.kty, "skipping non-RSA key");
            continue;
        }
        let alg = match key.alg.as_deref().map(Algorithm::from_str) {
            None => Algorithm::RS256,
            Some(Ok(alg)) => alg,
            Some(Err(_)) => {
                tracing::debug!(kid = %key.kid, "skipping key with unknown alg");
                continue;
            }
        };
        let (Some(n), Some(e)) = (&key.n, &key.e) else {
            continue;
        };
        if let Err(err) = keys.insert_rsa_components(key.kid.clone(), n, e, alg) {
            tracing::warn!(kid = %key.kid, error = %err, "ignoring malformed signing key");
        }
    }
    Ok(keys)
}

/// Fetch and parse the JWKS at `url`.
///
/// # Errors
///
/// Returns [`LetterboxError::Http`] on transport failure, [`LetterboxError::Upstream`]
/// on a non-success status and [`LetterboxError::Config`] for an unparsable body.
pub async fn fetch_jwks(http: &rquest::Client, url: &str) -> Result<KeySet> {
    tracing::info!(%url, "fetching identity signing keys");
    let resp = http.get(url).send().await?;
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(LetterboxError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    let keys = parse_jwks(&body)?;
    tracing::info!(count = keys.len(), "loaded identity signing keys");
    Ok(keys)
}
