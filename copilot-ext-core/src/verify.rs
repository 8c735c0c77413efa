// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Payload signature verification.
//!
//! The platform signs every request body with an ECDSA P-256 key and sends the
//! base64 ASN.1 signature in [`SIGNATURE_HEADER`]. The matching public key is
//! published at [`PUBLIC_KEYS_URL`].

use base64::Engine;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::VerifyError;

/// Header carrying the user's GitHub token.
pub const TOKEN_HEADER: &str = "X-Github-Token";
/// Header naming the key that signed the payload.
pub const KEY_IDENTIFIER_HEADER: &str = "Github-Public-Key-Identifier";
/// Header carrying the base64 payload signature.
pub const SIGNATURE_HEADER: &str = "Github-Public-Key-Signature";

/// Public key metadata endpoint for Copilot agents.
pub const PUBLIC_KEYS_URL: &str = "https://api.github.com/meta/public_keys/copilot_api";

/// Checks that a request body was signed by the platform.
pub trait PayloadVerifier: Send + Sync {
    /// Verify `signature` over `body`.
    ///
    /// Returns `Ok(false)` when the signature is well formed but does not
    /// match, and an error when it cannot be decoded.
    fn verify(&self, body: &[u8], signature: &str) -> Result<bool, VerifyError>;
}

/// Response of the public key metadata endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeysResponse {
    #[serde(default)]
    pub public_keys: Vec<PublicKeyEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    #[serde(default)]
    pub key_identifier: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub is_current: bool,
}

impl PublicKeysResponse {
    /// The first key marked current.
    pub fn current(&self) -> Option<&PublicKeyEntry> {
        self.public_keys.iter().find(|k| k.is_current)
    }
}

/// [`PayloadVerifier`] backed by a single P-256 public key.
#[derive(Debug, Clone)]
pub struct EcdsaPayloadVerifier {
    key: VerifyingKey,
    key_identifier: Option<String>,
}

impl EcdsaPayloadVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self {
            key,
            key_identifier: None,
        }
    }

    /// Parse a PEM encoded SubjectPublicKeyInfo.
    ///
    /// Literal `\n` escapes are turned into newlines first, so keys copied
    /// out of JSON or an environment variable work as-is. Anything other than
    /// a P-256 EC key is rejected.
    pub fn from_pem(pem: &str) -> Result<Self, VerifyError> {
        let pem = pem.replace("\\n", "\n");
        let key = VerifyingKey::from_public_key_pem(pem.trim())
            .map_err(|e| VerifyError::InvalidPublicKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Fetch the current public key from the metadata endpoint at `url`.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self, VerifyError> {
        debug!(url, "fetching payload public keys");

        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, concat!("copilot-ext/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(VerifyError::FetchStatus(response.status()));
        }

        let keys: PublicKeysResponse = response.json().await?;
        let current = keys.current().ok_or(VerifyError::NoCurrentKey)?;

        info!(key_identifier = %current.key_identifier, "loaded payload public key");
        let mut verifier = Self::from_pem(&current.key)?;
        verifier.key_identifier = Some(current.key_identifier.clone());
        Ok(verifier)
    }

    /// Identifier of the key, when it was fetched from the metadata endpoint.
    pub fn key_identifier(&self) -> Option<&str> {
        self.key_identifier.as_deref()
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

impl PayloadVerifier for EcdsaPayloadVerifier {
    fn verify(&self, body: &[u8], signature: &str) -> Result<bool, VerifyError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(signature.trim())?;
        let signature = Signature::from_der(&raw)?;
        let digest = Sha256::digest(body);
        Ok(self.key.verify_prehash(&digest, &signature).is_ok())
    }
}
