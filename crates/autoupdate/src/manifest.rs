use crate::error::ManifestError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

/// Latest published build, as described by the release server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateManifest {
    /// Semantic version of the release.
    pub version: semver::Version,
    /// Where the release payload can be downloaded.
    pub url: String,
}

/// Wire form of a manifest: the release description plus its signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedManifest {
    #[serde(flatten)]
    pub manifest: UpdateManifest,
    /// Base64 encoded Ed25519 signature over the canonical JSON of [`UpdateManifest`].
    pub signature: String,
}

impl SignedManifest {
    /// Render the payload that was signed.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec(&self.manifest)?)
    }

    /// Parse the Ed25519 signature from the manifest.
    pub fn parsed_signature(&self) -> Result<Signature, ManifestError> {
        let raw = general_purpose::STANDARD
            .decode(self.signature.as_bytes())
            .map_err(|err| ManifestError::InvalidSignature(format!("malformed base64: {err}")))?;

        let array: [u8; 64] = raw
            .try_into()
            .map_err(|_| ManifestError::InvalidSignature("signature must be 64 bytes".into()))?;
        Ok(Signature::from_bytes(&array))
    }

    /// Check the signature against `key` and hand back the release description.
    pub fn verify(self, key: &VerifyingKey) -> Result<UpdateManifest, ManifestError> {
        let signature = self.parsed_signature()?;
        let payload = self.signing_bytes()?;
        key.verify(&payload, &signature)
            .map_err(|_| ManifestError::SignatureInvalid)?;
        Ok(self.manifest)
    }
}

/// Retrieves and authenticates the release manifest.
#[async_trait]
pub trait ManifestChecker: Send + Sync {
    /// Fetch the manifest at `manifest_url` with `client`, verifying it
    /// against `trust_anchor`.
    async fn check(
        &self,
        client: &Client,
        current_version: &str,
        manifest_url: &str,
        trust_anchor: &[u8],
    ) -> Result<UpdateManifest, ManifestError>;
}

/// Fetches a JSON [`SignedManifest`] over HTTP and verifies its Ed25519 signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedManifestChecker;

impl SignedManifestChecker {
    fn verifying_key(trust_anchor: &[u8]) -> Result<VerifyingKey, ManifestError> {
        let bytes: &[u8; 32] = trust_anchor.try_into().map_err(|_| {
            ManifestError::InvalidTrustAnchor(format!(
                "expected 32 bytes, got {}",
                trust_anchor.len()
            ))
        })?;
        VerifyingKey::from_bytes(bytes)
            .map_err(|err| ManifestError::InvalidTrustAnchor(err.to_string()))
    }

    fn request_url(manifest_url: &str, current_version: &str) -> Result<Url, ManifestError> {
        let mut url = Url::parse(manifest_url).map_err(|err| ManifestError::InvalidUrl {
            url: manifest_url.to_string(),
            reason: err.to_string(),
        })?;
        url.query_pairs_mut().append_pair("version", current_version);
        Ok(url)
    }
}

#[async_trait]
impl ManifestChecker for SignedManifestChecker {
    async fn check(
        &self,
        client: &Client,
        current_version: &str,
        manifest_url: &str,
        trust_anchor: &[u8],
    ) -> Result<UpdateManifest, ManifestError> {
        let key = Self::verifying_key(trust_anchor)?;
        let url = Self::request_url(manifest_url, current_version)?;

        tracing::debug!(%url, "fetching release manifest");
        let response = client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let signed: SignedManifest = serde_json::from_slice(&bytes)?;
        signed.verify(&key)
    }
}
