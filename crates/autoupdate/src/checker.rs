use crate::{
    client::ClientProvider,
    config::ReleaseChannel,
    error::{CheckError, ManifestError},
    manifest::{ManifestChecker, UpdateManifest},
    version::{is_newer, parse_version},
};

/// Result of checking for updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// There is no newer version available.
    UpToDate,
    /// A newer version is available.
    Available(AvailableUpdate),
}

impl UpdateStatus {
    /// Download URL of the newer build, if any.
    pub fn download_url(&self) -> Option<&str> {
        match self {
            UpdateStatus::UpToDate => None,
            UpdateStatus::Available(update) => Some(update.url()),
        }
    }
}

/// Details about an available update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableUpdate {
    manifest: UpdateManifest,
}

impl AvailableUpdate {
    /// Version of the newer build.
    pub fn version(&self) -> &semver::Version {
        &self.manifest.version
    }

    /// Where the newer build can be downloaded.
    pub fn url(&self) -> &str {
        &self.manifest.url
    }

    /// The verified manifest that announced the update.
    pub fn manifest(&self) -> &UpdateManifest {
        &self.manifest
    }
}

impl From<UpdateManifest> for AvailableUpdate {
    fn from(manifest: UpdateManifest) -> Self {
        AvailableUpdate { manifest }
    }
}

/// Compares the running version against the published release manifest.
pub struct UpdateChecker<P, M> {
    clients: P,
    manifests: M,
}

impl<P, M> UpdateChecker<P, M>
where
    P: ClientProvider,
    M: ManifestChecker,
{
    /// Create a checker from its HTTP and manifest collaborators.
    pub fn new(clients: P, manifests: M) -> Self {
        Self { clients, manifests }
    }

    /// Determine whether the manifest at `manifest_url` describes a build newer
    /// than `current_version`.
    ///
    /// Nothing is retried; the first failing stage ends the check.
    pub async fn check_for_update(
        &self,
        should_proxy: bool,
        current_version: &str,
        manifest_url: &str,
        trust_anchor: &[u8],
    ) -> Result<UpdateStatus, CheckError> {
        tracing::debug!(current_version, "checking for new version");

        let client = self.clients.client(should_proxy).map_err(|err| {
            tracing::error!("could not get HTTP client to check for update: {err}");
            CheckError::ClientAcquisition(err)
        })?;

        let manifest = self
            .manifests
            .check(&client, current_version, manifest_url, trust_anchor)
            .await
            .map_err(|err| {
                tracing::error!("error checking for update: {err}");
                CheckError::ManifestRetrieval(err)
            })?;

        let current = parse_version(current_version).map_err(|source| {
            tracing::error!("could not parse version number {current_version:?}: {source}");
            CheckError::VersionParse {
                version: current_version.to_string(),
                source,
            }
        })?;

        if is_newer(&current, &manifest.version) {
            tracing::info!(version = %manifest.version, "newer version available");
            Ok(UpdateStatus::Available(manifest.into()))
        } else {
            tracing::debug!("no new version available");
            Ok(UpdateStatus::UpToDate)
        }
    }

    /// Check `channel` for a build newer than `app_version`.
    pub async fn check_release(
        &self,
        should_proxy: bool,
        app_version: &str,
        channel: &ReleaseChannel,
    ) -> Result<UpdateStatus, CheckError> {
        let trust_anchor = channel.trust_anchor().map_err(|err| {
            CheckError::ManifestRetrieval(ManifestError::InvalidTrustAnchor(err.to_string()))
        })?;
        self.check_for_update(should_proxy, app_version, &channel.manifest_url, &trust_anchor)
            .await
    }
}
