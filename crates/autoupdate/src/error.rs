use std::io;
use std::path::PathBuf;

/// Failure to obtain an HTTP client for the requested proxy mode.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// A proxied client was requested but no proxy address is configured.
    #[error("proxied client requested but no proxy address is configured")]
    ProxyNotConfigured,
    /// The configured proxy address was rejected.
    #[error("invalid proxy address {address}: {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },
    /// Only one of the proxy username and password is set.
    #[error("proxy username and password must be set together")]
    IncompleteCredentials,
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Errors raised while fetching and authenticating a release manifest.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The manifest URL could not be parsed.
    #[error("invalid manifest URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Network request for the manifest failed.
    #[error("manifest request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The manifest could not be decoded from JSON.
    #[error("manifest decoding failed: {0}")]
    Decode(#[from] serde_json::Error),
    /// The signature field is not a well formed Ed25519 signature.
    #[error("malformed manifest signature: {0}")]
    InvalidSignature(String),
    /// The trust anchor is not a usable Ed25519 public key.
    #[error("invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),
    /// The manifest signature did not verify against the trust anchor.
    #[error("manifest signature invalid")]
    SignatureInvalid,
}

/// Errors surfaced by an update check, annotated with the failing stage.
#[derive(thiserror::Error, Debug)]
pub enum CheckError {
    /// No HTTP client for the requested proxy mode.
    #[error("could not get HTTP client to check for update: {0}")]
    ClientAcquisition(#[source] ClientError),
    /// The manifest could not be fetched or authenticated.
    #[error("error checking for update: {0}")]
    ManifestRetrieval(#[source] ManifestError),
    /// The running version is not valid semver.
    #[error("could not parse version number {version:?}: {source}")]
    VersionParse {
        version: String,
        #[source]
        source: semver::Error,
    },
}

/// Stage of a download at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStage {
    /// Destination or staging file.
    FileCreation,
    /// HTTP client for the requested proxy mode.
    ClientAcquisition,
    /// Building the GET request.
    RequestConstruction,
    /// Sending the request or reading its status.
    RequestExecution,
    /// Reading, decompressing or writing the body.
    StreamCopy,
    /// Moving the finished file into place.
    Persist,
}

/// Errors that end a download attempt.
#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    /// The destination (or its staging file) could not be created.
    #[error("could not create {path:?}: {source}")]
    FileCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// No HTTP client for the requested proxy mode.
    #[error("could not get HTTP client to download update: {0}")]
    ClientAcquisition(#[source] ClientError),
    /// The download URL could not be turned into a request.
    #[error("error building update request: {0}")]
    RequestConstruction(#[source] reqwest::Error),
    /// The request failed or returned an error status.
    #[error("error requesting update: {0}")]
    RequestExecution(#[source] reqwest::Error),
    /// The body could not be read, decompressed or written.
    #[error("error copying update: {0}")]
    StreamCopy(#[source] io::Error),
    /// The fully written staging file could not be moved into place.
    #[error("could not move update into {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    /// The stage that failed.
    pub fn kind(&self) -> DownloadStage {
        match self {
            DownloadError::FileCreation { .. } => DownloadStage::FileCreation,
            DownloadError::ClientAcquisition(_) => DownloadStage::ClientAcquisition,
            DownloadError::RequestConstruction(_) => DownloadStage::RequestConstruction,
            DownloadError::RequestExecution(_) => DownloadStage::RequestExecution,
            DownloadError::StreamCopy(_) => DownloadStage::StreamCopy,
            DownloadError::Persist { .. } => DownloadStage::Persist,
        }
    }
}

/// Errors raised while loading updater configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The config file is not valid JSON for [`crate::UpdaterConfig`].
    #[error("config decoding failed: {0}")]
    Parse(#[from] serde_json::Error),
    /// The channel public key is neither hex nor base64.
    #[error("invalid public key: {0}")]
    InvalidKey(String),
}
