//! Update checks and proxied payload downloads for a client application.
//!
//! The crate answers two questions for a running application: is a newer
//! build published, and if so, fetch it. Both can be routed through a forward
//! proxy so update traffic follows the same path as the application's regular
//! traffic.
//!
//! Release manifests are JSON documents signed with Ed25519. The
//! [`UpdateChecker`] fetches the manifest, verifies it against the configured
//! trust anchor and compares its version with the running one. The
//! [`Downloader`] streams the compressed payload, decompresses it on the fly,
//! reports progress to a host supplied [`Updater`] and moves the result into
//! place only once it is complete.
//!
//! ```ignore
//! use autoupdate::{
//!     ChannelUpdater, Downloader, ProxiedClientProvider, SignedManifestChecker,
//!     UpdateChecker, UpdateStatus, UpdaterConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = UpdaterConfig::load("updater.json")?;
//! let clients = Arc::new(ProxiedClientProvider::new(config.proxy.clone()));
//! let checker = UpdateChecker::new(clients.clone(), SignedManifestChecker);
//!
//! if let UpdateStatus::Available(update) = checker
//!     .check_release(true, env!("CARGO_PKG_VERSION"), &config.channel)
//!     .await?
//! {
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//!     tokio::spawn(async move {
//!         while let Some(progress) = rx.recv().await {
//!             println!("{progress}%");
//!         }
//!     });
//!
//!     let downloader = Downloader::new(clients).with_compression(config.compression);
//!     downloader
//!         .download(
//!             true,
//!             update.url(),
//!             std::path::Path::new("/tmp/app.apk"),
//!             Arc::new(ChannelUpdater::new(tx)),
//!         )
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

mod checker;
mod client;
mod compression;
mod config;
mod downloader;
mod error;
mod manifest;
mod progress;
mod version;

pub use checker::{AvailableUpdate, UpdateChecker, UpdateStatus};
pub use client::{ClientProvider, ProxiedClientProvider};
pub use compression::{Compression, Decoder};
pub use config::{ProxyConfig, ReleaseChannel, UpdaterConfig};
pub use downloader::Downloader;
pub use error::{
    CheckError, ClientError, ConfigError, DownloadError, DownloadStage, ManifestError,
};
pub use manifest::{ManifestChecker, SignedManifest, SignedManifestChecker, UpdateManifest};
pub use progress::{ChannelUpdater, Progress, ProgressReader, TransferState, Updater};
pub use version::{is_newer, parse_version};
