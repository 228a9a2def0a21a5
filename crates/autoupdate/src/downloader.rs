use crate::{
    client::ClientProvider,
    compression::Compression,
    error::DownloadError,
    progress::{ProgressReader, TransferState, Updater},
};
use bytes::Bytes;
use futures_util::TryStreamExt;
use reqwest::header::ACCEPT_ENCODING;
use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::task;
use tokio_util::io::{StreamReader, SyncIoBridge};

/// Streams update payloads to disk while reporting progress.
pub struct Downloader<P> {
    clients: P,
    compression: Compression,
}

impl<P> Downloader<P>
where
    P: ClientProvider,
{
    /// Create a downloader expecting bzip2 payloads.
    pub fn new(clients: P) -> Self {
        Self {
            clients,
            compression: Compression::default(),
        }
    }

    /// Set the compression the published payloads use.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Download `url` to `destination`, decompressing on the fly.
    ///
    /// Progress goes to `updater` on every chunk read from the network. A
    /// failure is logged, reported once through [`Updater::show_error`] and
    /// returned; the destination is left untouched in that case.
    pub async fn download(
        &self,
        should_proxy: bool,
        url: &str,
        destination: &Path,
        updater: Arc<dyn Updater>,
    ) -> Result<PathBuf, DownloadError> {
        tracing::debug!(url, ?destination, "attempting to download update");

        match self
            .transfer(should_proxy, url, destination, updater.clone())
            .await
        {
            Ok(state) => {
                tracing::info!(
                    ?destination,
                    bytes = state.bytes_transferred,
                    "update downloaded"
                );
                Ok(destination.to_path_buf())
            }
            Err(err) => {
                tracing::error!(stage = ?err.kind(), "{err}");
                updater.show_error(&err);
                Err(err)
            }
        }
    }

    async fn transfer(
        &self,
        should_proxy: bool,
        url: &str,
        destination: &Path,
        updater: Arc<dyn Updater>,
    ) -> Result<TransferState, DownloadError> {
        let staging = create_staging_file(destination)?;

        let client = self
            .clients
            .client(should_proxy)
            .map_err(DownloadError::ClientAcquisition)?;

        // The payload carries its own compression; no transfer encoding on top.
        let request = client
            .get(url)
            .header(ACCEPT_ENCODING, "identity")
            .build()
            .map_err(DownloadError::RequestConstruction)?;

        let response = client
            .execute(request)
            .await
            .and_then(|response| response.error_for_status())
            .map_err(DownloadError::RequestExecution)?;

        let expected_length = response.content_length();
        tracing::debug!(status = %response.status(), ?expected_length, "streaming update");

        let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        let body: SyncIoBridge<StreamReader<_, Bytes>> =
            SyncIoBridge::new(StreamReader::new(stream));
        let compression = self.compression;

        let (staging, state) = task::spawn_blocking(move || {
            copy_payload(body, staging, compression, expected_length, updater)
        })
        .await
        .map_err(|err| DownloadError::StreamCopy(io::Error::other(err)))??;

        persist(staging, destination)?;
        Ok(state)
    }
}

/// Create the file the payload is streamed into, next to its destination.
fn create_staging_file(destination: &Path) -> Result<NamedTempFile, DownloadError> {
    let creation_error = |source: io::Error| DownloadError::FileCreation {
        path: destination.to_path_buf(),
        source,
    };

    if destination.is_dir() {
        return Err(creation_error(io::Error::other("destination is a directory")));
    }

    // The rename in `persist` would replace a file the caller may not write.
    if destination.exists() {
        OpenOptions::new()
            .write(true)
            .open(destination)
            .map_err(creation_error)?;
    }

    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    tempfile::Builder::new()
        .prefix(".update-")
        .tempfile_in(parent)
        .map_err(creation_error)
}

fn copy_payload<R: Read>(
    body: R,
    mut staging: NamedTempFile,
    compression: Compression,
    expected_length: Option<u64>,
    updater: Arc<dyn Updater>,
) -> Result<(NamedTempFile, TransferState), DownloadError> {
    let mut reader = compression.decoder(ProgressReader::new(body, expected_length, updater));

    io::copy(&mut reader, &mut staging).map_err(DownloadError::StreamCopy)?;
    staging.flush().map_err(DownloadError::StreamCopy)?;
    staging
        .as_file()
        .sync_all()
        .map_err(DownloadError::StreamCopy)?;

    let state = reader.get_ref().state().clone();
    Ok((staging, state))
}

/// Atomically move the completed staging file onto `destination`.
fn persist(staging: NamedTempFile, destination: &Path) -> Result<(), DownloadError> {
    let persist_error = |source: io::Error| DownloadError::Persist {
        path: destination.to_path_buf(),
        source,
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = staging
            .as_file()
            .metadata()
            .map_err(persist_error)?
            .permissions();
        // Staging files are owner-only; downloaded packages are world readable.
        perms.set_mode(0o644);
        staging
            .as_file()
            .set_permissions(perms)
            .map_err(persist_error)?;
    }

    staging
        .persist(destination)
        .map_err(|err| persist_error(err.error))?;
    Ok(())
}
