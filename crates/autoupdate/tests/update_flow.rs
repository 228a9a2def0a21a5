//! End-to-end check and download against a local HTTP server.

use anyhow::Result;
use autoupdate::{
    ChannelUpdater, CheckError, Downloader, ManifestError, Progress, ProxiedClientProvider,
    ProxyConfig, ReleaseChannel, SignedManifest, SignedManifestChecker, UpdateChecker,
    UpdateManifest, UpdateStatus,
};
use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer, SigningKey};
use std::io::Write;
use std::sync::Arc;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn signed_manifest(key: &SigningKey, version: &str, url: &str) -> Result<String> {
    let manifest = UpdateManifest {
        version: semver::Version::parse(version)?,
        url: url.to_string(),
    };
    let signature = key.sign(&serde_json::to_vec(&manifest)?);
    let signed = SignedManifest {
        manifest,
        signature: general_purpose::STANDARD.encode(signature.to_bytes()),
    };
    Ok(serde_json::to_string(&signed)?)
}

fn build_payload() -> Vec<u8> {
    b"PK\x03\x04 pretend this is an application package "
        .iter()
        .copied()
        .cycle()
        .take(200_000)
        .collect()
}

fn bzip2_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[tokio::test]
async fn checks_then_downloads_a_newer_release() -> Result<()> {
    init_tracing();
    let key = SigningKey::from_bytes(&[42u8; 32]);
    let payload = build_payload();
    let compressed = bzip2_encode(&payload)?;

    let mut server = mockito::Server::new_async().await;
    let payload_url = format!("{}/releases/app-1.0.1.apk.bz2", server.url());
    let manifest_mock = server
        .mock("GET", "/update")
        .match_query(mockito::Matcher::UrlEncoded(
            "version".into(),
            "1.0.0".into(),
        ))
        .with_status(200)
        .with_body(signed_manifest(&key, "1.0.1", &payload_url)?)
        .create_async()
        .await;
    let payload_mock = server
        .mock("GET", "/releases/app-1.0.1.apk.bz2")
        .with_status(200)
        .with_header("content-length", &compressed.len().to_string())
        .with_body(compressed.clone())
        .create_async()
        .await;

    let clients = Arc::new(ProxiedClientProvider::new(ProxyConfig::default()));
    let channel = ReleaseChannel::new(
        format!("{}/update", server.url()),
        hex::encode(key.verifying_key().as_bytes()),
    );

    let checker = UpdateChecker::new(clients.clone(), SignedManifestChecker);
    let status = checker.check_release(false, "1.0.0", &channel).await?;
    manifest_mock.assert_async().await;

    let UpdateStatus::Available(update) = status else {
        anyhow::bail!("expected an update to be available");
    };
    assert_eq!(update.url(), payload_url);

    let dir = tempdir()?;
    let destination = dir.path().join("app.apk");
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let downloaded = Downloader::new(clients)
        .download(
            false,
            update.url(),
            &destination,
            Arc::new(ChannelUpdater::new(tx)),
        )
        .await?;
    payload_mock.assert_async().await;

    assert_eq!(downloaded, destination);
    assert_eq!(std::fs::read(&destination)?, payload);

    let mut reports = Vec::new();
    while let Some(progress) = rx.recv().await {
        reports.push(progress);
    }
    assert!(!reports.is_empty());
    assert_eq!(reports.last(), Some(&Progress::Percent(100)));
    assert!(reports.windows(2).all(|w| w[0].percent() <= w[1].percent()));
    Ok(())
}

#[tokio::test]
async fn up_to_date_when_manifest_is_older() -> Result<()> {
    let key = SigningKey::from_bytes(&[42u8; 32]);
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/update")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(signed_manifest(&key, "1.9.9", "https://dl.example.com/old")?)
        .create_async()
        .await;

    let checker = UpdateChecker::new(
        ProxiedClientProvider::new(ProxyConfig::default()),
        SignedManifestChecker,
    );
    let status = checker
        .check_for_update(
            false,
            "2.0.0",
            &format!("{}/update", server.url()),
            key.verifying_key().as_bytes(),
        )
        .await?;

    assert_eq!(status, UpdateStatus::UpToDate);
    assert_eq!(status.download_url(), None);
    Ok(())
}

#[tokio::test]
async fn manifest_server_failure_is_an_error() -> Result<()> {
    let key = SigningKey::from_bytes(&[42u8; 32]);
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/update")
        .match_query(mockito::Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let checker = UpdateChecker::new(
        ProxiedClientProvider::new(ProxyConfig::default()),
        SignedManifestChecker,
    );
    let result = checker
        .check_for_update(
            false,
            "1.0.0",
            &format!("{}/update", server.url()),
            key.verifying_key().as_bytes(),
        )
        .await;

    assert!(matches!(
        result,
        Err(CheckError::ManifestRetrieval(ManifestError::Http(_)))
    ));
    Ok(())
}

#[tokio::test]
async fn manifest_signed_by_another_key_is_rejected() -> Result<()> {
    let publisher = SigningKey::from_bytes(&[1u8; 32]);
    let trusted = SigningKey::from_bytes(&[2u8; 32]);
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/update")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(signed_manifest(&publisher, "9.0.0", "https://dl.example.com/evil")?)
        .create_async()
        .await;

    let checker = UpdateChecker::new(
        ProxiedClientProvider::new(ProxyConfig::default()),
        SignedManifestChecker,
    );
    let result = checker
        .check_for_update(
            false,
            "1.0.0",
            &format!("{}/update", server.url()),
            trusted.verifying_key().as_bytes(),
        )
        .await;

    assert!(matches!(
        result,
        Err(CheckError::ManifestRetrieval(ManifestError::SignatureInvalid))
    ));
    Ok(())
}
