// sdeupdater/src/fetch/download.rs
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use reqwest::{Client, Response};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use super::artifact::TempArtifact;
use crate::errors::{AppError, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransferStats {
    pub bytes: u64,
    pub largest_chunk: usize,
}

/// Streams the dump at `dump_url` into a fresh `.dmp.bz2` temp file. Only
/// one network chunk is held at a time; a failed transfer drops the partial
/// file with the artifact.
pub async fn download_dump(client: &Client, dump_url: &str) -> Result<TempArtifact> {
    download_dump_in(client, dump_url, &std::env::temp_dir()).await
}

pub(crate) async fn download_dump_in(client: &Client, dump_url: &str, temp_dir: &Path) -> Result<TempArtifact> {
    let response = client.get(dump_url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Transfer(format!(
            "GET {} returned {}",
            dump_url,
            response.status()
        )));
    }

    let (file, artifact) = TempArtifact::create_in(temp_dir, ".dmp.bz2")?;
    let mut output = File::from_std(file);
    let stats = stream_to_file(response, &mut output).await?;

    println!(
        "✓ Downloaded {} bytes from {} to {}",
        stats.bytes,
        dump_url,
        artifact.path().display()
    );
    debug!("Largest chunk held in memory: {} bytes", stats.largest_chunk);
    Ok(artifact)
}

pub(crate) async fn stream_to_file(mut response: Response, output: &mut File) -> Result<TransferStats> {
    let expected = response.content_length();
    let progress = transfer_progress(expected);
    let mut stats = TransferStats::default();

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                progress.abandon();
                return Err(AppError::Transfer(format!(
                    "download interrupted after {} bytes: {}",
                    stats.bytes, e
                )));
            }
        };
        output.write_all(&chunk).await?;
        stats.bytes += chunk.len() as u64;
        stats.largest_chunk = stats.largest_chunk.max(chunk.len());
        progress.set_position(stats.bytes);
    }
    output.flush().await?;
    output.sync_all().await?;
    progress.finish_and_clear();

    if let Some(expected) = expected {
        if stats.bytes < expected {
            return Err(AppError::Transfer(format!(
                "download ended after {} of {} bytes",
                stats.bytes, expected
            )));
        }
    }
    info!("Transferred {} bytes", stats.bytes);
    Ok(stats)
}

/// A byte bar when the size is known, a byte-counting spinner otherwise.
fn transfer_progress(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("Downloading [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}, {eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("━━─"),
            );
            bar
        }
        None => {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::default_spinner()
                    .template("Downloading {spinner:.cyan} {bytes} ({binary_bytes_per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::build_http_client;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    fn synthetic_payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn downloads_body_into_temp_file() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let payload = synthetic_payload(64 * 1024);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sde.dmp.bz2");
                then.status(200).body(payload.clone());
            })
            .await;

        let client = build_http_client()?;
        let artifact = download_dump(&client, &server.url("/sde.dmp.bz2")).await?;

        assert!(artifact.path().to_string_lossy().ends_with(".dmp.bz2"));
        assert_eq!(std::fs::read(artifact.path())?, payload);
        Ok(())
    }

    #[tokio::test]
    async fn large_payload_streams_in_chunks() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let payload = synthetic_payload(8 * 1024 * 1024);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big.dmp.bz2");
                then.status(200).body(payload.clone());
            })
            .await;

        let client = build_http_client()?;
        let response = client.get(server.url("/big.dmp.bz2")).send().await?;
        let (file, artifact) = TempArtifact::create(".dmp.bz2")?;
        let mut output = File::from_std(file);
        let stats = stream_to_file(response, &mut output).await?;

        assert_eq!(stats.bytes, payload.len() as u64);
        assert!(stats.largest_chunk < payload.len());
        assert_eq!(artifact.size()?, payload.len() as u64);
        Ok(())
    }

    #[tokio::test]
    async fn truncated_body_fails_and_discards_partial_file() -> anyhow::Result<()> {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await?;
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await?;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\n0123456789")
                .await?;
            socket.shutdown().await?;
            Ok::<_, std::io::Error>(())
        });

        let temp_dir = tempfile::TempDir::new()?;
        let client = build_http_client()?;
        let result = download_dump_in(&client, &format!("http://{}/sde.dmp.bz2", addr), temp_dir.path()).await;
        server.await??;

        assert!(matches!(result, Err(AppError::Transfer(_))), "got {:?}", result);
        assert_eq!(std::fs::read_dir(temp_dir.path())?.count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn error_status_is_transfer_failure() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/sde.dmp.bz2");
                then.status(503).body("maintenance");
            })
            .await;

        let client = build_http_client()?;
        let result = download_dump(&client, &server.url("/sde.dmp.bz2")).await;
        assert!(matches!(result, Err(AppError::Transfer(_))));
        Ok(())
    }
}
