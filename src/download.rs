use crate::error::DownloadError;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const USER_AGENT: &str = concat!("toolshed/", env!("CARGO_PKG_VERSION"));

/// Streams `url` into `local_path`, replacing whatever is there.
///
/// The body is written to a temporary file next to `local_path` and renamed
/// over it only once the whole payload is on disk, so a failed download
/// never leaves a truncated file at the destination.
pub async fn download_file(url: &str, local_path: &Path) -> Result<(), DownloadError> {
    let parent = match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // Only a regular file may be replaced.
    if let Ok(existing) = std::fs::metadata(local_path) {
        if !existing.is_file() {
            return Err(DownloadError::Create {
                path: local_path.to_path_buf(),
                source: std::io::Error::other("destination exists and is not a regular file"),
            });
        }
    }

    // The output file exists before any request goes out.
    let mut staged = NamedTempFile::new_in(parent).map_err(|source| DownloadError::Create {
        path: local_path.to_path_buf(),
        source,
    })?;

    tracing::info!("Downloading {} to {}...", url, local_path.display());

    if let Err(e) = stream_to_file(url, local_path, staged.as_file_mut()).await {
        discard(staged);
        return Err(e);
    }

    staged.persist(local_path).map_err(|e| {
        let source = e.error;
        discard(e.file);
        DownloadError::Persist {
            path: local_path.to_path_buf(),
            source,
        }
    })?;

    tracing::debug!("Download complete: {}", local_path.display());
    Ok(())
}

async fn stream_to_file(
    url: &str,
    local_path: &Path,
    file: &mut std::fs::File,
) -> Result<(), DownloadError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|source| DownloadError::Network {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| DownloadError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status,
        });
    }

    let pb = progress_bar(response.content_length(), local_path);
    let copy_error = |source: std::io::Error| DownloadError::Copy {
        url: url.to_string(),
        path: local_path.to_path_buf(),
        source,
    };

    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| copy_error(std::io::Error::other(e)))?;
        file.write_all(&chunk).map_err(copy_error)?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }
    file.flush().map_err(copy_error)?;

    pb.finish_and_clear();
    tracing::debug!("Received {} bytes from {}", downloaded, url);
    Ok(())
}

fn progress_bar(total_size: Option<u64>, local_path: &Path) -> ProgressBar {
    let Some(total_size) = total_size else {
        return ProgressBar::hidden();
    };

    let filename = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg} {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(format!("Downloading {}", filename));
    pb
}

fn discard(staged: NamedTempFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.close() {
        tracing::warn!("Failed to remove partial download ({}): {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_exact_payload() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        Mock::given(method("GET"))
            .and(path("/bin/tool"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        download_file(&format!("{}/bin/tool", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), payload);
        // Only the destination remains; the staging file was renamed away.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_download_overwrites_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("new"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        fs::write(&dest, "old contents that are longer").unwrap();

        download_file(&server.uri(), &dest).await.unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_unreachable_url_is_network_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");

        // Nothing listens on port 9 of the loopback interface.
        let err = download_file("http://127.0.0.1:9/tool", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Network { .. }), "{err:?}");
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let err = download_file(&server.uri(), &dest).await.unwrap_err();

        match err {
            DownloadError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_directory_destination_fails_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        fs::create_dir(&dest).unwrap();

        let err = download_file(&server.uri(), &dest).await.unwrap_err();
        assert!(matches!(err, DownloadError::Create { .. }), "{err:?}");
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(dest.is_dir());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_body_is_copy_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\n0123456789")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("tool");
        let err = download_file(&format!("http://{}/tool", addr), &dest)
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, DownloadError::Copy { .. }), "{err:?}");
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_directory_is_create_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing").join("tool");

        // The URL is never contacted because the file cannot be created.
        let err = download_file("http://127.0.0.1:9/tool", &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Create { .. }), "{err:?}");
    }
}
