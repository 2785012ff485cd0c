use std::future::Future;
use std::path::Path;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use export_logging::{export_debug, export_warn};
use futures_util::StreamExt;
use reqwest::header::{HeaderName, CONTENT_TYPE};
use reqwest::{Response, Url};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::{ExportEvent, FailureKind, FetchError, FetchMetadata, FetchOutput};

pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Total number of attempts per request, including the first one.
    pub max_attempts: u32,
    /// Linear backoff step: attempt `n` is followed by a `n * backoff_unit` pause.
    pub backoff_unit: Duration,
    pub connect_timeout: Duration,
    /// Whole-request bound for API responses.
    pub request_timeout: Duration,
    /// Body cap for API responses.
    pub max_bytes: u64,
    /// Whole-request bound for streamed downloads. Unbounded when `None`.
    pub download_timeout: Option<Duration>,
    /// Size cap for streamed downloads. Unbounded when `None`.
    pub max_download_bytes: Option<u64>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_bytes: 50 * 1024 * 1024,
            download_timeout: None,
            max_download_bytes: None,
        }
    }
}

impl FetchSettings {
    /// Pause taken after the given failed attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt)
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ExportEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ExportEvent) {}
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`, accepting either an image or a JSON body. Failed attempts
    /// are retried; the error of the final attempt is returned once the
    /// attempts are exhausted.
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError>;

    /// GET `url` and stream the body into a newly created `destination`,
    /// retried like [`Fetcher::fetch`]. An existing file is never
    /// overwritten, and a partially written file is removed.
    async fn download(&self, url: &str, destination: &Path) -> Result<FetchMetadata, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    api_client: reqwest::Client,
    download_client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let api_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        let mut download_builder =
            reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.download_timeout {
            download_builder = download_builder.timeout(timeout);
        }
        let download_client = download_builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            api_client,
            download_client,
        })
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable kind,
    /// or the attempts are exhausted. Returns the value and the attempt count.
    async fn with_retries<T, F, Fut>(
        &self,
        url: &str,
        mut operation: F,
    ) -> Result<(T, u32), FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok((value, attempt)),
                Err(err) => {
                    export_warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        max_attempts,
                        url,
                        err.kind
                    );
                    if attempt >= max_attempts || !err.kind.is_retryable() {
                        return Err(err.with_attempts(attempt));
                    }
                    tokio::time::sleep(self.settings.backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, url: &Url) -> Result<FetchOutput, FetchError> {
        let response = send_checked(&self.api_client, url).await?;
        check_declared_length(&response, Some(self.settings.max_bytes))?;
        let content_type = checked_content_type(url, &response)?;

        let total_pages = response
            .headers()
            .get(HeaderName::from_static(TOTAL_PAGES_HEADER))
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u32>().ok());

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = body.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            body.extend_from_slice(&chunk);
        }
        let bytes: Bytes = body.freeze();

        Ok(FetchOutput {
            metadata: FetchMetadata {
                url: url.to_string(),
                content_type,
                total_pages,
                byte_len: bytes.len() as u64,
                attempts: 1,
            },
            bytes,
        })
    }

    async fn download_attempt(
        &self,
        url: &Url,
        destination: &Path,
    ) -> Result<FetchMetadata, FetchError> {
        let response = send_checked(&self.download_client, url).await?;
        check_declared_length(&response, self.settings.max_download_bytes)?;
        let content_type = checked_content_type(url, &response)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(destination)
            .await
            .map_err(|err| write_error(destination, err))?;
        let streamed = stream_to_file(
            response,
            &mut file,
            destination,
            self.settings.max_download_bytes,
        )
        .await;
        drop(file);

        match streamed {
            Ok(byte_len) => Ok(FetchMetadata {
                url: url.to_string(),
                content_type,
                total_pages: None,
                byte_len,
                attempts: 1,
            }),
            Err(err) => {
                if let Err(remove_err) = tokio::fs::remove_file(destination).await {
                    export_warn!(
                        "Could not remove partial file {:?}: {}",
                        destination,
                        remove_err
                    );
                }
                Err(err)
            }
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        let parsed = parse_url(url)?;
        let (mut output, attempts) = self.with_retries(url, || self.attempt(&parsed)).await?;
        output.metadata.attempts = attempts;
        export_debug!("GET {} ok ({} bytes)", url, output.metadata.byte_len);
        Ok(output)
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<FetchMetadata, FetchError> {
        let parsed = parse_url(url)?;
        let (mut metadata, attempts) = self
            .with_retries(url, || self.download_attempt(&parsed, destination))
            .await?;
        metadata.attempts = attempts;
        export_debug!(
            "Streamed {} to {:?} ({} bytes)",
            url,
            destination,
            metadata.byte_len
        );
        Ok(metadata)
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))
}

async fn send_checked(client: &reqwest::Client, url: &Url) -> Result<Response, FetchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    Ok(response)
}

fn check_declared_length(response: &Response, max_bytes: Option<u64>) -> Result<(), FetchError> {
    match (response.content_length(), max_bytes) {
        (Some(content_len), Some(max_bytes)) if content_len > max_bytes => Err(FetchError::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(content_len),
            },
            "response too large",
        )),
        _ => Ok(()),
    }
}

fn checked_content_type(url: &Url, response: &Response) -> Result<Option<String>, FetchError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    validate_content_type(url, content_type.as_deref())?;
    Ok(content_type)
}

/// Writes each body chunk as it arrives; returns the number of bytes written.
async fn stream_to_file(
    response: Response,
    file: &mut File,
    destination: &Path,
    max_bytes: Option<u64>,
) -> Result<u64, FetchError> {
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        written += chunk.len() as u64;
        if let Some(max_bytes) = max_bytes {
            if written > max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(written),
                    },
                    "download too large",
                ));
            }
        }
        file.write_all(&chunk)
            .await
            .map_err(|err| write_error(destination, err))?;
    }
    file.flush().await.map_err(|err| write_error(destination, err))?;
    file.sync_all()
        .await
        .map_err(|err| write_error(destination, err))?;
    Ok(written)
}

fn write_error(destination: &Path, err: std::io::Error) -> FetchError {
    FetchError::new(FailureKind::Write, format!("{}: {err}", destination.display()))
}

/// Images are accepted by URL extension or `image/*` content type; anything
/// else must declare JSON.
fn validate_content_type(url: &Url, content_type: Option<&str>) -> Result<(), FetchError> {
    let path = url.path().to_ascii_lowercase();
    let is_image_url = IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    let ct = content_type.unwrap_or_default().to_ascii_lowercase();
    if is_image_url || ct.contains("image/") || ct.contains("application/json") {
        return Ok(());
    }
    Err(FetchError::new(
        FailureKind::UnsupportedContentType {
            content_type: content_type.unwrap_or("<none>").to_string(),
        },
        "expected JSON or an image",
    ))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
