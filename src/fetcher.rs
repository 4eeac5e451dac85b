//! Resolves the user's image reference into inline bytes.
//!
//! Two kinds of reference are supported: plain `http(s)://` URLs, fetched with
//! a GET, and `gs://bucket/object` Cloud Storage references, fetched through
//! the storage JSON API (metadata lookup for the content type, then a media
//! download). Either way the result is an [`InlineImage`], so the model
//! provider never needs to reach the original location.

use image::{ImageFormat, ImageReader};
use log::{debug, info};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::Duration;

use crate::config::FetcherConfig;
use crate::model::InlineImage;
use crate::ChefError;

/// Where the fridge photo lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// `http://` or `https://` URL
    Http(Url),
    /// `gs://<bucket>/<object>`
    Storage { bucket: String, object: String },
}

impl ImageReference {
    pub fn parse(reference: &str) -> Result<Self, ChefError> {
        let reference = reference.trim();

        if let Some(rest) = reference.strip_prefix("gs://") {
            return match rest.split_once('/') {
                Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => {
                    Ok(ImageReference::Storage {
                        bucket: bucket.to_string(),
                        object: object.to_string(),
                    })
                }
                _ => Err(ChefError::FetchError(format!(
                    "Invalid gs:// URL format, expected gs://<bucket>/<object>: {}",
                    reference
                ))),
            };
        }

        let lowered = reference.to_ascii_lowercase();
        if lowered.starts_with("http://") || lowered.starts_with("https://") {
            let url = Url::parse(reference).map_err(|e| {
                ChefError::FetchError(format!("Invalid image URL {}: {}", reference, e))
            })?;
            return Ok(ImageReference::Http(url));
        }

        Err(ChefError::FetchError(format!(
            "Unsupported image reference '{}', expected http://, https:// or gs://",
            reference
        )))
    }
}

impl FromStr for ImageReference {
    type Err = ChefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageReference::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::Http(url) => write!(f, "{}", url),
            ImageReference::Storage { bucket, object } => write!(f, "gs://{}/{}", bucket, object),
        }
    }
}

/// Photo formats a vision model is sent
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Detect the format of `bytes` and return its MIME type, if it is one of
/// [`ALLOWED_FORMATS`]
pub fn detect_image_type(bytes: &[u8]) -> Option<&'static str> {
    let format = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .format()?;
    if !ALLOWED_FORMATS.contains(&format) {
        debug!("Detected unsupported image format {:?}", format);
        return None;
    }
    Some(format.to_mime_type())
}

/// `image/jpeg; charset=binary` -> `image/jpeg`
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

fn resolve_content_type(
    declared: Option<&str>,
    bytes: &[u8],
    source: &str,
) -> Result<String, ChefError> {
    let declared = declared.map(essence).filter(|t| !t.is_empty());
    match declared {
        Some(t) if t.starts_with("image/") => Ok(t.to_ascii_lowercase()),
        _ => detect_image_type(bytes).map(str::to_string).ok_or_else(|| {
            ChefError::FetchError(format!(
                "{} is not an image (content type: {})",
                source,
                declared.unwrap_or("unknown")
            ))
        }),
    }
}

pub struct ImageFetcher {
    client: Client,
    max_image_bytes: usize,
    storage_base_url: String,
    storage_access_token: Option<String>,
}

impl ImageFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, ChefError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("fridge-chef/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChefError::BuilderError(format!("Failed to create HTTP client: {}", e)))?;

        let storage_access_token = config
            .storage_access_token
            .clone()
            .or_else(|| std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN").ok())
            .filter(|token| !token.trim().is_empty());

        Ok(ImageFetcher {
            client,
            max_image_bytes: config.max_image_bytes,
            storage_base_url: config.storage_base_url.clone(),
            storage_access_token,
        })
    }

    /// Download the image and return it inline
    pub async fn fetch(&self, reference: &ImageReference) -> Result<InlineImage, ChefError> {
        let image = match reference {
            ImageReference::Http(url) => self.fetch_http(url).await?,
            ImageReference::Storage { bucket, object } => {
                self.fetch_storage(bucket, object).await?
            }
        };

        info!(
            "Fetched {} ({}, {} bytes)",
            reference,
            image.content_type,
            image.bytes.len()
        );
        Ok(image)
    }

    async fn fetch_http(&self, url: &Url) -> Result<InlineImage, ChefError> {
        debug!("Fetching image from {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ChefError::FetchError(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChefError::FetchError(format!(
                "{} answered with status {}",
                url, status
            )));
        }

        let declared = header_content_type(&response);
        let bytes = self.read_limited(response, url.as_str()).await?;
        let content_type = resolve_content_type(declared.as_deref(), &bytes, url.as_str())?;

        Ok(InlineImage::new(content_type, bytes))
    }

    async fn fetch_storage(&self, bucket: &str, object: &str) -> Result<InlineImage, ChefError> {
        let source = format!("gs://{}/{}", bucket, object);
        let url = self.storage_object_url(bucket, object)?;
        debug!("Looking up metadata for {}", source);

        let metadata: Value = {
            let response = self.storage_get(url.clone(), &source).await?;
            response.json().await.map_err(|e| {
                ChefError::FetchError(format!("Invalid metadata for {}: {}", source, e))
            })?
        };

        if let Some(size) = metadata["size"]
            .as_str()
            .and_then(|size| size.parse::<u64>().ok())
        {
            if size > self.max_image_bytes as u64 {
                return Err(self.too_large(&source));
            }
        }

        let mut media_url = url;
        media_url.query_pairs_mut().append_pair("alt", "media");
        let response = self.storage_get(media_url, &source).await?;
        let declared = metadata["contentType"]
            .as_str()
            .map(str::to_string)
            .or_else(|| header_content_type(&response));
        let bytes = self.read_limited(response, &source).await?;
        let content_type = resolve_content_type(declared.as_deref(), &bytes, &source)?;

        Ok(InlineImage::new(content_type, bytes))
    }

    async fn storage_get(&self, url: Url, source: &str) -> Result<Response, ChefError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.storage_access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChefError::FetchError(format!("Request for {} failed: {}", source, e)))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ChefError::FetchError(format!(
                "object not found: {}",
                source
            ))),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ChefError::FetchError(format!(
                    "storage request for {} failed ({}): {}",
                    source, status, body
                )))
            }
        }
    }

    /// `{base}/storage/v1/b/{bucket}/o/{object}` with the object name percent-encoded
    fn storage_object_url(&self, bucket: &str, object: &str) -> Result<Url, ChefError> {
        let mut url = Url::parse(&self.storage_base_url).map_err(|e| {
            ChefError::BuilderError(format!(
                "Invalid storage base URL {}: {}",
                self.storage_base_url, e
            ))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ChefError::BuilderError(format!(
                    "Storage base URL cannot have a path: {}",
                    self.storage_base_url
                ))
            })?
            .pop_if_empty()
            .extend(["storage", "v1", "b", bucket, "o", object]);
        Ok(url)
    }

    async fn read_limited(&self, mut response: Response, source: &str) -> Result<Vec<u8>, ChefError> {
        if let Some(length) = response.content_length() {
            if length > self.max_image_bytes as u64 {
                return Err(self.too_large(source));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ChefError::FetchError(format!("Reading {} failed: {}", source, e)))?
        {
            if bytes.len() + chunk.len() > self.max_image_bytes {
                return Err(self.too_large(source));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(ChefError::FetchError(format!("{} is empty", source)));
        }
        Ok(bytes)
    }

    fn too_large(&self, source: &str) -> ChefError {
        ChefError::FetchError(format!(
            "{} is larger than {} bytes",
            source, self.max_image_bytes
        ))
    }
}

fn header_content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
