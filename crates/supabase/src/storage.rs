//! Supabase Storage client for a single public bucket.
//!
//! Uploads use the service-role key, so this client must only be built on
//! the server side (the admin panel).

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use crate::{error_message, http_client, trim_base};

/// Errors returned by [`StorageClient`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Client bound to one bucket.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
    bucket: String,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl StorageClient {
    /// Create a client for `bucket` in the project at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        service_key: SecretString,
        bucket: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Ok(Self {
            client: http_client()?,
            base_url: trim_base(base_url),
            service_key,
            bucket: bucket.into(),
        })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload (or overwrite) an object and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for empty or traversing paths
    /// and [`StorageError::Api`] when the service refuses the upload.
    #[instrument(skip(self, bytes), fields(bucket = %self.bucket, size = bytes.len()))]
    pub async fn upload(
        &self,
        object_path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        validate_path(object_path)?;
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, object_path
        );

        let file_name = object_path
            .rsplit('/')
            .next()
            .unwrap_or(object_path)
            .to_owned();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .header("x-upsert", "true")
            .multipart(form)
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!(path = %object_path, "Uploaded object");
        Ok(self.public_url(object_path))
    }

    /// Delete objects by path. Missing objects are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Api`] if the service refuses the request.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn remove(&self, object_paths: &[String]) -> Result<(), StorageError> {
        if object_paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);

        let response = self
            .client
            .delete(&url)
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .json(&serde_json::json!({ "prefixes": object_paths }))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    /// Public URL of an object in this bucket.
    #[must_use]
    pub fn public_url(&self, object_path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_path
        )
    }

    /// Inverse of [`Self::public_url`]: the object path of a URL that points
    /// into this bucket, or `None` for foreign URLs.
    #[must_use]
    pub fn object_path_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/storage/v1/object/public/{}/", self.base_url, self.bucket);
        url.strip_prefix(&prefix)
            .filter(|p| !p.is_empty())
            .map(str::to_owned)
    }
}

/// Build a collision-free object path like `products/6205/<uuid>-photo.jpg`.
///
/// The original filename is reduced to ASCII alphanumerics, `-`, `_` and `.`.
#[must_use]
pub fn unique_object_path(prefix: &str, file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');
    let cleaned = if cleaned.is_empty() { "upload" } else { cleaned };
    let prefix = prefix.trim_matches('/');
    format!("{prefix}/{}-{cleaned}", uuid::Uuid::new_v4())
}

fn validate_path(object_path: &str) -> Result<(), StorageError> {
    if object_path.is_empty()
        || object_path.starts_with('/')
        || object_path.split('/').any(|segment| segment == ".." || segment.is_empty())
    {
        return Err(StorageError::InvalidPath(object_path.to_owned()));
    }
    Ok(())
}

async fn check_status(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);
    tracing::error!(status = status.as_u16(), %message, "Supabase storage error");
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> StorageClient {
        StorageClient::new(base, SecretString::from("service-key".to_owned()), "product-images")
            .unwrap()
    }

    #[test]
    fn test_public_url_roundtrip() {
        let storage = client("https://proj.supabase.co/");
        let url = storage.public_url("products/a.jpg");
        assert_eq!(
            url,
            "https://proj.supabase.co/storage/v1/object/public/product-images/products/a.jpg"
        );
        assert_eq!(storage.object_path_from_url(&url).as_deref(), Some("products/a.jpg"));
        assert!(storage.object_path_from_url("https://cdn.example.com/a.jpg").is_none());
    }

    #[test]
    fn test_unique_object_path_sanitizes() {
        let p = unique_object_path("/products/", "My Photo (1).JPG");
        assert!(p.starts_with("products/"));
        assert!(p.ends_with("-my-photo--1-.jpg"));

        let p = unique_object_path("banners", "...");
        assert!(p.ends_with("-upload"));
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("products/a.jpg").is_ok());
        assert!(validate_path("").is_err());
        assert!(validate_path("/abs.jpg").is_err());
        assert!(validate_path("products/../secret").is_err());
        assert!(validate_path("products//a.jpg").is_err());
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/product-images/products/a.jpg"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"Key": "product-images/products/a.jpg"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let storage = client(&server.uri());
        let url = storage
            .upload("products/a.jpg", vec![0xFF, 0xD8], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(
            url,
            format!("{}/storage/v1/object/public/product-images/products/a.jpg", server.uri())
        );
    }

    #[tokio::test]
    async fn test_upload_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(413).set_body_json(serde_json::json!({
                "statusCode": "413",
                "error": "Payload too large",
                "message": "The object exceeded the maximum allowed size"
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .upload("products/big.jpg", vec![0; 16], "image/jpeg")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Api { status: 413, ref message }
            if message == "The object exceeded the maximum allowed size"));
    }

    #[tokio::test]
    async fn test_remove_empty_is_noop() {
        // No server: an empty list must not issue a request.
        let storage = client("http://127.0.0.1:9");
        storage.remove(&[]).await.unwrap();
    }
}
