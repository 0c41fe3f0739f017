// Cloudinary adapter
// Upload API: https://cloudinary.com/documentation/image_upload_api_reference
// Signed uploads: sha1 over the sorted params joined with '&', followed by the API secret

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;

use super::{guess_mime, unix_timestamp, ProviderAdapter};
use crate::models::{Credential, StorageProvider, StoredFile, UploadSignature};
use crate::types::{AppError, AppResult};

const API_VERSION_SEGMENT: &str = "v1_1";

pub struct CloudinaryAdapter {
    client: Client,
    api_base: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    public_id: Option<String>,
}

/// Cloud name precedence: segment after `v1_1/`, else the first path segment
/// (unless it is `v1_1`), else `bucket_name`.
pub fn resolve_cloud_name(url_endpoint: &str, bucket_name: Option<&str>) -> Option<String> {
    let from_url = Url::parse(url_endpoint.trim()).ok().and_then(|url| {
        let path = url.path().trim_start_matches('/');
        let mut segments = path.split('/');
        let first = segments.next().unwrap_or_default();

        if path.starts_with("v1_1/") {
            segments.next().filter(|s| !s.is_empty()).map(str::to_string)
        } else if !first.is_empty() && first != API_VERSION_SEGMENT {
            Some(first.to_string())
        } else {
            None
        }
    });

    from_url.or_else(|| {
        bucket_name
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_string)
    })
}

/// hex(sha1("public_id={public_id}&timestamp={timestamp}" + api_secret))
pub fn sign_params(public_id: &str, timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("public_id={}&timestamp={}", public_id, timestamp).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

impl CloudinaryAdapter {
    pub fn new(client: Client, api_base: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn upload_url(&self, cloud_name: &str) -> String {
        format!("{}/{}/image/upload", self.api_base, cloud_name)
    }

    fn cloud_name_for(credential: &Credential) -> Option<String> {
        resolve_cloud_name(&credential.url_endpoint, credential.bucket_name.as_deref())
    }
}

#[async_trait]
impl ProviderAdapter for CloudinaryAdapter {
    fn provider(&self) -> StorageProvider {
        StorageProvider::Cloudinary
    }

    async fn upload(
        &self,
        credential: &Credential,
        file_bytes: &[u8],
        file_name: &str,
    ) -> AppResult<StoredFile> {
        let cloud_name = Self::cloud_name_for(credential)
            .ok_or_else(|| AppError::provider_upload(&credential.name, "missing cloud_name"))?;

        let timestamp = unix_timestamp();
        let signature = sign_params(file_name, timestamp, &credential.private_key);

        let part = Part::bytes(file_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(&guess_mime(file_name))
            .map_err(|e| AppError::provider_upload(&credential.name, format!("Invalid file part: {}", e)))?;

        let form = Form::new()
            .text("api_key", credential.public_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature)
            .text("public_id", file_name.to_string())
            .part("file", part);

        let url = self.upload_url(&cloud_name);
        debug!(credential = %credential.name, %cloud_name, "Uploading to Cloudinary");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::provider_upload(&credential.name, format!("Cloudinary request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider_upload(
                &credential.name,
                format!("Cloudinary upload failed ({}): {}", status.as_u16(), body),
            ));
        }

        let body: CloudinaryUploadResponse = response.json().await.map_err(|e| {
            AppError::provider_upload(&credential.name, format!("Failed to parse Cloudinary response: {}", e))
        })?;

        let url = body
            .secure_url
            .or(body.url)
            .ok_or_else(|| AppError::provider_upload(&credential.name, "Cloudinary response has no url"))?;

        Ok(StoredFile {
            url,
            file_id: body.public_id.unwrap_or_else(|| file_name.to_string()),
        })
    }

    fn sign(&self, credential: &Credential, file_name: &str) -> AppResult<UploadSignature> {
        let timestamp = unix_timestamp();
        Ok(UploadSignature::Cloudinary {
            signature: sign_params(file_name, timestamp, &credential.private_key),
            timestamp,
            api_key: credential.public_key.clone(),
            cloud_name: Self::cloud_name_for(credential),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::credential;
    use mockito::{Matcher, Server};

    fn cloudinary_credential(url_endpoint: &str, bucket_name: Option<&str>) -> Credential {
        let mut cred = credential("cl-primary", StorageProvider::Cloudinary);
        cred.public_key = "123456789".to_string();
        cred.private_key = "cloud-secret".to_string();
        cred.url_endpoint = url_endpoint.to_string();
        cred.bucket_name = bucket_name.map(str::to_string);
        cred
    }

    #[test]
    fn test_cloud_name_from_api_url() {
        assert_eq!(
            resolve_cloud_name("https://api.cloudinary.com/v1_1/demo/image/upload", None),
            Some("demo".to_string())
        );
    }

    #[test]
    fn test_cloud_name_from_delivery_url() {
        assert_eq!(
            resolve_cloud_name("https://res.cloudinary.com/demo", None),
            Some("demo".to_string())
        );
        assert_eq!(
            resolve_cloud_name("https://res.cloudinary.com/demo/", Some("ignored")),
            Some("demo".to_string())
        );
    }

    #[test]
    fn test_cloud_name_falls_back_to_bucket() {
        assert_eq!(resolve_cloud_name("", Some("fallback")), Some("fallback".to_string()));
        // bare host, or a version segment with nothing after it
        assert_eq!(
            resolve_cloud_name("https://api.cloudinary.com", Some("fallback")),
            Some("fallback".to_string())
        );
        assert_eq!(
            resolve_cloud_name("https://api.cloudinary.com/v1_1/", Some("fallback")),
            Some("fallback".to_string())
        );
        assert_eq!(
            resolve_cloud_name("https://api.cloudinary.com/v1_1", Some("fallback")),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_cloud_name_unresolved() {
        assert_eq!(resolve_cloud_name("", Some("")), None);
        assert_eq!(resolve_cloud_name("", None), None);
    }

    #[test]
    fn test_sign_params_known_vector() {
        assert_eq!(
            sign_params("cat.png", 1700000000, "cloud-secret"),
            "f5e9db74f249b56c62b55c946d65c5e5aac705f9"
        );
    }

    #[test]
    fn test_sign_includes_cloud_name_when_resolvable() {
        let adapter = CloudinaryAdapter::new(Client::new(), "https://api.cloudinary.com/v1_1");
        let cred = cloudinary_credential("https://res.cloudinary.com/demo", None);

        match adapter.sign(&cred, "cat.png").unwrap() {
            UploadSignature::Cloudinary { signature, timestamp, api_key, cloud_name } => {
                assert_eq!(signature, sign_params("cat.png", timestamp, "cloud-secret"));
                assert_eq!(api_key, "123456789");
                assert_eq!(cloud_name, Some("demo".to_string()));
            }
            other => panic!("unexpected signature shape: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_success_prefers_secure_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="api_key""#.to_string()),
                Matcher::Regex("123456789".to_string()),
                Matcher::Regex(r#"name="signature""#.to_string()),
                Matcher::Regex(r#"name="timestamp""#.to_string()),
                Matcher::Regex(r#"name="public_id""#.to_string()),
                Matcher::Regex(r#"name="file"; filename="cat.png""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"public_id":"cat.png","url":"http://res.cloudinary.com/demo/cat.png","secure_url":"https://res.cloudinary.com/demo/cat.png"}"#,
            )
            .create_async()
            .await;

        let adapter = CloudinaryAdapter::new(Client::new(), &format!("{}/v1_1", server.url()));
        let cred = cloudinary_credential("https://api.cloudinary.com/v1_1/demo/image/upload", None);
        let stored = adapter.upload(&cred, b"meow", "cat.png").await.unwrap();

        assert_eq!(stored.url, "https://res.cloudinary.com/demo/cat.png");
        assert_eq!(stored.file_id, "cat.png");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_falls_back_to_plain_url() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1_1/fallback/image/upload")
            .with_status(200)
            .with_body(r#"{"public_id":"cat","url":"http://res.cloudinary.com/fallback/cat.png"}"#)
            .create_async()
            .await;

        let adapter = CloudinaryAdapter::new(Client::new(), &format!("{}/v1_1/", server.url()));
        let cred = cloudinary_credential("", Some("fallback"));
        let stored = adapter.upload(&cred, b"meow", "cat.png").await.unwrap();

        assert_eq!(stored.url, "http://res.cloudinary.com/fallback/cat.png");
        assert_eq!(stored.file_id, "cat");
    }

    #[tokio::test]
    async fn test_upload_error_status() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1_1/demo/image/upload")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid Signature"}}"#)
            .create_async()
            .await;

        let adapter = CloudinaryAdapter::new(Client::new(), &format!("{}/v1_1", server.url()));
        let cred = cloudinary_credential("https://res.cloudinary.com/demo", None);
        let err = adapter.upload(&cred, b"meow", "cat.png").await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("401"));
        assert!(message.contains("Invalid Signature"));
    }

    #[tokio::test]
    async fn test_missing_cloud_name_fails_before_network() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let adapter = CloudinaryAdapter::new(Client::new(), &format!("{}/v1_1", server.url()));
        let cred = cloudinary_credential("", Some(""));
        let err = adapter.upload(&cred, b"meow", "cat.png").await.unwrap_err();

        match err {
            AppError::ProviderUpload { credential_name, detail } => {
                assert_eq!(credential_name, "cl-primary");
                assert_eq!(detail, "missing cloud_name");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        mock.assert_async().await;
    }
}
