// ImageKit adapter
// Upload API: https://docs.imagekit.io/api-reference/upload-file-api/server-side-file-upload
// Client-side auth parameters: token + expire signed with HMAC-SHA1 of the private key

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::Deserialize;
use sha1::Sha1;
use tracing::debug;
use uuid::Uuid;

use super::{guess_mime, unix_timestamp, ProviderAdapter};
use crate::models::{Credential, StorageProvider, StoredFile, UploadSignature};
use crate::types::{AppError, AppResult};

type HmacSha1 = Hmac<Sha1>;

pub struct ImageKitAdapter {
    client: Client,
    upload_url: String,
    signature_ttl_secs: i64,
}

#[derive(Deserialize)]
struct ImageKitUploadResponse {
    url: String,
    #[serde(rename = "fileId")]
    file_id: String,
}

impl ImageKitAdapter {
    pub fn new(client: Client, upload_url: &str, signature_ttl_secs: i64) -> Self {
        Self {
            client,
            upload_url: upload_url.to_string(),
            signature_ttl_secs,
        }
    }

    /// ImageKit takes the private key as the Basic auth username with an empty password
    fn basic_auth(private_key: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{}:", private_key)))
    }

    /// hex(HMAC-SHA1(private_key, token + expire))
    pub fn signature_for(private_key: &str, token: &str, expire: i64) -> AppResult<String> {
        let mut mac = HmacSha1::new_from_slice(private_key.as_bytes())
            .map_err(|e| AppError::Internal(format!("Invalid HMAC key: {}", e)))?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ProviderAdapter for ImageKitAdapter {
    fn provider(&self) -> StorageProvider {
        StorageProvider::ImageKit
    }

    async fn upload(
        &self,
        credential: &Credential,
        file_bytes: &[u8],
        file_name: &str,
    ) -> AppResult<StoredFile> {
        let part = Part::bytes(file_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(&guess_mime(file_name))
            .map_err(|e| AppError::provider_upload(&credential.name, format!("Invalid file part: {}", e)))?;

        let form = Form::new()
            .part("file", part)
            .text("fileName", file_name.to_string());

        debug!(credential = %credential.name, url = %self.upload_url, "Uploading to ImageKit");

        let response = self
            .client
            .post(&self.upload_url)
            .header(AUTHORIZATION, Self::basic_auth(&credential.private_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::provider_upload(&credential.name, format!("ImageKit request failed: {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::provider_upload(
                &credential.name,
                format!("ImageKit upload failed ({}): {}", status.as_u16(), body),
            ));
        }

        let body: ImageKitUploadResponse = response.json().await.map_err(|e| {
            AppError::provider_upload(&credential.name, format!("Failed to parse ImageKit response: {}", e))
        })?;

        Ok(StoredFile {
            url: body.url,
            file_id: body.file_id,
        })
    }

    fn sign(&self, credential: &Credential, _file_name: &str) -> AppResult<UploadSignature> {
        let token = Uuid::new_v4().to_string();
        let expire = unix_timestamp() + self.signature_ttl_secs;
        let signature = Self::signature_for(&credential.private_key, &token, expire)?;

        Ok(UploadSignature::ImageKit {
            token,
            expire,
            signature,
            public_key: credential.public_key.clone(),
        })
    }
}
