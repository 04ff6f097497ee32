//! Image upload with a durability fallback chain.
//!
//! An upload tries each rung in order and returns the first success:
//!
//!   1. the backend object store (durable, preferred)
//!   2. external image hosts (durable, third-party)
//!   3. an inline data URL for small files (works offline, bloats rows)
//!   4. a transient reference (placeholder only, never durable)
//!
//! Validation runs before any network traffic: only `image/*` content
//! under the size cap is accepted.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::config::GalleryConfig;
use crate::gateway::{GatewayError, GatewayResult, StorageGateway};

/// A file handed over by the browser form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        }
    }

    fn extension(&self) -> &str {
        self.file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("png")
    }
}

/// Which rung of the fallback chain produced the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ObjectStore,
    ImageHost,
    DataUrl,
    Transient,
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub url: String,
    pub kind: UploadKind,
}

impl UploadedImage {
    /// Whether the URL will survive a page reload on another machine.
    pub fn is_durable(&self) -> bool {
        matches!(self.kind, UploadKind::ObjectStore | UploadKind::ImageHost)
    }
}

/// An external image hosting service usable as a storage fallback.
#[async_trait]
pub trait ImageHost: Send + Sync {
    fn name(&self) -> &str;

    /// Upload the file and return its public URL.
    async fn upload(&self, file: &ImageFile) -> GatewayResult<String>;
}

pub struct Uploader {
    storage: Arc<dyn StorageGateway>,
    hosts: Vec<Arc<dyn ImageHost>>,
    config: GalleryConfig,
}

impl Uploader {
    /// Standard host chain: ImgBB when an API key is configured, then
    /// anonymous Imgur.
    pub fn new(storage: Arc<dyn StorageGateway>, config: GalleryConfig) -> Self {
        let mut hosts: Vec<Arc<dyn ImageHost>> = Vec::new();
        if let Some(key) = &config.imgbb_api_key {
            hosts.push(Arc::new(ImgBbHost::new(key)));
        }
        hosts.push(Arc::new(ImgurHost::new()));
        Self {
            storage,
            hosts,
            config,
        }
    }

    /// Replace the host chain (tests inject stub hosts here).
    pub fn with_hosts(
        storage: Arc<dyn StorageGateway>,
        config: GalleryConfig,
        hosts: Vec<Arc<dyn ImageHost>>,
    ) -> Self {
        Self {
            storage,
            hosts,
            config,
        }
    }

    pub async fn upload(&self, file: &ImageFile) -> GatewayResult<UploadedImage> {
        if !file.content_type.starts_with("image/") {
            return Err(GatewayError::Validation(format!(
                "unsupported content type {}",
                file.content_type
            )));
        }
        if file.bytes.len() > self.config.max_upload_bytes {
            return Err(GatewayError::Validation(format!(
                "file exceeds the {} byte limit",
                self.config.max_upload_bytes
            )));
        }

        let path = format!("public/{}.{}", Uuid::new_v4(), file.extension());
        match self
            .storage
            .upload(
                &self.config.artworks_bucket,
                &path,
                &file.bytes,
                &file.content_type,
            )
            .await
        {
            Ok(()) => {
                return Ok(UploadedImage {
                    url: self.storage.public_url(&self.config.artworks_bucket, &path),
                    kind: UploadKind::ObjectStore,
                });
            }
            Err(e) => log::warn!("object store upload failed, trying image hosts: {e}"),
        }

        for host in &self.hosts {
            match host.upload(file).await {
                Ok(url) => {
                    return Ok(UploadedImage {
                        url,
                        kind: UploadKind::ImageHost,
                    });
                }
                Err(e) => log::warn!("{} upload failed: {e}", host.name()),
            }
        }

        if file.bytes.len() < self.config.inline_data_url_max_bytes {
            log::warn!("all upload targets failed, inlining image as a data URL");
            let encoded = BASE64.encode(&file.bytes);
            return Ok(UploadedImage {
                url: format!("data:{};base64,{encoded}", file.content_type),
                kind: UploadKind::DataUrl,
            });
        }

        log::warn!("all upload targets failed, returning a transient reference");
        Ok(UploadedImage {
            url: format!("transient://{}", Uuid::new_v4()),
            kind: UploadKind::Transient,
        })
    }
}

// ==== ImgBB ====

pub struct ImgBbHost {
    client: reqwest::Client,
    api_key: String,
}

impl ImgBbHost {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ImgBbResponse {
    success: bool,
    #[serde(default)]
    data: Option<ImgBbData>,
}

#[derive(Deserialize)]
struct ImgBbData {
    url: String,
}

#[async_trait]
impl ImageHost for ImgBbHost {
    fn name(&self) -> &str {
        "imgbb"
    }

    async fn upload(&self, file: &ImageFile) -> GatewayResult<String> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post("https://api.imgbb.com/1/upload")
            .query(&[("key", self.api_key.as_str())])
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "imgbb returned {}",
                response.status()
            )));
        }

        let body: ImgBbResponse = response.json().await?;
        match body.data {
            Some(data) if body.success => Ok(data.url),
            _ => Err(GatewayError::Transport(
                "imgbb reported an unsuccessful upload".to_string(),
            )),
        }
    }
}

// ==== Imgur (anonymous) ====

const IMGUR_ANONYMOUS_CLIENT_ID: &str = "546c25a59c58ad7";

pub struct ImgurHost {
    client: reqwest::Client,
    client_id: String,
}

impl ImgurHost {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: IMGUR_ANONYMOUS_CLIENT_ID.to_string(),
        }
    }
}

impl Default for ImgurHost {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ImgurResponse {
    success: bool,
    #[serde(default)]
    data: Option<ImgurData>,
}

#[derive(Deserialize)]
struct ImgurData {
    link: String,
}

#[async_trait]
impl ImageHost for ImgurHost {
    fn name(&self) -> &str {
        "imgur"
    }

    async fn upload(&self, file: &ImageFile) -> GatewayResult<String> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let response = self
            .client
            .post("https://api.imgur.com/3/image")
            .header(
                "Authorization",
                format!("Client-ID {}", self.client_id),
            )
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "imgur returned {}",
                response.status()
            )));
        }

        let body: ImgurResponse = response.json().await?;
        match body.data {
            Some(data) if body.success => Ok(data.link),
            _ => Err(GatewayError::Transport(
                "imgur reported an unsuccessful upload".to_string(),
            )),
        }
    }
}
