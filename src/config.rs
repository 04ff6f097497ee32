use std::env;

/// Maximum accepted upload size (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Files below this size may be inlined as a data URL when every real
/// upload target fails (demo environments only).
pub const INLINE_DATA_URL_MAX_BYTES: usize = 1024 * 1024;

/// Runtime configuration, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Base URL of the hosted backend (relational store + auth + storage).
    pub backend_url: String,
    /// Anonymous API key sent with every backend request.
    pub anon_key: String,
    /// Storage bucket that holds artwork images.
    pub artworks_bucket: String,
    /// API key for the ImgBB fallback host, if configured.
    pub imgbb_api_key: Option<String>,
    pub max_upload_bytes: usize,
    pub inline_data_url_max_bytes: usize,
}

impl GalleryConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let backend_url = env::var("GALLERY_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:54321".to_string());

        let anon_key = env::var("GALLERY_ANON_KEY").unwrap_or_default();
        if anon_key.is_empty() {
            log::warn!("GALLERY_ANON_KEY not set, backend requests will be unauthenticated");
        }

        let imgbb_api_key = env::var("IMGBB_API_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        Self {
            backend_url,
            anon_key,
            artworks_bucket: env::var("GALLERY_ARTWORKS_BUCKET")
                .unwrap_or_else(|_| "artworks".to_string()),
            imgbb_api_key,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            inline_data_url_max_bytes: INLINE_DATA_URL_MAX_BYTES,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:54321".to_string(),
            anon_key: String::new(),
            artworks_bucket: "artworks".to_string(),
            imgbb_api_key: None,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            inline_data_url_max_bytes: INLINE_DATA_URL_MAX_BYTES,
        }
    }
}
