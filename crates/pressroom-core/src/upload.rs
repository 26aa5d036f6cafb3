//! Image uploads

use chrono::Utc;
use pressroom_common::config::StorageConfig;
use pressroom_common::{Error, Result};
use pressroom_storage::file::FileStorage;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Stores uploaded images and hands back their public URL
pub struct UploadService {
    storage: Arc<dyn FileStorage>,
    bucket: String,
    public_base_url: String,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(storage: Arc<dyn FileStorage>, config: &StorageConfig) -> Self {
        Self {
            storage,
            bucket: config.bucket.trim_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_upload_bytes,
        }
    }

    /// Store `data` under a fresh `{random}_{millis}.{ext}` name
    pub async fn upload(&self, filename: &str, data: &[u8]) -> Result<String> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| Error::Upload(format!("File has no extension: {}", filename)))?;

        let mime = mime_guess::from_ext(&ext).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::IMAGE {
            return Err(Error::Upload(format!("Only images can be uploaded (got {})", mime)));
        }
        if data.is_empty() {
            return Err(Error::Upload("File is empty".to_string()));
        }
        if data.len() > self.max_bytes {
            return Err(Error::Upload(format!(
                "File is too large ({} bytes, limit {})",
                data.len(),
                self.max_bytes
            )));
        }

        let name = stored_name(&ext, Utc::now().timestamp_millis());
        let key = format!("{}/{}", self.bucket, name);
        self.storage.store(&key, data).await.map_err(|e| {
            warn!(key = %key, "Upload failed: {}", e);
            Error::Upload(e.to_string())
        })?;

        info!(key = %key, size = data.len(), "Image uploaded");
        Ok(format!("{}/{}", self.public_base_url, key))
    }
}

fn stored_name(ext: &str, millis: i64) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}_{}.{}", &random[..13], millis, ext)
}
