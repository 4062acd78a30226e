//! Punch photo evidence in the object store.

use anyhow::Context;
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::storage::StorageClient;

/// A captured photo as received from the client.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub body: Bytes,
    pub content_type: String,
}

impl PhotoUpload {
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Object key for a worker's photo taken at `at`: `<worker>/<unix-millis>-<id>.<ext>`.
pub fn photo_key(owner: &str, at: OffsetDateTime, content_type: &str) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    format!("{}/{}-{}.{}", owner, millis, Uuid::new_v4().simple(), ext)
}

/// Uploads the photo and returns its reference (the object key).
pub async fn store_photo(
    storage: &dyn StorageClient,
    owner: &str,
    photo: PhotoUpload,
    at: OffsetDateTime,
) -> anyhow::Result<String> {
    let key = photo_key(owner, at, &photo.content_type);
    storage
        .put_object(&key, photo.body, &photo.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    debug!(%key, "photo stored");
    Ok(key)
}

/// Best-effort removal of a photo whose punch was not recorded.
pub async fn discard_photo(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = %e, %key, "orphaned photo could not be deleted");
    }
}

pub async fn public_url_for(
    storage: &dyn StorageClient,
    key: &str,
    ttl_secs: u64,
) -> anyhow::Result<String> {
    storage
        .presign_get(key, ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", key))
}

/// Content type to store a camera upload under. A missing or generic
/// declared type falls back to the file extension, then to JPEG.
pub fn photo_content_type(declared: Option<&str>, file_name: Option<&str>) -> String {
    match declared.map(str::trim) {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => file_name
            .and_then(|n| n.rsplit_once('.'))
            .and_then(|(_, ext)| mime_from_ext(ext))
            .unwrap_or("image/jpeg")
            .to_string(),
    }
}

fn mime_from_ext(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
