//! Outbound collaborators: object storage for photos and address geocoding.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::ServiceError;

/// A file received with a create/update request, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object storage rejected '{file_name}': {reason}")]
    Upload { file_name: String, reason: String },
    #[error("object '{url}' could not be deleted: {reason}")]
    Delete { url: String, reason: String },
}

/// Blob store returning publicly resolvable URLs.
pub trait ObjectStorage: Send + Sync + Debug {
    fn upload(&self, bytes: &[u8], file_name: &str, content_type: &str)
        -> Result<String, StorageError>;
    fn delete(&self, url: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("address could not be resolved: {0}")]
    Unresolvable(String),
    #[error("geocoding provider failed: {0}")]
    Provider(String),
}

pub trait Geocoder: Send + Sync + Debug {
    fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Rejects anything that is not an `image/*` payload before a single byte is uploaded.
pub fn validate_photos(photos: &[PhotoUpload]) -> Result<(), ServiceError> {
    for photo in photos {
        let is_image = photo
            .content_type
            .parse::<mime::Mime>()
            .map(|parsed| parsed.type_() == mime::IMAGE)
            .unwrap_or(false);
        if !is_image {
            return Err(ServiceError::Validation(format!(
                "photo '{}' must be an image (found '{}')",
                photo.file_name, photo.content_type
            )));
        }
    }
    Ok(())
}

/// Uploads every photo or none of them: on the first failure the objects already stored
/// for this request are deleted again and the failure is returned.
pub fn upload_all(
    storage: &dyn ObjectStorage,
    photos: &[PhotoUpload],
) -> Result<Vec<String>, ServiceError> {
    validate_photos(photos)?;

    let mut uploaded = Vec::with_capacity(photos.len());
    for photo in photos {
        match storage.upload(&photo.bytes, &photo.file_name, &photo.content_type) {
            Ok(url) => uploaded.push(url),
            Err(err) => {
                discard(storage, &uploaded);
                return Err(err.into());
            }
        }
    }
    Ok(uploaded)
}

/// Best-effort removal; failures are logged and skipped.
pub fn discard(storage: &dyn ObjectStorage, urls: &[String]) {
    for url in urls {
        if let Err(err) = storage.delete(url) {
            warn!(%url, error = %err, "failed to delete stored object");
        }
    }
}
