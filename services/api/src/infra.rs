use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use student_lets::config::{GeocodingConfig, StorageConfig};
use student_lets::marketplace::gateways::{
    Coordinates, GeocodeError, Geocoder, ObjectStorage, StorageError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) objects: Arc<InMemoryObjectStorage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoredObject {
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// Photo storage held in process memory and served back under `/uploads/{key}`.
#[derive(Debug)]
pub(crate) struct InMemoryObjectStorage {
    public_base_url: String,
    sequence: AtomicU64,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl InMemoryObjectStorage {
    pub(crate) fn new(config: &StorageConfig) -> Self {
        Self {
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            sequence: AtomicU64::new(0),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn fetch(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    fn key_for(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_base_url)?
            .strip_prefix('/')
            .map(str::to_string)
    }
}

impl ObjectStorage for InMemoryObjectStorage {
    fn upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let key = format!("{id}-{}", sanitize_file_name(file_name));

        let mut objects = self.objects.lock().map_err(|_| StorageError::Upload {
            file_name: file_name.to_string(),
            reason: "object store lock poisoned".to_string(),
        })?;
        objects.insert(
            key.clone(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );

        Ok(format!("{}/{key}", self.public_base_url))
    }

    fn delete(&self, url: &str) -> Result<(), StorageError> {
        let key = self.key_for(url).ok_or_else(|| StorageError::Delete {
            url: url.to_string(),
            reason: "url is not served by this store".to_string(),
        })?;

        let mut objects = self.objects.lock().map_err(|_| StorageError::Delete {
            url: url.to_string(),
            reason: "object store lock poisoned".to_string(),
        })?;
        objects
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| StorageError::Delete {
                url: url.to_string(),
                reason: "no such object".to_string(),
            })
    }
}

fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}

/// Resolves addresses by the first known place name they mention, falling back to a configured
/// coordinate when nothing matches.
#[derive(Debug, Default)]
pub(crate) struct InMemoryGeocoder {
    places: Vec<(String, Coordinates)>,
    fallback: Option<Coordinates>,
}

impl InMemoryGeocoder {
    pub(crate) fn new(config: &GeocodingConfig) -> Self {
        let mut geocoder = Self {
            places: Vec::new(),
            fallback: config.fallback,
        };
        for (place, latitude, longitude) in UNIVERSITY_TOWNS {
            geocoder = geocoder.with_place(place, Coordinates { latitude, longitude });
        }
        geocoder
    }

    pub(crate) fn with_place(mut self, place: &str, coordinates: Coordinates) -> Self {
        self.places.push((place.to_ascii_lowercase(), coordinates));
        self
    }
}

const UNIVERSITY_TOWNS: [(&str, f64, f64); 6] = [
    ("cambridge", 52.2053, 0.1218),
    ("oxford", 51.7520, -1.2577),
    ("london", 51.5072, -0.1276),
    ("manchester", 53.4808, -2.2426),
    ("edinburgh", 55.9533, -3.1883),
    ("bristol", 51.4545, -2.5879),
];

impl Geocoder for InMemoryGeocoder {
    fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let needle = address.to_ascii_lowercase();
        self.places
            .iter()
            .find(|(place, _)| needle.contains(place.as_str()))
            .map(|(_, coordinates)| *coordinates)
            .or(self.fallback)
            .ok_or_else(|| GeocodeError::Unresolvable(address.to_string()))
    }
}
