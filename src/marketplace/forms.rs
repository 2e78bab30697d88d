//! Request bodies that arrive either as JSON or as `multipart/form-data` with photo files.
//!
//! Multipart text fields are converted into a JSON object and then deserialized with the same
//! schema as a JSON body, so both encodings share one strict set of rules.

use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, Multipart, Path, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::error::ServiceError;
use super::gateways::PhotoUpload;

/// Multipart field name carrying photo files.
pub const PHOTO_FIELD: &str = "photos";

#[derive(Debug)]
pub struct FormPayload<T> {
    pub payload: T,
    pub photos: Vec<PhotoUpload>,
}

#[async_trait]
impl<S, T> FromRequest<S> for FormPayload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;
            return Ok(Self {
                payload,
                photos: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::Validation(rejection.body_text()))?;

        let mut fields = Map::new();
        let mut photos = Vec::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ServiceError::Validation(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    if name != PHOTO_FIELD {
                        return Err(ServiceError::Validation(format!(
                            "unexpected file field '{name}'"
                        )));
                    }
                    let content_type = field.content_type().map(str::to_string).unwrap_or_else(
                        || {
                            mime_guess::from_path(&file_name)
                                .first_or_octet_stream()
                                .to_string()
                        },
                    );
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| ServiceError::Validation(err.body_text()))?;
                    if bytes.is_empty() {
                        continue;
                    }
                    photos.push(PhotoUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|err| ServiceError::Validation(err.body_text()))?;
                    fields.insert(name, form_value(&text));
                }
            }
        }

        let payload = serde_json::from_value(Value::Object(fields))
            .map_err(|err| ServiceError::Validation(format!("invalid form data: {err}")))?;
        Ok(Self { payload, photos })
    }
}

/// Unwraps a JSON body, turning any rejection into a 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

pub(crate) fn path_params<T>(
    extracted: Result<Path<T>, PathRejection>,
) -> Result<T, ServiceError> {
    extracted
        .map(|Path(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

pub(crate) fn query_params<T>(
    extracted: Result<Query<T>, QueryRejection>,
) -> Result<T, ServiceError> {
    extracted
        .map(|Query(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

/// Interprets a form text field: JSON arrays/objects, booleans, and numbers keep their type,
/// everything else stays a string.
pub(crate) fn form_value(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return value;
        }
    }
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(number) = serde_json::from_str::<serde_json::Number>(trimmed) {
        return Value::Number(number);
    }
    Value::String(text.to_string())
}

/// Accepts strings, or the numbers and booleans that [`form_value`] produced for a text field
/// such as a postal code or a listing named "2024".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text(Value::deserialize(deserializer)?)
}

pub(crate) fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_text(value).map(Some),
    }
}

fn scalar_text<E: de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(E::custom(format!("expected a string, found {other}"))),
    }
}

/// Accepts a JSON array of strings or a comma-separated string.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_string_list(deserializer)?.unwrap_or_default())
}

pub(crate) fn optional_string_list<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(split_list(&text))),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text.trim().to_string()),
                other => Err(de::Error::custom(format!(
                    "expected a list of strings, found {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(other) => Err(de::Error::custom(format!(
            "expected a list of strings, found {other}"
        ))),
    }
}

pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
