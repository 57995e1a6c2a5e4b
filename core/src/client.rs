//! Stateless HTTP request builder and response parser for the pets API.
//!
//! # Design
//! `PetClient` holds only a `base_url` and the verb used for updates; it
//! carries no mutable state between calls. Each CRUD operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. `RemoteStore` pairs the two halves with a
//! `Transport` to perform the actual round trip.

use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{NewPet, Pet, PetId};

/// Characters that must be escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Verb used to send an edited pet back to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    #[default]
    Put,
    Patch,
}

impl FromStr for UpdateMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "put" => Ok(UpdateMethod::Put),
            "patch" => Ok(UpdateMethod::Patch),
            other => Err(other.to_string()),
        }
    }
}

impl From<UpdateMethod> for HttpMethod {
    fn from(method: UpdateMethod) -> Self {
        match method {
            UpdateMethod::Put => HttpMethod::Put,
            UpdateMethod::Patch => HttpMethod::Patch,
        }
    }
}

/// Stateless client for the `pets` resource.
///
/// Builds `HttpRequest` values and parses `HttpResponse` values without
/// touching the network.
#[derive(Debug, Clone)]
pub struct PetClient {
    base_url: String,
    update_method: UpdateMethod,
}

impl PetClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            update_method: UpdateMethod::default(),
        }
    }

    pub fn with_update_method(mut self, method: UpdateMethod) -> Self {
        self.update_method = method;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_list_pets(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: format!("{}/pets", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_create_pet(&self, input: &NewPet) -> Result<HttpRequest, RequestError> {
        Ok(HttpRequest {
            method: HttpMethod::Post,
            path: format!("{}/pets", self.base_url),
            headers: json_headers(),
            body: Some(to_json(input)?),
        })
    }

    /// The full pet, id included, goes in the body.
    pub fn build_update_pet(&self, pet: &Pet) -> Result<HttpRequest, RequestError> {
        Ok(HttpRequest {
            method: self.update_method.into(),
            path: self.member_path(&pet.id),
            headers: json_headers(),
            body: Some(to_json(pet)?),
        })
    }

    pub fn build_delete_pet(&self, id: &PetId) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            path: self.member_path(id),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn parse_list_pets(&self, response: HttpResponse) -> Result<Vec<Pet>, RequestError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_create_pet(&self, response: HttpResponse) -> Result<Pet, RequestError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_update_pet(&self, response: HttpResponse) -> Result<Pet, RequestError> {
        check_status(&response)?;
        from_json(&response.body)
    }

    /// Any 2xx acknowledges the delete; the body is ignored.
    pub fn parse_delete_pet(&self, response: HttpResponse) -> Result<(), RequestError> {
        check_status(&response)
    }

    fn member_path(&self, id: &PetId) -> String {
        let segment = id.to_string();
        format!("{}/pets/{}", self.base_url, utf8_percent_encode(&segment, PATH_SEGMENT))
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![("content-type".to_string(), "application/json".to_string())]
}

fn to_json<T: Serialize>(value: &T) -> Result<String, RequestError> {
    serde_json::to_string(value).map_err(|e| RequestError::SerializationError(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, RequestError> {
    serde_json::from_str(body).map_err(|e| RequestError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `RequestError` variant.
fn check_status(response: &HttpResponse) -> Result<(), RequestError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(RequestError::NotFound);
    }
    match FieldErrors::from_body(&response.body) {
        Some(fields) => Err(RequestError::Validation {
            status: response.status,
            fields,
        }),
        None => Err(RequestError::HttpError {
            status: response.status,
            body: response.body.clone(),
        }),
    }
}
