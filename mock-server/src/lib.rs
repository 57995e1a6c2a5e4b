use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: u64,
    pub name: String,
    pub kind: String,
    pub photo: Option<String>,
}

/// Body of POST, PUT and PATCH. Every field is optional so that missing ones
/// can be reported per field instead of rejecting the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct PetInput {
    pub name: Option<String>,
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub photo: Option<Option<String>>,
}

/// Distinguishes `"photo": null` (clear) from a missing key (keep).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default)]
pub struct PetTable {
    next_id: u64,
    pets: Vec<Pet>,
}

impl PetTable {
    fn insert(&mut self, name: String, kind: String, photo: Option<String>) -> Pet {
        self.next_id += 1;
        let pet = Pet {
            id: self.next_id,
            name,
            kind,
            photo,
        };
        self.pets.push(pet.clone());
        pet
    }

    fn get_mut(&mut self, id: u64) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|p| p.id == id)
    }
}

pub type Db = Arc<RwLock<PetTable>>;

/// Failure responses. Validation failures carry `{field: message}`.
#[derive(Debug)]
pub enum ApiFailure {
    NotFound,
    Invalid(BTreeMap<&'static str, &'static str>),
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            ApiFailure::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiFailure::Invalid(errors) => (StatusCode::UNPROCESSABLE_ENTITY, Json(errors)).into_response(),
        }
    }
}

/// Largest accepted request body. Photos arrive inline as data URIs.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

pub fn app() -> Router {
    app_with_pets(Vec::new())
}

/// Router pre-populated with `pets`. Ids are kept; new ids continue after the
/// largest one.
pub fn app_with_pets(pets: Vec<Pet>) -> Router {
    let next_id = pets.iter().map(|p| p.id).max().unwrap_or(0);
    let db: Db = Arc::new(RwLock::new(PetTable { next_id, pets }));
    Router::new()
        .route("/pets", get(list_pets).post(create_pet))
        .route(
            "/pets/{id}",
            get(get_pet).put(replace_pet).patch(patch_pet).delete(delete_pet),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_pets(listener, Vec::new()).await
}

/// Serve a backend pre-populated with `pets`.
pub async fn run_with_pets(listener: TcpListener, pets: Vec<Pet>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_pets(pets)).await
}

async fn list_pets(State(db): State<Db>) -> Json<Vec<Pet>> {
    let table = db.read().await;
    Json(table.pets.clone())
}

async fn create_pet(
    State(db): State<Db>,
    Json(input): Json<PetInput>,
) -> Result<(StatusCode, Json<Pet>), ApiFailure> {
    let (name, kind, photo) = validate_full(input)?;
    let pet = db.write().await.insert(name, kind, photo);
    info!(id = pet.id, name = %pet.name, "created pet");
    Ok((StatusCode::CREATED, Json(pet)))
}

async fn get_pet(State(db): State<Db>, Path(id): Path<u64>) -> Result<Json<Pet>, ApiFailure> {
    let table = db.read().await;
    table
        .pets
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .map(Json)
        .ok_or(ApiFailure::NotFound)
}

async fn replace_pet(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PetInput>,
) -> Result<Json<Pet>, ApiFailure> {
    let mut table = db.write().await;
    let pet = table.get_mut(id).ok_or(ApiFailure::NotFound)?;
    let (name, kind, photo) = validate_full(input)?;
    pet.name = name;
    pet.kind = kind;
    pet.photo = photo;
    info!(id, "replaced pet");
    Ok(Json(pet.clone()))
}

async fn patch_pet(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PetInput>,
) -> Result<Json<Pet>, ApiFailure> {
    let mut table = db.write().await;
    let pet = table.get_mut(id).ok_or(ApiFailure::NotFound)?;

    let mut errors = BTreeMap::new();
    if let Some(name) = &input.name {
        check_name(name, &mut errors);
    }
    if let Some(kind) = &input.kind {
        check_kind(kind, &mut errors);
    }
    if let Some(Some(photo)) = &input.photo {
        check_photo(photo, &mut errors);
    }
    if !errors.is_empty() {
        return Err(ApiFailure::Invalid(errors));
    }

    if let Some(name) = input.name {
        pet.name = name;
    }
    if let Some(kind) = input.kind {
        pet.kind = kind;
    }
    if let Some(photo) = input.photo {
        pet.photo = photo;
    }
    info!(id, "patched pet");
    Ok(Json(pet.clone()))
}

async fn delete_pet(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, ApiFailure> {
    let mut table = db.write().await;
    let before = table.pets.len();
    table.pets.retain(|p| p.id != id);
    if table.pets.len() == before {
        return Err(ApiFailure::NotFound);
    }
    info!(id, "deleted pet");
    Ok(StatusCode::NO_CONTENT)
}

type Validated = (String, String, Option<String>);

/// Checks for POST and PUT, where every field is required to be valid.
fn validate_full(input: PetInput) -> Result<Validated, ApiFailure> {
    let mut errors = BTreeMap::new();
    let name = input.name.unwrap_or_default();
    let kind = input.kind.unwrap_or_default();
    let photo = input.photo.flatten();

    check_name(&name, &mut errors);
    check_kind(&kind, &mut errors);
    if let Some(photo) = &photo {
        check_photo(photo, &mut errors);
    }

    if errors.is_empty() {
        Ok((name, kind, photo))
    } else {
        Err(ApiFailure::Invalid(errors))
    }
}

fn check_name(name: &str, errors: &mut BTreeMap<&'static str, &'static str>) {
    if name.trim().is_empty() {
        errors.insert("name", "required");
    }
}

fn check_kind(kind: &str, errors: &mut BTreeMap<&'static str, &'static str>) {
    match kind {
        "cat" | "dog" => {}
        "" => {
            errors.insert("kind", "required");
        }
        _ => {
            errors.insert("kind", "invalid");
        }
    }
}

fn check_photo(photo: &str, errors: &mut BTreeMap<&'static str, &'static str>) {
    let valid = photo
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .is_some_and(|(mime, _)| !mime.is_empty());
    if !valid {
        errors.insert("photo", "invalid");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_serializes_to_json() {
        let pet = Pet {
            id: 1,
            name: "Rex".to_string(),
            kind: "dog".to_string(),
            photo: None,
        };
        let json = serde_json::to_value(&pet).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Rex");
        assert_eq!(json["kind"], "dog");
        assert!(json["photo"].is_null());
    }

    #[test]
    fn input_distinguishes_null_photo_from_missing() {
        let input: PetInput = serde_json::from_str(r#"{"photo":null}"#).unwrap();
        assert_eq!(input.photo, Some(None));
        let input: PetInput = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(input.photo, None);
    }

    #[test]
    fn validate_full_reports_every_field() {
        let input: PetInput =
            serde_json::from_str(r#"{"name":"  ","kind":"fish","photo":"/tmp/x.png"}"#).unwrap();
        let Err(ApiFailure::Invalid(errors)) = validate_full(input) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.get("name"), Some(&"required"));
        assert_eq!(errors.get("kind"), Some(&"invalid"));
        assert_eq!(errors.get("photo"), Some(&"invalid"));
    }

    #[test]
    fn validate_full_requires_kind() {
        let input: PetInput = serde_json::from_str(r#"{"name":"Rex","kind":""}"#).unwrap();
        let Err(ApiFailure::Invalid(errors)) = validate_full(input) else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("kind"), Some(&"required"));
    }

    #[test]
    fn validate_full_accepts_data_uri_photo() {
        let input: PetInput = serde_json::from_str(
            r#"{"name":"Mia","kind":"cat","photo":"data:image/png;base64,iVBORw0KGgo="}"#,
        )
        .unwrap();
        let (name, kind, photo) = validate_full(input).unwrap();
        assert_eq!(name, "Mia");
        assert_eq!(kind, "cat");
        assert!(photo.is_some());
    }

    #[test]
    fn table_assigns_increasing_ids() {
        let mut table = PetTable::default();
        let a = table.insert("A".into(), "cat".into(), None);
        let b = table.insert("B".into(), "dog".into(), None);
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(table.pets, vec![a, b]);
    }
}
