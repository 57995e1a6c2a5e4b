//! Domain DTOs for the pets resource.
//!
//! # Design
//! These types mirror the backend's JSON shape but are defined independently
//! of the mock-server crate. Integration tests catch any schema drift between
//! the two. A `Pet` always carries a server-assigned id; a `NewPet` never does,
//! so the compiler keeps drafts out of the canonical collection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::photo::Photo;

/// Server-assigned identity of a pet. Backends hand out either numbers or
/// strings, so both are accepted and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PetId {
    Number(u64),
    Text(String),
}

impl fmt::Display for PetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PetId::Number(n) => write!(f, "{n}"),
            PetId::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for PetId {
    fn from(n: u64) -> Self {
        PetId::Number(n)
    }
}

impl From<&str> for PetId {
    fn from(s: &str) -> Self {
        PetId::Text(s.to_string())
    }
}

impl From<String> for PetId {
    fn from(s: String) -> Self {
        PetId::Text(s)
    }
}

/// The kind of animal. `Unset` is the "Choose a kind" placeholder and
/// serializes as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "cat")]
    Cat,
    #[serde(rename = "dog")]
    Dog,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Cat => "cat",
            Kind::Dog => "dog",
            Kind::Unset => "",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known `Kind`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pet kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cat" => Ok(Kind::Cat),
            "dog" => Ok(Kind::Dog),
            "" => Ok(Kind::Unset),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// A pet as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub name: String,
    #[serde(default, deserialize_with = "kind_or_unset")]
    pub kind: Kind,
    #[serde(default, deserialize_with = "photo_or_none")]
    pub photo: Option<Photo>,
}

/// Request payload for creating a pet. Carries no id; the server assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPet {
    pub name: String,
    #[serde(default, deserialize_with = "kind_or_unset")]
    pub kind: Kind,
    #[serde(default)]
    pub photo: Option<Photo>,
}

impl NewPet {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            photo: None,
        }
    }

    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.photo = Some(photo);
        self
    }
}

/// Some backends send `null` for an unset kind.
fn kind_or_unset<'de, D>(deserializer: D) -> Result<Kind, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Kind>::deserialize(deserializer)?.unwrap_or_default())
}

/// A stored photo that is not a data URI is dropped rather than failing the
/// whole list.
fn photo_or_none<'de, D>(deserializer: D) -> Result<Option<Photo>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(uri) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match Photo::try_from(uri) {
        Ok(photo) => Ok(Some(photo)),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable pet photo");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_id_accepts_numbers_and_strings() {
        let n: PetId = serde_json::from_str("7").unwrap();
        assert_eq!(n, PetId::Number(7));
        let s: PetId = serde_json::from_str(r#""abc-1""#).unwrap();
        assert_eq!(s, PetId::Text("abc-1".to_string()));
        assert_eq!(s.to_string(), "abc-1");
    }

    #[test]
    fn kind_serializes_unset_as_empty_string() {
        assert_eq!(serde_json::to_value(Kind::Unset).unwrap(), "");
        assert_eq!(serde_json::to_value(Kind::Cat).unwrap(), "cat");
    }

    #[test]
    fn kind_parses_form_values() {
        assert_eq!("dog".parse::<Kind>().unwrap(), Kind::Dog);
        assert_eq!("".parse::<Kind>().unwrap(), Kind::Unset);
        assert_eq!("fish".parse::<Kind>(), Err(UnknownKind("fish".to_string())));
    }

    #[test]
    fn pet_tolerates_null_kind_and_missing_photo() {
        let pet: Pet = serde_json::from_str(r#"{"id":1,"name":"Rex","kind":null}"#).unwrap();
        assert_eq!(pet.kind, Kind::Unset);
        assert!(pet.photo.is_none());
    }

    #[test]
    fn pet_with_unreadable_photo_keeps_the_row() {
        let pets: Vec<Pet> = serde_json::from_str(
            r#"[{"id":1,"name":"Rex","kind":"dog","photo":""},
                {"id":2,"name":"Mia","kind":"cat","photo":"https://pets.test/mia.png"},
                {"id":3,"name":"Bo","kind":"dog","photo":"data:image/png;base64,iVBORw0KGgo="}]"#,
        )
        .unwrap();
        assert_eq!(pets.len(), 3);
        assert!(pets[0].photo.is_none());
        assert!(pets[1].photo.is_none());
        assert!(pets[2].photo.is_some());
    }

    #[test]
    fn new_pet_photo_stays_strict() {
        let result: Result<NewPet, _> =
            serde_json::from_str(r#"{"name":"Rex","kind":"dog","photo":"not a uri"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn pet_serializes_null_photo() {
        let pet = Pet {
            id: PetId::Number(1),
            name: "Rex".to_string(),
            kind: Kind::Dog,
            photo: None,
        };
        let json = serde_json::to_value(&pet).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 1, "name": "Rex", "kind": "dog", "photo": null})
        );
    }

    #[test]
    fn new_pet_has_no_id_field() {
        let json = serde_json::to_value(NewPet::new("Mia", Kind::Cat)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "Mia");
    }
}
