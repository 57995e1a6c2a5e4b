//! Client-side catalog manager for an adopt-a-pet listing.
//!
//! # Overview
//! Keeps an in-memory list of pets consistent with a REST backend exposing a
//! `pets` resource, and drives the create/edit forms that mutate it.
//!
//! # Design
//! - `PetClient` builds `HttpRequest` values and parses `HttpResponse` values
//!   without touching the network (host-does-IO pattern). A `Transport`
//!   executes them; `RemoteStore` pairs the two.
//! - `Catalog` owns the canonical collection. It is write-through: local state
//!   changes only after the server confirmed a write.
//! - `FormSession` is the per-modal state machine. It never mutates the
//!   catalog itself; it submits through it.
//! - `ViewState` is shell state downstream of the catalog.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod photo;
pub mod remote;
pub mod transport;
pub mod types;
pub mod view;

pub use catalog::{Catalog, CatalogEvent, CatalogState, Confirmation, RemoveOutcome};
pub use client::{PetClient, UpdateMethod};
pub use config::Config;
pub use error::{ConfigError, FieldErrors, FormError, PhotoError, RequestError};
pub use form::{Field, FormMode, FormSession, FormState, SubmitOutcome, Submission};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use photo::Photo;
pub use remote::RemoteStore;
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT};
pub use types::{Kind, NewPet, Pet, PetId};
pub use view::{Modal, ViewState};
