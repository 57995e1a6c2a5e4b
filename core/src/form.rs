//! Form Session for creating or editing a pet.
//!
//! ```text
//!            set_field / attach_photo
//!              +------+
//!              v      |
//!  create() -> Editing -+-- begin_submit --> Saving --ok--> Saved
//!  edit()       ^   |                          |
//!               |   +-- cancel --> Cancelled   +--err--> Failed
//!               +------ set_field -----------------------+
//! ```
//!
//! A session is discarded once it reaches `Saved` or `Cancelled`. Results
//! arriving after that are ignored.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::{FieldErrors, FormError, PhotoError, RequestError};
use crate::photo::Photo;
use crate::transport::Transport;
use crate::types::{Kind, NewPet, Pet, PetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Editing,
    Saving,
    Failed,
    Saved,
    Cancelled,
}

impl FormState {
    /// Draft fields may change.
    pub fn is_editable(self) -> bool {
        matches!(self, FormState::Editing | FormState::Failed)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FormState::Saved | FormState::Cancelled)
    }
}

impl fmt::Display for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormState::Editing => "editing",
            FormState::Saving => "saving",
            FormState::Failed => "failed",
            FormState::Saved => "saved",
            FormState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Whether the session creates a new pet or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(PetId),
}

/// Editable fields of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Kind,
    Photo,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Kind => "kind",
            Field::Photo => "photo",
        }
    }
}

impl FromStr for Field {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Field::Name),
            "kind" => Ok(Field::Kind),
            "photo" => Ok(Field::Photo),
            other => Err(FormError::UnknownField(other.to_string())),
        }
    }
}

/// Working copy of a pet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub name: String,
    pub kind: Kind,
    pub photo: Option<Photo>,
}

/// What `begin_submit` asks the catalog to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create(NewPet),
    Update(Pet),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved(Pet),
    /// Errors are available through `FormSession::errors`.
    Failed,
    /// The session was closed before the response arrived.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct FormSession {
    mode: FormMode,
    draft: Draft,
    errors: FieldErrors,
    state: FormState,
}

impl FormSession {
    /// Session for a new pet, starting from an empty draft.
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            draft: Draft::default(),
            errors: FieldErrors::new(),
            state: FormState::Editing,
        }
    }

    /// Session for an existing pet, starting from a full copy of it.
    pub fn edit(pet: &Pet) -> Self {
        Self {
            mode: FormMode::Edit(pet.id.clone()),
            draft: Draft {
                name: pet.name.clone(),
                kind: pet.kind,
                photo: pet.photo.clone(),
            },
            errors: FieldErrors::new(),
            state: FormState::Editing,
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    /// True while a request is outstanding; submit and cancel controls
    /// should be disabled.
    pub fn saving(&self) -> bool {
        self.state == FormState::Saving
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "New Pet",
            FormMode::Edit(_) => "Edit Pet",
        }
    }

    /// Set a field from its form value. `kind` takes `cat`, `dog` or the
    /// empty string; `photo` takes a data URI or the empty string.
    pub fn set_field(&mut self, field: Field, value: &str) -> Result<(), FormError> {
        self.ensure_editable()?;
        match field {
            Field::Name => self.draft.name = value.to_string(),
            Field::Kind => self.draft.kind = value.parse()?,
            Field::Photo if value.is_empty() => self.draft.photo = None,
            Field::Photo => self.draft.photo = Some(Photo::parse(value)?),
        }
        self.touch();
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.name = name.into();
        self.touch();
        Ok(())
    }

    pub fn set_kind(&mut self, kind: Kind) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.kind = kind;
        self.touch();
        Ok(())
    }

    pub fn clear_photo(&mut self) -> Result<(), FormError> {
        self.ensure_editable()?;
        self.draft.photo = None;
        self.touch();
        Ok(())
    }

    /// Encode the selected image file off the caller's thread and store it
    /// on the draft. On failure the current photo is kept.
    pub async fn attach_photo(&mut self, bytes: Vec<u8>) -> Result<(), FormError> {
        self.ensure_editable()?;
        let photo = Photo::encode_in_background(bytes).await?;
        self.draft.photo = Some(photo);
        self.touch();
        Ok(())
    }

    pub async fn attach_photo_file(&mut self, path: impl AsRef<Path>) -> Result<(), FormError> {
        self.ensure_editable()?;
        let bytes = tokio::fs::read(path).await.map_err(PhotoError::from)?;
        self.attach_photo(bytes).await
    }

    /// Enter `Saving` and produce the request for the catalog. Errors from a
    /// previous attempt are cleared.
    pub fn begin_submit(&mut self) -> Result<Submission, FormError> {
        self.ensure_editable()?;
        self.state = FormState::Saving;
        self.errors.clear();

        let Draft { name, kind, photo } = self.draft.clone();
        Ok(match &self.mode {
            FormMode::Create => Submission::Create(NewPet { name, kind, photo }),
            FormMode::Edit(id) => Submission::Update(Pet {
                id: id.clone(),
                name,
                kind,
                photo,
            }),
        })
    }

    /// Apply the catalog's answer to a submission.
    pub fn complete(&mut self, result: Result<Pet, RequestError>) -> SubmitOutcome {
        if self.state != FormState::Saving {
            debug!(state = %self.state, "ignoring response for a settled form");
            return SubmitOutcome::Ignored;
        }
        match result {
            Ok(pet) => {
                self.state = FormState::Saved;
                SubmitOutcome::Saved(pet)
            }
            Err(err) => {
                warn!(error = %err, "failed to save pet");
                self.errors = err
                    .field_errors()
                    .cloned()
                    .unwrap_or_else(|| FieldErrors::generic(err.message()));
                self.state = FormState::Failed;
                SubmitOutcome::Failed
            }
        }
    }

    /// Submit the draft through the catalog: create or update by mode.
    pub async fn submit<T: Transport>(
        &mut self,
        catalog: &Catalog<T>,
    ) -> Result<SubmitOutcome, FormError> {
        let result = match self.begin_submit()? {
            Submission::Create(pet) => catalog.create(pet).await,
            Submission::Update(pet) => catalog.update(&pet).await,
        };
        Ok(self.complete(result))
    }

    /// User abort. Does nothing while a save is in flight.
    pub fn cancel(&mut self) {
        if self.state.is_editable() {
            self.state = FormState::Cancelled;
        }
    }

    /// The modal went away. Any response still in flight will be ignored.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.state = FormState::Cancelled;
        }
    }

    fn ensure_editable(&self) -> Result<(), FormError> {
        if self.state.is_editable() {
            Ok(())
        } else {
            Err(FormError::NotEditable { state: self.state })
        }
    }

    /// Editing after a failed save returns to `Editing`; messages stay until
    /// the next submit.
    fn touch(&mut self) {
        if self.state == FormState::Failed {
            self.state = FormState::Editing;
        }
    }
}
