//! Presentation view state.
//!
//! Which modal is open and which pet it edits is ephemeral shell state. It
//! reads from the catalog and never feeds back into it except through
//! `FormSession::submit` and `Catalog::remove`.

use std::fmt::Write;

use crate::catalog::CatalogState;
use crate::form::FormSession;
use crate::types::{Kind, Pet};

#[derive(Debug, Clone, Default)]
pub enum Modal {
    #[default]
    Closed,
    NewPet(FormSession),
    EditPet(FormSession),
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    modal: Modal,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn modal(&self) -> &Modal {
        &self.modal
    }

    /// Open the "New Pet" modal. Returns false if another modal is open.
    pub fn open_new(&mut self) -> bool {
        if self.form().is_some() {
            return false;
        }
        self.modal = Modal::NewPet(FormSession::create());
        true
    }

    /// Open the "Edit Pet" modal for `pet`. Returns false if another modal
    /// is open.
    pub fn open_edit(&mut self, pet: &Pet) -> bool {
        if self.form().is_some() {
            return false;
        }
        self.modal = Modal::EditPet(FormSession::edit(pet));
        true
    }

    pub fn form(&self) -> Option<&FormSession> {
        match &self.modal {
            Modal::NewPet(form) | Modal::EditPet(form) => Some(form),
            Modal::Closed => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FormSession> {
        match &mut self.modal {
            Modal::NewPet(form) | Modal::EditPet(form) => Some(form),
            Modal::Closed => None,
        }
    }

    /// Cancel button. Ignored while the form is saving.
    pub fn cancel_modal(&mut self) {
        if let Some(form) = self.form_mut() {
            form.cancel();
        }
        self.settle();
    }

    /// Drop the modal once its session is saved or cancelled.
    pub fn settle(&mut self) {
        if self.form().is_some_and(|form| form.state().is_terminal()) {
            self.modal = Modal::Closed;
        }
    }

    /// Plain-text rendering of the page.
    pub fn render(&self, state: &CatalogState) -> String {
        let mut out = String::from("Adopt-a-Pet\n");
        if state.loading {
            out.push_str("Loading...\n");
        } else {
            for pet in &state.pets {
                let _ = write!(out, "- {}", pet.name);
                if pet.kind != Kind::Unset {
                    let _ = write!(out, " ({})", pet.kind);
                }
                if pet.photo.is_some() {
                    out.push_str(" [photo]");
                }
                out.push('\n');
            }
        }

        if let Some(form) = self.form() {
            let _ = writeln!(out, "[{}]", form.title());
            let draft = form.draft();
            let _ = writeln!(out, "  name: {}", draft.name);
            let _ = writeln!(out, "  kind: {}", draft.kind);
            for (field, message) in form.errors().iter() {
                let _ = writeln!(out, "  ! {field}: {message}");
            }
            if form.saving() {
                out.push_str("  saving...\n");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FieldErrors, RequestError};
    use crate::form::FormState;
    use crate::types::PetId;

    fn rex() -> Pet {
        Pet {
            id: PetId::Number(1),
            name: "Rex".to_string(),
            kind: Kind::Dog,
            photo: None,
        }
    }

    #[test]
    fn render_shows_loading_instead_of_list() {
        let state = CatalogState {
            pets: vec![rex()],
            loading: true,
        };
        let out = ViewState::new().render(&state);
        assert!(out.contains("Loading..."));
        assert!(!out.contains("Rex"));
    }

    #[test]
    fn render_lists_pets_in_order() {
        let mut mia = rex();
        mia.id = PetId::Number(2);
        mia.name = "Mia".to_string();
        mia.kind = Kind::Cat;
        let state = CatalogState {
            pets: vec![rex(), mia],
            loading: false,
        };
        let out = ViewState::new().render(&state);
        assert_eq!(out, "Adopt-a-Pet\n- Rex (dog)\n- Mia (cat)\n");
    }

    #[test]
    fn only_one_modal_at_a_time() {
        let mut view = ViewState::new();
        assert!(view.open_new());
        assert!(!view.open_edit(&rex()));
        view.cancel_modal();
        assert!(matches!(view.modal(), Modal::Closed));
        assert!(view.open_edit(&rex()));
    }

    #[test]
    fn cancel_is_ignored_while_saving() {
        let mut view = ViewState::new();
        view.open_edit(&rex());
        view.form_mut().unwrap().begin_submit().unwrap();
        view.cancel_modal();
        assert_eq!(view.form().unwrap().state(), FormState::Saving);
    }

    #[test]
    fn render_shows_form_errors() {
        let mut view = ViewState::new();
        view.open_edit(&rex());
        let form = view.form_mut().unwrap();
        form.begin_submit().unwrap();
        let fields: FieldErrors = [("kind", "required")].into_iter().collect();
        form.complete(Err(RequestError::Validation { status: 422, fields }));
        view.settle();

        let out = view.render(&CatalogState::default());
        assert!(out.contains("[Edit Pet]"));
        assert!(out.contains("! kind: required"));
    }
}
