//! Edit session - at most one receipt under edit
//!
//! State machine: `Idle -> Editing -> Saving -> Idle`, with `Editing -> Idle`
//! on cancel and `Saving -> Editing` when the save fails. The draft is a
//! private copy; the collection only changes after the server confirms.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::domain::{Draft, Receipt, ReceiptField, StatusMessage};
use crate::ports::ReceiptGateway;

use super::collection::ReceiptStore;

/// Edit session state
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Idle,
    Editing(Draft),
    /// Save in flight; the draft is kept to restore on failure
    Saving(Draft),
}

impl EditState {
    fn name(&self) -> &'static str {
        match self {
            EditState::Idle => "idle",
            EditState::Editing(_) => "editing",
            EditState::Saving(_) => "saving",
        }
    }
}

struct Inner {
    state: EditState,
    status: Option<StatusMessage>,
}

/// Single-slot edit flow over the shared receipt store
pub struct EditSession {
    gateway: Arc<dyn ReceiptGateway>,
    store: Arc<ReceiptStore>,
    inner: Mutex<Inner>,
}

impl EditSession {
    pub fn new(gateway: Arc<dyn ReceiptGateway>, store: Arc<ReceiptStore>) -> Self {
        Self {
            gateway,
            store,
            inner: Mutex::new(Inner {
                state: EditState::Idle,
                status: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> EditState {
        self.lock().state.clone()
    }

    /// Current draft, while editing or saving
    pub fn draft(&self) -> Option<Draft> {
        match &self.lock().state {
            EditState::Editing(draft) | EditState::Saving(draft) => Some(draft.clone()),
            EditState::Idle => None,
        }
    }

    /// Outcome of the last save
    pub fn status(&self) -> Option<StatusMessage> {
        self.lock().status.clone()
    }

    /// Start editing a copy of `record`
    ///
    /// Rejected unless idle: a second edit must wait for the first to be
    /// saved or cancelled.
    pub fn begin(&self, record: &Receipt) -> Result<()> {
        let mut inner = self.lock();
        if inner.state != EditState::Idle {
            return Err(Error::invalid_state(format!(
                "Cannot start an edit while {}",
                inner.state.name()
            )));
        }
        inner.state = EditState::Editing(Draft::from_receipt(record));
        inner.status = None;
        Ok(())
    }

    /// Start editing the committed record with this id
    pub fn begin_by_id(&self, id: i64) -> Result<()> {
        let record = self
            .store
            .find(id)
            .ok_or_else(|| Error::not_found(format!("Receipt {} is not loaded", id)))?;
        self.begin(&record)
    }

    /// Change one draft field; the collection is not touched
    pub fn update_field(&self, field: ReceiptField, value: &str) -> Result<()> {
        let mut inner = self.lock();
        match &mut inner.state {
            EditState::Editing(draft) => draft.set(field, value),
            other => Err(Error::invalid_state(format!(
                "Cannot change {} while {}",
                field,
                other.name()
            ))),
        }
    }

    /// Discard the draft
    pub fn cancel(&self) -> Result<()> {
        let mut inner = self.lock();
        if !matches!(inner.state, EditState::Editing(_)) {
            return Err(Error::invalid_state(format!(
                "Cannot cancel while {}",
                inner.state.name()
            )));
        }
        inner.state = EditState::Idle;
        Ok(())
    }

    /// Send the draft to the server and commit the result
    ///
    /// On success the returned record (or the draft, when the server only
    /// confirms) replaces the committed one and the session goes idle. On
    /// failure the session returns to editing with the draft intact.
    pub async fn save(&self) -> Result<Receipt> {
        let draft = {
            let mut inner = self.lock();
            let draft = match &inner.state {
                EditState::Editing(draft) => draft.clone(),
                other => {
                    return Err(Error::invalid_state(format!("Cannot save while {}", other.name())))
                }
            };
            inner.state = EditState::Saving(draft.clone());
            draft
        };

        let result = self.gateway.update_receipt(draft.id(), draft.receipt()).await;

        let mut inner = self.lock();
        match result {
            Ok(returned) => {
                let mut record = returned.unwrap_or_else(|| draft.clone().into_receipt());
                record.id = draft.id();
                self.store.upsert(record.clone());
                inner.state = EditState::Idle;
                inner.status = Some(StatusMessage::success("Receipt updated successfully."));
                Ok(record)
            }
            Err(e) => {
                inner.state = EditState::Editing(draft);
                inner.status = Some(StatusMessage::from_error(&e));
                Err(e)
            }
        }
    }
}
