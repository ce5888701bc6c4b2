//! Front-end agnostic state behind the store dashboard.
//!
//! A [`Dashboard`] owns the rendered rows, the single status line and the
//! create form's draft. Both the web page and the CLI drive it; neither keeps
//! state of its own between actions.

use client_sdk::{ClientError, StoreApi};
use common::{Store, StoreEngine};
use tracing::{info, warn};

pub const NAME_REQUIRED_MESSAGE: &str = "Store name is required";
pub const CREATE_FAILED_MESSAGE: &str = "Creation failed";
pub const DELETE_FAILED_MESSAGE: &str = "Delete failed";
pub const CREATED_AT_PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub tone: Tone,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Info,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }
}

/// One table row, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRow {
    pub name: String,
    pub engine: String,
    pub status: String,
    pub status_class: &'static str,
    pub url: String,
    pub created_at: String,
}

impl From<Store> for StoreRow {
    fn from(store: Store) -> Self {
        let status_class = store.status_kind().css_class();
        Self {
            name: store.name,
            engine: store.engine,
            status: store.status,
            status_class,
            url: store.url,
            created_at: store
                .created_at
                .unwrap_or_else(|| CREATED_AT_PLACEHOLDER.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Rejected locally; no request was sent.
    Invalid,
    /// The server answered with a non-success status.
    Rejected,
    /// The request never produced a usable response.
    Failed,
    Completed,
}

impl ActionOutcome {
    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

pub struct Dashboard<A> {
    api: A,
    rows: Vec<StoreRow>,
    message: Option<StatusMessage>,
    name_draft: String,
    engine: StoreEngine,
}

impl<A: StoreApi> Dashboard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            rows: Vec::new(),
            message: None,
            name_draft: String::new(),
            engine: StoreEngine::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn rows(&self) -> &[StoreRow] {
        &self.rows
    }

    pub fn message(&self) -> Option<&StatusMessage> {
        self.message.as_ref()
    }

    pub fn name_draft(&self) -> &str {
        &self.name_draft
    }

    pub fn engine(&self) -> StoreEngine {
        self.engine
    }

    /// Tear down the table and rebuild it from a fresh `GET /stores`.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.rows.clear();
        let stores = self.api.list_stores().await?;
        self.rows = stores.into_iter().map(StoreRow::from).collect();
        Ok(())
    }

    /// Like [`Dashboard::refresh`], but a failure lands on the status line.
    pub async fn load(&mut self) -> bool {
        match self.refresh().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to load store list");
                self.message = Some(StatusMessage::error(err.to_string()));
                false
            }
        }
    }

    pub async fn create(&mut self, name: &str, engine: StoreEngine) -> ActionOutcome {
        self.name_draft = name.to_string();
        self.engine = engine;

        let name = name.trim();
        if name.is_empty() {
            self.message = Some(StatusMessage::error(NAME_REQUIRED_MESSAGE));
            return ActionOutcome::Invalid;
        }

        self.message = Some(StatusMessage::info(format!("Provisioning {name}...")));
        info!(store = %name, engine = %engine, "requesting store provisioning");

        if let Err(err) = self.api.create_store(name, engine).await {
            warn!(store = %name, error = %err, "store provisioning request failed");
            return self.fail(err, CREATE_FAILED_MESSAGE);
        }

        self.message = Some(StatusMessage::info(format!(
            "Provisioning started for {name}"
        )));
        self.name_draft.clear();
        self.load().await;
        ActionOutcome::Completed
    }

    /// Keep a draft that could not be submitted and show why.
    pub fn reject_draft(&mut self, name: &str, reason: impl Into<String>) -> ActionOutcome {
        self.name_draft = name.to_string();
        self.message = Some(StatusMessage::error(reason));
        ActionOutcome::Invalid
    }

    pub async fn delete(&mut self, name: &str) -> ActionOutcome {
        self.message = Some(StatusMessage::info(format!("Deleting {name}...")));
        info!(store = %name, "requesting store deletion");

        if let Err(err) = self.api.delete_store(name).await {
            warn!(store = %name, error = %err, "store deletion request failed");
            return self.fail(err, DELETE_FAILED_MESSAGE);
        }

        self.message = Some(StatusMessage::info(format!("Deleted {name}")));
        self.load().await;
        ActionOutcome::Completed
    }

    fn fail(&mut self, err: ClientError, fallback: &str) -> ActionOutcome {
        if err.is_rejection() {
            let text = err.detail().unwrap_or(fallback).to_string();
            self.message = Some(StatusMessage::error(text));
            ActionOutcome::Rejected
        } else {
            self.message = Some(StatusMessage::error(err.to_string()));
            ActionOutcome::Failed
        }
    }
}
