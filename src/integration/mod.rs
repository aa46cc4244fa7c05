//! Shared model for email-marketing integrations.
//!
//! Integrations describe the lists and fields they can receive
//! ([`FormSettings`]), and receive form [`Submission`]s. The collaborators an
//! integration instance needs (token provider, field mapping, payload hooks,
//! error log) are bundled in [`IntegrationContext`].

mod mapping;

pub use mapping::ConfiguredFieldMapping;

use crate::tokens::TokenProvider;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Field values keyed by integration field handle.
pub type FieldValues = Map<String, Value>;

/// A field an integration list accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegrationField {
    pub handle: String,
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl IntegrationField {
    pub fn new(handle: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            name: name.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// An addressable list in the remote service, with the fields it accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmailMarketingList {
    pub id: String,
    pub name: String,
    pub fields: Vec<IntegrationField>,
}

/// Settings discovered from the remote service.
///
/// Empty settings mean the service could not be reached, not that the
/// account has no lists.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSettings {
    #[serde(default)]
    pub lists: Vec<EmailMarketingList>,
}

impl FormSettings {
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

/// A single form submission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Handle of the form that produced the submission
    pub form: String,

    /// Submitted values keyed by form field handle
    #[serde(default)]
    pub values: Map<String, Value>,
}

/// Produces the integration field values for a submission.
pub trait FieldMapper: Send + Sync {
    fn field_mapping_values(&self, submission: &Submission) -> FieldValues;
}

/// Extension points around the network call of a send.
///
/// Both hooks default to letting the send proceed.
pub trait PayloadHooks: Send + Sync {
    /// Returning false cancels the send before any request is made.
    fn before_send_payload(&self, _submission: &Submission, _payload: &Value) -> bool {
        true
    }

    /// Returning false marks the (already completed) send as failed.
    fn after_send_payload(
        &self,
        _submission: &Submission,
        _payload: &Value,
        _response: &Value,
    ) -> bool {
        true
    }
}

/// Hooks that never interfere.
pub struct DefaultHooks;

impl PayloadHooks for DefaultHooks {}

/// Where integrations report failures for administrators.
pub trait IntegrationLog: Send + Sync {
    /// `fatal` marks errors that stop the integration from doing its job.
    fn error(&self, integration: &str, message: &str, fatal: bool);
}

/// [`IntegrationLog`] that writes to `tracing`.
pub struct TracingLog;

impl IntegrationLog for TracingLog {
    fn error(&self, integration: &str, message: &str, fatal: bool) {
        tracing::error!(integration = %integration, fatal, "{}", message);
    }
}

/// Collaborators of one integration instance.
#[derive(Clone)]
pub struct IntegrationContext {
    pub tokens: Arc<dyn TokenProvider>,
    pub field_mapper: Arc<dyn FieldMapper>,
    pub hooks: Arc<dyn PayloadHooks>,
    pub log: Arc<dyn IntegrationLog>,
}

impl IntegrationContext {
    /// Context with default hooks and `tracing` logging.
    pub fn new(tokens: Arc<dyn TokenProvider>, field_mapper: Arc<dyn FieldMapper>) -> Self {
        Self {
            tokens,
            field_mapper,
            hooks: Arc::new(DefaultHooks),
            log: Arc::new(TracingLog),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn PayloadHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_log(mut self, log: Arc<dyn IntegrationLog>) -> Self {
        self.log = log;
        self
    }
}
