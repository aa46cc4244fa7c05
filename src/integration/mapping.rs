use super::{FieldMapper, FieldValues, Submission};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field mapping taken from configuration.
///
/// Each entry maps an integration field handle to the submission field whose
/// value it receives. A configured field missing from the submission maps to
/// `null`; the integration decides how to send it. With no entries at all,
/// submission values are passed through under their own names.
#[derive(Clone, Debug, Default)]
pub struct ConfiguredFieldMapping {
    fields: BTreeMap<String, String>,
}

impl ConfiguredFieldMapping {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }
}

impl FieldMapper for ConfiguredFieldMapping {
    fn field_mapping_values(&self, submission: &Submission) -> FieldValues {
        if self.fields.is_empty() {
            return submission.values.clone();
        }
        self.fields
            .iter()
            .filter(|(_, source)| !source.is_empty())
            .map(|(handle, source)| {
                let value = submission.values.get(source).cloned().unwrap_or(Value::Null);
                (handle.clone(), value)
            })
            .collect()
    }
}
