//! Subscriber payload for `POST {account}/subscribers`.
//!
//! The ten well-known subscriber fields are lifted to the top level of the
//! record; every other mapped value is sent under `custom_fields`. Drip
//! rejects `null`, so a known field that is missing or null is sent as `""`.

use formsync::integration::FieldValues;
use serde::Serialize;
use serde_json::Value;

/// Handles of the top-level subscriber fields, in display order.
pub const KNOWN_FIELDS: [&str; 10] = [
    "email",
    "first_name",
    "last_name",
    "address1",
    "address2",
    "city",
    "state",
    "zip",
    "country",
    "phone",
];

/// The top-level subscriber fields. Never null.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriberFields {
    pub email: Value,
    pub first_name: Value,
    pub last_name: Value,
    pub address1: Value,
    pub address2: Value,
    pub city: Value,
    pub state: Value,
    pub zip: Value,
    pub country: Value,
    pub phone: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriberRecord {
    #[serde(flatten)]
    pub fields: SubscriberFields,
    pub custom_fields: FieldValues,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscriberPayload {
    pub subscribers: Vec<SubscriberRecord>,
}

/// Splits mapped values into the known subscriber fields and the rest.
///
/// Works on a copy; `values` is left untouched for the caller.
pub fn partition(values: &FieldValues) -> (SubscriberFields, FieldValues) {
    let mut remainder = values.clone();
    let mut take = |handle: &str| match remainder.remove(handle) {
        None | Some(Value::Null) => Value::String(String::new()),
        Some(value) => value,
    };

    let fields = SubscriberFields {
        email: take("email"),
        first_name: take("first_name"),
        last_name: take("last_name"),
        address1: take("address1"),
        address2: take("address2"),
        city: take("city"),
        state: take("state"),
        zip: take("zip"),
        country: take("country"),
        phone: take("phone"),
    };

    (fields, remainder)
}

/// Builds the single-subscriber payload for one submission.
pub fn build_payload(values: &FieldValues) -> SubscriberPayload {
    let (fields, custom_fields) = partition(values);
    SubscriberPayload {
        subscribers: vec![SubscriberRecord {
            fields,
            custom_fields,
        }],
    }
}
