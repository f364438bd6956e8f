// src/models/source.rs

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::FieldError,
    models::record::{HostRecord, coerce_to_string},
};

/// `(raw_value, record, attribute_key) -> value`
pub type ResolveFn =
    Arc<dyn Fn(Option<Value>, &dyn HostRecord, Option<&str>) -> anyhow::Result<Value> + Send + Sync>;

/// `(record) -> value`, for fields with no backing attribute.
pub type ComputeFn = Arc<dyn Fn(&dyn HostRecord) -> anyhow::Result<Value> + Send + Sync>;

/// Boxes a resolve callback, fixing its signature for closure inference.
pub fn resolve_fn<F>(f: F) -> ResolveFn
where
    F: Fn(Option<Value>, &dyn HostRecord, Option<&str>) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn compute_fn<F>(f: F) -> ComputeFn
where
    F: Fn(&dyn HostRecord) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// The one source that produces a field's raw HTML for a resolution.
///
/// Chosen by fixed priority: static content, computed callback, resolve
/// callback, direct attribute lookup, then nothing.
pub enum ContentSource<'a> {
    Static(&'a str),
    Computed(&'a ComputeFn),
    Callback {
        callback: &'a ResolveFn,
        attribute: Option<&'a str>,
    },
    DirectAttribute(&'a str),
    Empty,
}

impl ContentSource<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ContentSource::Static(_) => "static",
            ContentSource::Computed(_) => "computed",
            ContentSource::Callback { .. } => "callback",
            ContentSource::DirectAttribute(_) => "attribute",
            ContentSource::Empty => "empty",
        }
    }

    /// Produces the raw (unsanitized) HTML. Callback errors propagate.
    pub fn resolve(&self, record: &dyn HostRecord) -> Result<String, FieldError> {
        match self {
            ContentSource::Static(html) => Ok(html.to_string()),
            ContentSource::Computed(compute) => {
                let value = compute(record).map_err(FieldError::Callback)?;
                Ok(coerce_to_string(Some(value)))
            }
            ContentSource::Callback {
                callback,
                attribute,
            } => {
                let raw = attribute.and_then(|key| record.get(key));
                let value = callback(raw, record, *attribute).map_err(FieldError::Callback)?;
                Ok(coerce_to_string(Some(value)))
            }
            ContentSource::DirectAttribute(key) => Ok(coerce_to_string(record.get(key))),
            ContentSource::Empty => Ok(String::new()),
        }
    }
}

impl fmt::Debug for ContentSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentSource::Static(html) => f.debug_tuple("Static").field(html).finish(),
            ContentSource::Callback { attribute, .. } => f
                .debug_struct("Callback")
                .field("attribute", attribute)
                .finish_non_exhaustive(),
            ContentSource::DirectAttribute(key) => f.debug_tuple("DirectAttribute").field(key).finish(),
            other => f.write_str(other.name()),
        }
    }
}
