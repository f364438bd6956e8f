// src/models/visibility.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The view a field is being displayed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Index,
    #[default]
    Detail,
    Creation,
    Update,
}

/// What the visibility predicate gets to look at for one display request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub view: View,
    /// Free-form request parameters (query string, resolved user role, ...).
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(view: View) -> Self {
        Self {
            view,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Per-view display flags.
///
/// The field is display-only, so forms are hidden by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub show_on_index: bool,
    pub show_on_detail: bool,
    pub show_on_creation: bool,
    pub show_on_update: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            show_on_index: true,
            show_on_detail: true,
            show_on_creation: false,
            show_on_update: false,
        }
    }
}

impl Visibility {
    pub fn is_shown_on(&self, view: View) -> bool {
        match view {
            View::Index => self.show_on_index,
            View::Detail => self.show_on_detail,
            View::Creation => self.show_on_creation,
            View::Update => self.show_on_update,
        }
    }

    pub fn only_on(view: View) -> Self {
        Self {
            show_on_index: view == View::Index,
            show_on_detail: view == View::Detail,
            show_on_creation: view == View::Creation,
            show_on_update: view == View::Update,
        }
    }
}
