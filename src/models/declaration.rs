// src/models/declaration.rs

use std::sync::Arc;

use serde::Deserialize;
use validator::Validate;

use crate::{
    models::{field::HtmlField, visibility::View},
    utils::{html::Sanitizer, policy::PurifierOverrides},
};

/// Declarative form of an [`HtmlField`] accepted over HTTP.
///
/// Closures cannot travel over the wire, so only static content and
/// attribute lookups are available here.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FieldDeclaration {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    /// Defaults to the attribute derived from `name`.
    #[validate(length(min = 1, max = 255))]
    pub attribute: Option<String>,

    #[validate(length(max = 100000))]
    pub content: Option<String>,

    #[serde(default = "default_sanitize")]
    pub sanitize: bool,

    #[serde(default)]
    pub purifier_config: PurifierOverrides,

    /// Restricts the field to a single view.
    pub only_on: Option<View>,

    #[serde(default)]
    pub hide_from_index: bool,

    #[serde(default)]
    pub hide_from_detail: bool,
}

fn default_sanitize() -> bool {
    true
}

impl FieldDeclaration {
    pub fn into_field(self, sanitizer: Arc<Sanitizer>) -> HtmlField {
        let mut field = match self.attribute {
            Some(attribute) => HtmlField::for_attribute(self.name, attribute),
            None => HtmlField::new(self.name),
        };

        if let Some(content) = self.content {
            field = field.content(content);
        }
        if !self.sanitize {
            field = field.without_sanitization();
        }
        field = field
            .purifier_config(self.purifier_config)
            .sanitizer(sanitizer);

        field = match self.only_on {
            Some(View::Index) => field.only_on_index(),
            Some(View::Detail) => field.only_on_detail(),
            // Display-only: there is nothing to show on forms.
            Some(View::Creation) | Some(View::Update) => field.hide_from_index().hide_from_detail(),
            None => field,
        };
        if self.hide_from_index {
            field = field.hide_from_index();
        }
        if self.hide_from_detail {
            field = field.hide_from_detail();
        }
        field
    }
}
