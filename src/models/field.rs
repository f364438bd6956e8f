// src/models/field.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::FieldError,
    models::{
        record::HostRecord,
        source::{ComputeFn, ContentSource, ResolveFn, compute_fn, resolve_fn},
        visibility::{RequestContext, View, Visibility},
    },
    utils::{html::Sanitizer, policy::PurifierOverrides},
};

/// Component name the rendering surface registers for this field.
pub const COMPONENT: &str = "html-field";

pub type VisibilityFn = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// Whether the field reads a stored attribute or is computed from the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Attribute,
    Computed,
}

/// A read-only display field that renders sanitized HTML.
///
/// Configure it once with the builder methods, then resolve it against as
/// many records as needed. Each resolution overwrites [`HtmlField::value`];
/// share one instance across threads only behind external synchronization,
/// or clone it per request.
#[derive(Clone)]
pub struct HtmlField {
    name: String,
    attribute: Option<String>,
    kind: FieldKind,
    static_content: Option<String>,
    compute: Option<ComputeFn>,
    resolve_callback: Option<ResolveFn>,
    sanitize: bool,
    purifier_config: PurifierOverrides,
    visibility: Visibility,
    show_when: Option<VisibilityFn>,
    sanitizer: Option<Arc<Sanitizer>>,
    value: Option<String>,
}

impl HtmlField {
    /// Field backed by the attribute derived from `name`
    /// (`"Body Html"` reads `body_html`).
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let attribute = default_attribute(&name);
        Self::with_parts(name, attribute, FieldKind::Attribute)
    }

    /// Field backed by an explicit attribute key.
    pub fn for_attribute(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::with_parts(name.into(), Some(attribute.into()), FieldKind::Attribute)
    }

    /// Field with no backing attribute whose HTML is computed from the record.
    pub fn computed<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&dyn HostRecord) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let mut field = Self::with_parts(name.into(), None, FieldKind::Computed);
        field.compute = Some(compute_fn(compute));
        field
    }

    fn with_parts(name: String, attribute: Option<String>, kind: FieldKind) -> Self {
        Self {
            name,
            attribute,
            kind,
            static_content: None,
            compute: None,
            resolve_callback: None,
            sanitize: true,
            purifier_config: PurifierOverrides::new(),
            visibility: Visibility::default(),
            show_when: None,
            sanitizer: None,
            value: None,
        }
    }

    /// Literal HTML that wins over every other source.
    pub fn content(mut self, html: impl Into<String>) -> Self {
        self.static_content = Some(html.into());
        self
    }

    /// Transforms the attribute's raw value: `(raw, record, attribute) -> html`.
    pub fn resolve_using<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<Value>, &dyn HostRecord, Option<&str>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.resolve_callback = Some(resolve_fn(callback));
        self
    }

    /// Builds the HTML from the record alone, ignoring the attribute value.
    pub fn html<F>(self, callback: F) -> Self
    where
        F: Fn(&dyn HostRecord) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.resolve_using(move |_value, record, _attribute| callback(record))
    }

    /// Renders the resolved HTML verbatim.
    ///
    /// Only for content you completely trust: this opens the page to XSS if
    /// the source can be influenced by users.
    pub fn without_sanitization(mut self) -> Self {
        self.sanitize = false;
        self
    }

    pub fn with_sanitization(mut self) -> Self {
        self.sanitize = true;
        self
    }

    /// Replaces the purifier overrides for this field.
    pub fn purifier_config<I, K>(mut self, config: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.purifier_config = config.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self
    }

    /// Uses `sanitizer` instead of the shared uncached default.
    pub fn sanitizer(mut self, sanitizer: Arc<Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    /// Only display the field when `predicate` holds for the request.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.show_when = Some(Arc::new(predicate));
        self
    }

    /// Only display the field when `predicate` does not hold.
    pub fn unless<F>(self, predicate: F) -> Self
    where
        F: Fn(&RequestContext) -> bool + Send + Sync + 'static,
    {
        self.when(move |request| !predicate(request))
    }

    pub fn only_on_index(mut self) -> Self {
        self.visibility = Visibility::only_on(View::Index);
        self
    }

    pub fn only_on_detail(mut self) -> Self {
        self.visibility = Visibility::only_on(View::Detail);
        self
    }

    pub fn except_on_forms(mut self) -> Self {
        self.visibility.show_on_creation = false;
        self.visibility.show_on_update = false;
        self
    }

    pub fn hide_from_index(mut self) -> Self {
        self.visibility.show_on_index = false;
        self
    }

    pub fn hide_from_detail(mut self) -> Self {
        self.visibility.show_on_detail = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn static_content(&self) -> Option<&str> {
        self.static_content.as_deref()
    }

    pub fn sanitizes(&self) -> bool {
        self.sanitize
    }

    pub fn purifier_overrides(&self) -> &PurifierOverrides {
        &self.purifier_config
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// The display value from the last resolution; `None` before the first.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_shown_on(&self, view: View) -> bool {
        self.visibility.is_shown_on(view)
    }

    /// Evaluates the `when`/`unless` predicate. Fields without one are authorized.
    pub fn authorize(&self, request: &RequestContext) -> bool {
        self.show_when.as_ref().is_none_or(|predicate| predicate(request))
    }

    /// Authorized and enabled on the request's view.
    pub fn is_visible_for(&self, request: &RequestContext) -> bool {
        self.authorize(request) && self.is_shown_on(request.view)
    }

    /// Picks the source that will produce the raw HTML.
    pub fn content_source<'a>(&'a self, attribute: Option<&'a str>) -> ContentSource<'a> {
        if let Some(html) = &self.static_content {
            return ContentSource::Static(html);
        }

        if self.kind == FieldKind::Computed {
            if let Some(compute) = &self.compute {
                return ContentSource::Computed(compute);
            }
        }

        let attribute = attribute.or(self.attribute.as_deref());

        if let Some(callback) = &self.resolve_callback {
            return ContentSource::Callback {
                callback,
                attribute,
            };
        }

        match (self.kind, attribute) {
            (FieldKind::Attribute, Some(key)) if !key.is_empty() => ContentSource::DirectAttribute(key),
            _ => ContentSource::Empty,
        }
    }

    /// Resolves the raw, unsanitized HTML for `record`.
    pub fn resolve_html_content(
        &self,
        record: &dyn HostRecord,
        attribute: Option<&str>,
    ) -> Result<String, FieldError> {
        let source = self.content_source(attribute);
        tracing::trace!(field = %self.name, source = source.name(), "resolving html content");
        source.resolve(record)
    }

    /// Resolves, sanitizes unless opted out, and stores the display value.
    pub fn resolve_for_display(
        &mut self,
        record: &dyn HostRecord,
        attribute: Option<&str>,
    ) -> Result<&str, FieldError> {
        let mut html = self.resolve_html_content(record, attribute)?;

        if self.sanitize && !html.is_empty() {
            html = self.sanitize_html(&html)?;
        }

        Ok(self.value.insert(html).as_str())
    }

    pub fn resolve(&mut self, record: &dyn HostRecord, attribute: Option<&str>) -> Result<&str, FieldError> {
        self.resolve_for_display(record, attribute)
    }

    fn sanitize_html(&self, html: &str) -> Result<String, FieldError> {
        match &self.sanitizer {
            Some(sanitizer) => sanitizer.sanitize(html, &self.purifier_config),
            None => Sanitizer::shared().sanitize(html, &self.purifier_config),
        }
    }

    /// Descriptor handed to the rendering surface.
    pub fn json_serialize(&self) -> FieldDescriptor {
        FieldDescriptor {
            component: COMPONENT.to_string(),
            prefix_component: true,
            index_name: self.name.clone(),
            name: self.name.clone(),
            attribute: self.attribute.clone(),
            value: self.value.clone(),
            readonly: true,
            sanitized: self.sanitize,
            as_html: true,
        }
    }
}

/// Serialized form of a resolved field.
///
/// `as_html` is always set: the surface must embed `value` without escaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub component: String,
    pub prefix_component: bool,
    pub index_name: String,
    pub name: String,
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub readonly: bool,
    pub sanitized: bool,
    pub as_html: bool,
}

fn default_attribute(name: &str) -> Option<String> {
    let attribute = name.trim().to_lowercase().replace(' ', "_");
    (!attribute.is_empty()).then_some(attribute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Record;
    use serde_json::json;

    #[test]
    fn name_derives_attribute() {
        assert_eq!(HtmlField::new("Body Html").attribute(), Some("body_html"));
        assert_eq!(HtmlField::new("  ").attribute(), None);
    }

    #[test]
    fn computed_field_has_no_attribute() {
        let field = HtmlField::computed("Summary", |_| Ok(json!("x")));
        assert_eq!(field.kind(), FieldKind::Computed);
        assert_eq!(field.attribute(), None);
    }

    #[test]
    fn source_precedence() {
        let field = HtmlField::for_attribute("Body", "body");
        assert!(matches!(field.content_source(None), ContentSource::DirectAttribute("body")));
        assert!(matches!(
            field.content_source(Some("other")),
            ContentSource::DirectAttribute("other")
        ));

        let field = field.html(|_| Ok(json!("cb")));
        assert!(matches!(
            field.content_source(None),
            ContentSource::Callback { attribute: Some("body"), .. }
        ));

        let field = field.content("<p>static</p>");
        assert!(matches!(field.content_source(None), ContentSource::Static("<p>static</p>")));

        let computed = HtmlField::computed("C", |_| Ok(json!("c"))).html(|_| Ok(json!("cb")));
        assert!(matches!(computed.content_source(None), ContentSource::Computed(_)));
    }

    #[test]
    fn computed_field_never_reads_attribute_override() {
        let field = HtmlField::with_parts("C".to_string(), None, FieldKind::Computed);
        assert!(matches!(field.content_source(Some("body")), ContentSource::Empty));
    }

    #[test]
    fn value_is_absent_before_first_resolution() {
        let mut field = HtmlField::new("Body");
        assert_eq!(field.value(), None);

        field.resolve_for_display(&Record::new(), None).unwrap();
        assert_eq!(field.value(), Some(""));
    }

    #[test]
    fn value_is_recomputed_per_record() {
        let mut field = HtmlField::for_attribute("Body", "body");
        field
            .resolve_for_display(&Record::new().with("body", "<p>one</p>"), None)
            .unwrap();
        assert_eq!(field.value(), Some("<p>one</p>"));

        field
            .resolve_for_display(&Record::new().with("body", "<p>two</p>"), None)
            .unwrap();
        assert_eq!(field.value(), Some("<p>two</p>"));
    }

    #[test]
    fn sanitization_toggle_is_explicit() {
        let field = HtmlField::new("Body").without_sanitization();
        assert!(!field.sanitizes());
        let field = field.purifier_config([("HTML.Allowed", json!("p"))]);
        assert!(!field.sanitizes());
        assert!(field.with_sanitization().sanitizes());
    }

    #[test]
    fn invalid_override_surfaces_on_resolution() {
        let mut field = HtmlField::new("Body")
            .content("<p>x</p>")
            .purifier_config([("HTML.Nope", json!(1))]);
        let err = field.resolve_for_display(&Record::new(), None).unwrap_err();
        assert!(matches!(err, FieldError::InvalidPolicy { .. }));
    }

    #[test]
    fn unless_negates_predicate() {
        let field = HtmlField::new("Body").unless(|request| request.param("role") == Some("guest"));
        assert!(field.authorize(&RequestContext::new(View::Detail)));
        assert!(!field.authorize(&RequestContext::new(View::Detail).with_param("role", "guest")));
    }

    #[test]
    fn descriptor_flags_html() {
        let mut field = HtmlField::new("Body").content("<p>Hi</p>");
        field.resolve_for_display(&Record::new(), None).unwrap();

        let descriptor = serde_json::to_value(field.json_serialize()).unwrap();
        assert_eq!(descriptor["component"], "html-field");
        assert_eq!(descriptor["asHtml"], true);
        assert_eq!(descriptor["value"], "<p>Hi</p>");
    }
}
