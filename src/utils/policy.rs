// src/utils/policy.rs

//! Allow-list policy for the HTML purifier.
//!
//! A [`PurifierPolicy`] is an immutable value. Per-field overrides are merged
//! onto a base policy with [`PurifierPolicy::merge`], which returns a new
//! effective policy and leaves the base untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::UrlRelative;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::FieldError;

/// Option name → value, merged onto the base policy for one sanitize call.
pub type PurifierOverrides = BTreeMap<String, Value>;

pub const HTML_ALLOWED: &str = "HTML.Allowed";
pub const HTML_ALLOWED_ELEMENTS: &str = "HTML.AllowedElements";
pub const HTML_ALLOWED_ATTRIBUTES: &str = "HTML.AllowedAttributes";
pub const HTML_FORBIDDEN_ELEMENTS: &str = "HTML.ForbiddenElements";
pub const HTML_FORBIDDEN_ATTRIBUTES: &str = "HTML.ForbiddenAttributes";
pub const HTML_NOFOLLOW: &str = "HTML.Nofollow";
pub const HTML_TARGET_BLANK: &str = "HTML.TargetBlank";
pub const ATTR_ENABLE_ID: &str = "Attr.EnableID";
pub const URI_ALLOWED_SCHEMES: &str = "URI.AllowedSchemes";
pub const URI_BASE: &str = "URI.Base";
pub const URI_MAKE_ABSOLUTE: &str = "URI.MakeAbsolute";

/// Application order. Allow-lists replace, then additions, then removals.
const OPTION_ORDER: [&str; 11] = [
    HTML_ALLOWED,
    HTML_ALLOWED_ELEMENTS,
    HTML_ALLOWED_ATTRIBUTES,
    ATTR_ENABLE_ID,
    HTML_FORBIDDEN_ELEMENTS,
    HTML_FORBIDDEN_ATTRIBUTES,
    HTML_NOFOLLOW,
    HTML_TARGET_BLANK,
    URI_ALLOWED_SCHEMES,
    URI_BASE,
    URI_MAKE_ABSOLUTE,
];

/// Elements that no policy may allow. The raw-text ones are serialized
/// without escaping, so their content would re-parse as markup.
const NEVER_ALLOWED_ELEMENTS: [&str; 16] = [
    "script", "style", "object", "embed", "iframe", "frame", "frameset", "applet", "base", "link",
    "meta", "noscript", "noembed", "noframes", "xmp", "plaintext",
];

/// Schemes that no policy may allow.
const NEVER_ALLOWED_SCHEMES: [&str; 3] = ["javascript", "vbscript", "data"];

/// URL-valued attributes that ammonia does not scheme-check on its own.
const EXTRA_URL_ATTRIBUTES: [&str; 3] = ["cite", "longdesc", "background"];

/// Removed together with their text content.
const CLEAN_CONTENT_ELEMENTS: [&str; 2] = ["script", "style"];

const DEFAULT_ELEMENTS: [&str; 46] = [
    "a", "abbr", "address", "b", "bdo", "big", "blockquote", "br", "caption", "cite", "code",
    "col", "colgroup", "dd", "del", "dfn", "div", "dl", "dt", "em", "figcaption", "figure", "h1",
    "h2", "h3", "h4", "h5", "h6", "hr", "i", "img", "ins", "kbd", "li", "ol", "p", "pre", "q",
    "s", "small", "span", "strong", "sub", "sup", "u", "ul",
];

const DEFAULT_TABLE_ELEMENTS: [&str; 7] = ["table", "tbody", "td", "tfoot", "th", "thead", "tr"];

const DEFAULT_GENERIC_ATTRIBUTES: [&str; 4] = ["class", "dir", "lang", "title"];

const DEFAULT_ELEMENT_ATTRIBUTES: [(&str, &[&str]); 11] = [
    ("a", &["href", "hreflang"]),
    ("img", &["src", "alt", "width", "height"]),
    ("td", &["colspan", "rowspan"]),
    ("th", &["colspan", "rowspan", "scope"]),
    ("col", &["span"]),
    ("colgroup", &["span"]),
    ("ol", &["start"]),
    ("blockquote", &["cite"]),
    ("q", &["cite"]),
    ("del", &["cite"]),
    ("ins", &["cite"]),
];

const DEFAULT_URL_SCHEMES: [&str; 7] = ["http", "https", "mailto", "ftp", "nntp", "news", "tel"];

const LINK_REL: &str = "noopener noreferrer";
const LINK_REL_NOFOLLOW: &str = "noopener noreferrer nofollow";

/// `element` or `element[attr|attr]`; `*` addresses every element.
static ALLOWED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[a-z][a-z0-9]*)(?:\[([a-z0-9_:\-|]*)\])?$").expect("valid regex")
});

/// An allow-list policy for one sanitize pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurifierPolicy {
    pub allowed_elements: BTreeSet<String>,
    /// Attributes allowed on every allowed element.
    pub generic_attributes: BTreeSet<String>,
    pub element_attributes: BTreeMap<String, BTreeSet<String>>,
    pub url_schemes: BTreeSet<String>,
    pub base_url: Option<String>,
    pub make_absolute: bool,
    pub nofollow: bool,
    pub target_blank: bool,
}

impl Default for PurifierPolicy {
    fn default() -> Self {
        Self {
            allowed_elements: DEFAULT_ELEMENTS
                .iter()
                .chain(DEFAULT_TABLE_ELEMENTS.iter())
                .map(|e| e.to_string())
                .collect(),
            generic_attributes: to_set(DEFAULT_GENERIC_ATTRIBUTES),
            element_attributes: DEFAULT_ELEMENT_ATTRIBUTES
                .iter()
                .map(|(element, attrs)| (element.to_string(), to_set(attrs.iter().copied())))
                .collect(),
            url_schemes: to_set(DEFAULT_URL_SCHEMES),
            base_url: None,
            make_absolute: false,
            nofollow: false,
            target_blank: false,
        }
    }
}

impl PurifierPolicy {
    /// Produces the effective policy for `overrides` without mutating `self`.
    pub fn merge(&self, overrides: &PurifierOverrides) -> Result<PurifierPolicy, FieldError> {
        if let Some(unknown) = overrides.keys().find(|key| !OPTION_ORDER.contains(&key.as_str())) {
            return Err(FieldError::invalid_policy(unknown, "unknown option"));
        }

        let mut policy = self.clone();
        for option in OPTION_ORDER {
            if let Some(value) = overrides.get(option) {
                policy.apply(option, value)?;
            }
        }
        Ok(policy)
    }

    fn apply(&mut self, option: &str, value: &Value) -> Result<(), FieldError> {
        match option {
            HTML_ALLOWED => {
                let mut elements = BTreeSet::new();
                let mut element_attributes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
                let mut generic = BTreeSet::new();

                for item in parse_list(option, value)? {
                    let caps = ALLOWED_ITEM.captures(&item).ok_or_else(|| {
                        FieldError::invalid_policy(option, format!("cannot parse '{}'", item))
                    })?;
                    let element = &caps[1];
                    let attrs = caps
                        .get(2)
                        .map(|m| to_set(m.as_str().split('|').filter(|a| !a.is_empty())))
                        .unwrap_or_default();

                    if element == "*" {
                        generic.extend(attrs);
                        continue;
                    }
                    elements.insert(element.to_string());
                    if !attrs.is_empty() {
                        element_attributes
                            .entry(element.to_string())
                            .or_default()
                            .extend(attrs);
                    }
                }

                self.allowed_elements = elements;
                self.element_attributes = element_attributes;
                self.generic_attributes = generic;
            }
            HTML_ALLOWED_ELEMENTS => {
                self.allowed_elements = parse_list(option, value)?.into_iter().collect();
                let allowed = &self.allowed_elements;
                self.element_attributes
                    .retain(|element, _| allowed.contains(element));
            }
            HTML_ALLOWED_ATTRIBUTES => {
                let mut generic = BTreeSet::new();
                let mut element_attributes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
                for item in parse_list(option, value)? {
                    match item.split_once('.') {
                        Some(("*", attr)) | Some(("", attr)) => {
                            generic.insert(attr.to_string());
                        }
                        Some((element, attr)) => {
                            element_attributes
                                .entry(element.to_string())
                                .or_default()
                                .insert(attr.to_string());
                        }
                        None => {
                            generic.insert(item);
                        }
                    }
                }
                self.generic_attributes = generic;
                self.element_attributes = element_attributes;
            }
            ATTR_ENABLE_ID => {
                if parse_bool(option, value)? {
                    self.generic_attributes.insert("id".to_string());
                } else {
                    self.generic_attributes.remove("id");
                }
            }
            HTML_FORBIDDEN_ELEMENTS => {
                for element in parse_list(option, value)? {
                    self.allowed_elements.remove(&element);
                    self.element_attributes.remove(&element);
                }
            }
            HTML_FORBIDDEN_ATTRIBUTES => {
                for item in parse_list(option, value)? {
                    match item.split_once('@') {
                        Some((element, attr)) if element != "*" => {
                            if let Some(attrs) = self.element_attributes.get_mut(element) {
                                attrs.remove(attr);
                            }
                        }
                        Some((_, attr)) => self.forbid_everywhere(attr),
                        None => self.forbid_everywhere(&item),
                    }
                }
            }
            HTML_NOFOLLOW => self.nofollow = parse_bool(option, value)?,
            HTML_TARGET_BLANK => self.target_blank = parse_bool(option, value)?,
            URI_ALLOWED_SCHEMES => {
                self.url_schemes = parse_list(option, value)?.into_iter().collect();
            }
            URI_BASE => {
                self.base_url = match value {
                    Value::Null => None,
                    Value::String(raw) => {
                        let url = Url::parse(raw).map_err(|e| {
                            FieldError::invalid_policy(option, format!("'{}' is not an absolute URL: {}", raw, e))
                        })?;
                        Some(url.to_string())
                    }
                    _ => return Err(FieldError::invalid_policy(option, "expected a URL string")),
                };
            }
            URI_MAKE_ABSOLUTE => self.make_absolute = parse_bool(option, value)?,
            _ => return Err(FieldError::invalid_policy(option, "unknown option")),
        }
        Ok(())
    }

    fn forbid_everywhere(&mut self, attr: &str) {
        self.generic_attributes.remove(attr);
        for attrs in self.element_attributes.values_mut() {
            attrs.remove(attr);
        }
    }

    /// Builds the ammonia cleaner for this policy.
    ///
    /// Script vectors are enforced here regardless of what the policy lists.
    /// Never-allowed elements and schemes are filtered out, as are `on*`
    /// handlers, `style`, and the `rel`/`target` attributes the builder sets
    /// itself. URL attributes outside ammonia's own list are checked against
    /// the same scheme allow-list.
    pub fn builder(&self) -> ammonia::Builder<'_> {
        let is_allowed_attr = |attr: &&str| {
            !attr.starts_with("on")
                && *attr != "style"
                && *attr != "rel"
                && !(self.target_blank && *attr == "target")
        };

        let tags: HashSet<&str> = self
            .allowed_elements
            .iter()
            .map(String::as_str)
            .filter(|element| !NEVER_ALLOWED_ELEMENTS.contains(element))
            .collect();

        let generic_attributes: HashSet<&str> = self
            .generic_attributes
            .iter()
            .map(String::as_str)
            .filter(is_allowed_attr)
            .collect();

        let tag_attributes: HashMap<&str, HashSet<&str>> = self
            .element_attributes
            .iter()
            .filter(|(element, _)| tags.contains(element.as_str()))
            .map(|(element, attrs)| {
                let attrs = attrs.iter().map(String::as_str).filter(is_allowed_attr).collect();
                (element.as_str(), attrs)
            })
            .collect();

        let url_schemes: HashSet<&str> = self
            .url_schemes
            .iter()
            .map(String::as_str)
            .filter(|scheme| !NEVER_ALLOWED_SCHEMES.contains(scheme))
            .collect();
        let url_filter: HashSet<String> = url_schemes.iter().map(|s| s.to_string()).collect();

        let url_relative = match (&self.base_url, self.make_absolute) {
            (Some(base), true) => match Url::parse(base) {
                Ok(url) => UrlRelative::RewriteWithBase(url),
                Err(_) => UrlRelative::PassThrough,
            },
            _ => UrlRelative::PassThrough,
        };

        let mut builder = ammonia::Builder::empty();
        builder
            .tags(tags)
            .clean_content_tags(CLEAN_CONTENT_ELEMENTS.iter().copied().collect())
            .generic_attributes(generic_attributes)
            .tag_attributes(tag_attributes)
            .url_schemes(url_schemes)
            .url_relative(url_relative)
            .attribute_filter(move |_element, attr, value| {
                if EXTRA_URL_ATTRIBUTES.contains(&attr) && !is_allowed_url(value, &url_filter) {
                    tracing::debug!("dropping {} with disallowed URL", attr);
                    return None;
                }
                Some(value.into())
            })
            .link_rel(Some(if self.nofollow { LINK_REL_NOFOLLOW } else { LINK_REL }))
            .strip_comments(true);

        if self.target_blank {
            builder.set_tag_attribute_value("a", "target", "_blank");
        }

        builder
    }
}

/// Same rule ammonia applies to `href`/`src`: absolute URLs need an allowed
/// scheme, relative ones pass, unparseable ones are dropped.
fn is_allowed_url(value: &str, schemes: &HashSet<String>) -> bool {
    match Url::parse(value) {
        Ok(url) => schemes.contains(url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

fn to_set<'a>(items: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    items.into_iter().map(str::to_string).collect()
}

/// Accepts a comma separated string, an array of strings, or an object of
/// `name: bool` lookups. Names are trimmed and lower-cased.
fn parse_list(option: &str, value: &Value) -> Result<Vec<String>, FieldError> {
    let normalize = |raw: &str| raw.trim().to_ascii_lowercase();

    match value {
        Value::String(raw) => Ok(raw
            .split(',')
            .map(normalize)
            .filter(|item| !item.is_empty())
            .collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(normalize)
                    .ok_or_else(|| FieldError::invalid_policy(option, "array items must be strings"))
            })
            .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, enabled)| match enabled {
                Value::Bool(true) => Some(Ok(normalize(key))),
                Value::Bool(false) => None,
                _ => Some(Err(FieldError::invalid_policy(option, "lookup values must be booleans"))),
            })
            .collect(),
        _ => Err(FieldError::invalid_policy(
            option,
            "expected a string, an array of strings, or an object of booleans",
        )),
    }
}

fn parse_bool(option: &str, value: &Value) -> Result<bool, FieldError> {
    value
        .as_bool()
        .ok_or_else(|| FieldError::invalid_policy(option, "expected a boolean"))
}
