// src/utils/html.rs

use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use sha2::{Digest, Sha256};

use crate::{
    error::FieldError,
    utils::{
        cache::{DefinitionCache, FileDefinitionCache, NullDefinitionCache},
        policy::{PurifierOverrides, PurifierPolicy},
    },
};

/// Bumped whenever the shape of a cached definition changes.
const DEFINITION_ETAG: &str = concat!("html-field-", env!("CARGO_PKG_VERSION"), "-policy-1");

static UNCACHED: LazyLock<Arc<Sanitizer>> = LazyLock::new(|| Arc::new(Sanitizer::default()));

/// Allow-list HTML sanitizer built on ammonia.
///
/// Holds an immutable base policy. Every call merges the caller's overrides
/// onto it, so two fields sharing one `Sanitizer` never see each other's
/// configuration. Preserves safe tags (like <b>, <p>) while stripping
/// dangerous tags (like <script>, <iframe>) together with event handler
/// attributes and `javascript:`/`data:` URLs.
pub struct Sanitizer {
    base: PurifierPolicy,
    cache: Box<dyn DefinitionCache>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(PurifierPolicy::default(), Box::new(NullDefinitionCache))
    }
}

impl Sanitizer {
    pub fn new(base: PurifierPolicy, cache: Box<dyn DefinitionCache>) -> Self {
        Self { base, cache }
    }

    /// Uses a file cache at `dir`, or runs uncached if the directory is
    /// missing and cannot be created, or is not writable.
    pub fn with_cache_dir(base: PurifierPolicy, dir: Option<PathBuf>) -> Self {
        let cache: Box<dyn DefinitionCache> =
            match dir.and_then(|dir| FileDefinitionCache::open(dir, DEFINITION_ETAG)) {
                Some(cache) => {
                    tracing::debug!("purifier definition cache at {:?}", cache.root());
                    Box::new(cache)
                }
                None => Box::new(NullDefinitionCache),
            };
        Self::new(base, cache)
    }

    /// Process-wide uncached sanitizer with the default policy.
    pub fn shared() -> Arc<Sanitizer> {
        Arc::clone(&UNCACHED)
    }

    pub fn base_policy(&self) -> &PurifierPolicy {
        &self.base
    }

    /// Cleans `html` under the base policy merged with `overrides`.
    ///
    /// Malformed markup is rebalanced rather than rejected. The output is a
    /// fixed point: sanitizing it again returns it unchanged.
    pub fn sanitize(&self, html: &str, overrides: &PurifierOverrides) -> Result<String, FieldError> {
        let policy = self.effective_policy(overrides)?;
        let cleaned = policy.builder().clean(html).to_string();
        Ok(restore_leading_newlines(&cleaned))
    }

    /// The merged policy for `overrides`, served from the definition cache
    /// when possible.
    pub fn effective_policy(&self, overrides: &PurifierOverrides) -> Result<PurifierPolicy, FieldError> {
        if overrides.is_empty() {
            return Ok(self.base.clone());
        }

        let key = self.fingerprint(overrides);
        if let Some(bytes) = self.cache.get(&key, DEFINITION_ETAG) {
            match serde_json::from_slice(&bytes) {
                Ok(policy) => return Ok(policy),
                Err(e) => tracing::debug!("discarding corrupt purifier definition {}: {}", key, e),
            }
        }

        let policy = self.base.merge(overrides)?;
        tracing::debug!("merged {} purifier option(s) into definition {}", overrides.len(), key);
        match serde_json::to_vec(&policy) {
            Ok(bytes) => self.cache.set(&key, DEFINITION_ETAG, &bytes),
            Err(e) => tracing::debug!("failed to serialize purifier definition: {}", e),
        }
        Ok(policy)
    }

    fn fingerprint(&self, overrides: &PurifierOverrides) -> String {
        let mut hasher = Sha256::new();
        // BTreeMap/BTreeSet serialize in key order, so equal inputs hash equal.
        if let Ok(base) = serde_json::to_vec(&self.base) {
            hasher.update(&base);
        }
        hasher.update([0u8]);
        if let Ok(overrides) = serde_json::to_vec(overrides) {
            hasher.update(&overrides);
        }
        hex::encode(hasher.finalize())
    }
}

/// Elements whose first newline the parser drops.
const NEWLINE_ELEMENTS: [&str; 3] = ["pre", "textarea", "listing"];

/// Doubles a newline that opens a `pre`, `textarea` or `listing`.
///
/// The parser eats the first newline after these start tags and the
/// serializer does not put it back, so without this every pass would lose
/// one more line. Expects serializer output: outside tags every `<` opens a
/// tag and attribute values are double quoted.
fn restore_leading_newlines(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        let mut in_quotes = false;
        let close = rest
            .char_indices()
            .find(|&(_, c)| {
                if c == '"' {
                    in_quotes = !in_quotes;
                }
                c == '>' && !in_quotes
            })
            .map(|(i, _)| i);
        let Some(close) = close else {
            break;
        };

        let tag = &rest[..=close];
        out.push_str(tag);
        rest = &rest[close + 1..];

        let name: String = tag[1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if NEWLINE_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) && rest.starts_with('\n') {
            out.push('\n');
        }
    }

    out.push_str(rest);
    out
}
