use std::sync::Arc;

use crate::{config::Config, utils::html::Sanitizer};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub sanitizer: Arc<Sanitizer>,
    pub config: Config,
}

impl AppState {
    /// Builds the shared sanitizer, using the configured cache directory when usable.
    pub fn from_config(config: Config) -> Self {
        let sanitizer = Sanitizer::with_cache_dir(Default::default(), config.cache_dir.clone());
        Self {
            sanitizer: Arc::new(sanitizer),
            config,
        }
    }
}

impl FromRef<AppState> for Arc<Sanitizer> {
    fn from_ref(state: &AppState) -> Self {
        state.sanitizer.clone()
    }
}
