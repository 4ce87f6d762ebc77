//! Shared router state.

use crate::{handlers::identity::BearerDecoder, services::FileService};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub files: FileService,
    /// Lowercase name of the header the auth gateway sets to the caller's subject.
    pub identity_header: Arc<str>,
    pub bearer: BearerDecoder,
    /// Shared secret expected from the object store's notification path.
    /// `None` disables event intake.
    pub events_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(files: FileService, identity_header: impl AsRef<str>) -> Self {
        Self {
            files,
            identity_header: Arc::from(identity_header.as_ref().to_ascii_lowercase()),
            bearer: BearerDecoder::new(),
            events_token: None,
        }
    }

    pub fn with_events_token(mut self, token: Option<&str>) -> Self {
        self.events_token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Arc::from);
        self
    }
}
