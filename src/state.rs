//! Shared application state handed to every axum handler via `.with_state`
//! (spec SPEC_FULL §4.K). Every field is an `Arc`-wrapped handle so cloning
//! `AppState` per request is cheap.

use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::upload::UploadPipeline;
use crate::world::WorldDcResolver;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<WorldDcResolver>,
    pub aggregator: Arc<Aggregator>,
    pub upload_pipeline: Arc<UploadPipeline>,
}
