use crate::services::pipeline::Pipeline;
use crate::services::storage::ObjectStorage;
use std::sync::Arc;

/// Shared handles for every request. Built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub storage: Arc<dyn ObjectStorage>,
}
