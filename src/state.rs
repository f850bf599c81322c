use std::sync::Arc;

use crate::{service::OtpService, store::MemoryStore};

/// Shared application state passed to every handler via axum `State`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub otp: Arc<OtpService<MemoryStore>>,
}

impl AppState {
    pub fn new(otp: OtpService<MemoryStore>) -> Self {
        AppState { otp: Arc::new(otp) }
    }
}
