//! Shared application state for the HTTP handlers.

use crate::chat::ChatService;
use crate::patient::PatientService;

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub patients: PatientService,
    /// Reported by `/health`
    pub environment: String,
}

impl AppState {
    pub fn new(chat: ChatService, patients: PatientService, environment: impl Into<String>) -> Self {
        Self {
            chat,
            patients,
            environment: environment.into(),
        }
    }
}
