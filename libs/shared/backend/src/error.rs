use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Backend URL is not configured")]
    NotConfigured,
}

impl BackendError {
    /// Maps a non-2xx status and its body text onto an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        let message = extract_message(&body);
        match status {
            401 | 403 => BackendError::Auth(message),
            404 => BackendError::NotFound(message),
            _ => BackendError::Api { status, message },
        }
    }
}

// The platform replies with `{ "message": .. }` or `{ "error": .. }`; fall back to the raw text.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
