/// Query parameter that carries the relay token.
pub const DEFAULT_PARAM: &str = "authToken";

/// Token validity window in milliseconds (5 minutes).
pub const DEFAULT_VALIDITY_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Per-deployment relay settings.
///
/// Pages that relay differently share the same minter and verifier and only
/// differ in this configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    param: String,
    validity_window_ms: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            param: DEFAULT_PARAM.to_string(),
            validity_window_ms: DEFAULT_VALIDITY_WINDOW_MS,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    #[must_use]
    pub fn with_validity_window_ms(mut self, window_ms: i64) -> Self {
        self.validity_window_ms = window_ms;
        self
    }

    #[must_use]
    pub fn param(&self) -> &str {
        &self.param
    }

    #[must_use]
    pub fn validity_window_ms(&self) -> i64 {
        self.validity_window_ms
    }
}
