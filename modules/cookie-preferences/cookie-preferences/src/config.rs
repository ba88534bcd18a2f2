use serde::{Deserialize, Serialize};

/// Configuration for the cookie-preferences module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CookiePreferencesConfig {
    /// Longest accepted `userId`, in bytes.
    pub max_user_id_length: usize,
}

impl Default for CookiePreferencesConfig {
    fn default() -> Self {
        Self {
            max_user_id_length: 256,
        }
    }
}
