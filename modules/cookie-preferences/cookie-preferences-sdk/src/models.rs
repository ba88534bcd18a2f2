//! Public models for the cookie-preferences module.
//!
//! The serde representation is the wire and local-storage format shared with
//! browser-era clients, hence the camelCase field names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subject used when no stable identity exists yet.
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// A named class of optional behavior gated by consent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Essential,
    Analytics,
    Preferences,
}

impl Category {
    pub const ALL: [Category; 3] = [Self::Essential, Self::Analytics, Self::Preferences];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Essential => "essential",
            Self::Analytics => "analytics",
            Self::Preferences => "preferences",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "essential" => Ok(Self::Essential),
            "analytics" => Ok(Self::Analytics),
            "preferences" => Ok(Self::Preferences),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// How consent was given. `None` in an `Option<ConsentKind>` means no decision yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentKind {
    /// Accept-all.
    All,
    /// Reject-all: only essential cookies.
    Essential,
    /// Customized per category.
    Custom,
}

impl ConsentKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Essential => "essential",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for ConsentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "essential" => Ok(Self::Essential),
            "custom" => Ok(Self::Custom),
            other => Err(UnknownVariant(other.to_owned())),
        }
    }
}

/// Parse failure for [`Category`] and [`ConsentKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}'")]
pub struct UnknownVariant(pub String);

/// Per-category flags without identity. `essential` is always `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySettings {
    #[serde(default = "always_true")]
    pub essential: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub preferences: bool,
}

fn always_true() -> bool {
    true
}

impl Default for CategorySettings {
    fn default() -> Self {
        Self::essential_only()
    }
}

impl CategorySettings {
    #[must_use]
    pub fn new(analytics: bool, preferences: bool) -> Self {
        Self {
            essential: true,
            analytics,
            preferences,
        }
    }

    #[must_use]
    pub fn all() -> Self {
        Self::new(true, true)
    }

    #[must_use]
    pub fn essential_only() -> Self {
        Self::new(false, false)
    }

    #[must_use]
    pub fn get(&self, category: Category) -> bool {
        match category {
            Category::Essential => self.essential,
            Category::Analytics => self.analytics,
            Category::Preferences => self.preferences,
        }
    }

    /// Copy with one category changed. `Essential` cannot be turned off.
    #[must_use]
    pub fn with(mut self, category: Category, enabled: bool) -> Self {
        match category {
            Category::Essential => {}
            Category::Analytics => self.analytics = enabled,
            Category::Preferences => self.preferences = enabled,
        }
        self
    }

    /// Restore the `essential == true` invariant on data read from outside.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.essential = true;
        self
    }
}

/// Stored consent record, one per `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieSettings {
    pub essential: bool,
    pub analytics: bool,
    pub preferences: bool,
    pub user_id: String,
    /// Write time in epoch milliseconds, set by the store.
    pub timestamp: i64,
}

impl CookieSettings {
    #[must_use]
    pub fn categories(&self) -> CategorySettings {
        CategorySettings {
            essential: self.essential,
            analytics: self.analytics,
            preferences: self.preferences,
        }
    }
}

/// Full update data for a record.
///
/// All fields are required; the store replaces the whole record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettingsUpdate {
    pub essential: bool,
    pub analytics: bool,
    pub preferences: bool,
    pub user_id: String,
}

impl CookieSettingsUpdate {
    #[must_use]
    pub fn from_categories(user_id: impl Into<String>, settings: CategorySettings) -> Self {
        Self {
            essential: settings.essential,
            analytics: settings.analytics,
            preferences: settings.preferences,
            user_id: user_id.into(),
        }
    }
}
