//! Cookies that follow from a consent decision.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use cookie_preferences_sdk::CategorySettings;
use parking_lot::Mutex;

pub const SESSION_COOKIE: &str = "session_id";
pub const ANALYTICS_COOKIE: &str = "analytics_enabled";
pub const PREFERENCES_COOKIE: &str = "preferences_enabled";

/// Lifetime of every consent-driven cookie: 365 days.
pub const CONSENT_COOKIE_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Destination for cookie writes, e.g. a response builder or a test recorder.
pub trait CookieJar: Send + Sync {
    fn set_cookie(&self, name: &str, value: &str, max_age: Duration);
    fn delete_cookie(&self, name: &str);
}

/// Set `session_id` unconditionally and the per-category markers as allowed.
pub fn apply_consented_cookies(jar: &dyn CookieJar, settings: &CategorySettings) {
    jar.set_cookie(SESSION_COOKIE, "essential", CONSENT_COOKIE_MAX_AGE);

    for (name, enabled) in [
        (ANALYTICS_COOKIE, settings.analytics),
        (PREFERENCES_COOKIE, settings.preferences),
    ] {
        if enabled {
            jar.set_cookie(name, "true", CONSENT_COOKIE_MAX_AGE);
        } else {
            jar.delete_cookie(name);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set {
        name: String,
        value: String,
        max_age: Duration,
    },
    Delete {
        name: String,
    },
}

impl CookieDirective {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Set { name, .. } | Self::Delete { name } => name,
        }
    }
}

impl fmt::Display for CookieDirective {
    /// `Set-Cookie` header value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set {
                name,
                value,
                max_age,
            } => write!(
                f,
                "{name}={value}; Max-Age={}; Path=/; SameSite=Lax",
                max_age.as_secs()
            ),
            Self::Delete { name } => write!(
                f,
                "{name}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/"
            ),
        }
    }
}

/// Records directives and tracks the resulting cookie values.
///
/// Pending directives hold at most one entry per cookie name: a newer write
/// replaces the undrained one, so the list stays bounded by the number of
/// distinct cookies however long the jar lives.
#[derive(Default)]
pub struct MemoryCookieJar {
    state: Mutex<JarState>,
}

#[derive(Default)]
struct JarState {
    cookies: BTreeMap<String, String>,
    directives: Vec<CookieDirective>,
}

impl JarState {
    fn record(&mut self, directive: CookieDirective) {
        self.directives.retain(|d| d.name() != directive.name());
        self.directives.push(directive);
    }
}

impl MemoryCookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.state.lock().cookies.get(name).cloned()
    }

    #[must_use]
    pub fn directives(&self) -> Vec<CookieDirective> {
        self.state.lock().directives.clone()
    }

    /// Drain recorded directives as `Set-Cookie` header values.
    pub fn take_set_cookie_headers(&self) -> Vec<String> {
        std::mem::take(&mut self.state.lock().directives)
            .iter()
            .map(ToString::to_string)
            .collect()
    }
}

impl CookieJar for MemoryCookieJar {
    fn set_cookie(&self, name: &str, value: &str, max_age: Duration) {
        let mut state = self.state.lock();
        state.cookies.insert(name.to_owned(), value.to_owned());
        state.record(CookieDirective::Set {
            name: name.to_owned(),
            value: value.to_owned(),
            max_age,
        });
    }

    fn delete_cookie(&self, name: &str) {
        let mut state = self.state.lock();
        state.cookies.remove(name);
        state.record(CookieDirective::Delete {
            name: name.to_owned(),
        });
    }
}
