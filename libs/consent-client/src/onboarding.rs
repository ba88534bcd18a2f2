use serde::{Deserialize, Serialize};

/// What a visitor entered in the onboarding form, stored under `userData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingProfile {
    pub name: String,
    pub age: u32,
}

impl OnboardingProfile {
    #[must_use]
    pub fn new(name: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            age,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && self.age > 0
    }

    /// `None` for anything that is not a complete profile.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(Self::is_complete)
    }
}

/// The banner asks for consent only from onboarded visitors who have not decided yet.
#[must_use]
pub fn should_show_banner(profile: Option<&OnboardingProfile>, has_consent_tag: bool) -> bool {
    profile.is_some_and(OnboardingProfile::is_complete) && !has_consent_tag
}
