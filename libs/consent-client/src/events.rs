use cookie_preferences_sdk::{CategorySettings, ConsentKind};

/// Notifications published by a [`crate::ConsentClient`].
///
/// Delivered over a `tokio::sync::broadcast` channel; slow subscribers may
/// observe `RecvError::Lagged` and should re-read the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentEvent {
    /// A decision was saved locally or adopted from storage or the store.
    Changed {
        consent: ConsentKind,
        settings: CategorySettings,
    },
    /// Local consent was cleared and defaults restored.
    Reset,
    /// The onboarding record was written or removed.
    OnboardingUpdated,
}
