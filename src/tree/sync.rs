//! Freshness marker for cached remote state.

use chrono::{DateTime, Utc};

/// Freshness of a cached snapshot or module listing.
///
/// `Failed` is deliberately distinct from `Stale`: a failed fetch must not
/// arm another automatic refresh, or a permanently-missing resource would
/// trigger an infinite refresh loop. Only an explicit refresh (or an
/// explicit [`SyncMark::Stale`] mark) retries after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMark {
    /// Never fetched; the first read must refresh.
    Never,
    /// Explicitly marked stale; the next read must refresh.
    Stale,
    /// The last fetch failed or found nothing; no automatic retry.
    Failed,
    /// Last successful fetch completed at the given instant.
    Synced(DateTime<Utc>),
}

impl SyncMark {
    /// Returns true if a read should refresh before using the cache.
    #[must_use]
    pub const fn needs_refresh(self) -> bool {
        matches!(self, Self::Never | Self::Stale)
    }

    /// Returns the instant of the last successful fetch, if any.
    #[must_use]
    pub const fn synced_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Synced(at) => Some(at),
            _ => None,
        }
    }

    /// Returns a mark for a fetch that just succeeded.
    #[must_use]
    pub fn now() -> Self {
        Self::Synced(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_needs_refresh() {
        assert!(SyncMark::Never.needs_refresh());
        assert!(SyncMark::Stale.needs_refresh());
        assert!(!SyncMark::Failed.needs_refresh());
        assert!(!SyncMark::now().needs_refresh());
    }

    #[test]
    fn test_synced_at() {
        assert_eq!(SyncMark::Never.synced_at(), None);
        assert_eq!(SyncMark::Failed.synced_at(), None);
        assert!(SyncMark::now().synced_at().is_some());
    }
}
