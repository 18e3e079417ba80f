//! Shared primitive types used across the ledger.

/// A contest participant: a platform mention (`<@123>`) or a plain name.
pub type Actor = String;

/// A league fixture number, `1..=max_match_number`.
pub type MatchNumber = u32;

/// Primary key of a history entry. Monotonically increasing, never reused.
pub type EntryId = i64;

/// A signed point adjustment or a balance.
pub type Points = i64;

/// Who is asking for a mutation. Admins bypass the policy gate and may
/// overwrite an already decided match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Admin,
    Member,
}

impl Authority {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::Member }
    }

    pub fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}
