use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KansoError;

/// Lifecycle state of a friendship row.
///
/// `Pending → {Accepted, Rejected}`; `Rejected → Pending` on re-request.
/// `Accepted` and `Blocked` accept no further requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Blocked => "BLOCKED",
        }
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FriendshipStatus {
    type Err = KansoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "ACCEPTED" => Ok(Self::Accepted),
            "REJECTED" => Ok(Self::Rejected),
            "BLOCKED" => Ok(Self::Blocked),
            _ => Err(KansoError::UnknownVariant {
                kind: "friendship status",
                value: s.to_string(),
            }),
        }
    }
}

/// One friendship row per unordered user pair.
///
/// Undirected for querying (either side lists it), directional for
/// authorization (only the requestee may respond).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: i64,
    pub requester_id: i64,
    pub requestee_id: i64,
    pub status: FriendshipStatus,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
}

/// What a new friend request should do, given the pair's existing row.
///
/// Classification is separate from execution so each transition is a named
/// case rather than a branch buried in the send path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    /// No row exists for the pair; insert a fresh pending row.
    CreateNew,
    /// Caller is the requestee of an open request; treat the call as an
    /// acceptance of that request.
    AcceptExisting { friendship_id: i64 },
    /// Caller already has an open request to this user.
    AlreadySent,
    /// The pair is already friends.
    AlreadyFriends,
    /// The pair is blocked. Callers must refuse with a generic message
    /// that does not reveal the block.
    Refused,
    /// An earlier request was rejected; reopen the same row as pending.
    Reopen { friendship_id: i64 },
}

/// Classify what sending a friend request should do for the caller, given
/// the existing row for the unordered pair (if any).
pub fn classify_request(existing: Option<&Friendship>, caller_id: i64) -> RequestAction {
    let Some(row) = existing else {
        return RequestAction::CreateNew;
    };
    match row.status {
        FriendshipStatus::Pending if caller_id == row.requestee_id => {
            RequestAction::AcceptExisting {
                friendship_id: row.id,
            }
        }
        FriendshipStatus::Pending => RequestAction::AlreadySent,
        FriendshipStatus::Accepted => RequestAction::AlreadyFriends,
        FriendshipStatus::Blocked => RequestAction::Refused,
        FriendshipStatus::Rejected => RequestAction::Reopen {
            friendship_id: row.id,
        },
    }
}

/// Aggregate counts for a user's friendship graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendshipStats {
    pub total_friends: i64,
    pub pending_incoming: i64,
    pub pending_outgoing: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: FriendshipStatus) -> Friendship {
        Friendship {
            id: 42,
            requester_id: 1,
            requestee_id: 2,
            status,
            requested_at: Utc::now(),
            accepted_at: None,
        }
    }

    #[test]
    fn test_no_row_creates_new() {
        assert_eq!(classify_request(None, 1), RequestAction::CreateNew);
    }

    #[test]
    fn test_pending_requestee_accepts() {
        let f = row(FriendshipStatus::Pending);
        assert_eq!(
            classify_request(Some(&f), 2),
            RequestAction::AcceptExisting { friendship_id: 42 }
        );
    }

    #[test]
    fn test_pending_requester_already_sent() {
        let f = row(FriendshipStatus::Pending);
        assert_eq!(classify_request(Some(&f), 1), RequestAction::AlreadySent);
    }

    #[test]
    fn test_accepted_already_friends() {
        let f = row(FriendshipStatus::Accepted);
        assert_eq!(classify_request(Some(&f), 1), RequestAction::AlreadyFriends);
        assert_eq!(classify_request(Some(&f), 2), RequestAction::AlreadyFriends);
    }

    #[test]
    fn test_blocked_refuses_both_directions() {
        let f = row(FriendshipStatus::Blocked);
        assert_eq!(classify_request(Some(&f), 1), RequestAction::Refused);
        assert_eq!(classify_request(Some(&f), 2), RequestAction::Refused);
    }

    #[test]
    fn test_rejected_reopens_same_row() {
        let f = row(FriendshipStatus::Rejected);
        assert_eq!(
            classify_request(Some(&f), 1),
            RequestAction::Reopen { friendship_id: 42 }
        );
    }
}
