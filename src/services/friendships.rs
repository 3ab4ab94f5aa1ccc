//! Friend requests, responses, and the friend graph.

use chrono::Utc;
use kanso_core::error::KansoError;
use kanso_core::friendship::{
    classify_request, Friendship, FriendshipStats, FriendshipStatus, RequestAction,
};
use kanso_core::user::User;
use kanso_store::Store;
use tracing::info;

use super::NotificationService;

#[derive(Clone)]
pub struct FriendshipService {
    store: Store,
    notifications: NotificationService,
}

impl FriendshipService {
    pub fn new(store: Store, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Send a friend request to a user named by username.
    ///
    /// The existing row for the pair decides what actually happens: a
    /// pending request from the other side is accepted instead, a rejected
    /// one is reopened, and blocked pairs get a generic refusal that does
    /// not reveal the block.
    pub async fn send_request(
        &self,
        requester_id: i64,
        requestee_username: &str,
    ) -> Result<Friendship, KansoError> {
        let requestee = self
            .store
            .find_user_by_username(requestee_username)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("user '{requestee_username}'")))?;

        if requester_id == requestee.id {
            return Err(KansoError::Conflict(
                "you cannot send a friend request to yourself".to_string(),
            ));
        }

        let existing = self
            .store
            .friendship_between(requester_id, requestee.id)
            .await?;

        match classify_request(existing.as_ref(), requester_id) {
            RequestAction::CreateNew => {
                let friendship = self
                    .store
                    .create_friendship(requester_id, requestee.id)
                    .await?;
                info!(
                    "friend request {} sent: {} -> {}",
                    friendship.id, requester_id, requestee.id
                );
                self.notifications
                    .friend_request(requestee.id, friendship.id)
                    .await?;
                Ok(friendship)
            }
            RequestAction::AcceptExisting { friendship_id } => {
                self.respond(friendship_id, requester_id, true).await
            }
            RequestAction::AlreadySent => Err(KansoError::Conflict(
                "friend request already sent".to_string(),
            )),
            RequestAction::AlreadyFriends => {
                Err(KansoError::Conflict("already friends".to_string()))
            }
            RequestAction::Refused => Err(KansoError::Conflict(
                "cannot send a friend request at this time".to_string(),
            )),
            RequestAction::Reopen { friendship_id } => {
                let mut friendship = self.found(friendship_id).await?;
                friendship.status = FriendshipStatus::Pending;
                friendship.requested_at = Utc::now();
                self.store.update_friendship(&friendship).await?;
                info!("friend request {} reopened by {}", friendship.id, requester_id);
                self.notifications
                    .friend_request(requestee.id, friendship.id)
                    .await?;
                Ok(friendship)
            }
        }
    }

    /// Accept or reject a pending request. Only the requestee may respond;
    /// accepting notifies the requester, rejecting notifies nobody.
    pub async fn respond(
        &self,
        friendship_id: i64,
        user_id: i64,
        accept: bool,
    ) -> Result<Friendship, KansoError> {
        let mut friendship = self.found(friendship_id).await?;

        if friendship.requestee_id != user_id {
            return Err(KansoError::Unauthorized(
                "you cannot respond to this friend request".to_string(),
            ));
        }
        if friendship.status != FriendshipStatus::Pending {
            return Err(KansoError::Conflict(
                "this friend request is no longer pending".to_string(),
            ));
        }

        if accept {
            friendship.status = FriendshipStatus::Accepted;
            friendship.accepted_at = Some(Utc::now());
            self.store.update_friendship(&friendship).await?;
            self.notifications
                .friend_accepted(friendship.requester_id, friendship.id)
                .await?;
        } else {
            friendship.status = FriendshipStatus::Rejected;
            self.store.update_friendship(&friendship).await?;
        }

        Ok(friendship)
    }

    /// Either party may remove the friendship (or withdraw a request).
    pub async fn remove(&self, friendship_id: i64, user_id: i64) -> Result<(), KansoError> {
        let friendship = self.found(friendship_id).await?;
        if friendship.requester_id != user_id && friendship.requestee_id != user_id {
            return Err(KansoError::Unauthorized(
                "you are not part of this friendship".to_string(),
            ));
        }
        self.store.delete_friendship(friendship.id).await
    }

    /// All rows touching the user, optionally filtered by status.
    pub async fn list(
        &self,
        user_id: i64,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>, KansoError> {
        self.store.friendships_for_user(user_id, status).await
    }

    pub async fn pending_incoming(&self, user_id: i64) -> Result<Vec<Friendship>, KansoError> {
        self.store.incoming_requests(user_id).await
    }

    pub async fn pending_outgoing(&self, user_id: i64) -> Result<Vec<Friendship>, KansoError> {
        self.store.outgoing_requests(user_id).await
    }

    pub async fn friends(&self, user_id: i64) -> Result<Vec<User>, KansoError> {
        self.store.friends_of(user_id).await
    }

    pub async fn stats(&self, user_id: i64) -> Result<FriendshipStats, KansoError> {
        self.store.friendship_stats(user_id).await
    }

    async fn found(&self, friendship_id: i64) -> Result<Friendship, KansoError> {
        self.store
            .find_friendship(friendship_id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("friend request {friendship_id}")))
    }
}
