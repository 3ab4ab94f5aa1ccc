//! Time block CRUD with advisory overlap detection.

use chrono::{DateTime, Utc};
use kanso_core::error::KansoError;
use kanso_core::timeblock::{check_range, NewTimeBlock, TimeBlock, TimeBlockUpdate};
use kanso_store::Store;
use tracing::debug;

/// A saved block plus whether it overlaps other blocks of the same user.
///
/// Overlap never blocks the save; callers surface it as a warning.
#[derive(Debug, Clone)]
pub struct SavedBlock {
    pub block: TimeBlock,
    pub overlaps_existing: bool,
}

#[derive(Clone)]
pub struct TimeBlockService {
    store: Store,
}

impl TimeBlockService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create a block. Fails `InvalidRange` when the end is not after the
    /// start; overlap with existing blocks is reported, not rejected.
    pub async fn create(&self, new: NewTimeBlock) -> Result<SavedBlock, KansoError> {
        check_range(new.start_time, new.end_time)?;

        let overlaps_existing = self
            .store
            .has_overlapping_time_blocks(new.user_id, new.start_time, new.end_time, None)
            .await?;
        if overlaps_existing {
            debug!("new block for user {} overlaps existing blocks", new.user_id);
        }

        let block = self.store.create_time_block(&new).await?;
        Ok(SavedBlock {
            block,
            overlaps_existing,
        })
    }

    pub async fn get(&self, user_id: i64, id: i64) -> Result<TimeBlock, KansoError> {
        let block = self
            .store
            .find_time_block(id)
            .await?
            .ok_or_else(|| KansoError::NotFound(format!("time block {id}")))?;
        if block.user_id != user_id {
            return Err(KansoError::Unauthorized(
                "you do not own this time block".to_string(),
            ));
        }
        Ok(block)
    }

    /// Apply a partial update, then re-run the range check and the overlap
    /// query against every other block of the user.
    pub async fn update(
        &self,
        user_id: i64,
        id: i64,
        update: TimeBlockUpdate,
    ) -> Result<SavedBlock, KansoError> {
        let mut block = self.get(user_id, id).await?;

        if let Some(title) = update.title {
            if !title.is_empty() {
                block.title = title;
            }
        }
        if let Some(start) = update.start_time {
            block.start_time = start;
        }
        if let Some(end) = update.end_time {
            block.end_time = end;
        }
        if let Some(color) = update.color {
            if !color.is_empty() {
                block.color = Some(color);
            }
        }

        check_range(block.start_time, block.end_time)?;

        let overlaps_existing = self
            .store
            .has_overlapping_time_blocks(user_id, block.start_time, block.end_time, Some(block.id))
            .await?;

        self.store.update_time_block(&block).await?;
        Ok(SavedBlock {
            block,
            overlaps_existing,
        })
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), KansoError> {
        let block = self.get(user_id, id).await?;
        self.store.delete_time_block(block.id).await
    }

    /// Blocks intersecting `[start, end]`, earliest first.
    pub async fn list_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, KansoError> {
        self.store.time_blocks_for_user(user_id, start, end).await
    }
}
