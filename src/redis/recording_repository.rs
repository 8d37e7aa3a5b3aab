use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::Result;
use crate::models::Recording;

/// Recording metadata mirrored from the meeting server, one JSON entry
/// per recording under the owning meeting's list key.
#[derive(Clone)]
pub struct RecordingRepository {
    pool: Pool,
}

impl RecordingRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// All recordings for a meeting, unfiltered. Entries that no longer
    /// parse are skipped rather than failing the listing.
    pub async fn get_recordings(&self, meeting_id: &str) -> Result<Vec<Recording>> {
        let mut conn = self.pool.get().await?;
        let key = format!("recordings:{}", meeting_id);

        let entries: Vec<String> = conn.lrange(&key, 0, -1).await?;

        let mut recordings = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_str::<Recording>(&entry) {
                Ok(recording) => recordings.push(recording),
                Err(e) => {
                    tracing::warn!(meeting_id = %meeting_id, error = %e, "Skipping unparsable recording entry");
                }
            }
        }

        Ok(recordings)
    }
}
