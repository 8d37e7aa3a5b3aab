use deadpool_redis::Pool;
use redis::AsyncCommands;

use crate::error::Result;
use crate::models::Room;

/// Read-side room store. Rooms are written by the account-management
/// service; the join flow only ever loads them.
#[derive(Clone)]
pub struct RoomRepository {
    pool: Pool,
}

impl RoomRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get a room by its friendly uid
    pub async fn get_room(&self, uid: &str) -> Result<Option<Room>> {
        let mut conn = self.pool.get().await?;
        let key = format!("room:{}", uid);

        let json: Option<String> = conn.get(&key).await?;

        match json {
            Some(data) => {
                let room: Room = serde_json::from_str(&data)?;
                Ok(Some(room))
            }
            None => Ok(None),
        }
    }

    /// Look a room up through its shared invite path; the stored value
    /// is the uid of the room it points at.
    pub async fn get_room_by_shared_path(&self, invite_path: &str) -> Result<Option<Room>> {
        let mut conn = self.pool.get().await?;
        let key = format!("room_shared:{}", invite_path);

        let uid: Option<String> = conn.get(&key).await?;
        drop(conn);

        match uid {
            Some(uid) => self.get_room(&uid).await,
            None => Ok(None),
        }
    }

    /// Health check - ping Redis
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.pool.get().await?;
        let pong: String = redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(pong == "PONG")
    }
}
