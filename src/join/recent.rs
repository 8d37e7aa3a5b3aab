/// Most-recently-joined rooms kept per authenticated user, newest first.
pub const RECENT_ROOMS_LIMIT: usize = 3;

/// Cookie lifetime for the recent-rooms list.
pub const RECENT_ROOMS_TTL_DAYS: i64 = 30;

/// Prepend the room just joined, dropping any earlier occurrence and
/// truncating to the limit.
pub fn push_recent_room(mut rooms: Vec<String>, room_uid: &str) -> Vec<String> {
    rooms.retain(|uid| uid != room_uid);
    rooms.insert(0, room_uid.to_string());
    rooms.truncate(RECENT_ROOMS_LIMIT);
    rooms
}
