pub mod recording;
pub mod room;
pub mod user;

pub use recording::{
    paginate, search_recordings, Paginated, Recording, RecordingFilter, RecordingVisibility,
};
pub use room::{Room, RoomSettings};
pub use user::{Claims, CurrentUser};
