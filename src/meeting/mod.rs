pub mod gateway;

pub use gateway::{MeetingApi, MeetingGateway};
