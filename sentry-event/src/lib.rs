pub mod event;
pub mod event_id;
pub mod frames;
pub mod input;
pub mod time;
