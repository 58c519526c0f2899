//! Utility modules shared by the commands.

pub mod category;
pub mod date;
pub mod log;
pub mod slug;
