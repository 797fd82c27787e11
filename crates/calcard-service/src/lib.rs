pub mod caldav;
pub mod carddav;
pub mod error;
pub mod import;
pub mod sync;
