//! Rows persisted by a [`crate::store::Store`].

mod collection;
mod resource;
mod tombstone;

pub use collection::{CollectionSnapshot, CollectionVersion};
pub use resource::{CachedFields, CalendarResource, ContactResource, ResourceContent, ResourceRow};
pub use tombstone::Tombstone;
