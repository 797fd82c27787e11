use calcard_core::types::ResourceType;
use calcard_rfc::rfc::ical::core::EventDisplay;
use calcard_rfc::rfc::vcard::ContactDisplay;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Display fields derived from the content at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachedFields {
    Event(EventDisplay),
    Contact(ContactDisplay),
}

impl CachedFields {
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Event(_) => ResourceType::Calendar,
            Self::Contact(_) => ResourceType::Contact,
        }
    }
}

/// New content for a resource, as produced by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceContent {
    /// Serialized iCalendar or vCard text.
    pub content: String,
    pub cached: CachedFields,
}

impl ResourceContent {
    #[must_use]
    pub fn new(content: String, cached: CachedFields) -> Self {
        Self { content, cached }
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.cached.resource_type()
    }
}

/// A stored calendar object or contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRow {
    pub resource_type: ResourceType,
    pub collection_id: Uuid,
    /// Logical identity, used for RECURRENCE-ID matching and sync history.
    pub uid: String,
    /// Path segment, fixed at creation.
    pub resource_name: String,
    pub content: String,
    pub etag: String,
    /// Collection ctag this row was last written at.
    pub revision: i64,
    pub last_modified: DateTime<Utc>,
    pub cached: CachedFields,
}

impl ResourceRow {
    /// Typed view of a calendar row.
    #[must_use]
    pub fn as_calendar(&self) -> Option<CalendarResource> {
        match &self.cached {
            CachedFields::Event(display) => Some(CalendarResource {
                collection_id: self.collection_id,
                uid: self.uid.clone(),
                resource_name: self.resource_name.clone(),
                content: self.content.clone(),
                display: display.clone(),
                etag: self.etag.clone(),
                last_modified: self.last_modified,
            }),
            CachedFields::Contact(_) => None,
        }
    }

    /// Typed view of a contact row.
    #[must_use]
    pub fn as_contact(&self) -> Option<ContactResource> {
        match &self.cached {
            CachedFields::Contact(display) => Some(ContactResource {
                address_book_id: self.collection_id,
                uid: self.uid.clone(),
                resource_name: self.resource_name.clone(),
                content: self.content.clone(),
                display: display.clone(),
                etag: self.etag.clone(),
                last_modified: self.last_modified,
            }),
            CachedFields::Event(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarResource {
    pub collection_id: Uuid,
    pub uid: String,
    pub resource_name: String,
    pub content: String,
    pub display: EventDisplay,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactResource {
    pub address_book_id: Uuid,
    pub uid: String,
    pub resource_name: String,
    pub content: String,
    pub display: ContactDisplay,
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}
