use serde::{Deserialize, Serialize};

/// Kind of resource stored in a collection.
///
/// Calendars hold iCalendar resources, address books hold vCards. Tombstones
/// record which kind vanished so sync responses can pick the right media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Calendar,
    Contact,
}

impl ResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Calendar => "calendar",
            Self::Contact => "contact",
        }
    }

    /// File extension used for resource names of this kind.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Calendar => "ics",
            Self::Contact => "vcf",
        }
    }

    /// Media type served for resources of this kind.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Calendar => "text/calendar; charset=utf-8",
            Self::Contact => "text/vcard; charset=utf-8",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
