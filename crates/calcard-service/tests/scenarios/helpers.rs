//! Shared setup for service scenario tests.

use calcard_core::config::Settings;
use calcard_core::types::ResourceType;
use calcard_db::ledger::{Precondition, VersionLedger};
use calcard_db::store::MemoryStore;
use calcard_rfc::rfc::ical::build::EventFields;
use calcard_rfc::rfc::ical::core::{EventTime, Frequency, ParsedResource, Rule};
use calcard_rfc::rfc::ical::parse::parse;
use calcard_rfc::rfc::ical::series::EditScope;
use calcard_service::caldav::object::PutEventContext;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

pub struct TestEnv {
    pub ledger: VersionLedger<MemoryStore>,
    pub settings: Settings,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            ledger: VersionLedger::new(MemoryStore::new()),
            settings: Settings::default(),
        }
    }

    pub async fn calendar(&self, collection_id: Uuid, uid: &str) -> ParsedResource {
        let row = self
            .ledger
            .load_resource(collection_id, ResourceType::Calendar, uid)
            .await
            .expect("load should succeed")
            .expect("resource should exist");
        parse(&row.content).expect("stored content should parse")
    }

    pub async fn etag(&self, collection_id: Uuid, resource_type: ResourceType, uid: &str) -> String {
        self.ledger
            .load_resource(collection_id, resource_type, uid)
            .await
            .expect("load should succeed")
            .expect("resource should exist")
            .etag
    }
}

pub fn jan(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

pub fn utc(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, 0, 0, 0)
        .single()
        .expect("valid date")
}

/// `evt1`: weekly on Mondays at 10:00 UTC from 2025-01-06, five times.
pub fn weekly_series() -> EventFields {
    EventFields::new("evt1", EventTime::utc(jan(6, 10)))
        .with_end(EventTime::utc(jan(6, 11)))
        .with_summary("Weekly sync")
        .with_rule(Rule::new(Frequency::Weekly).with_count(5))
}

pub fn scoped(collection_id: Uuid, scope: EditScope) -> PutEventContext {
    PutEventContext {
        collection_id,
        scope,
        precondition: Precondition::None,
    }
}
