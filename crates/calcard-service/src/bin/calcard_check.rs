use std::path::Path;

use anyhow::Context;
use calcard_core::config::load_config;
use calcard_db::ledger::etag_of;
use calcard_rfc::rfc::ical::build::serialize;
use calcard_rfc::rfc::ical::parse::split_calendar_by_uid;
use calcard_rfc::rfc::vcard::{serialize_vcard, split_vcards};
use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[derive(Debug, Serialize)]
struct Report<'a> {
    file: &'a str,
    uid: Option<String>,
    etag: Option<String>,
    error: Option<String>,
}

fn check_calendar<'a>(file: &'a str, text: &str) -> Vec<Report<'a>> {
    let resources = match split_calendar_by_uid(text) {
        Ok(resources) => resources,
        Err(e) => {
            return vec![Report {
                file,
                uid: None,
                etag: None,
                error: Some(e.to_string()),
            }];
        }
    };

    resources
        .iter()
        .map(|resource| {
            let uid = resource.uid();
            match resource.validate() {
                Ok(()) => Report {
                    file,
                    uid,
                    etag: Some(etag_of(&serialize(resource))),
                    error: None,
                },
                Err(e) => Report {
                    file,
                    uid,
                    etag: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}

fn check_contacts<'a>(file: &'a str, text: &str) -> Vec<Report<'a>> {
    let split = split_vcards(text);
    let mut reports: Vec<Report<'a>> = split
        .cards
        .iter()
        .map(|card| Report {
            file,
            uid: card.uid(),
            etag: Some(etag_of(&serialize_vcard(card))),
            error: None,
        })
        .collect();
    if split.malformed > 0 {
        reports.push(Report {
            file,
            uid: None,
            etag: None,
            error: Some(format!("{} malformed vCard entries", split.malformed)),
        });
    }
    reports
}

fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    let config = load_config()?;

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping warn");
    }

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        anyhow::bail!("usage: calcard-check <file.ics|file.vcf>...");
    }

    let mut failed = false;
    for file in &files {
        let text = std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?;
        let is_vcard = Path::new(file)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("vcf"));

        let reports = if is_vcard {
            check_contacts(file, &text)
        } else {
            check_calendar(file, &text)
        };

        for report in reports {
            failed |= report.error.is_some();
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
