use anyhow::Result;
use daily_digest_core::Channel;

use crate::resolver::{ChannelSource, ReportResolver};

/// One row of `digest sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub channel: Channel,
    pub kind: &'static str,
    pub location: String,
    pub available: bool,
}

pub fn source_rows(resolver: &ReportResolver) -> Vec<SourceRow> {
    Channel::ALL
        .iter()
        .map(|&channel| match resolver.source(channel) {
            ChannelSource::Remote { index_url, .. } => SourceRow {
                channel,
                kind: "remote",
                location: index_url.to_string(),
                available: true,
            },
            ChannelSource::Local { dirs } => {
                let existing: Vec<String> = dirs
                    .iter()
                    .filter(|d| d.is_dir())
                    .map(|d| d.display().to_string())
                    .collect();
                SourceRow {
                    channel,
                    kind: "local",
                    available: !existing.is_empty(),
                    location: if existing.is_empty() {
                        "(no report directory exists)".to_string()
                    } else {
                        existing.join(", ")
                    },
                }
            }
        })
        .collect()
}

pub fn list_sources(resolver: &ReportResolver) -> Result<()> {
    println!("{:<10} {:<8} {:<10} LOCATION", "CHANNEL", "SOURCE", "AVAILABLE");
    for row in source_rows(resolver) {
        println!(
            "{:<10} {:<8} {:<10} {}",
            row.channel.as_str(),
            row.kind,
            row.available,
            row.location
        );
    }

    let storage = if resolver.config().storage.is_usable() {
        "configured"
    } else {
        "not configured (deletions are local only)"
    };
    println!();
    println!("object storage: {}", storage);

    Ok(())
}
