//! CLI entry points for the `digest` binary.
//!
//! Each `run_*` function prints to stdout and returns `Err` only for
//! failures the user should see as a non-zero exit.

use std::sync::Arc;

use anyhow::{bail, Result};
use daily_digest_core::{slug, Channel, ReportSummary};

use crate::config::Config;
use crate::object_store::OssClient;
use crate::resolver::ReportResolver;
use crate::sync::{remove_report, IndexSynchronizer};

/// `digest list <channel>`
pub async fn run_list(resolver: &ReportResolver, channel: Channel, json: bool) -> Result<()> {
    let reports = resolver.all_reports(channel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    if reports.is_empty() {
        println!("No {} reports found.", channel);
        return Ok(());
    }

    for r in &reports {
        print_summary_line(r);
    }
    println!();
    println!("{} report(s)", reports.len());
    Ok(())
}

fn print_summary_line(r: &ReportSummary) {
    println!(
        "{:<10}  {:>4} items  {:>3} themes  {}",
        r.date.to_string(),
        r.item_count,
        r.theme_count,
        r.title
    );
    println!("            id: {}", r.identifier);
}

/// `digest show <id>`
pub async fn run_show(
    resolver: &ReportResolver,
    identifier: &str,
    channel: Option<Channel>,
) -> Result<()> {
    let detail = match resolver.report_by_slug(identifier, channel).await {
        Ok(d) => d,
        Err(e) => bail!("{}", e),
    };
    let s = &detail.summary;

    println!("--- Report ---");
    println!("title:       {}", s.title);
    println!("channel:     {}", s.channel);
    println!("date:        {}", s.date);
    println!("file_name:   {}", s.file_name);
    println!("items:       {}", s.item_count);
    println!("themes:      {}", s.theme_count);
    if let Some(ref updated) = s.updated_at {
        println!("updated_at:  {}", updated);
    }
    println!("excerpt:     {}", s.excerpt);
    println!();
    println!("--- Content ---");
    println!("{}", detail.content);
    Ok(())
}

/// `digest delete <file-name>`
pub async fn run_delete(config: Arc<Config>, file_name: &str, channel: Option<Channel>) -> Result<()> {
    let Some(name) = slug::basename(file_name.trim()) else {
        bail!("not a file name: {:?}", file_name);
    };
    let channel = match channel {
        Some(c) => c,
        None => match Channel::search_order(None).into_iter().find(|c| c.qualifies(name)) {
            Some(c) => c,
            None => bail!("'{}' is not a report of any channel", name),
        },
    };

    let sync = match OssClient::new(&config.storage) {
        Ok(client) => Some(IndexSynchronizer::new(Arc::new(client), config.clone())),
        Err(_) => {
            println!("Object storage not configured; deleting local copies only.");
            None
        }
    };

    let report = remove_report(sync.as_ref(), config.local.report_dirs(), channel, name).await?;

    if let Some(ref remote) = report.remote {
        println!("deleted object: {}", remote.object_name);
        if let Some(ref url) = remote.deleted_url {
            println!("  url:          {}", url);
        }
        println!(
            "index updated:  {}{}",
            remote.index_url.as_deref().unwrap_or("(no public url)"),
            if remote.removed_from_index {
                ""
            } else {
                " (entry was not listed)"
            }
        );
    }
    for path in &report.local_removed {
        println!("deleted file:   {}", path);
    }
    if !report.removed_anything() {
        bail!("report not found: {}", report.file_name);
    }
    Ok(())
}

/// `digest slug encode|decode`
pub fn run_slug_encode(file_name: &str) {
    println!("{}", slug::encode(file_name));
}

pub fn run_slug_decode(identifier: &str) -> Result<()> {
    println!("{}", slug::decode(identifier)?);
    Ok(())
}
