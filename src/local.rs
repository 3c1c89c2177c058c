//! Local report directories.
//!
//! When a channel has no remote index, reports are read from an ordered
//! list of local directories (the project output directory, then a shared
//! temp directory). Only the top level of each directory is scanned. A
//! missing directory contributes nothing; when the same file name exists in
//! several directories, the first directory wins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use daily_digest_core::models::file_stem;
use daily_digest_core::{slug, Channel, MetadataExtractor, ReportDate, ReportSummary};
use walkdir::WalkDir;

/// A qualifying report file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReport {
    pub path: PathBuf,
    pub file_name: String,
}

/// List the channel's report files across `dirs`, deduplicated by name.
pub fn list_report_files(dirs: &[PathBuf], channel: Channel) -> Vec<LocalReport> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "report directory missing, skipping");
            continue;
        }
        let mut in_dir: Vec<LocalReport> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let file_name = e.file_name().to_str()?.to_string();
                channel.qualifies(&file_name).then(|| LocalReport {
                    path: e.path().to_path_buf(),
                    file_name,
                })
            })
            .collect();
        in_dir.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        for report in in_dir {
            if seen.insert(report.file_name.clone()) {
                files.push(report);
            }
        }
    }

    files
}

/// Build a summary by reading the file and its modification time.
pub fn summarize(
    report: &LocalReport,
    channel: Channel,
    extractor: &dyn MetadataExtractor,
) -> Result<ReportSummary> {
    let content = std::fs::read_to_string(&report.path)
        .with_context(|| format!("Failed to read {}", report.path.display()))?;
    let modified = std::fs::metadata(&report.path)
        .and_then(|m| m.modified())
        .ok();
    Ok(summary_from_content(
        &report.file_name,
        channel,
        &content,
        modified,
        extractor,
    ))
}

/// Summary for a report whose full text is at hand.
pub fn summary_from_content(
    file_name: &str,
    channel: Channel,
    content: &str,
    modified: Option<SystemTime>,
    extractor: &dyn MetadataExtractor,
) -> ReportSummary {
    let meta = extractor.extract(content, file_stem(file_name));
    ReportSummary {
        identifier: slug::encode(file_name),
        channel,
        title: meta.title,
        date: ReportDate::from_file_name(file_name),
        file_name: file_name.to_string(),
        excerpt: meta.excerpt,
        item_count: meta.item_count,
        theme_count: meta.theme_count,
        updated_at: modified.map(|t| {
            DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true)
        }),
    }
}

/// Read `file_name` from the first directory that holds it.
pub fn read_report(dirs: &[PathBuf], file_name: &str) -> Option<(PathBuf, String)> {
    dirs.iter().find_map(|dir| {
        let path = dir.join(file_name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some((path, content)),
            Err(_) => None,
        }
    })
}

/// Remove `file_name` from every directory holding it. Returns the removed
/// paths.
pub fn remove_report_file(dirs: &[PathBuf], file_name: &str) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for dir in dirs {
        let path = dir.join(file_name);
        if is_regular_file(&path) {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            removed.push(path);
        }
    }
    Ok(removed)
}

fn is_regular_file(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daily_digest_core::DailyReportExtractor;
    use std::fs;

    #[test]
    fn test_list_dedups_first_dir_wins() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        fs::write(a.path().join("2024-05-01 - X 日报.md"), "from a").unwrap();
        fs::write(b.path().join("2024-05-01 - X 日报.md"), "from b").unwrap();
        fs::write(b.path().join("2024-05-02 - X 日报.md"), "only b").unwrap();
        fs::write(b.path().join("2024-05-02 - X 日报 - 公众号格式.md"), "wechat").unwrap();
        fs::write(b.path().join("notes.txt"), "ignored").unwrap();

        let dirs = vec![a.path().to_path_buf(), b.path().to_path_buf()];
        let files = list_report_files(&dirs, Channel::Ai);
        assert_eq!(files.len(), 2);
        let first = files
            .iter()
            .find(|f| f.file_name == "2024-05-01 - X 日报.md")
            .unwrap();
        assert!(first.path.starts_with(a.path()));
    }

    #[test]
    fn test_missing_dirs_tolerated() {
        let a = tempfile::tempdir().unwrap();
        fs::write(a.path().join("2024-05-01 - X 日报.md"), "x").unwrap();
        let dirs = vec![
            a.path().join("does-not-exist"),
            a.path().to_path_buf(),
        ];
        assert_eq!(list_report_files(&dirs, Channel::Ai).len(), 1);
        assert!(list_report_files(&[PathBuf::from("/nonexistent/dir")], Channel::Ai).is_empty());
    }

    #[test]
    fn test_subdirectories_not_scanned() {
        let a = tempfile::tempdir().unwrap();
        fs::create_dir(a.path().join("nested")).unwrap();
        fs::write(a.path().join("nested").join("2024-05-01 - X 日报.md"), "x").unwrap();
        assert!(list_report_files(&[a.path().to_path_buf()], Channel::Ai).is_empty());
    }

    #[test]
    fn test_summarize_reads_metadata() {
        let a = tempfile::tempdir().unwrap();
        let name = "2024-05-01 - X 日报.md";
        fs::write(
            a.path().join(name),
            "# X 日报\n\n> 共 **12** 条 RSS 更新，**4** 个核心主题\n\n正文第一行\n正文第二行\n",
        )
        .unwrap();
        let files = list_report_files(&[a.path().to_path_buf()], Channel::Ai);
        let summary = summarize(&files[0], Channel::Ai, &DailyReportExtractor).unwrap();
        assert_eq!(summary.title, "# X 日报");
        assert_eq!(summary.item_count, 12);
        assert_eq!(summary.theme_count, 4);
        assert_eq!(summary.excerpt, "正文第一行 正文第二行");
        assert_eq!(summary.date.to_string(), "2024-05-01");
        assert_eq!(slug::decode(&summary.identifier).unwrap(), name);
        assert!(summary.updated_at.is_some());
    }

    #[test]
    fn test_read_and_remove() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let name = "2024-05-01 - X 日报.md";
        fs::write(b.path().join(name), "body").unwrap();
        let dirs = vec![a.path().to_path_buf(), b.path().to_path_buf()];

        let (path, content) = read_report(&dirs, name).unwrap();
        assert!(path.starts_with(b.path()));
        assert_eq!(content, "body");

        let removed = remove_report_file(&dirs, name).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(read_report(&dirs, name).is_none());
        assert!(remove_report_file(&dirs, name).unwrap().is_empty());
    }
}
