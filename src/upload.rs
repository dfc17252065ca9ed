//! Hand-off to the video host. The actual OAuth upload lives behind
//! [`Uploader`]; this module only shapes metadata and keeps the local log.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

use crate::facts::ContentItem;

pub const DEFAULT_DAILY_LIMIT: usize = 6;

const TITLE_PREFIX: &str = "Mind-Blowing Fact: ";
const TITLE_FACT_CHARS: usize = 50;
const DEFAULT_TAGS: &[&str] = &[
    "facts",
    "education",
    "mindblowing",
    "science",
    "knowledge",
    "interesting",
    "didyouknow",
    "amazing",
    "fact",
    "learning",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: String,
}

impl UploadMetadata {
    pub fn for_item(item: &ContentItem) -> Self {
        let title_fact = if item.text.chars().count() > TITLE_FACT_CHARS {
            let head: String = item.text.chars().take(TITLE_FACT_CHARS).collect();
            format!("{head}...")
        } else {
            item.text.clone()
        };

        let mut tags: Vec<String> = DEFAULT_TAGS.iter().map(|t| t.to_string()).collect();
        if !item.category.is_empty() {
            tags.push(item.category.clone());
        }
        tags.push("honest_ai_slop".into());

        Self {
            title: format!("{TITLE_PREFIX}{title_fact}"),
            description: format!(
                "🔬 {}\n\n💡 Did you know this incredible fact? Share your thoughts below!\n\n\
                 #facts #education #mindblowing #science #knowledge #didyouknow\n\n---\nGenerated with AI 🤖",
                item.text
            ),
            tags,
            category_id: "27".into(),
            privacy: "public".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub video_id: String,
    pub url: String,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, video: &Path, meta: &UploadMetadata) -> anyhow::Result<UploadReceipt>;
}

/// Resolves an artifact reference from the render service to a file on
/// disk. URLs served under `/tasks/` live in the service's storage dir.
/// Returns `None` for a `/tasks/` reference that climbs out of it with `..`.
pub fn artifact_local_path(artifact: &str, storage_dir: &Path) -> Option<PathBuf> {
    let path = reqwest::Url::parse(artifact)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| artifact.to_string());
    match path.strip_prefix('/') {
        Some(rest) if rest.starts_with("tasks/") => {
            let rest = Path::new(rest);
            if rest.components().any(|c| matches!(c, Component::ParentDir)) {
                return None;
            }
            Some(storage_dir.join(rest))
        }
        _ => Some(PathBuf::from(artifact)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadResult {
    Uploaded(UploadReceipt),
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadLogEntry {
    pub task_id: String,
    pub video_path: String,
    pub fact: String,
    pub category: String,
    pub upload_result: UploadResult,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub uploads_today: usize,
}

impl UploadStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 * 100.0 / self.total as f64
    }
}

#[derive(Debug)]
pub struct UploadLog {
    path: PathBuf,
    entries: Vec<UploadLogEntry>,
}

impl UploadLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                warn!("Ignoring unreadable upload log {}: {}", path.display(), e);
                Vec::new()
            }),
            Err(_) => Vec::new(),
        };
        debug!("Upload log has {} entries", entries.len());
        Self { path, entries }
    }

    pub fn entries(&self) -> &[UploadLogEntry] {
        &self.entries
    }

    pub fn record(&mut self, entry: UploadLogEntry) -> anyhow::Result<()> {
        self.entries.push(entry);
        let data = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, data)?;
        info!("Upload log updated ({} entries)", self.entries.len());
        Ok(())
    }

    pub fn uploads_on(&self, day: chrono::NaiveDate) -> usize {
        self.entries
            .iter()
            .filter(|e| e.timestamp.date_naive() == day)
            .count()
    }

    pub fn remaining_today(&self, limit: usize) -> usize {
        limit.saturating_sub(self.uploads_on(Local::now().date_naive()))
    }

    pub fn stats(&self) -> UploadStats {
        let successful = self
            .entries
            .iter()
            .filter(|e| matches!(e.upload_result, UploadResult::Uploaded(_)))
            .count();
        UploadStats {
            total: self.entries.len(),
            successful,
            failed: self.entries.len() - successful,
            uploads_today: self.uploads_on(Local::now().date_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(text: &str) -> ContentItem {
        ContentItem {
            id: 1,
            text: text.into(),
            category: "space".into(),
            subcategory: "planets".into(),
        }
    }

    #[test]
    fn long_fact_title_is_shortened() {
        let meta = UploadMetadata::for_item(&item(
            "A day on Venus is longer than its year, because rotation is slow.",
        ));
        assert_eq!(
            meta.title,
            "Mind-Blowing Fact: A day on Venus is longer than its year, because ro..."
        );
        assert!(meta.tags.contains(&"space".to_string()));
        assert_eq!(meta.tags.last().map(String::as_str), Some("honest_ai_slop"));
        assert_eq!(meta.category_id, "27");
    }

    #[test]
    fn short_fact_title_is_kept() {
        let meta = UploadMetadata::for_item(&item("Bees dance."));
        assert_eq!(meta.title, "Mind-Blowing Fact: Bees dance.");
        assert!(meta.description.contains("Bees dance."));
    }

    #[test]
    fn task_urls_map_into_storage() {
        let storage = Path::new("storage");
        assert_eq!(
            artifact_local_path("http://localhost:8080/tasks/abc/final-1.mp4", storage),
            Some(PathBuf::from("storage/tasks/abc/final-1.mp4"))
        );
        assert_eq!(
            artifact_local_path("/tasks/abc/final-1.mp4", storage),
            Some(PathBuf::from("storage/tasks/abc/final-1.mp4"))
        );
        assert_eq!(
            artifact_local_path("/srv/out/final-1.mp4", storage),
            Some(PathBuf::from("/srv/out/final-1.mp4"))
        );
    }

    #[test]
    fn task_paths_cannot_leave_storage() {
        let storage = Path::new("storage");
        assert_eq!(artifact_local_path("/tasks/../../etc/passwd", storage), None);
        assert_eq!(artifact_local_path("/tasks/abc/../../../x.mp4", storage), None);
        // Url::parse normalises dot segments, so a URL lands back inside tasks/.
        assert_eq!(
            artifact_local_path("http://localhost:8080/tasks/abc/../def/final-1.mp4", storage),
            Some(PathBuf::from("storage/tasks/def/final-1.mp4"))
        );
    }

    #[test]
    fn log_round_trips_and_counts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("upload_log.json");
        let mut log = UploadLog::open(&path);
        let entry = |result| UploadLogEntry {
            task_id: "t1".into(),
            video_path: "v.mp4".into(),
            fact: "f".into(),
            category: "c".into(),
            upload_result: result,
            timestamp: Local::now(),
        };
        log.record(entry(UploadResult::Uploaded(UploadReceipt {
            video_id: "abc".into(),
            url: "https://www.youtube.com/watch?v=abc".into(),
        })))
        .unwrap();
        log.record(entry(UploadResult::Error {
            error: "quota".into(),
        }))
        .unwrap();

        let reopened = UploadLog::open(&path);
        assert_eq!(reopened.entries(), log.entries());
        let stats = reopened.stats();
        assert_eq!((stats.total, stats.successful, stats.failed), (2, 1, 1));
        assert_eq!(stats.uploads_today, 2);
        assert_eq!(reopened.remaining_today(DEFAULT_DAILY_LIMIT), 4);
        assert!((stats.success_rate() - 50.0).abs() < f64::EPSILON);
    }
}
