// Ephemeral artifact store
//
// Tracks materialized files behind opaque tickets until their retention runs
// out. Expiry is enforced lazily on every access and proactively by `sweep`.
//
// Removing a record from the map is what grants the right to delete its file.
// Whichever path wins the removal (serve, status, sweep) deletes the file, so
// every backing file is deleted exactly once even when they race.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use dashmap::DashMap;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::clock::Clock;
use crate::downloader::models::MaterializedFile;

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("artifact expired")]
    Expired,

    #[error("artifact not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
struct ArtifactRecord {
    path: PathBuf,
    title: String,
    file_extension: String,
    file_size: u64,
    quality: String,
    platform: String,
    created_at: OffsetDateTime,
    expires_at: OffsetDateTime,
    expires: Instant,
    download_count: u64,
}

impl ArtifactRecord {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires
    }
}

/// Snapshot of a record as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub download_id: String,
    pub title: String,
    pub file_extension: String,
    pub file_size: u64,
    pub quality: String,
    pub platform: String,
    pub download_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub download_url: String,
}

/// An open handle on an artifact, counted as one download
#[derive(Debug)]
pub struct ServedArtifact {
    pub file: tokio::fs::File,
    pub file_name: String,
    pub file_size: u64,
    pub download_count: u64,
}

pub struct ArtifactStore {
    records: DashMap<String, ArtifactRecord>,
    retention: Duration,
    clock: Arc<dyn Clock>,
}

impl ArtifactStore {
    pub fn new(retention: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            retention,
            clock,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path a client fetches a ticket from
    pub fn serve_path(ticket: &str) -> String {
        format!("/api/serve/{}", ticket)
    }

    /// Start tracking a materialized file and hand out its ticket.
    ///
    /// The size is the one measured when the file was validated.
    pub fn register(&self, file: &MaterializedFile, quality: &str) -> String {
        let ticket = Uuid::new_v4().to_string();
        let created_at = self.clock.now_utc();
        let record = ArtifactRecord {
            path: file.path.clone(),
            title: file.metadata.title.clone(),
            file_extension: file.file_extension.clone(),
            file_size: file.file_size,
            quality: quality.to_string(),
            platform: file.metadata.platform.clone(),
            created_at,
            expires_at: created_at + self.retention,
            expires: self.clock.now() + self.retention,
            download_count: 0,
        };

        tracing::info!(
            ticket = %ticket,
            path = %record.path.display(),
            file_size = record.file_size,
            "Artifact registered"
        );
        self.records.insert(ticket.clone(), record);
        ticket
    }

    /// Open the artifact for download and count it.
    ///
    /// The counter is bumped before any bytes move; an aborted transfer
    /// still counts.
    pub async fn serve(&self, ticket: &str) -> Result<ServedArtifact, StoreError> {
        self.expire_if_due(ticket)?;

        // Counted under the entry lock; the file is opened once it is released
        let (path, file_name, file_size, download_count) = {
            let mut record = self.records.get_mut(ticket).ok_or(StoreError::NotFound)?;
            record.download_count += 1;
            (
                record.path.clone(),
                attachment_name(&record.title, &record.file_extension),
                record.file_size,
                record.download_count,
            )
        };

        match tokio::fs::File::open(&path).await {
            Ok(file) => {
                tracing::info!(ticket, download_count, "Serving artifact");
                Ok(ServedArtifact {
                    file,
                    file_name,
                    file_size,
                    download_count,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(
                    ticket,
                    path = %path.display(),
                    "Artifact file vanished while record was active, purging record"
                );
                self.records.remove_if(ticket, |_, r| r.path == path);
                Err(StoreError::NotFound)
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    pub fn status_of(&self, ticket: &str) -> Result<ArtifactStatus, StoreError> {
        self.expire_if_due(ticket)?;

        let record = self.records.get(ticket).ok_or(StoreError::NotFound)?;
        Ok(ArtifactStatus {
            download_id: ticket.to_string(),
            title: record.title.clone(),
            file_extension: record.file_extension.clone(),
            file_size: record.file_size,
            quality: record.quality.clone(),
            platform: record.platform.clone(),
            download_count: record.download_count,
            created_at: record.created_at,
            expires_at: record.expires_at,
            download_url: Self::serve_path(ticket),
        })
    }

    /// Purge every expired record and delete its file. Returns how many
    /// records were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut expired = Vec::new();

        self.records.retain(|ticket, record| {
            if record.is_expired(now) {
                expired.push((ticket.clone(), record.path.clone()));
                false
            } else {
                true
            }
        });

        for (ticket, path) in &expired {
            tracing::debug!(ticket = %ticket, "Sweeping expired artifact");
            delete_backing_file(path);
        }
        expired.len()
    }

    /// Remove the record and its file when the ticket's retention has run out
    fn expire_if_due(&self, ticket: &str) -> Result<(), StoreError> {
        let now = self.clock.now();
        if let Some((_, record)) = self.records.remove_if(ticket, |_, r| r.is_expired(now)) {
            tracing::info!(ticket, "Artifact expired on access");
            delete_backing_file(&record.path);
            return Err(StoreError::Expired);
        }
        Ok(())
    }
}

/// Best effort; a file that is already gone is fine
fn delete_backing_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Deleted artifact file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to delete artifact file"),
    }
}

/// Delete regular files in `dir` last modified more than `max_age` ago.
///
/// Records do not survive a restart, so anything this old in the download
/// directory at startup can no longer be served.
pub fn purge_stale_files(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age > max_age {
            delete_backing_file(&entry.path());
            removed += 1;
        }
    }
    Ok(removed)
}

/// `"<title>.<ext>"` safe to put inside a quoted Content-Disposition filename
fn attachment_name(title: &str, extension: &str) -> String {
    let title: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let title = title.trim();
    let title = if title.is_empty() { "video" } else { title };
    format!("{}.{}", title, extension)
}
