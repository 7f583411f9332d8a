//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use video_downloader_lib::downloader::{
    DownloadTarget, ExtractionProfile, RawMediaResult, ResolveError, Resolver,
};

pub const MP4_MAGIC: &[u8] = b"\x00\x00\x00\x18ftypmp42";
pub const WEBM_MAGIC: &[u8] = b"\x1a\x45\xdf\xa3";

/// What the scripted resolver does for one profile
#[derive(Debug, Clone)]
pub enum Step {
    /// Fail with this stderr text
    Fail(&'static str),
    /// Return metadata only, even when a download was requested
    Metadata,
    /// Return metadata and, when a download was requested, write these bytes
    File { ext: &'static str, bytes: Vec<u8> },
}

impl Step {
    pub fn media(magic: &[u8], ext: &'static str, size: usize) -> Self {
        let mut bytes = magic.to_vec();
        bytes.resize(size, 0x42);
        Step::File { ext, bytes }
    }

    pub fn html(size: usize) -> Self {
        let mut bytes = b"<!doctype html><html><body>Access denied".to_vec();
        bytes.resize(size, b' ');
        Step::File { ext: "mp4", bytes }
    }
}

/// Resolver driven by a per-profile script. Records every profile it was
/// called with, in order.
pub struct ScriptedResolver {
    steps: HashMap<&'static str, Step>,
    fallback: Step,
    seen: Mutex<Vec<&'static str>>,
}

impl ScriptedResolver {
    pub fn new(fallback: Step) -> Self {
        Self {
            steps: HashMap::new(),
            fallback,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn on(mut self, profile: &'static str, step: Step) -> Self {
        self.steps.insert(profile, step);
        self
    }

    pub fn seen(&self) -> Vec<&'static str> {
        self.seen.lock().unwrap().clone()
    }
}

pub fn sample_raw() -> RawMediaResult {
    RawMediaResult {
        id: Some("abc123".to_string()),
        title: Some("Test clip".to_string()),
        uploader: Some("tester".to_string()),
        duration: Some(65.0),
        view_count: Some(1000),
        extractor: Some("youtube".to_string()),
        url: Some("https://cdn.example.com/v.mp4".to_string()),
        ext: Some("mp4".to_string()),
        format_id: Some("22".to_string()),
        resolution: Some("1280x720".to_string()),
        fps: Some(30.0),
        ..Default::default()
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn resolve(
        &self,
        _url: &str,
        profile: &ExtractionProfile,
        target: Option<&DownloadTarget>,
    ) -> Result<RawMediaResult, ResolveError> {
        self.seen.lock().unwrap().push(profile.name);
        let step = self.steps.get(profile.name).unwrap_or(&self.fallback).clone();

        let mut raw = sample_raw();
        match step {
            Step::Fail(message) => Err(ResolveError::from(message.to_string())),
            Step::Metadata => Ok(raw),
            Step::File { ext, bytes } => {
                if let Some(target) = target {
                    let path = target.dir.join(format!("{}.{}", target.stem, ext));
                    tokio::fs::write(&path, bytes).await.unwrap();
                    raw.ext = Some(ext.to_string());
                    raw.local_path = Some(path);
                }
                Ok(raw)
            }
        }
    }
}
