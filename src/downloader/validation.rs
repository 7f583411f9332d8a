// Content validation for downloaded files
//
// Platforms sometimes answer a blocked request with an HTML error page that
// the tool happily saves under a video extension. These checks reject such
// files before they are handed to the artifact store.

use std::path::Path;

use tokio::io::AsyncReadExt;

/// Anything smaller is assumed to be an error page
pub const MIN_MEDIA_SIZE: u64 = 1024;

/// How many leading bytes are inspected
pub const HEAD_LEN: usize = 100;

const HTML_MARKERS: [&[u8]; 5] = [b"<html", b"<!doctype", b"<head>", b"<body>", b"<title>"];

const EBML_MAGIC: &[u8] = b"\x1a\x45\xdf\xa3";

/// Container recognised from the leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// ISO base media (mp4, m4a, mov)
    IsoBmff,
    /// Matroska / WebM
    Matroska,
    /// RIFF (avi)
    Riff,
    /// No known signature but not HTML either
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("file is missing")]
    Missing,

    #[error("file too small ({0} bytes)")]
    TooSmall(u64),

    #[error("file starts with an HTML marker")]
    Html,

    #[error("file unreadable: {0}")]
    Unreadable(String),
}

/// Classify a file from its size and leading bytes
pub fn inspect(head: &[u8], size: u64) -> Result<Container, Rejection> {
    let head = &head[..head.len().min(HEAD_LEN)];
    let lower = head.to_ascii_lowercase();

    if HTML_MARKERS
        .iter()
        .any(|marker| contains(&lower, marker))
    {
        return Err(Rejection::Html);
    }

    if size < MIN_MEDIA_SIZE {
        return Err(Rejection::TooSmall(size));
    }

    if head.get(4..8) == Some(b"ftyp".as_slice()) {
        Ok(Container::IsoBmff)
    } else if head.starts_with(EBML_MAGIC) {
        Ok(Container::Matroska)
    } else if head.starts_with(b"RIFF") {
        Ok(Container::Riff)
    } else {
        Ok(Container::Unrecognized)
    }
}

/// Validate a file on disk. Returns its size and detected container.
pub async fn validate_file(path: &Path) -> Result<(u64, Container), Rejection> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Rejection::Missing),
        Err(e) => return Err(Rejection::Unreadable(e.to_string())),
    };
    let size = file
        .metadata()
        .await
        .map_err(|e| Rejection::Unreadable(e.to_string()))?
        .len();

    let mut head = Vec::with_capacity(HEAD_LEN);
    (&mut file)
        .take(HEAD_LEN as u64)
        .read_to_end(&mut head)
        .await
        .map_err(|e| Rejection::Unreadable(e.to_string()))?;

    inspect(&head, size).map(|container| (size, container))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp4_head() -> Vec<u8> {
        let mut head = b"\x00\x00\x00\x18ftypmp42".to_vec();
        head.resize(HEAD_LEN, 0);
        head
    }

    #[test]
    fn test_html_rejected_regardless_of_size() {
        assert_eq!(inspect(b"<html><body>blocked", 10), Err(Rejection::Html));
        assert_eq!(
            inspect(b"<!DOCTYPE html><html>", 5_000_000),
            Err(Rejection::Html)
        );
        assert_eq!(inspect(b"\n\n  <TITLE>Error", 4096), Err(Rejection::Html));
    }

    #[test]
    fn test_small_file_rejected() {
        assert_eq!(inspect(&mp4_head(), 500), Err(Rejection::TooSmall(500)));
    }

    #[test]
    fn test_known_containers() {
        assert_eq!(inspect(&mp4_head(), 1024), Ok(Container::IsoBmff));
        assert_eq!(
            inspect(b"\x1a\x45\xdf\xa3\x9f\x42\x86\x81", 2048),
            Ok(Container::Matroska)
        );
        assert_eq!(inspect(b"RIFF\x00\x10\x00\x00AVI ", 2048), Ok(Container::Riff));
    }

    #[test]
    fn test_unknown_binary_accepted() {
        assert_eq!(inspect(&[0xff; 64], 4096), Ok(Container::Unrecognized));
    }

    #[test]
    fn test_marker_past_head_is_ignored() {
        let mut head = vec![0u8; 200];
        head[150..155].copy_from_slice(b"<html");
        assert_eq!(inspect(&head, 4096), Ok(Container::Unrecognized));
    }

    #[tokio::test]
    async fn test_validate_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.mp4");
        let mut bytes = mp4_head();
        bytes.resize(4096, 7);
        std::fs::write(&good, &bytes).unwrap();
        assert_eq!(validate_file(&good).await, Ok((4096, Container::IsoBmff)));

        let page = dir.path().join("page.mp4");
        std::fs::write(&page, b"<!doctype html><p>nope</p>").unwrap();
        assert_eq!(validate_file(&page).await, Err(Rejection::Html));

        assert_eq!(
            validate_file(&dir.path().join("missing.mp4")).await,
            Err(Rejection::Missing)
        );
    }
}
