// Quality labels and their yt-dlp format selectors
//
// Callers pass a free-form label ("best", "480p", ...). Unknown labels fall
// back to a 720p ceiling so a typo never produces a huge download.

use std::fmt;

/// Ceilings offered as `<height>p` labels
pub const SUPPORTED_CEILINGS: [u32; 4] = [720, 480, 360, 240];

pub const DEFAULT_CEILING: u32 = 720;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Worst,
    #[default]
    Best,
    /// Best rendition no taller than this many pixels
    Ceiling(u32),
    Audio,
}

impl Quality {
    pub fn parse(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        match label.as_str() {
            "worst" => Self::Worst,
            "best" => Self::Best,
            "audio" => Self::Audio,
            other => other
                .strip_suffix('p')
                .and_then(|h| h.parse::<u32>().ok())
                .filter(|h| SUPPORTED_CEILINGS.contains(h))
                .map(Self::Ceiling)
                .unwrap_or(Self::Ceiling(DEFAULT_CEILING)),
        }
    }

    /// Get format spec for yt-dlp
    pub fn format_selector(&self) -> String {
        match self {
            Self::Worst => "worst".to_string(),
            Self::Best => "best".to_string(),
            Self::Ceiling(h) => format!("best[height<={}]/best", h),
            Self::Audio => "bestaudio".to_string(),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worst => write!(f, "worst"),
            Self::Best => write!(f, "best"),
            Self::Ceiling(h) => write!(f, "{}p", h),
            Self::Audio => write!(f, "audio"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels() {
        assert_eq!(Quality::parse("worst").format_selector(), "worst");
        assert_eq!(Quality::parse("best").format_selector(), "best");
        assert_eq!(Quality::parse("audio").format_selector(), "bestaudio");
        assert_eq!(Quality::parse("480p").format_selector(), "best[height<=480]/best");
        assert_eq!(Quality::parse(" 240P ").format_selector(), "best[height<=240]/best");
    }

    #[test]
    fn test_unknown_label_defaults_to_720() {
        assert_eq!(Quality::parse("4k"), Quality::Ceiling(720));
        assert_eq!(Quality::parse("999p"), Quality::Ceiling(720));
        assert_eq!(Quality::parse("1080p"), Quality::Ceiling(720));
        assert_eq!(Quality::parse(""), Quality::Ceiling(720));
        assert_eq!(Quality::parse("ultra").format_selector(), "best[height<=720]/best");
    }

    #[test]
    fn test_display_round_trips_label() {
        assert_eq!(Quality::parse("360p").to_string(), "360p");
        assert_eq!(Quality::default().to_string(), "best");
    }
}
