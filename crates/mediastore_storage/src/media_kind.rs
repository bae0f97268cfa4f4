//! Media kind enumeration and the system-wide extension allow-list.

/// Kind of media a slot accepts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    derive_more::Display,
)]
pub enum MediaKind {
    /// Image content (PNG, JPEG, WebP, etc.)
    #[display("image")]
    Image,
    /// Video content (MP4, WebM, AVI, etc.)
    #[display("video")]
    Video,
    /// Audio content (MP3, WAV, OGG, etc.)
    #[display("audio")]
    Audio,
    /// Documents (PDF, office formats, plain text)
    #[display("document")]
    Document,
}

impl MediaKind {
    /// Convert to the string used in slot descriptors.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    /// Extensions the whole system accepts for this kind.
    ///
    /// A slot may narrow this set but never widen it.
    pub fn system_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Image => &[
                "bmp", "gif", "heic", "jpeg", "jpg", "png", "svg", "tif", "tiff", "webp",
            ],
            MediaKind::Video => &[
                "3gp", "avi", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "webm", "wmv",
            ],
            MediaKind::Audio => &["aac", "flac", "m4a", "mp3", "oga", "ogg", "opus", "wav", "wma"],
            MediaKind::Document => &[
                "csv", "doc", "docx", "htm", "html", "json", "odp", "ods", "odt", "pdf", "ppt",
                "pptx", "rtf", "txt", "xls", "xlsx", "xml",
            ],
        }
    }

    /// Whether the system-wide allow-list for this kind contains `extension`.
    pub fn allows_extension(&self, extension: &str) -> bool {
        let extension = extension.trim().to_ascii_lowercase();
        self.system_extensions().contains(&extension.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            "document" => Ok(MediaKind::Document),
            _ => Err(format!("Unknown media type: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_descriptor_spelling() {
        assert_eq!("Image".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert_eq!(" document ".parse::<MediaKind>().unwrap(), MediaKind::Document);
        assert!("hologram".parse::<MediaKind>().is_err());
    }

    #[test]
    fn every_kind_round_trips_through_display() {
        for kind in MediaKind::iter() {
            assert_eq!(kind.to_string().parse::<MediaKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }

    #[test]
    fn extension_lookup_ignores_case() {
        assert!(MediaKind::Image.allows_extension("JPG"));
        assert!(!MediaKind::Image.allows_extension("mp4"));
        assert!(MediaKind::Video.allows_extension("mp4"));
    }
}
