//! Tag and audio-property lookup for INFO requests.
//!
//! Backed by `lofty` when the `tags` feature is enabled. Without it every
//! lookup reports [`TagError::Unavailable`], which INFO answers with 504.

use std::path::{Path, PathBuf};

/// Artistic tags. Missing fields are empty strings or zero, as clients expect
/// every element to be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub year: u32,
    pub comment: String,
    pub track: u32,
    pub genre: String,
}

/// Technical stream properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioProperties {
    /// kbit/s
    pub bitrate: u32,
    /// Hz
    pub sample_rate: u32,
    pub channels: u32,
    pub length_secs: u64,
}

/// Everything INFO can report about one file. Either part may be missing when
/// the container carries no tag or exposes no properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDetails {
    pub tag: Option<TagInfo>,
    pub properties: Option<AudioProperties>,
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("tag support not compiled in")]
    Unavailable,
    #[error("cannot read tags from {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
}

/// True when this build can answer INFO requests.
pub const fn available() -> bool {
    cfg!(feature = "tags")
}

#[cfg(feature = "tags")]
pub fn read_details(path: &Path) -> Result<ItemDetails, TagError> {
    use lofty::{config::ParseOptions, prelude::*, probe::Probe};

    tracing::debug!(path = %path.display(), "Reading tags");

    let tagged_file = Probe::open(path)
        .and_then(|probe| probe.options(ParseOptions::new()).read())
        .map_err(|e| TagError::Unreadable {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .map(|tag| TagInfo {
            title: tag.title().map(|s| s.to_string()).unwrap_or_default(),
            artist: tag.artist().map(|s| s.to_string()).unwrap_or_default(),
            album: tag.album().map(|s| s.to_string()).unwrap_or_default(),
            year: tag.year().unwrap_or_default(),
            comment: tag.comment().map(|s| s.to_string()).unwrap_or_default(),
            track: tag.track().unwrap_or_default(),
            genre: tag.genre().map(|s| s.to_string()).unwrap_or_default(),
        });

    let properties = tagged_file.properties();
    let properties = AudioProperties {
        bitrate: properties.audio_bitrate().unwrap_or_default(),
        sample_rate: properties.sample_rate().unwrap_or_default(),
        channels: properties.channels().map(u32::from).unwrap_or_default(),
        length_secs: properties.duration().as_secs(),
    };

    Ok(ItemDetails {
        tag,
        properties: Some(properties),
    })
}

#[cfg(not(feature = "tags"))]
pub fn read_details(_path: &Path) -> Result<ItemDetails, TagError> {
    Err(TagError::Unavailable)
}
