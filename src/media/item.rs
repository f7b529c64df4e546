use std::fmt;
use std::path::Path;

/// Type codes are grouped into families of a hundred: `201` (rom/gb) belongs
/// to the `200` (rom) family.
pub const TYPE_BASE: u32 = 100;

/// Media type of an indexed file. The numeric codes are part of the wire
/// protocol and must not change.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MediaType {
    Audio,
    Rom,
    RomGb,
    RomNes,
    Video,
}

impl MediaType {
    /// Every known type, in the order STAT reports them.
    pub const ALL: [MediaType; 5] = [
        MediaType::Audio,
        MediaType::Rom,
        MediaType::RomGb,
        MediaType::RomNes,
        MediaType::Video,
    ];

    pub fn code(self) -> u32 {
        match self {
            MediaType::Audio => 100,
            MediaType::Rom => 200,
            MediaType::RomGb => 201,
            MediaType::RomNes => 202,
            MediaType::Video => 300,
        }
    }

    /// The type code rounded down to its hundred.
    pub fn family(self) -> u32 {
        let code = self.code();
        code - code % TYPE_BASE
    }

    pub fn name(self) -> &'static str {
        match self {
            MediaType::Audio => "audio",
            MediaType::Rom => "rom",
            MediaType::RomGb => "rom/gb",
            MediaType::RomNes => "rom/nes",
            MediaType::Video => "video",
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        MediaType::ALL.into_iter().find(|t| t.code() == code)
    }

    /// True when `filter` names this exact type or its family.
    pub fn matches(self, filter: u32) -> bool {
        filter == self.code() || filter == self.family()
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// One indexed file.
///
/// The label is not stored separately: it is the trailing path segment of
/// `filepath`, kept as an offset into the same string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: u32,
    pub media_type: MediaType,
    filepath: String,
    label_start: usize,
}

impl MediaItem {
    pub fn new(id: u32, filepath: String, media_type: MediaType) -> Self {
        let label_start = filepath.rfind('/').map_or(0, |sep| sep + 1);
        Self {
            id,
            media_type,
            filepath,
            label_start,
        }
    }

    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.filepath)
    }

    /// Display name: the file name part of `filepath`.
    pub fn label(&self) -> &str {
        &self.filepath[self.label_start..]
    }
}
