//! Response encoders.
//!
//! Every structured response is rendered into a [`BoundedBuffer`] and only
//! sent once complete. Crossing the ceiling aborts the whole response with
//! [`EncodeError::TooLong`]; nothing partial ever reaches the client.

use quick_xml::escape::escape;

use crate::media::catalog::{Catalog, MAX_ITEMS};
use crate::media::item::{MediaItem, MediaType};
use crate::media::tags::{self, ItemDetails, TagError};
use crate::protocol::{status_line, Status};

pub const STATUS_CEILING: usize = 512;
pub const LISTING_CEILING: usize = 10_000;
pub const INFO_CEILING: usize = 1_024;

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("response needs more than {ceiling} bytes")]
    TooLong { ceiling: usize },
    #[error("list parameters out of range: type={media_type} offset={offset} length={length}")]
    BadParams {
        media_type: i64,
        offset: i64,
        length: i64,
    },
    #[error("no info available for {0}")]
    NoInfo(MediaType),
    #[error(transparent)]
    Tags(#[from] TagError),
}

impl EncodeError {
    pub fn status(&self) -> Status {
        match self {
            EncodeError::TooLong { .. } => Status::TooLong,
            EncodeError::BadParams { .. } => Status::BadParams,
            EncodeError::NoInfo(_) => Status::NotFound,
            EncodeError::Tags(TagError::Unavailable) => Status::NotImplemented,
            EncodeError::Tags(TagError::Unreadable { .. }) => Status::NotFound,
        }
    }
}

/// Growable output with a hard ceiling and one overflow check.
#[derive(Debug)]
pub struct BoundedBuffer {
    buf: String,
    ceiling: usize,
}

impl BoundedBuffer {
    pub fn new(ceiling: usize) -> Self {
        Self {
            buf: String::new(),
            ceiling,
        }
    }

    pub fn push_str(&mut self, s: &str) -> Result<(), EncodeError> {
        if self.buf.len() + s.len() > self.ceiling {
            return Err(EncodeError::TooLong {
                ceiling: self.ceiling,
            });
        }
        self.buf.push_str(s);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

/// A `200 OK` status line and the blank line that separates it from the
/// payload.
fn ok_preamble(ceiling: usize) -> Result<BoundedBuffer, EncodeError> {
    let mut out = BoundedBuffer::new(ceiling);
    out.push_str(&status_line(Status::Ok))?;
    out.push_str("\n")?;
    Ok(out)
}

/// STAT payload: catalog size and version plus the known type table.
pub fn status(catalog: &Catalog) -> Result<Vec<u8>, EncodeError> {
    let mut out = ok_preamble(STATUS_CEILING)?;
    out.push_str("<mediacenter><status>")?;
    out.push_str(&format!(
        "<items version=\"{}\" size=\"{}\"/>",
        catalog.version(),
        catalog.size()
    ))?;
    out.push_str("<types>")?;
    for media_type in MediaType::ALL {
        out.push_str(&format!(
            "<type id=\"{}\" name=\"{}\"/>",
            media_type.code(),
            media_type.name()
        ))?;
    }
    out.push_str("</types></status></mediacenter>")?;
    Ok(out.into_bytes())
}

/// LIST payload.
///
/// Type `0` lists everything and treats `offset` as a catalog index. Any
/// other type filters on the exact type or its family and skips the first
/// `offset` matches.
pub fn listing(
    catalog: &Catalog,
    media_type: i64,
    offset: i64,
    length: i64,
) -> Result<Vec<u8>, EncodeError> {
    let bad_params = || EncodeError::BadParams {
        media_type,
        offset,
        length,
    };
    let filter = u32::try_from(media_type).map_err(|_| bad_params())?;
    let start = usize::try_from(offset).map_err(|_| bad_params())?;
    let count = usize::try_from(length).map_err(|_| bad_params())?;
    if start >= catalog.size() || count < 1 || count > MAX_ITEMS {
        return Err(bad_params());
    }

    let mut out = ok_preamble(LISTING_CEILING)?;
    out.push_str(&format!(
        "<mediacenter><items version=\"{}\" type=\"{}\" offset=\"{}\" length=\"{}\">",
        catalog.version(),
        filter,
        start,
        count
    ))?;

    let selected: Box<dyn Iterator<Item = &MediaItem> + '_> = if filter == 0 {
        Box::new(catalog.items()[start..].iter().take(count))
    } else {
        Box::new(
            catalog
                .items()
                .iter()
                .filter(move |item| item.media_type.matches(filter))
                .skip(start)
                .take(count),
        )
    };

    for item in selected {
        out.push_str(&format!(
            "<item id=\"{}\" type=\"{}\" label=\"{}\"/>",
            item.id,
            item.media_type.code(),
            escape(item.label())
        ))?;
    }

    out.push_str("</items></mediacenter>")?;
    Ok(out.into_bytes())
}

/// INFO payload for one item, read through the tag collaborator.
pub fn info(item: &MediaItem) -> Result<Vec<u8>, EncodeError> {
    if !tags::available() {
        return Err(TagError::Unavailable.into());
    }
    if !matches!(item.media_type, MediaType::Audio | MediaType::Video) {
        return Err(EncodeError::NoInfo(item.media_type));
    }
    let details = tags::read_details(item.path())?;
    render_info(item, &details)
}

/// Render INFO for already-collected details.
pub fn render_info(item: &MediaItem, details: &ItemDetails) -> Result<Vec<u8>, EncodeError> {
    let mut out = ok_preamble(INFO_CEILING)?;
    out.push_str(&format!(
        "<mediacenter><item id=\"{}\" type=\"{}\" label=\"{}\">",
        item.id,
        item.media_type.code(),
        escape(item.label())
    ))?;

    if let Some(tag) = &details.tag {
        out.push_str(&format!(
            "<tag><title>{}</title><artist>{}</artist><album>{}</album>\
             <year>{}</year><comment>{}</comment><track>{}</track>\
             <genre>{}</genre></tag>",
            escape(&tag.title),
            escape(&tag.artist),
            escape(&tag.album),
            tag.year,
            escape(&tag.comment),
            tag.track,
            escape(&tag.genre)
        ))?;
    }

    if let Some(props) = &details.properties {
        out.push_str(&format!(
            "<properties><bitrate>{}</bitrate><samplerate>{}</samplerate>\
             <channels>{}</channels><length>{}</length></properties>",
            props.bitrate, props.sample_rate, props.channels, props.length_secs
        ))?;
    }

    out.push_str("</item></mediacenter>")?;
    Ok(out.into_bytes())
}
