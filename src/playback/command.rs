use serde::Deserialize;

use crate::media::item::MediaType;

/// Placeholder replaced by the media file path.
pub const PATH_PLACEHOLDER: &str = "%s";

/// Player command templates, one per playable type.
///
/// Audio and video share a player by default. Types without a dedicated
/// entry use `fallback`, or cannot be played when it is unset.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlayerCommands {
    pub audio: String,
    pub video: String,
    pub rom_nes: String,
    pub fallback: Option<String>,
}

impl Default for PlayerCommands {
    fn default() -> Self {
        Self {
            audio: "/usr/bin/omxplayer -b %s".to_string(),
            video: "/usr/bin/omxplayer -b %s".to_string(),
            rom_nes: "/usr/bin/fceu %s".to_string(),
            fallback: None,
        }
    }
}

impl PlayerCommands {
    pub fn template_for(&self, media_type: MediaType) -> Option<&str> {
        match media_type {
            MediaType::Audio => Some(&self.audio),
            MediaType::Video => Some(&self.video),
            MediaType::RomNes => Some(&self.rom_nes),
            MediaType::Rom | MediaType::RomGb => self.fallback.as_deref(),
        }
    }
}

/// Split a command template into argv, substituting `filepath` for `%s`.
///
/// Arguments are separated by spaces; a double-quoted span keeps its spaces
/// and loses the quotes.
pub fn expand(template: &str, filepath: &str) -> Vec<String> {
    let mut argv = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in template.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            ' ' if !quoted => {
                if pending {
                    argv.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            _ => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        argv.push(current);
    }

    argv.into_iter()
        .map(|arg| arg.replace(PATH_PLACEHOLDER, filepath))
        .collect()
}
