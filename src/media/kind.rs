use crate::media::item::MediaType;

const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3"];
const ROM_EXTENSIONS: &[&str] = &["gb", "gbc", "nes", "smc", "smd"];
const ROM_GB_EXTENSIONS: &[&str] = &["gb", "gbc"];
const ROM_NES_EXTENSIONS: &[&str] = &["nes"];
const VIDEO_EXTENSIONS: &[&str] = &["avi", "mkv", "mp4"];

/// Classify a file name by the text after its last `.`.
///
/// Matching is case-sensitive (`song.MP3` is not audio). Roms must resolve to a
/// sub-type: `smc` and `smd` are recognised as roms but have no player and are
/// skipped like any unknown extension.
pub fn classify(file_name: &str) -> Option<MediaType> {
    let (_, ext) = file_name.rsplit_once('.')?;

    if AUDIO_EXTENSIONS.contains(&ext) {
        return Some(MediaType::Audio);
    }

    if ROM_EXTENSIONS.contains(&ext) {
        if ROM_GB_EXTENSIONS.contains(&ext) {
            return Some(MediaType::RomGb);
        }
        if ROM_NES_EXTENSIONS.contains(&ext) {
            return Some(MediaType::RomNes);
        }
        return None;
    }

    if VIDEO_EXTENSIONS.contains(&ext) {
        return Some(MediaType::Video);
    }

    None
}
