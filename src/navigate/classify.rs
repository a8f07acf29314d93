//! File categories by extension

use crate::navigate::results::EntryKind;

const IMAGE: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];
const VIDEO: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "mkv"];
const AUDIO: &[&str] = &["mp3", "wav", "ogg", "flac", "aac"];
const DOCUMENT: &[&str] = &[
    "doc", "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "txt", "rtf",
];
const ARCHIVE: &[&str] = &["zip", "rar", "tar", "gz", "7z"];
const CODE: &[&str] = &[
    "html", "css", "js", "php", "py", "java", "c", "cpp", "json", "xml",
];

/// Lowercase extension of a file name, empty when there is none.
///
/// A leading dot does not start an extension (`.bashrc` has none).
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Category of a file from its lowercase extension
pub fn classify(extension: &str) -> EntryKind {
    let tables = [
        (IMAGE, EntryKind::Image),
        (VIDEO, EntryKind::Video),
        (AUDIO, EntryKind::Audio),
        (DOCUMENT, EntryKind::Document),
        (ARCHIVE, EntryKind::Archive),
        (CODE, EntryKind::Code),
    ];

    tables
        .iter()
        .find(|(table, _)| table.contains(&extension))
        .map(|(_, kind)| *kind)
        .unwrap_or(EntryKind::Other)
}
