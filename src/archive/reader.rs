use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use plist::Value;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

use super::descriptor::Descriptor;
use crate::config::MAX_DESCRIPTOR_BYTES;

/// Top-level directory every .ipa keeps its bundle under.
const PAYLOAD_DIR: &str = "Payload";

/// Suffix marking an application bundle directory.
const APP_BUNDLE_SUFFIX: &str = ".app";

/// Descriptor file name inside the bundle.
const DESCRIPTOR_FILE: &str = "Info.plist";

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("no Payload/*.app/Info.plist entry in archive")]
    NotFound,

    #[error("Plist error: {0}")]
    Plist(#[from] plist::Error),

    #[error("descriptor root is not a dictionary")]
    NotADictionary,

    #[error("descriptor is empty")]
    Empty,

    #[error("descriptor exceeds {} bytes", MAX_DESCRIPTOR_BYTES)]
    TooLarge,
}

/// Whether `name` is `Payload/<bundle>.app/Info.plist` with exactly one bundle segment.
pub fn is_descriptor_entry(name: &str) -> bool {
    let mut parts = name.split('/');
    let (Some(root), Some(bundle), Some(file), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    root == PAYLOAD_DIR
        && bundle.len() > APP_BUNDLE_SUFFIX.len()
        && bundle.ends_with(APP_BUNDLE_SUFFIX)
        && file == DESCRIPTOR_FILE
}

/// Open the archive at `path` and parse its application descriptor.
///
/// Only the matching entry is decompressed. When several bundles match, the
/// first one in central-directory order wins.
pub fn read_descriptor(path: &Path) -> Result<Descriptor, DescriptorError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let mut found = None;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if is_descriptor_entry(entry.name()) {
            debug!("descriptor entry {} at index {}", entry.name(), i);
            found = Some(i);
            break;
        }
    }
    let index = found.ok_or(DescriptorError::NotFound)?;

    // Declared sizes come from the upload itself: cap both allocation and read.
    let mut entry = archive.by_index(index)?;
    let mut raw = Vec::with_capacity(entry.size().min(MAX_DESCRIPTOR_BYTES) as usize);
    entry
        .by_ref()
        .take(MAX_DESCRIPTOR_BYTES + 1)
        .read_to_end(&mut raw)?;
    if raw.len() as u64 > MAX_DESCRIPTOR_BYTES {
        return Err(DescriptorError::TooLarge);
    }

    parse_descriptor(&raw)
}

/// Parse descriptor bytes in either XML or binary plist encoding.
pub fn parse_descriptor(raw: &[u8]) -> Result<Descriptor, DescriptorError> {
    let value = Value::from_reader(Cursor::new(raw))?;
    let dict = value
        .into_dictionary()
        .ok_or(DescriptorError::NotADictionary)?;
    if dict.is_empty() {
        return Err(DescriptorError::Empty);
    }
    Ok(Descriptor::new(dict))
}
