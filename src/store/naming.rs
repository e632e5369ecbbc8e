use crate::archive::Descriptor;

pub const ARCHIVE_EXTENSION: &str = "ipa";
pub const MANIFEST_EXTENSION: &str = "plist";

/// Identifier component used when the descriptor carries none.
const FALLBACK_IDENTIFIER: &str = "app";

/// File names of one artifact pair, sharing `{identifier}-{version}` as base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub base: String,
    pub archive: String,
    pub manifest: String,
}

impl ArtifactNames {
    pub fn for_descriptor(descriptor: &Descriptor) -> Self {
        let identifier = descriptor.identifier().unwrap_or(FALLBACK_IDENTIFIER);
        Self::from_base(format!(
            "{}-{}",
            sanitize_component(identifier),
            sanitize_component(descriptor.version())
        ))
    }

    pub fn from_base(base: String) -> Self {
        Self {
            archive: format!("{}.{}", base, ARCHIVE_EXTENSION),
            manifest: format!("{}.{}", base, MANIFEST_EXTENSION),
            base,
        }
    }
}

/// Restrict a descriptor value to characters safe in a flat file name and URL path.
pub fn sanitize_component(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with('.') {
        out.insert(0, '_');
    }
    out
}

/// Whether `name` addresses a single entry directly inside the store root.
pub fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
}

/// Case-insensitive check for the `.ipa` upload extension.
pub fn has_archive_extension(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
