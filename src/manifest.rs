// Manifest synthesis: maps a descriptor onto the OTA distribution manifest.

use serde::{Deserialize, Serialize};

use crate::archive::Descriptor;

/// Identifier written when the descriptor carries none.
pub const PLACEHOLDER_BUNDLE_ID: &str = "com.example.unknown";

const ASSET_KIND: &str = "software-package";
const METADATA_KIND: &str = "software";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub assets: Vec<Asset>,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    pub bundle_identifier: String,
    pub bundle_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Manifest {
    /// Single-item manifest pointing installers at `archive_url`.
    pub fn for_descriptor(descriptor: &Descriptor, archive_url: &str) -> Self {
        let metadata = Metadata {
            bundle_identifier: descriptor
                .identifier()
                .unwrap_or(PLACEHOLDER_BUNDLE_ID)
                .to_string(),
            bundle_version: descriptor.version().to_string(),
            kind: METADATA_KIND.to_string(),
            title: descriptor.title().map(str::to_string),
        };
        Self {
            items: vec![ManifestItem {
                assets: vec![Asset {
                    kind: ASSET_KIND.to_string(),
                    url: archive_url.to_string(),
                }],
                metadata,
            }],
        }
    }

    /// XML property-list encoding consumed by installation clients.
    pub fn to_xml(&self) -> Result<Vec<u8>, plist::Error> {
        let mut buf = Vec::new();
        plist::to_writer_xml(&mut buf, self)?;
        Ok(buf)
    }
}

/// Build and serialize the manifest for `descriptor`. No I/O.
pub fn synthesize(descriptor: &Descriptor, archive_url: &str) -> Result<Vec<u8>, plist::Error> {
    Manifest::for_descriptor(descriptor, archive_url).to_xml()
}
