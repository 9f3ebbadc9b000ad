//! Icon reference strings: how a resource is named inside a header line.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::resource::Resource;
use crate::CRLF;

/// Scheme used for resources sent as raw blocks after the header.
pub const RESOURCE_SCHEME: &str = "x-growl-resource://";

/// MIME line width for wrapped base64.
const BASE64_LINE_LEN: usize = 76;

/// How icons are delivered to the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconMode {
    /// Raw bytes after the header block, referenced by identifier.
    Binary,
    /// `file:///` URL of the source path; needs the file on the daemon's disk.
    FileUrl,
    /// Inline base64 `data:` URL. Works everywhere.
    #[default]
    DataUrl,
    /// Source path taken as an http(s) URL.
    HttpUrl,
    /// Same as `DataUrl`.
    Auto,
}

impl IconMode {
    /// True when referenced resources must follow the header as raw blocks.
    pub fn sends_binary(self) -> bool {
        self == IconMode::Binary
    }
}

impl std::str::FromStr for IconMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binary" => Ok(IconMode::Binary),
            "file-url" | "fileurl" | "file" => Ok(IconMode::FileUrl),
            "data-url" | "dataurl" | "data" => Ok(IconMode::DataUrl),
            "http-url" | "httpurl" | "http" => Ok(IconMode::HttpUrl),
            "auto" => Ok(IconMode::Auto),
            other => Err(format!("unknown icon mode: {other}")),
        }
    }
}

/// Reference string for `resource` under `mode`. Pure; the caller decides
/// whether the resource also goes on the raw transmission list.
pub fn reference(resource: &Resource, mode: IconMode) -> String {
    match mode {
        IconMode::Binary => format!("{}{}", RESOURCE_SCHEME, resource.id()),
        IconMode::FileUrl => match resource.source_path() {
            Some(path) => {
                let path = path.to_string_lossy().replace('\\', "/");
                format!("file:///{}", path)
            }
            None => data_url(resource),
        },
        IconMode::HttpUrl => match resource.source_path() {
            Some(url) => url.to_string_lossy().into_owned(),
            None => data_url(resource),
        },
        IconMode::DataUrl | IconMode::Auto => data_url(resource),
    }
}

/// `data:<mime>;base64,<payload>` with the payload wrapped at 76 columns.
pub fn data_url(resource: &Resource) -> String {
    let encoded = STANDARD.encode(resource.data());
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 38 + 32);
    out.push_str("data:");
    out.push_str(resource.mime_type());
    out.push_str(";base64,");
    // base64 output is ASCII, so byte chunks are valid str slices
    for (i, line) in encoded.as_bytes().chunks(BASE64_LINE_LEN).enumerate() {
        if i > 0 {
            out.push_str(CRLF);
        }
        out.push_str(std::str::from_utf8(line).unwrap_or_default());
    }
    out
}
