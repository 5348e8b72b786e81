//! Resolves where the waybill document comes from and reads its bytes.

use flate2::read::GzDecoder;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::Result;

/// Example export compiled into the binary, used when no file is supplied.
pub static BUNDLED_EXAMPLE: &[u8] = include_bytes!("../data/example_waybills.json");

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Bundled,
}

impl InputSource {
    pub fn from_option(path: Option<PathBuf>) -> Self {
        path.map_or(InputSource::Bundled, InputSource::File)
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::File(path) => write!(f, "{}", path.display()),
            InputSource::Bundled => f.write_str("<bundled example>"),
        }
    }
}

/// Reads the document, decompressing gzip and stripping a UTF-8 BOM.
#[tracing::instrument(skip(source), fields(source = %source))]
pub fn read_document(source: &InputSource) -> Result<Vec<u8>> {
    let raw = match source {
        InputSource::File(path) => std::fs::read(path)?,
        InputSource::Bundled => {
            info!("No input file given, using bundled example");
            BUNDLED_EXAMPLE.to_vec()
        }
    };
    decode_document(raw)
}

/// Normalizes raw bytes into plain JSON bytes.
pub fn decode_document(raw: Vec<u8>) -> Result<Vec<u8>> {
    let mut bytes = if raw.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice()).read_to_end(&mut decoded)?;
        debug!(compressed = raw.len(), decompressed = decoded.len(), "Gzip document decoded");
        decoded
    } else {
        raw
    };

    if bytes.starts_with(&UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    Ok(bytes)
}
