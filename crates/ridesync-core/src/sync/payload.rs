//! Compressed stream payload attached to new activities

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::model::ActivityStreams;

const PAYLOAD_ENTRY: &str = "streams.json";

/// Serialize streams to JSON and deflate them into an in-memory zip
pub fn compress_streams(streams: &ActivityStreams) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(streams)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(PAYLOAD_ENTRY, options)?;
    writer.write_all(&json)?;

    Ok(writer.finish()?.into_inner())
}

/// Inverse of [`compress_streams`]
pub fn decompress_streams(payload: &[u8]) -> Result<ActivityStreams> {
    let mut archive = ZipArchive::new(Cursor::new(payload))?;
    let mut entry = archive
        .by_name(PAYLOAD_ENTRY)
        .map_err(|_| Error::Other(format!("Stream payload has no {} entry", PAYLOAD_ENTRY)))?;

    let mut json = Vec::new();
    entry.read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_restores_streams() {
        let streams = ActivityStreams {
            time: (0..600).map(f64::from).collect(),
            distance: (0..600).map(|i| f64::from(i) * 5.0).collect(),
            latlng: (0..600).map(|i| [45.0 + f64::from(i) * 1e-4, 6.0]).collect(),
            ..Default::default()
        };

        let payload = compress_streams(&streams).unwrap();
        assert!(payload.len() < serde_json::to_vec(&streams).unwrap().len());
        assert_eq!(decompress_streams(&payload).unwrap(), streams);
    }

    #[test]
    fn test_decompress_garbage() {
        assert!(decompress_streams(b"not a zip").is_err());
    }
}
