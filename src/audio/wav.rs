// src/audio/wav.rs

//! Canonical WAV decoding.
//!
//! The header is read as a fixed 44-byte block at fixed offsets. No chunks
//! are walked and nothing is validated beyond the sizes: the file is assumed
//! to be uncompressed PCM with `data` immediately after `fmt `.

use crate::error::PlatformError;
use log::debug;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

pub const WAV_HEADER_LEN: usize = 44;

const CHANNELS_AT: usize = 22;
const SAMPLE_RATE_AT: usize = 24;
const FORMAT_AT: usize = 34;
const DATA_LEN_AT: usize = 40;

/// Format fields taken from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub freq: u32,
    pub channels: u16,
    /// The 16-bit field at offset 34.
    pub format: u16,
}

/// A decoded sound. Dropping it releases the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wav {
    pub spec: WavSpec,
    pub data: Vec<u8>,
}

impl Wav {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn u16_at(header: &[u8; WAV_HEADER_LEN], at: usize) -> u16 {
    u16::from_le_bytes([header[at], header[at + 1]])
}

fn u32_at(header: &[u8; WAV_HEADER_LEN], at: usize) -> u32 {
    u32::from_le_bytes([header[at], header[at + 1], header[at + 2], header[at + 3]])
}

/// Decode a WAV stream.
///
/// Fails if fewer than 44 header bytes or fewer payload bytes than the header
/// declares are available. On failure nothing decoded is kept.
pub fn read_wav<R: Read>(mut reader: R) -> Result<Wav, PlatformError> {
    let mut header = [0u8; WAV_HEADER_LEN];
    reader.read_exact(&mut header).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PlatformError::WavHeaderTruncated,
        _ => PlatformError::Io(e),
    })?;

    let spec = WavSpec {
        freq: u32_at(&header, SAMPLE_RATE_AT),
        channels: u16_at(&header, CHANNELS_AT),
        format: u16_at(&header, FORMAT_AT),
    };
    let data_len = u32_at(&header, DATA_LEN_AT);

    let mut data = Vec::new();
    data.try_reserve_exact(data_len as usize)
        .map_err(|_| PlatformError::WavAllocation(data_len))?;
    reader.by_ref().take(u64::from(data_len)).read_to_end(&mut data)?;
    if data.len() < data_len as usize {
        return Err(PlatformError::WavDataTruncated {
            expected: data_len,
            actual: data.len(),
        });
    }

    debug!("WAV: {:?}, {} bytes", spec, data.len());
    Ok(Wav { spec, data })
}

/// Decode the WAV file at `path`.
pub fn load_wav(path: impl AsRef<Path>) -> Result<Wav, PlatformError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| PlatformError::WavOpen {
        path: path.to_path_buf(),
        source,
    })?;
    read_wav(BufReader::new(file))
}

#[cfg(test)]
pub(crate) fn canonical_header(freq: u32, channels: u16, bits: u16, data_len: u32) -> Vec<u8> {
    let block_align = channels * (bits / 8);
    let mut h = Vec::with_capacity(WAV_HEADER_LEN);
    h.extend_from_slice(b"RIFF");
    h.extend_from_slice(&(36 + data_len).to_le_bytes());
    h.extend_from_slice(b"WAVEfmt ");
    h.extend_from_slice(&16u32.to_le_bytes());
    h.extend_from_slice(&1u16.to_le_bytes());
    h.extend_from_slice(&channels.to_le_bytes());
    h.extend_from_slice(&freq.to_le_bytes());
    h.extend_from_slice(&(freq * u32::from(block_align)).to_le_bytes());
    h.extend_from_slice(&block_align.to_le_bytes());
    h.extend_from_slice(&bits.to_le_bytes());
    h.extend_from_slice(b"data");
    h.extend_from_slice(&data_len.to_le_bytes());
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_log::test;

    #[test]
    fn it_should_read_fields_at_fixed_offsets() {
        let mut bytes = canonical_header(22050, 1, 8, 4);
        bytes.extend_from_slice(&[1, 2, 3, 4]);

        let wav = read_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(
            wav.spec,
            WavSpec {
                freq: 22050,
                channels: 1,
                format: 8
            }
        );
        assert_eq!(wav.data, vec![1, 2, 3, 4]);
        assert_eq!(wav.len(), 4);
    }

    #[test]
    fn it_should_ignore_bytes_past_the_declared_payload() {
        let mut bytes = canonical_header(11025, 2, 8, 2);
        bytes.extend_from_slice(&[7, 8, 9, 10]);
        let wav = read_wav(Cursor::new(bytes)).unwrap();
        assert_eq!(wav.data, vec![7, 8]);
        assert_eq!(wav.spec.channels, 2);
    }

    #[test]
    fn it_should_reject_a_short_header() {
        let bytes = canonical_header(22050, 1, 8, 0);
        let err = read_wav(Cursor::new(&bytes[..43])).unwrap_err();
        assert!(matches!(err, PlatformError::WavHeaderTruncated));

        let err = read_wav(Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, PlatformError::WavHeaderTruncated));
    }

    #[test]
    fn it_should_reject_a_short_payload() {
        let mut bytes = canonical_header(22050, 1, 8, 1000);
        bytes.extend(std::iter::repeat(128).take(500));
        match read_wav(Cursor::new(bytes)) {
            Err(PlatformError::WavDataTruncated { expected, actual }) => {
                assert_eq!(expected, 1000);
                assert_eq!(actual, 500);
            }
            other => panic!("expected truncated payload, got {:?}", other),
        }
    }

    #[test]
    fn it_should_accept_an_empty_payload() {
        let wav = read_wav(Cursor::new(canonical_header(8000, 1, 8, 0))).unwrap();
        assert!(wav.is_empty());
    }

    #[test]
    fn it_should_report_the_path_of_a_missing_file() {
        let err = load_wav("/definitely/not/here.wav").unwrap_err();
        match err {
            PlatformError::WavOpen { path, .. } => assert!(path.ends_with("here.wav")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
