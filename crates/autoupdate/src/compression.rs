//! Payload compression formats and their streaming decoders.

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};

/// Compression applied to a published payload.
///
/// This describes the artefact itself, not the HTTP transfer encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// bzip2 stream, the published default.
    #[default]
    Bzip2,
    /// gzip member.
    Gzip,
    /// Payload is stored uncompressed.
    None,
}

impl Compression {
    /// Wrap `source` in the matching decoder.
    pub fn decoder<R: Read>(self, source: R) -> Decoder<R> {
        match self {
            Compression::Bzip2 => Decoder::Bzip2(BzDecoder::new(source)),
            Compression::Gzip => Decoder::Gzip(GzDecoder::new(source)),
            Compression::None => Decoder::Identity(source),
        }
    }
}

/// Streaming decoder over a compressed byte source.
pub enum Decoder<R: Read> {
    /// bzip2 decompression.
    Bzip2(BzDecoder<R>),
    /// gzip decompression.
    Gzip(GzDecoder<R>),
    /// Bytes passed through unchanged.
    Identity(R),
}

impl<R: Read> Decoder<R> {
    /// The wrapped source.
    pub fn get_ref(&self) -> &R {
        match self {
            Decoder::Bzip2(decoder) => decoder.get_ref(),
            Decoder::Gzip(decoder) => decoder.get_ref(),
            Decoder::Identity(source) => source,
        }
    }
}

impl<R: Read> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Decoder::Bzip2(decoder) => decoder.read(buf),
            Decoder::Gzip(decoder) => decoder.read(buf),
            Decoder::Identity(source) => source.read(buf),
        }
    }
}
