use anyhow::Result;
use snap::raw::{Decoder, Encoder};

/// Decompresses a snappy block.
///
/// Prometheus remote write and read bodies use the snappy block format, not
/// the framed format, so `snap::raw` is used instead of `snap::read`.
pub fn decompress_snappy(input: &[u8]) -> Result<Vec<u8>> {
    Ok(Decoder::new().decompress_vec(input)?)
}

pub fn compress_snappy(input: &[u8]) -> Result<Vec<u8>> {
    Ok(Encoder::new().compress_vec(input)?)
}
