//! Cache-value encoding for the distributed (L2) tier: bincode for a
//! compact binary shape, lz4 for general-purpose compression, with a
//! 4-byte little-endian prefix recording the uncompressed length — the
//! length-prefixed compact encoding spec §4.E calls for, with lz4 standing
//! in for "Snappy-class" compression since it's what this corpus actually
//! depends on (see the cache module in the reference pack).

use crate::error::AppError;
use crate::models::Listing;

pub fn encode(listings: &[Listing]) -> Result<Vec<u8>, AppError> {
    let raw = bincode::serialize(listings).map_err(|e| AppError::Durable(e.to_string()))?;
    let compressed = lz4_flex::compress(&raw);

    let mut out = Vec::with_capacity(4 + compressed.len());
    out.extend_from_slice(&(raw.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<Vec<Listing>, AppError> {
    if bytes.len() < 4 {
        return Err(AppError::Durable("cache value too short for length prefix".into()));
    }
    let (len_bytes, compressed) = bytes.split_at(4);
    let uncompressed_len = u32::from_le_bytes(len_bytes.try_into().unwrap()) as usize;

    let raw = lz4_flex::decompress(compressed, uncompressed_len)
        .map_err(|e| AppError::Durable(e.to_string()))?;

    bincode::deserialize(&raw).map_err(|e| AppError::Durable(e.to_string()))
}
