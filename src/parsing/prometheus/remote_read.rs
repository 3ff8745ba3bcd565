use super::common::{compress_snappy, decompress_snappy};
use super::models::{ReadRequest, ReadResponse};
use anyhow::{Context, Result};
use prost::Message;
use tracing::debug;

pub fn parse_remote_read_request(input: &[u8]) -> Result<ReadRequest> {
    let decompressed =
        decompress_snappy(input).context("Failed to decompress the remote read body")?;
    let request = ReadRequest::decode(decompressed.as_slice())
        .context("Failed to decode the remote read protobuf")?;
    debug!("Parsed ReadRequest with {} queries", request.queries.len());

    for (i, query) in request.queries.iter().enumerate() {
        debug!(
            "Query {}: time range {}ms - {}ms, {} matchers",
            i,
            query.start_timestamp_ms,
            query.end_timestamp_ms,
            query.matchers.len()
        );
    }

    Ok(request)
}

pub fn serialize_read_response(response: &ReadResponse) -> Result<Vec<u8>> {
    let encoded = response.encode_to_vec();
    let compressed = compress_snappy(&encoded)?;
    debug!(
        "Encoded ReadResponse: {} bytes, {} compressed",
        encoded.len(),
        compressed.len()
    );
    Ok(compressed)
}
