use super::common::decompress_snappy;
use super::models::WriteRequest;
use crate::datamodel::{Labels, Sample};
use anyhow::{Context, Result};
use prost::Message;
use tracing::debug;

pub fn parse_remote_write_request(input: &[u8]) -> Result<WriteRequest> {
    let decompressed =
        decompress_snappy(input).context("Failed to decompress the remote write body")?;
    let request = WriteRequest::decode(decompressed.as_slice())
        .context("Failed to decode the remote write protobuf")?;
    debug!(
        "Parsed WriteRequest: {} bytes, {} time series",
        decompressed.len(),
        request.timeseries.len()
    );
    Ok(request)
}

/// Flattens the request into one [`Sample`] per received value.
///
/// Every sample carries the full label set of its series, `__name__`
/// included. Series without a name are kept; they fail classification later
/// and are counted as ignored.
pub fn into_samples(request: WriteRequest) -> Vec<Sample> {
    let capacity = request.timeseries.iter().map(|ts| ts.samples.len()).sum();
    let mut samples = Vec::with_capacity(capacity);

    for time_series in request.timeseries {
        let labels: Labels = time_series
            .labels
            .into_iter()
            .map(|label| (label.name, label.value))
            .collect();

        samples.extend(
            time_series
                .samples
                .into_iter()
                .map(|sample| Sample::new(labels.clone(), sample.timestamp, sample.value)),
        );
    }

    samples
}
