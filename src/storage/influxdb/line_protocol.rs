use crate::datamodel::{FieldValue, Point};
use influxdb_line_protocol::LineProtocolBuilder;

/// Encodes points as InfluxDB line protocol, one line per point, in order.
///
/// Points without fields are skipped; [`Point::new`] never builds them.
pub fn encode_points(points: &[Point]) -> Vec<u8> {
    let mut builder = LineProtocolBuilder::new();

    for point in points {
        let mut fields = point.fields.iter();
        let Some((first_key, first_value)) = fields.next() else {
            continue;
        };

        let line = builder.measurement(&point.measurement);
        let line = point
            .tags
            .iter()
            .fold(line, |line, (key, value)| line.tag(key, value));

        let line = match first_value {
            FieldValue::Float(value) => line.field(first_key, *value),
            FieldValue::String(value) => line.field(first_key, value.as_str()),
        };
        let line = fields.fold(line, |line, (key, value)| match value {
            FieldValue::Float(value) => line.field(key, *value),
            FieldValue::String(value) => line.field(key, value.as_str()),
        });

        builder = line.timestamp(point.timestamp_ms).close_line();
    }

    builder.build()
}
