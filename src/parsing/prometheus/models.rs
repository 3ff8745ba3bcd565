// Hand-written prost messages for the Prometheus remote storage protocol.
// Only the messages the adapter reads or produces are declared; unknown
// fields (such as remote write metadata) are skipped by prost.
//
// See https://github.com/prometheus/prometheus/blob/main/prompb/remote.proto
// and https://github.com/prometheus/prometheus/blob/main/prompb/types.proto

#[derive(prost::Message, Clone, PartialEq)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct ReadRequest {
    #[prost(message, repeated, tag = "1")]
    pub queries: Vec<Query>,
    #[prost(enumeration = "read_request::ResponseType", repeated, tag = "2")]
    pub accepted_response_types: Vec<i32>,
}

pub mod read_request {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum ResponseType {
        /// A single snappy compressed `ReadResponse` with raw samples.
        Samples = 0,
        /// Streamed XOR chunks. Not produced by the adapter.
        StreamedXorChunks = 1,
    }
}

impl ReadRequest {
    /// An empty list means the client only understands `SAMPLES`.
    pub fn accepts_samples(&self) -> bool {
        self.accepted_response_types.is_empty()
            || self
                .accepted_response_types
                .contains(&(read_request::ResponseType::Samples as i32))
    }
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct ReadResponse {
    /// In same order as the request's queries.
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<QueryResult>,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct Query {
    #[prost(int64, tag = "1")]
    pub start_timestamp_ms: i64,
    #[prost(int64, tag = "2")]
    pub end_timestamp_ms: i64,
    #[prost(message, repeated, tag = "3")]
    pub matchers: Vec<LabelMatcher>,
    #[prost(message, optional, tag = "4")]
    pub hints: Option<ReadHints>,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct QueryResult {
    /// Samples within a time series must be ordered by time.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct LabelMatcher {
    #[prost(enumeration = "label_matcher::Type", tag = "1")]
    pub r#type: i32,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub value: String,
}

impl LabelMatcher {
    pub fn new(
        matcher_type: label_matcher::Type,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            r#type: matcher_type as i32,
            name: name.into(),
            value: value.into(),
        }
    }
}

pub mod label_matcher {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Eq = 0,
        Neq = 1,
        Re = 2,
        Nre = 3,
    }
}

#[derive(prost::Message, Clone, PartialEq)]
pub struct ReadHints {
    #[prost(int64, tag = "1")]
    pub step_ms: i64,
    #[prost(string, tag = "2")]
    pub func: String,
    #[prost(int64, tag = "3")]
    pub start_ms: i64,
    #[prost(int64, tag = "4")]
    pub end_ms: i64,
    #[prost(string, repeated, tag = "5")]
    pub grouping: Vec<String>,
    #[prost(bool, tag = "6")]
    pub by: bool,
    #[prost(int64, tag = "7")]
    pub range_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_samples() {
        let mut request = ReadRequest {
            queries: vec![],
            accepted_response_types: vec![],
        };
        assert!(request.accepts_samples());

        request.accepted_response_types =
            vec![read_request::ResponseType::StreamedXorChunks as i32];
        assert!(!request.accepts_samples());

        request
            .accepted_response_types
            .push(read_request::ResponseType::Samples as i32);
        assert!(request.accepts_samples());
    }

    #[test]
    fn test_label_matcher_type() {
        let matcher = LabelMatcher::new(label_matcher::Type::Nre, "job", "node.*");
        assert_eq!(matcher.r#type(), label_matcher::Type::Nre);
        assert_eq!(matcher.name, "job");

        // Unknown enumeration values decode to the default variant.
        let matcher = LabelMatcher {
            r#type: 42,
            name: "job".to_string(),
            value: "x".to_string(),
        };
        assert_eq!(matcher.r#type(), label_matcher::Type::Eq);
        assert!(label_matcher::Type::try_from(matcher.r#type).is_err());
    }
}
