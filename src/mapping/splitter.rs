use super::{index::ClassificationIndex, measurement::MeasurementSpec};
use crate::datamodel::{Labels, METRIC_NAME_LABEL};
use std::collections::BTreeMap;

/// Labels of one sample, partitioned for a measurement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitLabels {
    pub tags: BTreeMap<String, String>,
    /// Label values stored as string fields.
    pub fields: BTreeMap<String, String>,
}

/// Partitions sample labels into tags and fields according to the
/// measurement definitions of a [`ClassificationIndex`].
#[derive(Debug, Clone, Copy)]
pub struct TagFieldSplitter<'a> {
    index: &'a ClassificationIndex,
}

impl<'a> TagFieldSplitter<'a> {
    pub fn new(index: &'a ClassificationIndex) -> Self {
        Self { index }
    }

    /// Splits `labels` for the measurement named `measurement`.
    ///
    /// An unknown measurement yields no tags and no fields, which the write
    /// path treats as unroutable.
    pub fn split(&self, labels: &Labels, measurement: &str) -> SplitLabels {
        match self.index.measurement(measurement) {
            Some(spec) => split_labels(spec, labels),
            None => SplitLabels::default(),
        }
    }
}

/// Tags first, then dropped labels; everything else becomes a string field
/// unless the measurement ignores other labels. The metric name label and
/// labels with an empty value never make it through.
pub fn split_labels(spec: &MeasurementSpec, labels: &Labels) -> SplitLabels {
    let mut split = SplitLabels::default();
    for (name, value) in labels {
        if name == METRIC_NAME_LABEL || value.is_empty() {
            continue;
        }
        if spec.tags.contains(name) {
            split.tags.insert(name.clone(), value.clone());
        } else if spec.drop_labels.contains(name) || spec.ignore_other_labels {
            continue;
        } else {
            split.fields.insert(name.clone(), value.clone());
        }
    }
    split
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn http_spec() -> MeasurementSpec {
        MeasurementSpec {
            name: "http".to_string(),
            tags: ["host".to_string(), "path".to_string()].into(),
            fields: ["latency".to_string()].into(),
            drop_labels: ["pod".to_string()].into(),
            database: "metrics".to_string(),
            ignore_other_labels: false,
        }
    }

    #[test]
    fn test_split() {
        let index = ClassificationIndex::build("prometheus", vec![http_spec()]);
        let splitter = TagFieldSplitter::new(&index);

        let split = splitter.split(
            &labels(&[
                ("__name__", "http_latency"),
                ("host", "a"),
                ("region", "us"),
                ("pod", "web-1"),
                ("path", ""),
            ]),
            "http",
        );

        assert_eq!(split.tags, labels(&[("host", "a")]));
        assert_eq!(split.fields, labels(&[("region", "us")]));
    }

    #[test]
    fn test_split_unknown_measurement() {
        let index = ClassificationIndex::build("prometheus", vec![http_spec()]);
        let splitter = TagFieldSplitter::new(&index);

        let split = splitter.split(&labels(&[("host", "a")]), "cpu");
        assert!(split.tags.is_empty());
        assert!(split.fields.is_empty());
    }

    #[test]
    fn test_split_ignore_other_labels() {
        let spec = MeasurementSpec {
            ignore_other_labels: true,
            ..http_spec()
        };

        let split = split_labels(
            &spec,
            &labels(&[("host", "a"), ("region", "us"), ("pod", "web-1")]),
        );
        assert_eq!(split.tags, labels(&[("host", "a")]));
        assert!(split.fields.is_empty());
    }

    #[test]
    fn test_split_without_tags() {
        let split = split_labels(&http_spec(), &labels(&[("region", "us")]));
        assert!(split.tags.is_empty());
        assert_eq!(split.fields, labels(&[("region", "us")]));
    }
}
