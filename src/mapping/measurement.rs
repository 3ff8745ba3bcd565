use crate::config::MappingConfig;
use std::collections::BTreeSet;
use tracing::{error, warn};

/// One mapping rule: which labels of a measurement are tags, which metric
/// suffixes are its fields, and where its points are stored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeasurementSpec {
    pub name: String,
    pub tags: BTreeSet<String>,
    /// Empty means a single implicit `value` field whose metric name is `name`.
    pub fields: BTreeSet<String>,
    pub drop_labels: BTreeSet<String>,
    pub database: String,
    /// Discard labels that are neither tags nor dropped instead of storing
    /// them as string fields.
    pub ignore_other_labels: bool,
}

impl MeasurementSpec {
    /// A single-value measurement, as declared by the global whitelist.
    pub fn implicit(name: &str, tags: &BTreeSet<String>, database: &str) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.clone(),
            database: database.to_string(),
            ..Default::default()
        }
    }

    /// The metric names this measurement claims, paired with the field each
    /// of them is stored under. An empty field means the implicit field.
    pub fn metric_names(&self) -> Vec<(String, String)> {
        if self.fields.is_empty() {
            return vec![(self.name.clone(), String::new())];
        }
        self.fields
            .iter()
            .map(|field| {
                let mut metric = String::with_capacity(self.name.len() + field.len() + 1);
                metric.push_str(&self.name);
                metric.push('_');
                metric.push_str(field);
                (metric, field.clone())
            })
            .collect()
    }

    /// Builds the ordered list of specs described by a mapping file.
    ///
    /// Whitelisted names come first. An explicit definition replaces the
    /// whitelist entry of the same name in place; a repeated explicit
    /// definition is ignored. Definitions without a name are skipped.
    pub fn from_mapping(mapping: &MappingConfig, default_database: &str) -> Vec<MeasurementSpec> {
        let global_tags: BTreeSet<String> =
            mapping.global.tags_whitelist.iter().cloned().collect();

        let mut specs: Vec<MeasurementSpec> = Vec::new();
        let mut explicit: BTreeSet<String> = BTreeSet::new();

        for name in &mapping.global.measurements_whitelist {
            if name.is_empty() {
                error!("Whitelisted measurement name is empty, skipping it");
                continue;
            }
            if specs.iter().any(|spec| &spec.name == name) {
                continue;
            }
            specs.push(MeasurementSpec::implicit(name, &global_tags, default_database));
        }

        for config in mapping.measurements() {
            if config.name.is_empty() {
                error!("Measurement name is empty, skipping its definition");
                continue;
            }
            if explicit.contains(&config.name) {
                warn!(
                    "Measurement {} is defined more than once, keeping the first definition",
                    config.name
                );
                continue;
            }

            let mut tags = global_tags.clone();
            tags.extend(config.tags.iter().cloned());

            let database = match config.database.as_deref() {
                Some(database) if !database.is_empty() => database.to_string(),
                _ => default_database.to_string(),
            };

            let spec = MeasurementSpec {
                name: config.name.clone(),
                tags,
                fields: config.fields.iter().cloned().collect(),
                drop_labels: config.drop_labels.iter().cloned().collect(),
                database,
                ignore_other_labels: config.ignore_other_label,
            };

            explicit.insert(config.name.clone());
            match specs.iter_mut().find(|existing| existing.name == spec.name) {
                Some(existing) => *existing = spec,
                None => specs.push(spec),
            }
        }

        specs
    }
}
