//! Route table and location derivation.

use std::collections::HashMap;

use lendingflow_common::{Config, DispatchError, DispatchResult, ProcessingLocation};

/// Static routing rules: which leading key segments are accepted and what
/// output segment each maps to. Built once at startup from configuration.
#[derive(Debug, Clone)]
pub struct RouteTable {
    input_prefixes: Vec<String>,
    output_map: HashMap<String, String>,
    route_profiles: HashMap<String, String>,
}

impl RouteTable {
    /// Build and validate the table. An output prefix that collides with an
    /// input prefix would let derived outputs re-enter the router, so that
    /// is a startup error.
    pub fn new(
        input_prefixes: Vec<String>,
        output_map: HashMap<String, String>,
        route_profiles: HashMap<String, String>,
    ) -> anyhow::Result<Self> {
        if input_prefixes.is_empty() {
            anyhow::bail!("at least one input prefix must be configured");
        }
        for (input, output) in &output_map {
            if input_prefixes.iter().any(|p| p == output) {
                anyhow::bail!(
                    "output prefix '{output}' for '{input}' collides with an input prefix"
                );
            }
        }
        Ok(Self {
            input_prefixes,
            output_map,
            route_profiles,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.input_prefixes.clone(),
            config.output_prefix_map.clone(),
            config.route_profiles.clone(),
        )
    }

    /// The input prefix matching `key`, if any. Matching is exact on the
    /// leading path segment: `documents/x.pdf` matches `documents`,
    /// `documents-old/x.pdf` does not.
    pub fn match_prefix(&self, key: &str) -> Option<&str> {
        let (first, _) = key.split_once('/')?;
        self.input_prefixes
            .iter()
            .find(|p| p.as_str() == first)
            .map(|p| p.as_str())
    }

    /// Profile name configured for a route, if any.
    pub fn profile_for(&self, prefix: &str) -> Option<&str> {
        self.route_profiles.get(prefix).map(String::as_str)
    }

    pub fn input_prefixes(&self) -> &[String] {
        &self.input_prefixes
    }

    /// Map an object key to its processing locations. Pure and deterministic;
    /// every input either derives or returns a classified error. Upstream
    /// prefix filtering is advisory, so the prefix is re-validated here.
    pub fn derive(&self, bucket: &str, key: &str) -> DispatchResult<ProcessingLocation> {
        let prefix = self
            .match_prefix(key)
            .ok_or_else(|| DispatchError::UnroutableKey {
                key: key.to_string(),
            })?;
        let output_prefix =
            self.output_map
                .get(prefix)
                .ok_or_else(|| DispatchError::UnmappedPrefix {
                    prefix: prefix.to_string(),
                })?;
        // Remainder keeps its leading '/' so all nested structure survives.
        let remainder = &key[prefix.len()..];
        Ok(ProcessingLocation {
            input_uri: format!("s3://{bucket}/{key}"),
            output_uri: format!("s3://{bucket}/{output_prefix}{remainder}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::new(
            vec!["documents".to_string(), "samples".to_string()],
            HashMap::from([
                ("documents".to_string(), "documents-output".to_string()),
                ("samples".to_string(), "samples-output".to_string()),
            ]),
            HashMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn derives_output_by_substituting_leading_segment() {
        let location = table().derive("b", "documents/loan123.pdf").unwrap();
        assert_eq!(location.input_uri, "s3://b/documents/loan123.pdf");
        assert_eq!(location.output_uri, "s3://b/documents-output/loan123.pdf");
    }

    #[test]
    fn preserves_nested_path_structure() {
        let location = table()
            .derive("b", "samples/2024/q3/statement.pdf")
            .unwrap();
        assert_eq!(location.output_uri, "s3://b/samples-output/2024/q3/statement.pdf");
    }

    #[test]
    fn rejects_keys_outside_configured_prefixes() {
        let err = table().derive("b", "uploads/loan123.pdf").unwrap_err();
        assert!(matches!(err, DispatchError::UnroutableKey { .. }));

        // No path separator at all.
        let err = table().derive("b", "loan123.pdf").unwrap_err();
        assert!(matches!(err, DispatchError::UnroutableKey { .. }));

        // Prefix match is on the whole first segment, not a string prefix.
        let err = table().derive("b", "documents-old/loan123.pdf").unwrap_err();
        assert!(matches!(err, DispatchError::UnroutableKey { .. }));
    }

    #[test]
    fn listed_prefix_without_mapping_is_unmapped() {
        let table = RouteTable::new(
            vec!["documents".to_string(), "inbox".to_string()],
            HashMap::from([("documents".to_string(), "documents-output".to_string())]),
            HashMap::new(),
        )
        .unwrap();

        let err = table.derive("b", "inbox/loan123.pdf").unwrap_err();
        assert!(matches!(err, DispatchError::UnmappedPrefix { .. }));
    }

    #[test]
    fn derived_outputs_never_match_an_input_prefix() {
        let table = table();
        let location = table.derive("b", "documents/loan123.pdf").unwrap();
        let output_key = location
            .output_uri
            .strip_prefix("s3://b/")
            .unwrap()
            .to_string();
        assert_eq!(table.match_prefix(&output_key), None);
    }

    #[test]
    fn output_prefix_colliding_with_input_is_a_config_error() {
        let result = RouteTable::new(
            vec!["documents".to_string(), "samples".to_string()],
            HashMap::from([("documents".to_string(), "samples".to_string())]),
            HashMap::new(),
        );
        assert!(result.is_err());
    }
}
