//! Plugin status report and the progress line protocol.
//!
//! stdout belongs to the plugin host: `!!Progress`/`!!Output` markers while
//! running, then exactly one XML result document. Logs go to stderr.

use crate::xml::Element;

pub fn write_progress(step: usize, total: usize) {
    println!("!!Progress {}/{}", step, total);
}

pub fn write_output(message: &str) {
    println!("!!Output {}", message);
}

/// Everything the calling software learns about the run.
#[derive(Debug, Clone, Default)]
pub struct PluginReport {
    pub plugin_name: String,
    pub message: String,
    pub network_id: Option<i64>,
    pub scenario_ids: Vec<i64>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub files: Vec<String>,
}

impl PluginReport {
    pub fn new(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            ..Self::default()
        }
    }

    pub fn to_xml(&self) -> String {
        let mut root = Element::new("plugin_result");
        root.leaf("plugin_name", &self.plugin_name);
        root.leaf("message", &self.message);
        if let Some(network_id) = self.network_id {
            root.leaf("network_id", network_id.to_string());
        }

        let mut scenarios = Element::new("scenarios");
        for id in &self.scenario_ids {
            scenarios.leaf("scenario_id", id.to_string());
        }
        root.push(scenarios);

        let mut errors = Element::new("errors");
        for error in &self.errors {
            errors.leaf("error", error);
        }
        root.push(errors);

        let mut warnings = Element::new("warnings");
        for warning in &self.warnings {
            warnings.leaf("warning", warning);
        }
        root.push(warnings);

        let mut files = Element::new("files");
        for file in &self.files {
            files.leaf("file", file);
        }
        root.push(files);

        root.to_pretty_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_report() {
        let mut report = PluginReport::new("Import Hobbes");
        report.message = "Import complete".to_string();
        report.network_id = Some(44);
        report.scenario_ids = vec![7];
        report.files = vec!["template.xml".to_string()];

        let xml = report.to_xml();
        assert!(xml.starts_with("<plugin_result>"));
        assert!(xml.contains("<plugin_name>Import Hobbes</plugin_name>"));
        assert!(xml.contains("<network_id>44</network_id>"));
        assert!(xml.contains("<scenario_id>7</scenario_id>"));
        assert!(xml.contains("<file>template.xml</file>"));
        assert!(xml.contains("<errors/>"));
    }

    #[test]
    fn test_failed_report_has_no_network_id() {
        let mut report = PluginReport::new("Import Hobbes");
        report.message = "An error has occurred".to_string();
        report.errors.push("validation failed".to_string());

        let xml = report.to_xml();
        assert!(!xml.contains("<network_id>"));
        assert!(xml.contains("<error>validation failed</error>"));
    }
}
