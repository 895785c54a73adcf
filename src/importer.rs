//! Network assembly and the end-to-end import pipeline.
//!
//! Turns the raw HOBBES feed into Hydra payloads: nodes with sequential
//! temporary IDs, links discovered incrementally from each node's
//! origins/terminals, and a scenario carrying per-node datasets. Referential
//! checks run before anything is submitted; there is no rollback once the
//! network exists on the server.

use std::collections::HashMap;

use chrono::{Local, NaiveDate, NaiveTime};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{ImportError, ImportResult};
use crate::hobbes::{HobbesClient, RawNode};
use crate::hydra::{
    Attr, AttrRef, Dataset, HydraConnection, LinkPayload, Network, NetworkPayload, NodePayload,
    Project, ResourceAttr, ResourceScenario, Scenario, ScenarioDraft, Template, TypeRef,
};
use crate::report::write_output;
use crate::template::{self, EXCLUDED_PROPERTIES};

/// Monotonic ID source owned by the assembler. IDs are handed out once per
/// distinct name, strictly increasing, never reused within a run.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> i64 {
        self.next += 1;
        self.next
    }
}

/// Node and link tables keyed by name, in feed order.
#[derive(Debug, Default)]
pub struct AssembledNetwork {
    pub nodes: IndexMap<String, NodePayload>,
    pub links: IndexMap<String, LinkPayload>,
}

impl AssembledNetwork {
    pub fn into_payload(self, project_id: i64) -> NetworkPayload {
        NetworkPayload {
            name: format!("HOBBES Network ({})", Local::now().format("%Y-%m-%d %H:%M:%S")),
            description: "Hobbes Network, imported directly from the web API".to_string(),
            project_id,
            projection: "EPSG:2229".to_string(),
            nodes: self.nodes.into_values().collect(),
            links: self.links.into_values().collect(),
            groups: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

fn blank_link(id: i64, name: String) -> LinkPayload {
    LinkPayload {
        id,
        name,
        node_1_id: None,
        node_2_id: None,
        description: String::new(),
        attributes: Vec::new(),
    }
}

/// Build node and link records from the feed.
///
/// Each node gets the next temporary ID at first sight of its name and the
/// attribute placeholders of its template type. A link is created the first
/// time either endpoint mentions it (`origins` make the node the downstream
/// `node_2`, `terminals` the upstream `node_1`) and the missing endpoint is
/// filled in place when the other side turns up. Unresolved types and
/// half-finished links are left for [`validate`] to report.
pub fn assemble(
    feed: &[RawNode],
    template: &Template,
    warnings: &mut Vec<String>,
) -> ImportResult<AssembledNetwork> {
    let mut node_ids = IdAllocator::new();
    let mut link_ids = IdAllocator::new();
    let mut assembled = AssembledNetwork::default();

    for raw in feed {
        let name = raw.prmname()?.to_string();
        if assembled.nodes.contains_key(&name) {
            warn!("Duplicate node '{}' in feed, keeping the first occurrence", name);
            warnings.push(format!("duplicate node '{}' in feed", name));
            continue;
        }

        let node_type = raw.node_type()?;
        let (x, y) = raw.xy()?;
        let node_id = node_ids.next_id();

        let mut attributes = Vec::new();
        let mut types = Vec::new();
        if let Some(matched) = template.types.iter().find(|t| t.name == node_type) {
            types.push(TypeRef {
                template_id: template.id,
                id: matched.id,
            });
            attributes = matched
                .typeattrs
                .iter()
                .map(|ta| AttrRef {
                    attr_id: ta.attr_id,
                })
                .collect();
        }

        assembled.nodes.insert(
            name.clone(),
            NodePayload {
                id: node_id,
                name,
                x: x.to_string(),
                y: y.to_string(),
                description: raw.description().to_string(),
                attributes,
                types,
            },
        );

        for link_name in raw.link_names("origins")? {
            let link = assembled
                .links
                .entry(link_name.clone())
                .or_insert_with(|| blank_link(link_ids.next_id(), link_name));
            link.node_2_id = Some(node_id);
        }

        for link_name in raw.link_names("terminals")? {
            let link = assembled
                .links
                .entry(link_name.clone())
                .or_insert_with(|| blank_link(link_ids.next_id(), link_name));
            link.node_1_id = Some(node_id);
        }
    }

    Ok(assembled)
}

/// Referential completeness check, run before submission: every node must
/// resolve a template type and every link must have both endpoints.
pub fn validate(assembled: &AssembledNetwork) -> ImportResult<()> {
    let mut problems = Vec::new();

    for node in assembled.nodes.values() {
        if node.types.is_empty() {
            problems.push(format!(
                "node '{}' has a type the template does not define",
                node.name
            ));
        }
    }
    for link in assembled.links.values() {
        if link.node_1_id.is_none() {
            problems.push(format!(
                "link '{}' never appeared as a terminal: upstream endpoint unset",
                link.name
            ));
        }
        if link.node_2_id.is_none() {
            problems.push(format!(
                "link '{}' never appeared as an origin: downstream endpoint unset",
                link.name
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ImportError::Validation(problems))
    }
}

/// Convert a HOBBES series into the Hydra single-series timeseries value.
///
/// Rows are `[date, value]` pairs; the first row is a header and is dropped.
/// Dates are `YYYY-MM-DD` and get reformatted with the configured format.
pub fn parse_timeseries(rows: &[Value], datetime_format: &str) -> ImportResult<Value> {
    let mut series = Map::new();
    for row in rows.iter().skip(1) {
        let pair = row
            .as_array()
            .filter(|p| p.len() >= 2)
            .ok_or_else(|| {
                ImportError::Data(format!("timeseries row is not a [date, value] pair: {}", row))
            })?;

        let date_str = pair[0]
            .as_str()
            .ok_or_else(|| ImportError::Data(format!("timeseries date is not a string: {}", pair[0])))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| ImportError::Data(format!("bad timeseries date '{}': {}", date_str, e)))?;
        let stamp = date
            .and_time(NaiveTime::MIN)
            .format(datetime_format)
            .to_string();

        let value = match &pair[1] {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            ImportError::Data(format!("non-numeric timeseries value for '{}'", date_str))
        })?;

        series.insert(stamp, json!(value));
    }
    Ok(json!({ "idx1": series }))
}

/// The `repo` property becomes one descriptor dataset: value is the repo
/// tag, metadata the whole object with every value stringified.
pub fn make_repo_dataset(repo: &Map<String, Value>) -> ImportResult<Dataset> {
    let tag = repo
        .get("tag")
        .and_then(Value::as_str)
        .ok_or_else(|| ImportError::Data("repo metadata has no 'tag'".to_string()))?;

    let mut meta = Map::new();
    for (key, value) in repo {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        meta.insert(key.clone(), Value::String(text));
    }

    Ok(Dataset {
        name: "repo".to_string(),
        kind: "descriptor".to_string(),
        value: tag.to_string(),
        dimension: "dimensionless".to_string(),
        unit: None,
        metadata: Some(serde_json::to_string(&meta)?),
    })
}

/// The uploaded (or fetched) template together with its name -> attribute
/// table, immutable for the rest of the run.
pub struct TemplateContext {
    pub template: Template,
    pub attrs_by_name: IndexMap<String, Attr>,
}

/// Drives the whole import against the two remote services.
pub struct HobbesImporter {
    pub hobbes: HobbesClient,
    pub hydra: HydraConnection,
    config: Config,
    pub warnings: Vec<String>,
    pub files: Vec<String>,
}

impl HobbesImporter {
    pub fn new(config: Config, server_url: Option<String>, session_id: Option<String>) -> Self {
        let hydra_url = server_url.unwrap_or_else(|| config.hydra_url.clone());
        let mut hydra = HydraConnection::new(hydra_url);
        if let Some(session_id) = session_id {
            write_output(&format!("Using existing session {}", session_id));
            hydra = hydra.with_session(session_id);
        }

        Self {
            hobbes: HobbesClient::new(config.hobbes_url.clone()),
            hydra,
            config,
            warnings: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Log in unless the caller supplied a session ID.
    pub async fn connect(&mut self) -> ImportResult<()> {
        if self.hydra.has_session() {
            return Ok(());
        }
        let username = self.config.username.clone();
        let password = self.config.password.clone();
        self.hydra.login(&username, &password).await
    }

    /// Infer, persist and upload a template — or fetch an existing one by
    /// ID. Either way the attribute table the scenario pass needs comes back
    /// with it.
    pub async fn ensure_template(
        &mut self,
        feed: &[RawNode],
        template_id: Option<i64>,
    ) -> ImportResult<TemplateContext> {
        let template = match template_id {
            Some(id) => {
                info!("Using existing template {}", id);
                self.hydra.get_template(id).await?
            }
            None => {
                let inferred = template::infer(feed)?;
                info!(
                    "Inferred {} node types from {} nodes",
                    inferred.types.len(),
                    feed.len()
                );
                inferred.write_to(&self.config.template_output)?;
                self.files
                    .push(self.config.template_output.display().to_string());
                self.hydra.upload_template_xml(&inferred.to_xml()).await?
            }
        };

        let attributes = self.hydra.get_template_attributes(template.id).await?;
        let attrs_by_name = attributes
            .into_iter()
            .map(|a| (a.name.clone(), a))
            .collect();

        Ok(TemplateContext {
            template,
            attrs_by_name,
        })
    }

    /// Assemble, validate and submit the network.
    pub async fn import_network_topology(
        &mut self,
        feed: &[RawNode],
        tpl: &TemplateContext,
        project_id: Option<i64>,
    ) -> ImportResult<Network> {
        let assembled = assemble(feed, &tpl.template, &mut self.warnings)?;
        info!(
            "Assembled {} nodes and {} links",
            assembled.nodes.len(),
            assembled.links.len()
        );
        validate(&assembled)?;

        let project = self.fetch_project(project_id).await?;

        write_output("Saving Network");
        let payload = assembled.into_payload(project.id);
        self.hydra.add_network(&payload).await
    }

    /// Resolve the target project: fetch by ID (missing IDs are fatal) or
    /// create a fresh one with a timestamped name.
    async fn fetch_project(&self, project_id: Option<i64>) -> ImportResult<Project> {
        if let Some(id) = project_id {
            let project = self.hydra.get_project(id).await?;
            info!("Loading existing project (ID={})", id);
            return Ok(project);
        }

        let name = format!(
            "Hobbes Project created at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.hydra
            .add_project(&name, "Default project created by the hobbes-import plug-in.")
            .await
    }

    /// Build and submit the scenario for the first `data_nodes` nodes of the
    /// feed: the per-node datasets from [`node_datasets`], and optionally one
    /// timeseries dataset per extras entry fetched from the per-node
    /// endpoint.
    pub async fn import_data(
        &mut self,
        feed: &[RawNode],
        tpl: &TemplateContext,
        network: &Network,
        include_timeseries: bool,
        data_nodes: usize,
    ) -> ImportResult<Scenario> {
        let node_ids_by_name: HashMap<&str, i64> = network
            .nodes
            .iter()
            .map(|n| (n.name.as_str(), n.id))
            .collect();

        let node_attributes = self.hydra.get_all_node_attributes(network.id).await?;
        let mut attrs_by_node: HashMap<i64, Vec<&ResourceAttr>> = HashMap::new();
        for resource_attr in &node_attributes {
            attrs_by_node
                .entry(resource_attr.ref_id)
                .or_default()
                .push(resource_attr);
        }

        let mut resource_scenarios = Vec::new();
        for raw in feed.iter().take(data_nodes) {
            let name = raw.prmname()?;
            let node_id = *node_ids_by_name.get(name).ok_or_else(|| {
                ImportError::Data(format!("node '{}' missing from the saved network", name))
            })?;

            resource_scenarios.extend(node_datasets(
                raw,
                node_id,
                tpl,
                &attrs_by_node,
                &mut self.warnings,
            )?);

            if include_timeseries {
                if raw.extras_keys().is_empty() {
                    continue;
                }
                let extra_data = self.hobbes.fetch_extras(name).await?;
                for (key, rows) in &extra_data {
                    if key == "prmname" || key == "readme" {
                        continue;
                    }
                    let rows = rows.as_array().ok_or_else(|| {
                        ImportError::Data(format!(
                            "extras entry '{}' for node '{}' is not a list",
                            key, name
                        ))
                    })?;
                    // a lone header row carries no data
                    if rows.len() < 2 {
                        continue;
                    }
                    let series = parse_timeseries(rows, &self.config.datetime_format)?;
                    let dataset = Dataset {
                        name: key.clone(),
                        kind: "timeseries".to_string(),
                        value: serde_json::to_string(&series)?,
                        dimension: "dimensionless".to_string(),
                        unit: None,
                        metadata: None,
                    };
                    resource_scenarios.push(bind(node_id, name, key, dataset, tpl, &attrs_by_node)?);
                }
            }
        }

        let scenario = ScenarioDraft {
            name: "Hobbes Import".to_string(),
            description: "Import from hobbes".to_string(),
            resourcescenarios: resource_scenarios,
        };
        self.hydra.add_scenario(network.id, &scenario).await
    }
}

/// Datasets derived from the node record itself: the `repo` descriptor and
/// one scalar per numeric property. `repo` sits on the exclusion list, so an
/// inferred template never defines an attribute for it; a descriptor that
/// cannot bind degrades to a warning instead of aborting after the network
/// already exists on the server.
pub fn node_datasets(
    raw: &RawNode,
    node_id: i64,
    tpl: &TemplateContext,
    attrs_by_node: &HashMap<i64, Vec<&ResourceAttr>>,
    warnings: &mut Vec<String>,
) -> ImportResult<Vec<ResourceScenario>> {
    let name = raw.prmname()?;
    let mut rows = Vec::new();

    match raw.repo() {
        Some(repo) => {
            let dataset = make_repo_dataset(repo)?;
            match bind(node_id, name, "repo", dataset, tpl, attrs_by_node) {
                Ok(row) => rows.push(row),
                Err(ImportError::Validation(_)) => {
                    warnings.push(format!(
                        "node '{}': repo metadata skipped, the template defines no 'repo' attribute",
                        name
                    ));
                }
                Err(other) => return Err(other),
            }
        }
        None => {
            warnings.push(format!("node '{}' has no repo metadata", name));
        }
    }

    for (key, value) in &raw.properties {
        if EXCLUDED_PROPERTIES.contains(&key.as_str()) {
            continue;
        }
        let number = match value {
            Value::Number(n) => n.as_f64(),
            _ => None,
        };
        if let Some(number) = number {
            let dataset = Dataset {
                name: key.clone(),
                kind: "scalar".to_string(),
                value: number.to_string(),
                dimension: "dimensionless".to_string(),
                unit: None,
                metadata: None,
            };
            rows.push(bind(node_id, name, key, dataset, tpl, attrs_by_node)?);
        }
    }

    Ok(rows)
}

/// Resolve the resource-attribute instance binding a dataset to a node. A
/// failed lookup is a validation error, never a null instance reference.
fn bind(
    node_id: i64,
    node_name: &str,
    attr_name: &str,
    dataset: Dataset,
    tpl: &TemplateContext,
    attrs_by_node: &HashMap<i64, Vec<&ResourceAttr>>,
) -> ImportResult<ResourceScenario> {
    let attr = tpl.attrs_by_name.get(attr_name).ok_or_else(|| {
        ImportError::Validation(vec![format!(
            "attribute '{}' on node '{}' is not defined by the template",
            attr_name, node_name
        )])
    })?;

    let resource_attr = attrs_by_node
        .get(&node_id)
        .and_then(|ras| ras.iter().find(|ra| ra.attr_id == attr.id))
        .ok_or_else(|| {
            ImportError::Validation(vec![format!(
                "node '{}' has no resource attribute for '{}'",
                node_name, attr_name
            )])
        })?;

    Ok(ResourceScenario {
        resource_attr_id: resource_attr.id,
        attr_id: attr.id,
        is_var: "N".to_string(),
        value: dataset,
    })
}
