//! HOBBES web API client.
//!
//! The feed is schemaless JSON, so node properties are kept as a raw ordered
//! map and surfaced through typed accessors that report missing or ill-shaped
//! keys as data errors instead of panicking.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{ImportError, ImportResult};

pub struct HobbesClient {
    client: Client,
    base_url: String,
}

impl HobbesClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetch the full network description: GET `{base}/network/get`.
    pub async fn fetch_network(&self) -> ImportResult<Vec<RawNode>> {
        let url = format!("{}/network/get", self.base_url);
        info!("Fetching HOBBES network from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ImportError::Transport(response.status()));
        }

        let nodes: Vec<RawNode> = response.json().await?;
        info!("Fetched {} nodes", nodes.len());
        Ok(nodes)
    }

    /// Fetch the per-node supplementary data series:
    /// GET `{base}/network/extras?prmname=<name>`.
    ///
    /// The response maps extra-attribute names to lists of `[date, value]`
    /// rows (the first row of each list is a header).
    pub async fn fetch_extras(&self, prmname: &str) -> ImportResult<Map<String, Value>> {
        let url = format!("{}/network/extras", self.base_url);
        debug!("Fetching extras for node '{}'", prmname);

        let response = self
            .client
            .get(&url)
            .query(&[("prmname", prmname)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ImportError::Transport(response.status()));
        }

        Ok(response.json().await?)
    }
}

/// One element of the HOBBES network feed, taken wholesale from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub coordinates: Value,
}

impl RawNode {
    fn str_prop(&self, key: &str) -> ImportResult<&str> {
        self.properties
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::Data(format!("node is missing string property '{}'", key)))
    }

    /// The node's unique name. Required.
    pub fn prmname(&self) -> ImportResult<&str> {
        self.str_prop("prmname")
    }

    /// The node's type name. Required.
    pub fn node_type(&self) -> ImportResult<&str> {
        self.str_prop("type")
    }

    /// Free-text description; absent on some feed entries.
    pub fn description(&self) -> &str {
        self.properties
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Names of the extra (timeseries) attributes, in document order.
    pub fn extras_keys(&self) -> Vec<&str> {
        self.properties
            .get("extras")
            .and_then(Value::as_object)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// The `repo` metadata object, when present.
    pub fn repo(&self) -> Option<&Map<String, Value>> {
        self.properties.get("repo").and_then(Value::as_object)
    }

    /// The `link_prmname` values under `origins` or `terminals`.
    ///
    /// An entry without a `link_prmname` is a feed defect and is reported,
    /// not skipped.
    pub fn link_names(&self, key: &str) -> ImportResult<Vec<String>> {
        let entries = match self.properties.get(key).and_then(Value::as_array) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };
        entries
            .iter()
            .map(|entry| {
                entry
                    .get("link_prmname")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ImportError::Data(format!(
                            "'{}' entry on node '{}' has no link_prmname",
                            key,
                            self.prmname().unwrap_or("?")
                        ))
                    })
            })
            .collect()
    }

    /// The node position. Some feed entries carry a nested list of pairs; the
    /// first pair wins.
    pub fn xy(&self) -> ImportResult<(f64, f64)> {
        let coords = self
            .geometry
            .coordinates
            .as_array()
            .ok_or_else(|| ImportError::Data("node has no coordinates".to_string()))?;

        let pair: &[Value] = match coords.first() {
            Some(Value::Array(first)) => {
                debug!(
                    "Node '{}' has nested coordinates, using the first pair",
                    self.prmname().unwrap_or("?")
                );
                first
            }
            _ => coords,
        };

        match (
            pair.first().and_then(Value::as_f64),
            pair.get(1).and_then(Value::as_f64),
        ) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(ImportError::Data(format!(
                "node '{}' has malformed coordinates",
                self.prmname().unwrap_or("?")
            ))),
        }
    }
}
