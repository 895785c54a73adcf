//! Hydra JSON-RPC connection and the wire payloads it exchanges.
//!
//! Every call is one synchronous POST of `{call_name: params}` to the
//! server's `/json` endpoint, authenticated by a session cookie. Responses
//! decode into explicit structs; server faults become typed RPC errors.

use reqwest::header::COOKIE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ImportError, ImportResult};

pub struct HydraConnection {
    client: Client,
    url: String,
    session_id: Option<String>,
}

impl HydraConnection {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            url,
            session_id: None,
        }
    }

    /// Reuse a session established by the calling software.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    /// Log in and keep the returned session ID for the rest of the run.
    pub async fn login(&mut self, username: &str, password: &str) -> ImportResult<()> {
        let response = self
            .call(
                "login",
                json!({ "username": username, "password": password }),
            )
            .await?;
        let login: LoginResponse = serde_json::from_value(response)?;
        info!("Logged in to Hydra as '{}'", username);
        self.session_id = Some(login.session_id);
        Ok(())
    }

    /// One RPC round trip. A non-success status with a decodable fault body
    /// becomes [`ImportError::Rpc`]; anything else non-success is transport.
    pub async fn call(&self, name: &str, params: Value) -> ImportResult<Value> {
        debug!("Calling Hydra '{}'", name);

        let mut body = serde_json::Map::new();
        body.insert(name.to_string(), params);

        let mut request = self
            .client
            .post(format!("{}/json", self.url))
            .json(&Value::Object(body));
        if let Some(ref session_id) = self.session_id {
            request = request.header(COOKIE, format!("beaker.session.id={}", session_id));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            if let Ok(fault) = response.json::<Fault>().await {
                return Err(ImportError::Rpc {
                    call: name.to_string(),
                    fault: fault.faultstring,
                });
            }
            return Err(ImportError::Transport(status));
        }

        Ok(response.json().await?)
    }

    /// Fetch an existing project; a fault maps to a not-found error naming
    /// the offending ID.
    pub async fn get_project(&self, project_id: i64) -> ImportResult<Project> {
        let value = self
            .call("get_project", json!({ "project_id": project_id }))
            .await
            .map_err(|e| match e {
                ImportError::Rpc { .. } => ImportError::ProjectNotFound(project_id),
                other => other,
            })?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn add_project(&self, name: &str, description: &str) -> ImportResult<Project> {
        let value = self
            .call(
                "add_project",
                json!({ "project": { "name": name, "description": description } }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_template(&self, template_id: i64) -> ImportResult<Template> {
        let value = self
            .call("get_template", json!({ "template_id": template_id }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn upload_template_xml(&self, template_xml: &str) -> ImportResult<Template> {
        let value = self
            .call(
                "upload_template_xml",
                json!({ "template_xml": template_xml }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_template_attributes(&self, template_id: i64) -> ImportResult<Vec<Attr>> {
        let value = self
            .call(
                "get_template_attributes",
                json!({ "template_id": template_id }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn add_network(&self, net: &NetworkPayload) -> ImportResult<Network> {
        let value = self
            .call("add_network", json!({ "net": net }))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn get_all_node_attributes(
        &self,
        network_id: i64,
    ) -> ImportResult<Vec<ResourceAttr>> {
        let value = self
            .call(
                "get_all_node_attributes",
                json!({ "network_id": network_id }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn add_scenario(
        &self,
        network_id: i64,
        scenario: &ScenarioDraft,
    ) -> ImportResult<Scenario> {
        let value = self
            .call(
                "add_scenario",
                json!({ "network_id": network_id, "scen": scenario }),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct Fault {
    #[serde(default)]
    #[allow(dead_code)]
    faultcode: String,
    faultstring: String,
}

// ── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub types: Vec<TemplateType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub typeattrs: Vec<TypeAttr>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeAttr {
    pub attr_id: i64,
}

/// An attribute definition, authoritative once the template is uploaded.
#[derive(Debug, Clone, Deserialize)]
pub struct Attr {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub id: i64,
    #[serde(default)]
    pub nodes: Vec<NetworkNode>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkNode {
    pub id: i64,
    pub name: String,
}

/// The platform-side binding of a node to one of its type's attributes.
/// Its `id` (the resource-attribute instance) is distinct from `attr_id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceAttr {
    pub id: i64,
    pub attr_id: i64,
    pub ref_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub id: i64,
}

// ── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct NodePayload {
    pub id: i64,
    pub name: String,
    pub x: String,
    pub y: String,
    pub description: String,
    pub attributes: Vec<AttrRef>,
    pub types: Vec<TypeRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttrRef {
    pub attr_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeRef {
    pub template_id: i64,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkPayload {
    pub id: i64,
    pub name: String,
    pub node_1_id: Option<i64>,
    pub node_2_id: Option<i64>,
    pub description: String,
    pub attributes: Vec<AttrRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkPayload {
    pub name: String,
    pub description: String,
    pub project_id: i64,
    pub projection: String,
    pub nodes: Vec<NodePayload>,
    pub links: Vec<LinkPayload>,
    pub groups: Vec<Value>,
    pub scenarios: Vec<Value>,
}

/// One attribute-value assignment: scalar, descriptor or timeseries.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dataset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    pub dimension: String,
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceScenario {
    pub resource_attr_id: i64,
    pub attr_id: i64,
    pub is_var: String,
    pub value: Dataset,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioDraft {
    pub name: String,
    pub description: String,
    pub resourcescenarios: Vec<ResourceScenario>,
}
