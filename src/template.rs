//! Template inference from the raw HOBBES node list.
//!
//! Scans every node's property keys to build one attribute set per node type.
//! Sets only ever grow, names are compared by exact string equality, and
//! insertion order is first-seen order so repeated runs on the same feed
//! produce byte-identical XML.

use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::error::ImportResult;
use crate::hobbes::RawNode;
use crate::xml::Element;

/// Property keys that never become template attributes.
pub const EXCLUDED_PROPERTIES: [&str; 9] = [
    "origins",
    "prmname",
    "regions",
    "terminals",
    "description",
    "extras",
    "type",
    "repo",
    "origin",
];

pub const TEMPLATE_NAME: &str = "HydraPlatform template for Hobbes";

/// Node-type name -> attribute names, both in first-seen order.
pub type TypeAttributeMap = IndexMap<String, IndexSet<String>>;

/// The inferred template: per-type attribute sets plus the names of the
/// attributes that carry timeseries data (found under `extras`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferredTemplate {
    pub types: TypeAttributeMap,
    pub timeseries: IndexSet<String>,
}

/// Build the per-type attribute map from the feed.
///
/// Each node of a type contributes `(property keys ∪ extras keys)` minus
/// [`EXCLUDED_PROPERTIES`]; the per-type set is the union over all of the
/// type's nodes. When a type is first seen its set is seeded from that node's
/// extras keys, which keeps timeseries attributes at the front of the set.
pub fn infer(nodes: &[RawNode]) -> ImportResult<InferredTemplate> {
    let mut template = InferredTemplate::default();

    for node in nodes {
        let node_type = node.node_type()?;
        let extras = node.extras_keys();

        let first_seen = !template.types.contains_key(node_type);
        let attrs = template.types.entry(node_type.to_string()).or_default();

        for &extra in &extras {
            template.timeseries.insert(extra.to_string());
        }
        if first_seen {
            for &extra in &extras {
                attrs.insert(extra.to_string());
            }
        }

        let before = attrs.len();
        for key in node.properties.keys() {
            if !EXCLUDED_PROPERTIES.contains(&key.as_str()) {
                attrs.insert(key.clone());
            }
        }
        for &extra in &extras {
            attrs.insert(extra.to_string());
        }
        if attrs.len() > before {
            debug!(
                "Extended '{}' to {} attributes",
                node_type,
                attrs.len()
            );
        }
    }

    Ok(template)
}

impl InferredTemplate {
    /// Serialize to the `template_definition` XML document Hydra expects.
    ///
    /// Shape: template name, a fixed `layout` grouping block with one group
    /// per type, then the resources: one NETWORK, one LINK, and one NODE
    /// resource per inferred type. Every attribute is dimensionless and
    /// non-variable.
    pub fn to_xml(&self) -> String {
        let mut root = Element::new("template_definition");
        root.leaf("template_name", TEMPLATE_NAME);
        root.push(self.layout_element());

        let mut resources = Element::new("resources");
        resources.push(fixed_resource("NETWORK", "HOBBES Network"));
        resources.push(fixed_resource("LINK", "HOBBES Link"));
        for (type_name, attrs) in &self.types {
            let mut resource = Element::new("resource");
            resource.leaf("type", "NODE");
            resource.leaf("name", type_name);
            for attr_name in attrs {
                let mut attribute = Element::new("attribute");
                attribute.leaf("name", attr_name);
                attribute.leaf("dimension", "dimensionless");
                attribute.leaf("is_var", "N");
                resource.push(attribute);
            }
            resources.push(resource);
        }
        root.push(resources);

        root.to_pretty_string()
    }

    /// Grouping metadata consumed by the Hydra modeller UI.
    fn layout_element(&self) -> Element {
        let mut layout = Element::new("layout");
        let mut item = Element::new("item");
        item.leaf("name", "grouping");

        let mut value = Element::new("value");
        value.leaf("name", TEMPLATE_NAME);
        value.leaf(
            "description",
            "An automatically generated template from the HOBBES network server.",
        );

        let mut categories = Element::new("categories");
        let mut category = Element::new("category");
        category.leaf("name", "Resources");
        category.leaf("description", "Network Resources");
        category.leaf("displayname", "Network Resources");

        let mut groups = Element::new("groups");
        for type_name in self.types.keys() {
            let mut group = Element::new("group");
            group.leaf("name", type_name);
            group.leaf("description", type_name);
            group.leaf("displayname", type_name);
            group.leaf("image", "");
            groups.push(group);
        }
        category.push(groups);
        categories.push(category);
        value.push(categories);
        item.push(value);
        layout.push(item);
        layout
    }

    /// Write the XML to disk; this file is what gets uploaded to Hydra.
    pub fn write_to(&self, path: &Path) -> ImportResult<()> {
        std::fs::write(path, self.to_xml())?;
        Ok(())
    }
}

fn fixed_resource(resource_type: &str, name: &str) -> Element {
    let mut resource = Element::new("resource");
    resource.leaf("type", resource_type);
    resource.leaf("name", name);
    resource
}
