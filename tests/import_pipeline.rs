//! End-to-end assembly over a small fixture feed: inference, a simulated
//! platform template with assigned IDs, network assembly, the final
//! payload shape and the scenario rows. No network I/O.

use std::collections::HashMap;

use hobbes_import::hobbes::RawNode;
use hobbes_import::hydra::{Attr, ResourceAttr, Template, TemplateType, TypeAttr};
use hobbes_import::importer::{assemble, node_datasets, validate, TemplateContext};
use hobbes_import::template::{self, InferredTemplate};
use indexmap::IndexMap;
use serde_json::json;

fn node(value: serde_json::Value) -> RawNode {
    serde_json::from_value(value).unwrap()
}

/// Two-node feed: A (a reservoir) terminates into link L1, B (an outflow)
/// originates from it.
fn feed() -> Vec<RawNode> {
    vec![
        node(json!({
            "properties": {
                "prmname": "SR_CLE",
                "type": "reservoir",
                "description": "Clear Lake",
                "capacity": 420.5,
                "extras": {"storage": []},
                "terminals": [{"link_prmname": "L1"}],
                "regions": ["north"],
                "repo": {"tag": "cwn-2015"}
            },
            "geometry": {"coordinates": [-122.1, 39.0]}
        })),
        node(json!({
            "properties": {
                "prmname": "OUT_1",
                "type": "outflow",
                "description": "",
                "origins": [{"link_prmname": "L1"}]
            },
            "geometry": {"coordinates": [[-122.0, 38.9], [-121.9, 38.8]]}
        })),
    ]
}

/// What the platform hands back after the template upload: the same types
/// and attributes, now with server-assigned IDs. Attribute IDs are shared
/// across types by name, like the real attribute table.
fn platform_template(inferred: &InferredTemplate) -> (Template, IndexMap<String, Attr>) {
    let mut attrs_by_name: IndexMap<String, Attr> = IndexMap::new();
    let mut next_attr_id = 100;
    let types = inferred
        .types
        .iter()
        .enumerate()
        .map(|(i, (name, attrs))| TemplateType {
            id: 10 + i as i64,
            name: name.clone(),
            typeattrs: attrs
                .iter()
                .map(|attr_name| {
                    let attr = attrs_by_name.entry(attr_name.clone()).or_insert_with(|| {
                        next_attr_id += 1;
                        Attr {
                            id: next_attr_id,
                            name: attr_name.clone(),
                        }
                    });
                    TypeAttr { attr_id: attr.id }
                })
                .collect(),
        })
        .collect();
    let template = Template {
        id: 1,
        name: "HydraPlatform template for Hobbes".to_string(),
        types,
    };
    (template, attrs_by_name)
}

#[test]
fn test_feed_assembles_into_one_complete_link() {
    let feed = feed();
    let inferred = template::infer(&feed).unwrap();
    let (tpl, _) = platform_template(&inferred);

    let mut warnings = Vec::new();
    let assembled = assemble(&feed, &tpl, &mut warnings).unwrap();
    validate(&assembled).unwrap();
    assert!(warnings.is_empty());

    assert_eq!(assembled.nodes.len(), 2);
    assert_eq!(assembled.links.len(), 1);

    let a = &assembled.nodes["SR_CLE"];
    let b = &assembled.nodes["OUT_1"];
    assert_eq!((a.id, b.id), (1, 2));

    let link = &assembled.links["L1"];
    assert_eq!(link.id, 1);
    assert_eq!(link.node_1_id, Some(a.id));
    assert_eq!(link.node_2_id, Some(b.id));
}

#[test]
fn test_nodes_carry_resolved_types_and_placeholders() {
    let feed = feed();
    let inferred = template::infer(&feed).unwrap();
    let (tpl, _) = platform_template(&inferred);

    let mut warnings = Vec::new();
    let assembled = assemble(&feed, &tpl, &mut warnings).unwrap();

    let a = &assembled.nodes["SR_CLE"];
    assert_eq!(a.types[0].template_id, 1);
    assert_eq!(a.x, "-122.1");
    assert_eq!(a.y, "39");
    assert_eq!(a.description, "Clear Lake");
    // one placeholder per attribute of the resolved type
    assert_eq!(
        a.attributes.len(),
        inferred.types["reservoir"].len()
    );

    // nested coordinates resolved to the first pair
    let b = &assembled.nodes["OUT_1"];
    assert_eq!(b.x, "-122");
    assert_eq!(b.y, "38.9");
}

#[test]
fn test_inference_is_stable_across_runs() {
    let first = template::infer(&feed()).unwrap();
    let second = template::infer(&feed()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_xml(), second.to_xml());
}

#[test]
fn test_network_payload_shape() {
    let feed = feed();
    let inferred = template::infer(&feed).unwrap();
    let (tpl, _) = platform_template(&inferred);

    let mut warnings = Vec::new();
    let assembled = assemble(&feed, &tpl, &mut warnings).unwrap();
    let payload = assembled.into_payload(7);

    assert_eq!(payload.project_id, 7);
    assert_eq!(payload.projection, "EPSG:2229");
    assert_eq!(payload.nodes.len(), 2);
    assert_eq!(payload.links.len(), 1);
    assert!(payload.groups.is_empty());
    assert!(payload.scenarios.is_empty());

    let serialized = serde_json::to_value(&payload).unwrap();
    assert_eq!(serialized["links"][0]["node_1_id"], json!(1));
    assert_eq!(serialized["nodes"][0]["name"], json!("SR_CLE"));
}

#[test]
fn test_scenario_rows_built_from_inferred_template() {
    let feed = feed();
    let inferred = template::infer(&feed).unwrap();
    let (template, attrs_by_name) = platform_template(&inferred);
    // 'repo' is excluded from inference, so the attribute table lacks it
    assert!(!attrs_by_name.contains_key("repo"));

    let mut warnings = Vec::new();
    let assembled = assemble(&feed, &template, &mut warnings).unwrap();

    // resource-attribute instances as add_network would mint them
    let mut minted = Vec::new();
    let mut next_instance_id = 1000;
    for node in assembled.nodes.values() {
        for attr_ref in &node.attributes {
            next_instance_id += 1;
            minted.push(ResourceAttr {
                id: next_instance_id,
                attr_id: attr_ref.attr_id,
                ref_id: node.id,
            });
        }
    }
    let mut attrs_by_node: HashMap<i64, Vec<&ResourceAttr>> = HashMap::new();
    for resource_attr in &minted {
        attrs_by_node
            .entry(resource_attr.ref_id)
            .or_default()
            .push(resource_attr);
    }

    let capacity_id = attrs_by_name["capacity"].id;
    let tpl = TemplateContext {
        template,
        attrs_by_name,
    };

    let mut rows = Vec::new();
    for raw in &feed {
        let node_id = assembled.nodes[raw.prmname().unwrap()].id;
        rows.extend(node_datasets(raw, node_id, &tpl, &attrs_by_node, &mut warnings).unwrap());
    }

    // one scalar row: SR_CLE's capacity, bound to its minted instance
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.attr_id, capacity_id);
    assert_eq!(row.is_var, "N");
    assert_eq!(row.value.kind, "scalar");
    assert_eq!(row.value.value, "420.5");
    let instance_id = attrs_by_node[&assembled.nodes["SR_CLE"].id]
        .iter()
        .find(|ra| ra.attr_id == capacity_id)
        .unwrap()
        .id;
    assert_eq!(row.resource_attr_id, instance_id);

    // SR_CLE's repo cannot bind and OUT_1 has none; neither is fatal
    assert_eq!(warnings.len(), 2);
    assert!(warnings[0].contains("repo metadata skipped"));
    assert!(warnings[1].contains("no repo metadata"));
}
