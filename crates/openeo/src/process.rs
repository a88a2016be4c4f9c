//! Process graph construction.

use std::collections::HashMap;

use bioma_common::{SpatialExtent, TemporalExtent};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Sentinel-2 L2A surface reflectance on the Copernicus Data Space.
pub const SENTINEL2_L2A: &str = "SENTINEL2_L2A";

/// Handle to a node output, used as the `data` argument of later nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef(String);

impl NodeRef {
    pub fn id(&self) -> &str {
        &self.0
    }

    fn from_node(&self) -> Value {
        json!({ "from_node": self.0 })
    }
}

/// A complete process graph, keyed by node id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProcessGraph(pub Map<String, Value>);

impl ProcessGraph {
    pub fn node(&self, id: &str) -> Option<&Value> {
        self.0.get(id)
    }

    /// Id of the node flagged `result: true`.
    pub fn result_node(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, node)| node.get("result") == Some(&Value::Bool(true)))
            .map(|(id, _)| id.as_str())
    }
}

/// Builds process graphs node by node. Node ids are `{process}{n}`.
#[derive(Debug, Default)]
pub struct ProcessGraphBuilder {
    nodes: Map<String, Value>,
    counters: HashMap<String, usize>,
    last: Option<String>,
}

impl ProcessGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its reference.
    pub fn add(&mut self, process_id: &str, arguments: Value) -> NodeRef {
        let n = self.counters.entry(process_id.to_string()).or_insert(0);
        *n += 1;
        let id = format!("{}{}", process_id, n);
        self.nodes.insert(
            id.clone(),
            json!({ "process_id": process_id, "arguments": arguments }),
        );
        self.last = Some(id.clone());
        NodeRef(id)
    }

    /// `load_collection`, optionally filtered on `eo:cloud_cover <= max`.
    pub fn load_collection(
        &mut self,
        collection_id: &str,
        spatial: &SpatialExtent,
        temporal: &TemporalExtent,
        bands: &[&str],
        max_cloud_cover: Option<f64>,
    ) -> NodeRef {
        let mut arguments = json!({
            "id": collection_id,
            "spatial_extent": spatial,
            "temporal_extent": temporal,
            "bands": bands,
        });
        if let Some(max) = max_cloud_cover {
            arguments["properties"] = json!({
                "eo:cloud_cover": {
                    "process_graph": {
                        "lte1": {
                            "process_id": "lte",
                            "arguments": { "x": { "from_parameter": "value" }, "y": max },
                            "result": true
                        }
                    }
                }
            });
        }
        self.add("load_collection", arguments)
    }

    /// `(nir - red) / (nir + red)` reduced over the `bands` dimension.
    pub fn ndvi(&mut self, data: &NodeRef, nir: &str, red: &str) -> NodeRef {
        let reducer = json!({
            "process_graph": {
                "array_element1": {
                    "process_id": "array_element",
                    "arguments": { "data": { "from_parameter": "data" }, "label": nir }
                },
                "array_element2": {
                    "process_id": "array_element",
                    "arguments": { "data": { "from_parameter": "data" }, "label": red }
                },
                "subtract1": {
                    "process_id": "subtract",
                    "arguments": {
                        "x": { "from_node": "array_element1" },
                        "y": { "from_node": "array_element2" }
                    }
                },
                "add1": {
                    "process_id": "add",
                    "arguments": {
                        "x": { "from_node": "array_element1" },
                        "y": { "from_node": "array_element2" }
                    }
                },
                "divide1": {
                    "process_id": "divide",
                    "arguments": {
                        "x": { "from_node": "subtract1" },
                        "y": { "from_node": "add1" }
                    },
                    "result": true
                }
            }
        });
        self.add(
            "reduce_dimension",
            json!({ "data": data.from_node(), "dimension": "bands", "reducer": reducer }),
        )
    }

    /// `save_result`, marked as the graph result.
    pub fn save_result(&mut self, data: &NodeRef, format: &str, options: Value) -> NodeRef {
        let node = self.add(
            "save_result",
            json!({ "data": data.from_node(), "format": format, "options": options }),
        );
        self.mark_result(node.id());
        node
    }

    fn mark_result(&mut self, id: &str) {
        for (node_id, node) in self.nodes.iter_mut() {
            if let Some(obj) = node.as_object_mut() {
                if node_id == id {
                    obj.insert("result".to_string(), Value::Bool(true));
                } else {
                    obj.remove("result");
                }
            }
        }
    }

    /// Finish the graph. Without an explicit result, the last node is it.
    pub fn build(mut self) -> ProcessGraph {
        let has_result = self
            .nodes
            .values()
            .any(|n| n.get("result") == Some(&Value::Bool(true)));
        if !has_result {
            if let Some(last) = self.last.clone() {
                self.mark_result(&last);
            }
        }
        ProcessGraph(self.nodes)
    }
}

/// Sentinel-2 NDVI from B08 and B04, saved as GeoTIFF.
pub fn ndvi_graph(
    collection: &str,
    spatial: &SpatialExtent,
    temporal: &TemporalExtent,
    max_cloud_cover: f64,
) -> ProcessGraph {
    let mut b = ProcessGraphBuilder::new();
    let cube = b.load_collection(collection, spatial, temporal, &["B08", "B04"], Some(max_cloud_cover));
    let ndvi = b.ndvi(&cube, "B08", "B04");
    b.save_result(&ndvi, "GTIFF", json!({ "output_band": "NDVI" }));
    b.build()
}

/// Sentinel-2 true colour bands B04, B03, B02, saved as GeoTIFF.
pub fn rgb_graph(
    collection: &str,
    spatial: &SpatialExtent,
    temporal: &TemporalExtent,
    max_cloud_cover: f64,
) -> ProcessGraph {
    let mut b = ProcessGraphBuilder::new();
    let cube = b.load_collection(
        collection,
        spatial,
        temporal,
        &["B04", "B03", "B02"],
        Some(max_cloud_cover),
    );
    b.save_result(&cube, "GTIFF", json!({ "output_band": "RGB" }));
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents() -> (SpatialExtent, TemporalExtent) {
        let spatial = SpatialExtent {
            west: -47.7,
            south: -22.75,
            east: -47.62,
            north: -22.68,
        };
        (spatial, TemporalExtent::parse("2023-01-01", "2023-12-31").unwrap())
    }

    #[test]
    fn test_ndvi_graph_structure() {
        let (s, t) = extents();
        let graph = ndvi_graph(SENTINEL2_L2A, &s, &t, 15.0);

        assert_eq!(graph.result_node(), Some("save_result1"));
        let load = graph.node("load_collection1").unwrap();
        assert_eq!(load["arguments"]["bands"], json!(["B08", "B04"]));
        assert_eq!(load["arguments"]["temporal_extent"], json!(["2023-01-01", "2023-12-31"]));
        assert_eq!(load["arguments"]["spatial_extent"]["west"], json!(-47.7));
        let cloud = &load["arguments"]["properties"]["eo:cloud_cover"]["process_graph"]["lte1"];
        assert_eq!(cloud["arguments"]["y"], json!(15.0));

        let reduce = graph.node("reduce_dimension1").unwrap();
        assert_eq!(reduce["arguments"]["data"], json!({ "from_node": "load_collection1" }));
        assert_eq!(reduce["arguments"]["dimension"], "bands");
        let divide = &reduce["arguments"]["reducer"]["process_graph"]["divide1"];
        assert_eq!(divide["result"], json!(true));

        let save = graph.node("save_result1").unwrap();
        assert_eq!(save["arguments"]["format"], "GTIFF");
        assert_eq!(save["arguments"]["options"]["output_band"], "NDVI");
    }

    #[test]
    fn test_rgb_graph() {
        let (s, t) = extents();
        let graph = rgb_graph(SENTINEL2_L2A, &s, &t, 15.0);
        assert_eq!(graph.0.len(), 2);
        assert_eq!(
            graph.node("load_collection1").unwrap()["arguments"]["bands"],
            json!(["B04", "B03", "B02"])
        );
    }

    #[test]
    fn test_node_ids_and_single_result() {
        let (s, t) = extents();
        let mut b = ProcessGraphBuilder::new();
        let a = b.load_collection("A", &s, &t, &["B04"], None);
        let c = b.load_collection("B", &s, &t, &["B04"], None);
        assert_eq!(a.id(), "load_collection1");
        assert_eq!(c.id(), "load_collection2");
        assert!(b.nodes["load_collection1"]["arguments"].get("properties").is_none());

        let graph = b.build();
        assert_eq!(graph.result_node(), Some("load_collection2"));
    }
}
