//! Graph document model.
//!
//! Texture graphs are authored as JSON: a flat node list plus a connection
//! list wiring output ports to input ports. The compiler treats nodes
//! opaquely except for identity, params, and connectivity; per-type behavior
//! lives in [`crate::nodes`].

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Graph {
    pub version: String,
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Metadata {
    pub name: String,
    pub created: Option<String>,
    pub modified: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub params: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub id: String,
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    #[serde(rename = "nodeId")]
    pub node_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

/// Node types that carry a literal value instead of generated code.
///
/// These are resolved inline by the code-generation context and never
/// scheduled by the topological sorter.
const VALUE_NODE_TYPES: &[&str] = &[
    "FloatInput",
    "IntInput",
    "BoolInput",
    "Vector2Input",
    "Vector3Input",
    "Vector4Input",
    "ColorInput",
];

pub fn is_value_node_type(node_type: &str) -> bool {
    VALUE_NODE_TYPES.contains(&node_type)
}

impl Graph {
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Graph> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read graph json at {}", path.display()))?;
        let graph: Graph = serde_json::from_str(&text).context("failed to parse graph json")?;
        Ok(graph)
    }

    pub fn node(&self, node_id: &str) -> Result<&Node, CompileError> {
        self.nodes
            .iter()
            .find(|n| n.id == node_id)
            .ok_or_else(|| CompileError::NodeNotFound(node_id.to_string()))
    }

    pub fn incoming_connection(&self, to_node_id: &str, to_port_id: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.to.node_id == to_node_id && c.to.port_id == to_port_id)
    }

    /// Incoming connections of `node_id`, in document order.
    pub fn incoming_connections(&self, node_id: &str) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(move |c| c.to.node_id == node_id)
    }

    /// Resolve the constant value feeding `node.port`, if any.
    ///
    /// Resolution order: a connected value node's `value` param wins, else
    /// the node's own inline param under the port name. `Ok(None)` means the
    /// caller should fall back to the port's declared default.
    pub fn const_input_value(
        &self,
        node: &Node,
        port: &str,
    ) -> Result<Option<ConstValue>, CompileError> {
        if let Some(conn) = self.incoming_connection(&node.id, port) {
            let producer = self.node(&conn.from.node_id)?;
            if is_value_node_type(&producer.node_type) {
                let raw = producer.params.get("value").ok_or_else(|| {
                    CompileError::PortResolution {
                        node_id: producer.id.clone(),
                        port: "value".to_string(),
                        detail: format!("{} node has no 'value' param", producer.node_type),
                    }
                })?;
                let value = ConstValue::from_json(raw).ok_or_else(|| {
                    CompileError::PortResolution {
                        node_id: producer.id.clone(),
                        port: "value".to_string(),
                        detail: format!("unparseable constant: {raw}"),
                    }
                })?;
                return Ok(Some(value));
            }
            // Connected to a real producer; not a constant.
            return Ok(None);
        }

        Ok(node.params.get(port).and_then(ConstValue::from_json))
    }

    /// Drops nodes that do not participate in any connection and are not in
    /// `keep`, so later stages do not trip over editor leftovers.
    pub fn treeshake_unlinked_nodes(&self, keep: &HashSet<&str>) -> Graph {
        let mut linked: HashSet<&str> = keep.clone();
        for c in &self.connections {
            linked.insert(c.from.node_id.as_str());
            linked.insert(c.to.node_id.as_str());
        }

        let nodes: Vec<Node> = self
            .nodes
            .iter()
            .filter(|n| linked.contains(n.id.as_str()))
            .cloned()
            .collect();

        Graph {
            version: self.version.clone(),
            metadata: self.metadata.clone(),
            nodes,
            connections: self.connections.clone(),
        }
    }
}

// ── Param accessors ──────────────────────────────────────────────────────

pub fn parse_f32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<f32> {
    match params.get(key) {
        Some(v) => v
            .as_f64()
            .map(|x| x as f32)
            .or_else(|| v.as_u64().map(|x| x as f32))
            .or_else(|| v.as_i64().map(|x| x as f32)),
        None => None,
    }
}

pub fn parse_u32(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<u32> {
    params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
}

pub fn parse_str<'a>(params: &'a HashMap<String, serde_json::Value>, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn parse_bool(params: &HashMap<String, serde_json::Value>, key: &str) -> Option<bool> {
    params.get(key).and_then(|v| v.as_bool())
}

impl Node {
    pub fn param_f32(&self, key: &str, default: f32) -> f32 {
        parse_f32(&self.params, key).unwrap_or(default)
    }

    pub fn param_u32(&self, key: &str, default: u32) -> u32 {
        parse_u32(&self.params, key).unwrap_or(default)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        parse_str(&self.params, key)
    }

    pub fn param_bool(&self, key: &str, default: bool) -> bool {
        parse_bool(&self.params, key).unwrap_or(default)
    }
}

// ── Constant values ──────────────────────────────────────────────────────

/// A literal resolved from the graph's constant/variable system.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Float(f32),
    Int(i64),
    Bool(bool),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
}

impl ConstValue {
    pub fn from_json(v: &serde_json::Value) -> Option<ConstValue> {
        if let Some(b) = v.as_bool() {
            return Some(ConstValue::Bool(b));
        }
        if v.is_i64() || v.is_u64() {
            return v.as_i64().map(ConstValue::Int);
        }
        if let Some(f) = v.as_f64() {
            return Some(ConstValue::Float(f as f32));
        }
        if let Some(arr) = v.as_array() {
            let comps: Option<Vec<f32>> =
                arr.iter().map(|x| x.as_f64().map(|f| f as f32)).collect();
            let comps = comps?;
            return match comps.as_slice() {
                [x, y] => Some(ConstValue::Vec2([*x, *y])),
                [x, y, z] => Some(ConstValue::Vec3([*x, *y, *z])),
                [x, y, z, w] => Some(ConstValue::Vec4([*x, *y, *z, *w])),
                _ => None,
            };
        }
        if let Some(obj) = v.as_object() {
            let get = |a: &str, b: &str| {
                obj.get(a)
                    .or_else(|| obj.get(b))
                    .and_then(|x| x.as_f64())
                    .map(|f| f as f32)
            };
            let r = get("r", "x")?;
            let g = get("g", "y")?;
            let b = get("b", "z")?;
            let a = get("a", "w").unwrap_or(1.0);
            return Some(ConstValue::Vec4([r, g, b, a]));
        }
        None
    }
}

/// Format an `f32` as an HLSL literal (always with a decimal point so the
/// downstream compiler never infers an int).
pub fn fmt_f32(v: f32) -> String {
    if v.fract() == 0.0 && v.abs() < 1.0e9 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
