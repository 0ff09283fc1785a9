use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::graph::{DEFAULT_EDGE_COLOR, DEFAULT_EDGE_SIZE, DEFAULT_NODE_COLOR, DEFAULT_NODE_SIZE};
use super::{Edge, Graph, Node, NodeKind};
use crate::error::{GraphError, Result};

/// Serialized graph as produced by the query layer.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub edges: Vec<RawEdge>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawNode {
    #[serde(rename = "ID", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "Description")]
    pub description: Option<String>,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default, rename = "type")]
    pub kind: Option<NodeKind>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Accepted so it never lands in `attributes`; highlights come from search.
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default, rename = "borderColor")]
    pub border_color: Option<String>,
    #[serde(default, rename = "borderSize")]
    pub border_size: Option<f32>,
    #[serde(default, deserialize_with = "community_id")]
    pub community: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub interaction: Option<String>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

// Community ids arrive as either numbers or strings depending on the clustering backend.
fn community_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

impl GraphDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Converts into a validated [`Graph`]. Edges without an id get
    /// `source:target`, suffixed with `#n` when that id is already taken.
    pub fn into_graph(self) -> Result<Graph> {
        let nodes = self.nodes.into_iter().map(RawNode::into_node).collect::<Vec<_>>();

        let explicit = self
            .edges
            .iter()
            .filter_map(|edge| edge.id.clone())
            .collect::<HashSet<_>>();
        let mut taken = HashSet::with_capacity(self.edges.len());
        let mut edges = Vec::with_capacity(self.edges.len());
        for raw in self.edges {
            let id = match raw.id.clone() {
                Some(id) => id,
                None => {
                    let base = format!("{}:{}", raw.source, raw.target);
                    let mut candidate = base.clone();
                    let mut suffix = 1usize;
                    while taken.contains(&candidate) || explicit.contains(&candidate) {
                        candidate = format!("{base}#{suffix}");
                        suffix += 1;
                    }
                    candidate
                }
            };
            taken.insert(id.clone());
            edges.push(raw.into_edge(id));
        }

        Graph::from_parts(nodes, edges)
    }
}

impl RawNode {
    fn into_node(self) -> Node {
        Node {
            label: self.label.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            x: self.x,
            y: self.y,
            size: self.size.unwrap_or(DEFAULT_NODE_SIZE),
            color: self.color.clone().unwrap_or_else(|| DEFAULT_NODE_COLOR.to_owned()),
            kind: self.kind.unwrap_or_default(),
            hidden: self.hidden,
            highlighted: false,
            border_color: self.border_color,
            border_size: self.border_size,
            community: self.community,
            fixed_size: self.size,
            fixed_color: self.color,
            attributes: self.attributes,
        }
    }
}

impl RawEdge {
    fn into_edge(self, id: String) -> Edge {
        Edge {
            id,
            source: self.source,
            target: self.target,
            score: self.score,
            size: self.size.unwrap_or(DEFAULT_EDGE_SIZE),
            color: self.color.clone().unwrap_or_else(|| DEFAULT_EDGE_COLOR.to_owned()),
            interaction: self.interaction,
            fixed_size: self.size,
            fixed_color: self.color,
            attributes: self.attributes,
        }
    }
}
