use std::collections::{BTreeMap, HashMap};

use eframe::egui::{Vec2, vec2};
use serde::Serialize;
use serde_json::Value;

use crate::error::{GraphError, Result};

pub const DEFAULT_NODE_COLOR: &str = "#6f8fb5";
pub const DEFAULT_EDGE_COLOR: &str = "#9aa4ae";
pub const DEFAULT_NODE_SIZE: f32 = 5.0;
pub const DEFAULT_EDGE_SIZE: f32 = 1.0;

/// Rendering variant of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Circle,
    Border,
    Image,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub size: f32,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub hidden: bool,
    pub highlighted: bool,
    #[serde(rename = "borderColor", skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(rename = "borderSize", skip_serializing_if = "Option::is_none")]
    pub border_size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub community: Option<String>,
    /// Size supplied with the node; styling keeps it instead of deriving one.
    #[serde(skip)]
    pub fixed_size: Option<f32>,
    #[serde(skip)]
    pub fixed_color: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// Serialized names of the typed node fields. Extension attributes may not reuse them.
pub const NODE_FIELDS: [&str; 13] = [
    "ID",
    "label",
    "description",
    "x",
    "y",
    "size",
    "color",
    "type",
    "hidden",
    "highlighted",
    "borderColor",
    "borderSize",
    "community",
];

pub const EDGE_FIELDS: [&str; 7] = ["id", "source", "target", "score", "size", "color", "interaction"];

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            description: None,
            x: None,
            y: None,
            size: DEFAULT_NODE_SIZE,
            color: DEFAULT_NODE_COLOR.to_owned(),
            kind: NodeKind::Circle,
            hidden: false,
            highlighted: false,
            border_color: None,
            border_size: None,
            community: None,
            fixed_size: None,
            fixed_color: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self.fixed_size = Some(size);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self.fixed_color = Some(self.color.clone());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// `None` until the node has been laid out or was given coordinates.
    pub fn position(&self) -> Option<Vec2> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(vec2(x, y)),
            _ => None,
        }
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.x = Some(position.x);
        self.y = Some(position.y);
    }

    /// Numeric view of an extension attribute. Numeric strings are accepted.
    pub fn numeric_attribute(&self, key: &str) -> Option<f64> {
        numeric_value(self.attributes.get(key)?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub score: f32,
    pub size: f32,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<String>,
    #[serde(skip)]
    pub fixed_size: Option<f32>,
    #[serde(skip)]
    pub fixed_color: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Edge {
    /// The id defaults to `source:target`; use [`Edge::with_id`] for parallel edges.
    pub fn new(source: impl Into<String>, target: impl Into<String>, score: f32) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{source}:{target}"),
            source,
            target,
            score,
            size: DEFAULT_EDGE_SIZE,
            color: DEFAULT_EDGE_COLOR.to_owned(),
            interaction: None,
            fixed_size: None,
            fixed_color: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// The opposite endpoint, if `node_id` is one of the two.
    pub fn other(&self, node_id: &str) -> Option<&str> {
        if self.source == node_id {
            Some(&self.target)
        } else if self.target == node_id {
            Some(&self.source)
        } else {
            None
        }
    }

    /// Weight for layout attraction: `score`, or a numeric extension attribute.
    pub fn weight(&self, attribute: Option<&str>) -> Option<f64> {
        match attribute {
            None | Some("score") => Some(self.score as f64),
            Some(key) => numeric_value(self.attributes.get(key)?),
        }
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    pub nodes: HashMap<String, Node>,
    pub edges: HashMap<String, Edge>,
}

impl Graph {
    /// Builds a graph, rejecting duplicate ids, self-loops and dangling edges.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let mut graph = Self {
            nodes: HashMap::with_capacity(nodes.len()),
            edges: HashMap::with_capacity(edges.len()),
        };

        for node in nodes {
            if graph.nodes.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            graph.nodes.insert(node.id.clone(), node);
        }

        for edge in edges {
            if graph.edges.contains_key(&edge.id) {
                return Err(GraphError::DuplicateEdge(edge.id));
            }
            graph.edges.insert(edge.id.clone(), edge);
        }

        graph.validate()?;
        Ok(graph)
    }

    /// Checks every invariant `from_parts` establishes, for graphs built by hand.
    pub fn validate(&self) -> Result<()> {
        for (key, node) in &self.nodes {
            if *key != node.id {
                return Err(GraphError::KeyMismatch {
                    key: key.clone(),
                    id: node.id.clone(),
                });
            }
            check_node(node)?;
        }
        for (key, edge) in &self.edges {
            if *key != edge.id {
                return Err(GraphError::KeyMismatch {
                    key: key.clone(),
                    id: edge.id.clone(),
                });
            }
            check_edge(edge, |id| self.nodes.contains_key(id))?;
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node ids in a stable order, for consumers that need determinism.
    pub fn sorted_node_ids(&self) -> Vec<String> {
        let mut ids = self.nodes.keys().cloned().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |edge| edge.touches(node_id))
    }

    pub fn neighbors(&self, node_id: &str) -> Vec<String> {
        let mut neighbors = self
            .incident_edges(node_id)
            .filter_map(|edge| edge.other(node_id))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    pub fn degree(&self, node_id: &str) -> usize {
        self.incident_edges(node_id).count()
    }
}

fn reserved_attribute<'a>(attributes: &'a BTreeMap<String, Value>, fields: &[&str]) -> Option<&'a str> {
    attributes
        .keys()
        .map(String::as_str)
        .find(|key| fields.contains(key))
}

pub(super) fn check_node(node: &Node) -> Result<()> {
    match reserved_attribute(&node.attributes, &NODE_FIELDS) {
        Some(key) => Err(GraphError::ReservedAttribute {
            owner: node.id.clone(),
            key: key.to_owned(),
        }),
        None => Ok(()),
    }
}

pub(super) fn check_edge(edge: &Edge, exists: impl Fn(&str) -> bool) -> Result<()> {
    if let Some(key) = reserved_attribute(&edge.attributes, &EDGE_FIELDS) {
        return Err(GraphError::ReservedAttribute {
            owner: edge.id.clone(),
            key: key.to_owned(),
        });
    }
    if edge.source == edge.target {
        return Err(GraphError::SelfLoop(edge.id.clone()));
    }

    for endpoint in [&edge.source, &edge.target] {
        if !exists(endpoint) {
            return Err(GraphError::DanglingEdge {
                edge: edge.id.clone(),
                node: endpoint.clone(),
            });
        }
    }
    Ok(())
}
