use thiserror::Error;

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: String, node: String },

    #[error("duplicate node id {0}")]
    DuplicateNode(String),

    #[error("duplicate edge id {0}")]
    DuplicateEdge(String),

    #[error("edge {0} connects a node to itself")]
    SelfLoop(String),

    #[error("entry keyed {key} holds id {id}")]
    KeyMismatch { key: String, id: String },

    #[error("{owner} has an attribute named {key}, which is a reserved field")]
    ReservedAttribute { owner: String, key: String },

    #[error("node {0} not found")]
    NodeNotFound(String),

    #[error("edge {0} not found")]
    EdgeNotFound(String),

    #[error("malformed graph document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl GraphError {
    /// Input that was rejected as a whole without touching the graph.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DanglingEdge { .. }
                | Self::DuplicateNode(_)
                | Self::DuplicateEdge(_)
                | Self::SelfLoop(_)
                | Self::KeyMismatch { .. }
                | Self::ReservedAttribute { .. }
                | Self::Document(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NodeNotFound(_) | Self::EdgeNotFound(_))
    }
}
