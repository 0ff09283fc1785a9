//! Graph state and force-directed layout for gene interaction networks.
//!
//! [`Store`] is the entry point: it owns the graph, runs layouts on
//! background threads, and keeps selection, search and hub analysis in step
//! with the graph.

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod radial;
pub mod selection;
pub mod store;
pub mod util;
pub mod worker;

pub use config::{EngineConfig, StyleConfig, WorkerConfig};
pub use error::{GraphError, Result};
pub use layout::{ForceAtlas2Settings, GenericForceSettings, LayoutKind, LayoutSettings};
pub use model::{Edge, Graph, GraphDocument, Node, NodeKind};
pub use radial::{RadialAnalysis, RadialAnalysisSetting, compute_hubs};
pub use selection::{SearchMode, SelectionBox};
pub use store::{GraphSnapshot, Store};
pub use worker::WorkerState;
