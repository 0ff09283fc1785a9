//! Hub detection over the score-filtered graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::Graph;

/// Thresholds driving [`compute_hubs`]. All cut-offs are inclusive.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RadialAnalysisSetting {
    /// Edges scoring below this do not count.
    pub edge_weight_cut_off: f32,
    /// Minimum value of `node_degree_property` for a node to be retained.
    pub node_degree_cut_off: f64,
    /// Filtered degree a node needs to be called a hub.
    pub hub_gene_edge_count: usize,
    /// Per-node numeric attribute compared against `node_degree_cut_off`;
    /// the filtered degree is used when unset.
    pub node_degree_property: Option<String>,
}

impl Default for RadialAnalysisSetting {
    fn default() -> Self {
        Self {
            edge_weight_cut_off: 0.5,
            node_degree_cut_off: 0.0,
            hub_gene_edge_count: 5,
            node_degree_property: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RadialAnalysis {
    /// Ids of edges with `score >= edge_weight_cut_off`.
    pub edges: BTreeSet<String>,
    /// Filtered degree of every node in the graph.
    pub degrees: BTreeMap<String, usize>,
    pub hubs: BTreeSet<String>,
    pub retained_nodes: BTreeSet<String>,
}

impl RadialAnalysis {
    pub fn is_hub(&self, id: &str) -> bool {
        self.hubs.contains(id)
    }

    pub fn degree(&self, id: &str) -> usize {
        self.degrees.get(id).copied().unwrap_or(0)
    }
}

/// Pure function of its inputs; equal inputs give equal output.
pub fn compute_hubs(graph: &Graph, settings: &RadialAnalysisSetting) -> RadialAnalysis {
    let mut degrees = graph
        .nodes
        .keys()
        .map(|id| (id.clone(), 0usize))
        .collect::<BTreeMap<_, _>>();
    let mut edges = BTreeSet::new();

    for edge in graph.edges.values() {
        if edge.score.is_nan() || edge.score < settings.edge_weight_cut_off {
            continue;
        }
        edges.insert(edge.id.clone());
        for endpoint in [&edge.source, &edge.target] {
            if let Some(degree) = degrees.get_mut(endpoint) {
                *degree += 1;
            }
        }
    }

    let hubs = degrees
        .iter()
        .filter(|(_, degree)| **degree >= 1 && **degree >= settings.hub_gene_edge_count)
        .map(|(id, _)| id.clone())
        .collect();

    let retained_nodes = degrees
        .iter()
        .filter(|(id, degree)| {
            let value = match settings.node_degree_property.as_deref() {
                Some(property) => graph
                    .nodes
                    .get(id.as_str())
                    .and_then(|node| node.numeric_attribute(property)),
                None => Some(**degree as f64),
            };
            value.is_some_and(|value| value >= settings.node_degree_cut_off)
        })
        .map(|(id, _)| id.clone())
        .collect();

    RadialAnalysis {
        edges,
        degrees,
        hubs,
        retained_nodes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};

    fn abc() -> Graph {
        Graph::from_parts(
            vec![
                Node::new("A").with_attribute("expression", 3.5),
                Node::new("B").with_attribute("expression", "1.0"),
                Node::new("C"),
            ],
            vec![Edge::new("A", "B", 0.9), Edge::new("B", "C", 0.2)],
        )
        .expect("graph")
    }

    fn settings(hub_gene_edge_count: usize) -> RadialAnalysisSetting {
        RadialAnalysisSetting {
            edge_weight_cut_off: 0.5,
            hub_gene_edge_count,
            ..RadialAnalysisSetting::default()
        }
    }

    #[test]
    fn only_edges_above_the_cut_off_count_toward_degree() {
        let analysis = compute_hubs(&abc(), &settings(1));
        assert_eq!(analysis.hubs, BTreeSet::from(["A".to_owned(), "B".to_owned()]));
        assert_eq!(analysis.edges, BTreeSet::from(["A:B".to_owned()]));
        assert_eq!(analysis.degree("C"), 0);
        assert!(!analysis.is_hub("C"));
    }

    #[test]
    fn cut_offs_are_inclusive() {
        let mut setting = settings(1);
        setting.edge_weight_cut_off = 0.2;
        let analysis = compute_hubs(&abc(), &setting);
        assert_eq!(analysis.edges.len(), 2);
        assert_eq!(analysis.degree("B"), 2);
        assert!(analysis.is_hub("C"));
    }

    #[test]
    fn edgeless_graph_has_no_hubs_for_any_threshold() {
        let graph = Graph::from_parts(vec![Node::new("A"), Node::new("B")], Vec::new())
            .expect("graph");
        for hub_gene_edge_count in [0, 1, 10] {
            let analysis = compute_hubs(&graph, &settings(hub_gene_edge_count));
            assert!(analysis.hubs.is_empty());
            assert!(analysis.edges.is_empty());
        }
    }

    #[test]
    fn degree_property_prunes_nodes_below_or_without_it() {
        let setting = RadialAnalysisSetting {
            node_degree_cut_off: 1.0,
            node_degree_property: Some("expression".to_owned()),
            ..settings(1)
        };
        let analysis = compute_hubs(&abc(), &setting);
        assert_eq!(
            analysis.retained_nodes,
            BTreeSet::from(["A".to_owned(), "B".to_owned()])
        );

        let by_degree = compute_hubs(
            &abc(),
            &RadialAnalysisSetting {
                node_degree_cut_off: 1.0,
                ..settings(1)
            },
        );
        assert_eq!(by_degree.retained_nodes, by_degree.hubs);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let graph = abc();
        let setting = settings(1);
        assert_eq!(compute_hubs(&graph, &setting), compute_hubs(&graph, &setting));
    }
}
