use eframe::egui::Color32;
use serde_json::Value;

use super::Graph;
use crate::config::{ScaleKind, StyleConfig};
use crate::util::{color_to_hex, lerp_color, normalize_linear, normalize_log, parse_hex_color};

const FALLBACK_LOW: Color32 = Color32::from_rgb(60, 150, 215);
const FALLBACK_HIGH: Color32 = Color32::from_rgb(245, 80, 60);

fn ramp(colors: &[String; 2]) -> (Color32, Color32) {
    (
        parse_hex_color(&colors[0]).unwrap_or(FALLBACK_LOW),
        parse_hex_color(&colors[1]).unwrap_or(FALLBACK_HIGH),
    )
}

fn range_of(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|value| value.is_finite()).fold(None, |range, value| match range {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

fn normalize(scale: ScaleKind, value: f64, min: f64, max: f64) -> f32 {
    match scale {
        ScaleKind::Linear => normalize_linear(value, min, max),
        ScaleKind::Log => normalize_log(value, min, max),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
        Some(Value::String(text)) => !text.is_empty() && text != "0" && text != "false",
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
        Some(Value::Null) | None => false,
    }
}

/// Recomputes the derived `size`/`color` of every node and edge. Values
/// supplied with the input (`fixed_size`/`fixed_color`) are kept as given.
pub fn apply_styles(graph: &mut Graph, style: &StyleConfig) {
    style_nodes(graph, style);
    style_edges(graph, style);
}

fn style_nodes(graph: &mut Graph, style: &StyleConfig) {
    let size_range = style.node_size_property.as_deref().and_then(|key| {
        range_of(graph.nodes.values().filter_map(|node| node.numeric_attribute(key)))
    });
    let color_range = style.node_color_property.as_deref().and_then(|key| {
        range_of(graph.nodes.values().filter_map(|node| node.numeric_attribute(key)))
    });
    let (low, high) = ramp(&style.node_color_ramp);
    let disease_color = style.disease_color.clone();

    for node in graph.nodes.values_mut() {
        node.size = node.fixed_size.unwrap_or_else(|| {
            match (style.node_size_property.as_deref(), size_range) {
                (Some(key), Some((min, max))) => match node.numeric_attribute(key) {
                    Some(value) => {
                        let t = normalize(style.node_size_scale, value, min, max);
                        style.node_size_range[0] + (style.node_size_range[1] - style.node_size_range[0]) * t
                    }
                    None => style.default_node_size,
                },
                _ => style.default_node_size,
            }
        });

        if let Some(color) = &node.fixed_color {
            node.color = color.clone();
            continue;
        }
        let is_disease = style
            .disease_property
            .as_deref()
            .is_some_and(|key| truthy(node.attributes.get(key)));
        node.color = if is_disease {
            disease_color.clone()
        } else {
            match (style.node_color_property.as_deref(), color_range) {
                (Some(key), Some((min, max))) => match node.numeric_attribute(key) {
                    Some(value) => color_to_hex(lerp_color(low, high, normalize_linear(value, min, max))),
                    None => style.default_node_color.clone(),
                },
                _ => style.default_node_color.clone(),
            }
        };
    }
}

fn style_edges(graph: &mut Graph, style: &StyleConfig) {
    let (min, max) = match style.score_range {
        Some([min, max]) => (min as f64, max as f64),
        None => range_of(graph.edges.values().map(|edge| edge.score as f64)).unwrap_or((0.0, 1.0)),
    };
    let (low, high) = ramp(&style.edge_color_ramp);
    let [min_size, max_size] = style.edge_size_range;

    for edge in graph.edges.values_mut() {
        let t = edge
            .score
            .is_finite()
            .then(|| normalize_linear(edge.score as f64, min, max));

        edge.size = match (edge.fixed_size, t) {
            (Some(size), _) => size,
            (None, Some(t)) => min_size + (max_size - min_size) * t,
            (None, None) => style.default_edge_size,
        };
        edge.color = match (&edge.fixed_color, t) {
            (Some(color), _) => color.clone(),
            (None, Some(t)) => color_to_hex(lerp_color(low, high, t)),
            (None, None) => style.default_edge_color.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};

    fn graph() -> Graph {
        Graph::from_parts(
            vec![
                Node::new("A").with_attribute("degree", 10).with_attribute("disease", true),
                Node::new("B").with_attribute("degree", 1).with_attribute("logFC", -2.0),
                Node::new("C").with_attribute("logFC", 2.0),
            ],
            vec![Edge::new("A", "B", 200.0), Edge::new("B", "C", 900.0)],
        )
        .expect("valid graph")
    }

    #[test]
    fn edge_size_is_monotonic_in_score() {
        let mut graph = graph();
        apply_styles(&mut graph, &StyleConfig::default());

        let weak = &graph.edges["A:B"];
        let strong = &graph.edges["B:C"];
        assert!(strong.size > weak.size);
        assert_eq!(weak.color, "#d9dde1");
        assert_eq!(strong.color, "#37474f");
    }

    #[test]
    fn node_size_and_color_follow_configured_properties() {
        let mut graph = graph();
        let style = StyleConfig {
            node_size_property: Some("degree".to_owned()),
            node_color_property: Some("logFC".to_owned()),
            disease_property: Some("disease".to_owned()),
            ..StyleConfig::default()
        };
        apply_styles(&mut graph, &style);

        assert_eq!(graph.nodes["A"].size, 15.0);
        assert_eq!(graph.nodes["B"].size, 3.0);
        assert_eq!(graph.nodes["C"].size, style.default_node_size);

        assert_eq!(graph.nodes["A"].color, style.disease_color);
        assert_eq!(graph.nodes["B"].color, "#3c96d7");
        assert_eq!(graph.nodes["C"].color, "#f5503c");
    }

    #[test]
    fn supplied_size_and_color_survive_restyling() {
        let mut graph = Graph::from_parts(
            vec![
                Node::new("A").with_size(12.0).with_color("#ff0000").with_attribute("degree", 10),
                Node::new("B").with_attribute("degree", 1),
            ],
            vec![Edge::new("A", "B", 0.4)],
        )
        .expect("valid graph");
        let style = StyleConfig {
            node_size_property: Some("degree".to_owned()),
            ..StyleConfig::default()
        };

        apply_styles(&mut graph, &style);
        apply_styles(&mut graph, &style);

        assert_eq!(graph.nodes["A"].size, 12.0);
        assert_eq!(graph.nodes["A"].color, "#ff0000");
        assert_eq!(graph.nodes["B"].size, style.node_size_range[0]);
    }

    #[test]
    fn fixed_score_range_clamps() {
        let mut graph = graph();
        let style = StyleConfig {
            score_range: Some([0.0, 1000.0]),
            ..StyleConfig::default()
        };
        apply_styles(&mut graph, &style);

        let edge = &graph.edges["A:B"];
        assert!((edge.size - (0.5 + 3.5 * 0.2)).abs() < 1e-4);
    }
}
