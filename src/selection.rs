use std::collections::BTreeSet;

use eframe::egui::{Pos2, Rect, Vec2};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::{Deserialize, Serialize};

use crate::model::{Graph, Node};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive substring of label, id or description.
    #[default]
    Substring,
    /// Skim-style fuzzy match of the same fields.
    Fuzzy,
}

/// Rectangle dragged out on the canvas, in the same space as node positions.
/// The corners may come in any order.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectionBox {
    #[serde(rename = "startX")]
    pub start_x: f32,
    #[serde(rename = "startY")]
    pub start_y: f32,
    #[serde(rename = "endX")]
    pub end_x: f32,
    #[serde(rename = "endY")]
    pub end_y: f32,
}

impl SelectionBox {
    pub fn new(start: Pos2, end: Pos2) -> Self {
        Self {
            start_x: start.x,
            start_y: start.y,
            end_x: end.x,
            end_y: end.y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_two_pos(
            Pos2::new(self.start_x, self.start_y),
            Pos2::new(self.end_x, self.end_y),
        )
    }

    /// Borders count as inside.
    pub fn contains(&self, position: Vec2) -> bool {
        self.rect().contains(position.to_pos2())
    }
}

#[derive(Debug, Default)]
pub struct SelectionState {
    selected: BTreeSet<String>,
    query: String,
    mode: SearchMode,
    matches: BTreeSet<String>,
}

impl SelectionState {
    pub fn new(mode: SearchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn matches(&self) -> &BTreeSet<String> {
        &self.matches
    }

    /// Replaces the selection. Ids not in `graph` are dropped without error.
    pub fn set_selection<I, S>(&mut self, ids: I, graph: &Graph)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.selected = ids
            .into_iter()
            .filter(|id| graph.nodes.contains_key(id.as_ref()))
            .map(|id| id.as_ref().to_owned())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Replaces the selection with every positioned id inside `area`.
    pub fn select_by_box<'a>(
        &mut self,
        area: &SelectionBox,
        positions: impl IntoIterator<Item = (&'a str, Vec2)>,
    ) -> &BTreeSet<String> {
        self.selected = positions
            .into_iter()
            .filter(|(_, position)| area.contains(*position))
            .map(|(id, _)| id.to_owned())
            .collect();
        &self.selected
    }

    /// Stores the query and recomputes the match set over `graph`.
    /// The caller writes the result into the nodes' `highlighted` flags.
    pub fn set_search_query(&mut self, text: &str, graph: &Graph) -> &BTreeSet<String> {
        self.query = text.to_owned();
        self.rematch(graph);
        &self.matches
    }

    pub fn set_mode(&mut self, mode: SearchMode, graph: &Graph) {
        self.mode = mode;
        self.rematch(graph);
    }

    /// Drops selected and matched ids that are no longer in `graph`.
    pub fn prune(&mut self, graph: &Graph) {
        self.selected.retain(|id| graph.nodes.contains_key(id));
        self.matches.retain(|id| graph.nodes.contains_key(id));
    }

    /// Prunes, then re-runs the search so new nodes can match.
    pub fn refresh(&mut self, graph: &Graph) {
        self.prune(graph);
        self.rematch(graph);
    }

    fn rematch(&mut self, graph: &Graph) {
        let query = self.query.trim();
        if query.is_empty() {
            self.matches.clear();
            return;
        }

        self.matches = match self.mode {
            SearchMode::Substring => {
                let needle = query.to_lowercase();
                graph
                    .nodes
                    .values()
                    .filter(|node| substring_match(node, &needle))
                    .map(|node| node.id.clone())
                    .collect()
            }
            SearchMode::Fuzzy => {
                let matcher = SkimMatcherV2::default().ignore_case();
                graph
                    .nodes
                    .values()
                    .filter(|node| searchable_fields(node).any(|field| matcher.fuzzy_match(field, query).is_some()))
                    .map(|node| node.id.clone())
                    .collect()
            }
        };
    }
}

fn searchable_fields(node: &Node) -> impl Iterator<Item = &str> {
    [Some(node.label.as_str()), Some(node.id.as_str()), node.description.as_deref()]
        .into_iter()
        .flatten()
}

fn substring_match(node: &Node, needle: &str) -> bool {
    searchable_fields(node).any(|field| field.to_lowercase().contains(needle))
}
