use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use eframe::egui::pos2;
use genenet::layout::{LayoutInput, LayoutState, LayoutStrategy};
use genenet::worker::LayoutSupervisor;
use genenet::{
    EngineConfig, ForceAtlas2Settings, GenericForceSettings, Graph, LayoutKind, LayoutSettings,
    RadialAnalysisSetting, SelectionBox, Store, WorkerConfig, WorkerState, compute_hubs,
};
use serde_json::json;

fn network() -> String {
    json!({
        "nodes": [
            {"ID": "ENSG00000147894", "label": "FTD-gene1", "x": 0.0, "y": 0.0, "expression": 4.2},
            {"ID": "ENSG00000089280", "label": "ALS-gene2", "x": 120.0, "y": 40.0, "Description": "RNA binding"},
            {"ID": "ENSG00000136997", "label": "gene3", "x": -80.0, "y": 90.0, "community": 2}
        ],
        "edges": [
            {"source": "ENSG00000147894", "target": "ENSG00000089280", "score": 0.9, "interaction": "physical"},
            {"source": "ENSG00000089280", "target": "ENSG00000136997", "score": 0.2}
        ]
    })
    .to_string()
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        worker: WorkerConfig {
            tick_interval_ms: 1,
            auto_stop_after_secs: 0.0,
            ..WorkerConfig::default()
        },
        ..EngineConfig::default()
    }
}

fn abc() -> Graph {
    let mut store = Store::default();
    store
        .load_json(
            &json!({
                "nodes": [{"ID": "A"}, {"ID": "B"}, {"ID": "C"}],
                "edges": [
                    {"source": "A", "target": "B", "score": 0.9},
                    {"source": "B", "target": "C", "score": 0.2}
                ]
            })
            .to_string(),
        )
        .expect("load");
    store.graph().clone()
}

fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[test]
fn loaded_nodes_are_readable_with_their_attributes() {
    let mut store = Store::default();
    assert_eq!(store.load_json(&network()).expect("load"), 1);

    let first = store.node("ENSG00000147894").expect("present");
    assert_eq!(first.label, "FTD-gene1");
    assert_eq!(first.numeric_attribute("expression"), Some(4.2));

    let second = store.node("ENSG00000089280").expect("present");
    assert_eq!(second.description.as_deref(), Some("RNA binding"));

    let third = store.node("ENSG00000136997").expect("present");
    assert_eq!(third.community.as_deref(), Some("2"));

    let edge = store
        .edge("ENSG00000147894:ENSG00000089280")
        .expect("edge id defaults to source:target");
    assert_eq!(edge.interaction.as_deref(), Some("physical"));
    assert!(store.node("ENSG00000000000").unwrap_err().is_not_found());
}

#[test]
fn dangling_edges_reject_the_whole_document() {
    let mut store = Store::default();
    store.load_json(&network()).expect("load");

    let broken = json!({
        "nodes": [{"ID": "A"}],
        "edges": [{"source": "A", "target": "missing", "score": 1.0}]
    });
    let error = store.load_json(&broken.to_string()).unwrap_err();
    assert!(error.is_validation());
    assert_eq!(store.generation(), 1);
    assert_eq!(store.graph().node_count(), 3);
}

#[test]
fn removing_a_node_leaves_no_dangling_edges() {
    let mut store = Store::default();
    store.load_json(&network()).expect("load");

    let removed = store.remove_node("ENSG00000089280").expect("present");
    assert_eq!(removed.edges.len(), 2);
    assert_eq!(store.graph().edge_count(), 0);
    for edge in store.graph().edges.values() {
        assert!(store.node(&edge.source).is_ok() && store.node(&edge.target).is_ok());
    }
}

#[test]
fn hub_scenario_counts_only_edges_above_the_cut_off() {
    let setting = RadialAnalysisSetting {
        edge_weight_cut_off: 0.5,
        hub_gene_edge_count: 1,
        ..RadialAnalysisSetting::default()
    };
    let graph = abc();
    let analysis = compute_hubs(&graph, &setting);

    assert_eq!(analysis.hubs, ids(&["A", "B"]));
    assert_eq!(analysis.edges, ids(&["A:B"]));
    assert_eq!(analysis, compute_hubs(&graph, &setting));
}

#[test]
fn edgeless_graph_has_no_hubs() {
    let mut store = Store::default();
    store
        .load_json(&json!({"nodes": [{"ID": "A"}, {"ID": "B"}], "edges": []}).to_string())
        .expect("load");

    for hub_gene_edge_count in [0, 1, 3] {
        let analysis = store.set_radial_settings(RadialAnalysisSetting {
            edge_weight_cut_off: 0.0,
            hub_gene_edge_count,
            ..RadialAnalysisSetting::default()
        });
        assert!(analysis.hubs.is_empty());
    }
}

#[test]
fn box_selection_is_pruned_when_the_node_disappears() {
    let mut store = Store::default();
    store.load_json(&network()).expect("load");

    let area = SelectionBox::new(pos2(-5.0, -5.0), pos2(5.0, 5.0));
    assert_eq!(store.select_by_box(&area), &ids(&["ENSG00000147894"]));

    let without = json!({
        "nodes": [{"ID": "ENSG00000089280"}, {"ID": "ENSG00000136997"}],
        "edges": []
    });
    store.load_json(&without.to_string()).expect("reload");
    assert!(store.selection().is_empty());
}

#[test]
fn search_highlights_only_the_matching_label() {
    let mut store = Store::default();
    store.load_json(&network()).expect("load");

    store.set_search_query("ftd");
    let highlighted = store
        .graph()
        .nodes
        .values()
        .filter(|node| node.highlighted)
        .map(|node| node.id.clone())
        .collect::<BTreeSet<_>>();
    assert_eq!(highlighted, ids(&["ENSG00000147894"]));
}

#[test]
fn starting_twice_keeps_a_single_run_and_kill_resets() {
    let config = fast_config();
    let graph = abc();
    let mut supervisor = LayoutSupervisor::new(config.worker.clone());
    let settings = LayoutSettings::from(ForceAtlas2Settings::default());

    supervisor.start(settings.clone(), LayoutInput::from_graph(&graph, 1, None));
    let run_id = supervisor
        .handle(LayoutKind::ForceAtlas2)
        .expect("running")
        .run_id();
    supervisor.start(settings.clone(), LayoutInput::from_graph(&graph, 1, None));
    assert_eq!(
        supervisor.handle(LayoutKind::ForceAtlas2).expect("running").run_id(),
        run_id
    );
    assert_eq!(supervisor.running_kinds(), vec![LayoutKind::ForceAtlas2]);

    supervisor.kill(LayoutKind::ForceAtlas2);
    supervisor.kill(LayoutKind::ForceAtlas2);
    assert_eq!(supervisor.state(LayoutKind::ForceAtlas2), WorkerState::Idle);
    assert!(supervisor.collect_frames().is_empty());

    assert_eq!(
        supervisor.start(settings, LayoutInput::from_graph(&graph, 1, None)),
        WorkerState::Running
    );
    assert_ne!(
        supervisor.handle(LayoutKind::ForceAtlas2).expect("running").run_id(),
        run_id
    );
}

#[test]
fn layout_results_reach_the_graph_through_pump() {
    let mut store = Store::new(fast_config());
    store.load_json(&network()).expect("load");
    let before = store.node("ENSG00000136997").expect("node").position();

    store.start_default_layout(LayoutKind::Force);
    let deadline = Instant::now() + Duration::from_secs(5);
    while store.pump() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert_ne!(store.node("ENSG00000136997").expect("node").position(), before);

    store.kill_layout(LayoutKind::Force);
    let revision = store.revision();
    std::thread::sleep(Duration::from_millis(10));
    store.pump();
    assert_eq!(store.revision(), revision);
}

#[test]
fn isolated_nodes_stay_bounded_under_both_layouts() {
    let mut store = Store::default();
    store
        .load_json(
            &json!({
                "nodes": [{"ID": "LONE"}, {"ID": "A"}, {"ID": "B"}],
                "edges": [{"source": "A", "target": "B", "score": 0.0}]
            })
            .to_string(),
        )
        .expect("load");
    let input = LayoutInput::from_graph(store.graph(), store.generation(), None);

    let strategies = [
        LayoutSettings::from(GenericForceSettings::default()),
        LayoutSettings::from(ForceAtlas2Settings::default()),
    ];
    for settings in strategies {
        let mut strategy = settings.build_strategy();
        let mut state = LayoutState::from_input(&input);
        for _ in 0..800 {
            strategy.tick(&mut state);
        }
        let centroid = state.centroid();
        for position in &state.positions {
            assert!(position.x.is_finite() && position.y.is_finite(), "{:?}", settings.kind());
            assert!((*position - centroid).length() < 10_000.0, "{:?}", settings.kind());
        }
    }
}

#[test]
fn snapshot_lists_derived_state() {
    let mut store = Store::default();
    store.load_json(&network()).expect("load");
    store.set_selection(["ENSG00000136997"]);
    store.set_search_query("gene");
    store.set_radial_settings(RadialAnalysisSetting {
        edge_weight_cut_off: 0.5,
        hub_gene_edge_count: 1,
        ..RadialAnalysisSetting::default()
    });

    let snapshot = store.snapshot();
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.selection, vec!["ENSG00000136997".to_owned()]);
    assert_eq!(snapshot.search_matches.len(), 3);
    assert_eq!(
        snapshot.hubs,
        vec!["ENSG00000089280".to_owned(), "ENSG00000147894".to_owned()]
    );

    let value = serde_json::to_value(&snapshot).expect("serialise");
    assert_eq!(value["nodes"][0]["ID"], json!("ENSG00000089280"));
}

#[test]
fn supplied_size_and_color_reach_nodes_and_snapshot_once() {
    let mut store = Store::default();
    store
        .load_json(
            &json!({
                "nodes": [{"ID": "A", "size": 12, "color": "#ff0000"}, {"ID": "B"}],
                "edges": [{"source": "A", "target": "B", "score": 0.5}]
            })
            .to_string(),
        )
        .expect("load");

    let node = store.node("A").expect("A");
    assert_eq!(node.size, 12.0);
    assert_eq!(node.color, "#ff0000");

    store.add_nodes(vec![genenet::Node::new("C")]).expect("add");
    assert_eq!(store.node("A").expect("A").size, 12.0);

    let raw = serde_json::to_string(&store.snapshot()).expect("serialise");
    let first_node = raw.split("},{").next().expect("first node");
    assert_eq!(first_node.matches("\"size\"").count(), 1);
    assert_eq!(first_node.matches("\"color\"").count(), 1);

    let value = serde_json::to_value(store.snapshot()).expect("serialise");
    assert_eq!(value["nodes"][0]["size"], json!(12.0));
    assert_eq!(value["nodes"][0]["color"], json!("#ff0000"));
}
