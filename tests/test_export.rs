use roi_extract::export::{self, GraphExecutor, Node, RoiExtractorGraph, ROI_EXTRACTOR_OP};
use roi_extract::{ExtractorConfig, Rois, SingleRoIExtractor};

mod common;

use common::{CHANNELS, STRIDES};

fn extractor(strides: &[u32], out_fp16: bool) -> SingleRoIExtractor {
    let config = ExtractorConfig::new()
        .with_featmap_strides(strides)
        .with_out_channels(CHANNELS)
        .with_sampling_ratio(2)
        .with_out_fp16(out_fp16);
    SingleRoIExtractor::new(config).unwrap()
}

#[test]
fn level_loop_is_unrolled() {
    let graph = export::trace(&extractor(&STRIDES, false), None);
    assert_eq!(graph.inputs.len(), 5);
    assert_eq!(graph.count_nodes("map_levels"), 1);
    assert_eq!(graph.count_nodes("nonzero"), 4);
    assert_eq!(graph.count_nodes("index_select"), 4);
    assert_eq!(graph.count_nodes("pool"), 4);
    assert_eq!(graph.count_nodes("concat"), 2);
    assert_eq!(graph.count_nodes("topk"), 1);
    assert_eq!(graph.count_nodes("gather"), 1);
    assert_eq!(graph.count_nodes("rescale"), 0);
    assert!(graph.nodes.iter().any(|n| matches!(n, Node::TopK { largest: false, .. })));
}

#[test]
fn single_level_traces_to_one_pool() {
    let graph = export::trace(&extractor(&[16], true), Some(2.0));
    let names: Vec<&str> = graph.nodes.iter().map(Node::name).collect();
    assert_eq!(names, vec!["pool", "cast_f16"]);
}

#[test]
fn custom_op_carries_layer_attributes() {
    let op = export::custom_op(&extractor(&STRIDES, false));
    assert_eq!(op.op_name, ROI_EXTRACTOR_OP);
    assert_eq!(op.output_size, (7, 7));
    assert_eq!(op.featmap_strides, STRIDES.to_vec());
    assert_eq!(op.sample_num, 2);
}

#[test]
fn graph_survives_json() {
    let graph = export::trace(&extractor(&STRIDES, true), Some(1.25));
    let json = graph.to_json().unwrap();
    assert!(json.contains("\"op\": \"topk\""));
    assert_eq!(RoiExtractorGraph::from_json(&json).unwrap(), graph);
}

#[test]
fn executed_graph_matches_forward() {
    for (strides, out_fp16, scale) in [
        (&STRIDES[..], false, None),
        (&STRIDES[..], true, Some(1.5)),
        (&STRIDES[..2], false, Some(0.8)),
        (&STRIDES[..1], false, None),
    ] {
        let extractor = extractor(strides, out_fp16);
        let pyramid = common::pyramid(strides, CHANNELS, 256);
        let rois = common::random_rois(60, strides.len() as u64);

        let graph = export::trace(&extractor, scale);
        let traced = GraphExecutor::new(&extractor).run(&graph, &pyramid, &rois).unwrap();
        let eager = extractor.forward(&pyramid, &rois, scale).unwrap();
        assert_eq!(traced, eager);
    }
}

#[test]
fn executed_graph_handles_no_rois() {
    let extractor = extractor(&STRIDES, false);
    let pyramid = common::pyramid(&STRIDES, CHANNELS, 64);
    let graph = export::trace(&extractor, None);
    let out = GraphExecutor::new(&extractor).run(&graph, &pyramid, &Rois::empty()).unwrap();
    assert_eq!(out.shape(), &[0, CHANNELS, 7, 7]);
}

#[test]
fn malformed_graph_is_reported() {
    let extractor = extractor(&STRIDES[..2], false);
    let pyramid = common::pyramid(&STRIDES[..2], CHANNELS, 64);
    let mut graph = export::trace(&extractor, None);
    graph.nodes.swap(0, 1);
    let err = GraphExecutor::new(&extractor).run(&graph, &pyramid, &common::random_rois(4, 2));
    assert!(matches!(err, Err(roi_extract::ExtractError::Graph { .. })));
}
