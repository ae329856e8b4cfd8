use crate::export::graph::{CustomOp, GraphBuilder, InputKind, Node, RoiExtractorGraph, ROI_EXTRACTOR_OP};
use crate::extractors::SingleRoIExtractor;

/// Custom op descriptor, attributes taken from the level 0 pooler.
pub fn custom_op(extractor: &SingleRoIExtractor) -> CustomOp {
    let layer = &extractor.roi_layers()[0];
    CustomOp {
        op_name: ROI_EXTRACTOR_OP.to_string(),
        output_size: layer.output_size(),
        featmap_strides: extractor.featmap_strides().to_vec(),
        sample_num: layer.sampling_ratio(),
    }
}

/// Unrolls `extractor.forward` into a static graph.
///
/// `roi_scale_factor` is baked in as a constant, mirroring `forward`: it is
/// dropped when there is a single level.
pub fn trace(extractor: &SingleRoIExtractor, roi_scale_factor: Option<f32>) -> RoiExtractorGraph {
    let num_levels = extractor.num_inputs();
    let mut g = GraphBuilder::default();

    let rois = g.input("rois", InputKind::Rois);
    let feats: Vec<_> = (0..num_levels)
        .map(|level| g.input(format!("feats_{level}"), InputKind::Feats(level)))
        .collect();

    let pooled = if num_levels == 1 {
        let out = g.value();
        g.push(Node::Pool {
            level: 0,
            feats: feats[0],
            rois,
            out,
        });
        out
    } else {
        let levels = g.value();
        g.push(Node::MapLevels {
            rois,
            num_levels,
            finest_scale: extractor.finest_scale(),
            out: levels,
        });
        let rois = match roi_scale_factor {
            Some(factor) => {
                let out = g.value();
                g.push(Node::Rescale { rois, factor, out });
                out
            }
            None => rois,
        };

        let mut level_indices = Vec::with_capacity(num_levels);
        let mut level_feats = Vec::with_capacity(num_levels);
        for (level, &feats) in feats.iter().enumerate() {
            let indices = g.value();
            g.push(Node::NonZero { levels, level, out: indices });
            let selected = g.value();
            g.push(Node::IndexSelect {
                input: rois,
                indices,
                out: selected,
            });
            let out = g.value();
            g.push(Node::Pool {
                level,
                feats,
                rois: selected,
                out,
            });
            level_indices.push(indices);
            level_feats.push(out);
        }

        let indices = g.value();
        g.push(Node::Concat {
            inputs: level_indices,
            out: indices,
        });
        let concat_feats = g.value();
        g.push(Node::Concat {
            inputs: level_feats,
            out: concat_feats,
        });
        let (values, order) = (g.value(), g.value());
        g.push(Node::TopK {
            input: indices,
            largest: false,
            values,
            indices: order,
        });
        let out = g.value();
        g.push(Node::Gather {
            input: concat_feats,
            indices: order,
            out,
        });
        out
    };

    let output = if extractor.config().out_fp16 {
        let out = g.value();
        g.push(Node::CastF16 { input: pooled, out });
        out
    } else {
        pooled
    };

    let graph = g.finish(custom_op(extractor), output);
    log::debug!("Traced {} level extractor into {} nodes", num_levels, graph.nodes.len());
    graph
}
