//! Static graph description of a RoI extractor forward pass.
//!
//! The graph has no data dependent control flow: the level loop is unrolled
//! and the original RoI order is restored with an explicit top-k.

use serde::{Deserialize, Serialize};
use crate::Result;

pub type ValueId = usize;

/// Name under which the whole extractor is exported as a single custom op.
pub const ROI_EXTRACTOR_OP: &str = "roi_feature_extractor";

/// Attributes of the exported custom op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomOp {
    pub op_name: String,
    pub output_size: (usize, usize),
    pub featmap_strides: Vec<u32>,
    pub sample_num: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum InputKind {
    Rois,
    Feats(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInput {
    pub name: String,
    pub id: ValueId,
    pub kind: InputKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Node {
    /// Pyramid level of every RoI.
    MapLevels {
        rois: ValueId,
        num_levels: usize,
        finest_scale: f32,
        out: ValueId,
    },
    /// Centre preserving box scaling.
    Rescale {
        rois: ValueId,
        factor: f32,
        out: ValueId,
    },
    /// Ascending positions where `levels == level`.
    #[serde(rename = "nonzero")]
    NonZero {
        levels: ValueId,
        level: usize,
        out: ValueId,
    },
    /// Rows of `input` at `indices`.
    IndexSelect {
        input: ValueId,
        indices: ValueId,
        out: ValueId,
    },
    Pool {
        level: usize,
        feats: ValueId,
        rois: ValueId,
        out: ValueId,
    },
    Concat {
        inputs: Vec<ValueId>,
        out: ValueId,
    },
    /// `k` is the length of `input`.
    #[serde(rename = "topk")]
    TopK {
        input: ValueId,
        largest: bool,
        values: ValueId,
        indices: ValueId,
    },
    Gather {
        input: ValueId,
        indices: ValueId,
        out: ValueId,
    },
    #[serde(rename = "cast_f16")]
    CastF16 {
        input: ValueId,
        out: ValueId,
    },
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::MapLevels { .. } => "map_levels",
            Node::Rescale { .. } => "rescale",
            Node::NonZero { .. } => "nonzero",
            Node::IndexSelect { .. } => "index_select",
            Node::Pool { .. } => "pool",
            Node::Concat { .. } => "concat",
            Node::TopK { .. } => "topk",
            Node::Gather { .. } => "gather",
            Node::CastF16 { .. } => "cast_f16",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiExtractorGraph {
    pub custom_op: CustomOp,
    pub inputs: Vec<GraphInput>,
    pub nodes: Vec<Node>,
    pub output: ValueId,
    pub num_values: usize,
}

impl RoiExtractorGraph {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn count_nodes(&self, name: &str) -> usize {
        self.nodes.iter().filter(|n| n.name() == name).count()
    }
}

/// Hands out value ids while nodes are appended.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    inputs: Vec<GraphInput>,
    nodes: Vec<Node>,
    next: ValueId,
}

impl GraphBuilder {
    pub(crate) fn value(&mut self) -> ValueId {
        let id = self.next;
        self.next += 1;
        id
    }

    pub(crate) fn input(&mut self, name: impl Into<String>, kind: InputKind) -> ValueId {
        let id = self.value();
        self.inputs.push(GraphInput {
            name: name.into(),
            id,
            kind,
        });
        id
    }

    pub(crate) fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub(crate) fn finish(self, custom_op: CustomOp, output: ValueId) -> RoiExtractorGraph {
        RoiExtractorGraph {
            custom_op,
            inputs: self.inputs,
            nodes: self.nodes,
            output,
            num_values: self.next,
        }
    }
}
