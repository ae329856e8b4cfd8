use half::f16;
use ndarray::{Array4, ArrayView4};
use crate::common::{FeaturePyramid, RoiFeats, Rois};
use crate::export::graph::{InputKind, Node, RoiExtractorGraph, ValueId};
use crate::extractors::level_mapping::{assign_levels, level_indices};
use crate::extractors::reassembly::{concat_levels, gather_rows, topk};
use crate::extractors::SingleRoIExtractor;
use crate::{ExtractError, Result};

#[derive(Debug, Clone)]
enum Value<'a> {
    Rois(Rois),
    Map(ArrayView4<'a, f32>),
    Indices(Vec<usize>),
    Feats(Array4<f32>),
    Half(Array4<f16>),
}

/// Reference interpreter for traced extractor graphs.
///
/// Runs the nodes one by one with the extractor's own poolers, so the result
/// can be compared against [`SingleRoIExtractor::forward`].
#[derive(Debug)]
pub struct GraphExecutor<'e> {
    extractor: &'e SingleRoIExtractor,
}

impl<'e> GraphExecutor<'e> {
    pub fn new(extractor: &'e SingleRoIExtractor) -> Self {
        Self { extractor }
    }

    pub fn run(&self, graph: &RoiExtractorGraph, pyramid: &FeaturePyramid, rois: &Rois) -> Result<RoiFeats> {
        self.extractor.check_inputs(pyramid)?;
        let mut values: Vec<Option<Value>> = vec![None; graph.num_values];

        for input in &graph.inputs {
            let value = match input.kind {
                InputKind::Rois => Value::Rois(rois.clone()),
                InputKind::Feats(level) => match pyramid.level(level) {
                    Some(l) => Value::Map(l.view()),
                    None => return Err(ExtractError::graph(format!("input {} has no feature level", input.name))),
                },
            };
            Self::store(&mut values, input.id, value)?;
        }

        for node in &graph.nodes {
            let value = self.eval(node, &values)?;
            Self::store(&mut values, Self::output_of(node), value)?;
            if let Node::TopK { input, values: sorted, .. } = node {
                let (vals, _) = topk(Self::indices(&values, *input)?, usize::MAX, false);
                Self::store(&mut values, *sorted, Value::Indices(vals))?;
            }
        }

        match values.get_mut(graph.output).and_then(Option::take) {
            Some(Value::Feats(x)) => Ok(RoiFeats::F32(x)),
            Some(Value::Half(x)) => Ok(RoiFeats::F16(x)),
            _ => Err(ExtractError::graph("graph output is not a feature batch")),
        }
    }

    fn eval<'a>(&self, node: &Node, values: &[Option<Value<'a>>]) -> Result<Value<'a>> {
        let value = match node {
            Node::MapLevels { rois, num_levels, finest_scale, .. } => {
                Value::Indices(assign_levels(Self::rois(values, *rois)?, *num_levels, *finest_scale))
            }
            Node::Rescale { rois, factor, .. } => Value::Rois(Self::rois(values, *rois)?.rescale(*factor)),
            Node::NonZero { levels, level, .. } => Value::Indices(level_indices(Self::indices(values, *levels)?, *level)),
            Node::IndexSelect { input, indices, .. } => {
                Value::Rois(Self::rois(values, *input)?.select(Self::indices(values, *indices)?))
            }
            Node::Pool { level, feats, rois, .. } => {
                let map = match Self::get(values, *feats)? {
                    Value::Map(map) => map.clone(),
                    _ => return Err(ExtractError::graph(format!("value {feats} is not a feature map"))),
                };
                if *level >= self.extractor.num_inputs() {
                    return Err(ExtractError::graph(format!("no pooler for level {level}")));
                }
                Value::Feats(self.extractor.pool_level_checked(*level, map, Self::rois(values, *rois)?)?)
            }
            Node::Concat { inputs, .. } => self.concat(values, inputs)?,
            Node::TopK { input, largest, .. } => {
                let xs = Self::indices(values, *input)?;
                Value::Indices(topk(xs, xs.len(), *largest).1)
            }
            Node::Gather { input, indices, .. } => match Self::get(values, *input)? {
                Value::Feats(x) => Value::Feats(gather_rows(x, Self::indices(values, *indices)?)),
                _ => return Err(ExtractError::graph(format!("value {input} is not a feature batch"))),
            },
            Node::CastF16 { input, .. } => match Self::get(values, *input)? {
                Value::Feats(x) => Value::Half(x.mapv(f16::from_f32)),
                _ => return Err(ExtractError::graph(format!("value {input} is not a feature batch"))),
            },
        };
        Ok(value)
    }

    fn concat<'a>(&self, values: &[Option<Value<'a>>], inputs: &[ValueId]) -> Result<Value<'a>> {
        match inputs.first().map(|&id| Self::get(values, id)).transpose()? {
            Some(Value::Indices(_)) => {
                let mut out = Vec::new();
                for &id in inputs {
                    out.extend_from_slice(Self::indices(values, id)?);
                }
                Ok(Value::Indices(out))
            }
            Some(Value::Feats(_)) => {
                let mut batches = Vec::with_capacity(inputs.len());
                for &id in inputs {
                    match Self::get(values, id)? {
                        Value::Feats(x) => batches.push(x.clone()),
                        _ => return Err(ExtractError::graph(format!("value {id} is not a feature batch"))),
                    }
                }
                let (out_h, out_w) = self.extractor.output_size();
                Ok(Value::Feats(concat_levels(&batches, (self.extractor.out_channels(), out_h, out_w))?))
            }
            _ => Err(ExtractError::graph("concat needs index lists or feature batches")),
        }
    }

    fn output_of(node: &Node) -> ValueId {
        match node {
            Node::MapLevels { out, .. }
            | Node::Rescale { out, .. }
            | Node::NonZero { out, .. }
            | Node::IndexSelect { out, .. }
            | Node::Pool { out, .. }
            | Node::Concat { out, .. }
            | Node::Gather { out, .. }
            | Node::CastF16 { out, .. } => *out,
            Node::TopK { indices, .. } => *indices,
        }
    }

    fn store<'a>(values: &mut [Option<Value<'a>>], id: ValueId, value: Value<'a>) -> Result<()> {
        let slot = values
            .get_mut(id)
            .ok_or_else(|| ExtractError::graph(format!("value {id} out of range")))?;
        if slot.is_some() {
            return Err(ExtractError::graph(format!("value {id} assigned twice")));
        }
        *slot = Some(value);
        Ok(())
    }

    fn get<'v, 'a>(values: &'v [Option<Value<'a>>], id: ValueId) -> Result<&'v Value<'a>> {
        values
            .get(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| ExtractError::graph(format!("value {id} used before it is defined")))
    }

    fn rois<'v>(values: &'v [Option<Value<'_>>], id: ValueId) -> Result<&'v Rois> {
        match Self::get(values, id)? {
            Value::Rois(r) => Ok(r),
            _ => Err(ExtractError::graph(format!("value {id} is not a roi set"))),
        }
    }

    fn indices<'v>(values: &'v [Option<Value<'_>>], id: ValueId) -> Result<&'v [usize]> {
        match Self::get(values, id)? {
            Value::Indices(x) => Ok(x),
            _ => Err(ExtractError::graph(format!("value {id} is not an index list"))),
        }
    }
}
