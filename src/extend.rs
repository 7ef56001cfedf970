//! Chain Extender: resume and extend an existing format chain.
//!
//! Given the persisted nodes of a (supplier, material) pair, the extender
//! finds the candidate top nodes, rebuilds the ordered base→top step list
//! for the chosen top, and lets the caller append new levels above it
//! without starting the chain over. Reconstruction walks `child_id`
//! references, so it is cycle-guarded like every other traversal over the
//! arena.

use std::collections::BTreeSet;

use crate::{
    builder::ChainBuildFailure,
    derive::Deriver,
    error::FormatoError,
    format::{FormatId, FormatNode, FormatSet, NewFormat},
    store::FormatStore,
};

/// One row of the chain editor: either a pre-filled existing node
/// (read-only until explicitly enabled) or a new level the user is typing.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStep {
    /// Id of the persisted node backing this step; `None` for new levels.
    pub existing: Option<FormatId>,
    pub label: String,
    /// `None` on the base step, whose multiplier is conceptually 1.
    pub multiplier: Option<f64>,
    pub unit: String,
    pub editable: bool,
}

impl ChainStep {
    fn from_node(node: &FormatNode) -> Self {
        ChainStep {
            existing: Some(node.id),
            label: node.label.clone(),
            multiplier: node.child_id.map(|_| node.child_multiplier),
            unit: node.unit.clone(),
            editable: false,
        }
    }

    /// The empty trailing row appended after the existing chain.
    pub fn blank() -> Self {
        ChainStep {
            existing: None,
            label: String::new(),
            multiplier: None,
            unit: String::new(),
            editable: true,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.existing.is_none() && self.label.trim().is_empty() && self.multiplier.is_none()
    }

    /// New steps ready to persist: typed in, not yet backed by the store.
    pub fn is_pending(&self) -> bool {
        self.existing.is_none() && !self.label.trim().is_empty() && self.multiplier.is_some()
    }
}

/// Resolve the chain's base node (see [`FormatSet::base`]).
pub fn resolve_base(nodes: &FormatSet) -> Option<&FormatNode> {
    nodes.base()
}

/// Candidate extension points: nodes nobody references as a `child_id`,
/// sorted by derived content descending (largest format first). The first
/// candidate is the default extension point.
pub fn top_candidates(nodes: &FormatSet) -> Vec<FormatId> {
    let mut deriver = Deriver::new(nodes);
    let mut candidates: Vec<(FormatId, f64)> = nodes
        .tops()
        .into_iter()
        .map(|id| {
            let content = deriver.derive(id).map(|d| d.content).unwrap_or(0.0);
            (id, content)
        })
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.into_iter().map(|(id, _)| id).collect()
}

/// Rebuild the ordered step list by walking from `top` down to the base,
/// then reversing to base→top. On a repeated node the walk stops and the
/// partial sequence is returned rather than looping.
pub fn build_steps_from_top(nodes: &FormatSet, top: FormatId) -> Vec<ChainStep> {
    let mut visited = BTreeSet::new();
    let mut walk: Vec<&FormatNode> = Vec::new();
    let mut cursor = Some(top);
    while let Some(id) = cursor {
        if !visited.insert(id) {
            tracing::warn!("cycle while rebuilding chain from top {top}; keeping partial walk");
            break;
        }
        let Some(node) = nodes.get(&id) else { break };
        walk.push(node);
        cursor = node.child_id;
    }
    walk.reverse();
    walk.into_iter().map(ChainStep::from_node).collect()
}

/// An interactive extension of one (supplier, material) chain: the rebuilt
/// existing steps, the user's pending new levels, and the chosen top.
pub struct ExtendSession {
    nodes: FormatSet,
    top: Option<FormatId>,
    steps: Vec<ChainStep>,
}

impl ExtendSession {
    /// Start a session over the pair's existing nodes, targeting the
    /// largest top by default, with one empty row appended for the next
    /// level.
    pub fn new(nodes: FormatSet) -> Self {
        let top = top_candidates(&nodes).into_iter().next();
        let mut session = ExtendSession {
            nodes,
            top,
            steps: Vec::new(),
        };
        session.rebuild(Vec::new());
        session
    }

    pub fn top(&self) -> Option<FormatId> {
        self.top
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn step_mut(&mut self, index: usize) -> Option<&mut ChainStep> {
        self.steps.get_mut(index)
    }

    /// Another empty level row above the current last one.
    pub fn push_blank(&mut self) {
        self.steps.push(ChainStep::blank());
    }

    /// Switch the extension point. Existing steps are rebuilt from the new
    /// top; new steps the user already started typing are preserved and
    /// re-appended after the rebuilt prefix.
    pub fn retarget(&mut self, top: FormatId) {
        self.top = Some(top);
        let pending: Vec<ChainStep> = self
            .steps
            .iter()
            .filter(|step| step.existing.is_none() && !step.is_blank())
            .cloned()
            .collect();
        self.rebuild(pending);
    }

    fn rebuild(&mut self, pending: Vec<ChainStep>) {
        self.steps = match self.top {
            Some(top) => build_steps_from_top(&self.nodes, top),
            None => Vec::new(),
        };
        self.steps.extend(pending);
        self.steps.push(ChainStep::blank());
    }

    /// Persist the pending new levels above the chosen top, in order, with
    /// the same sequential, abort-on-failure discipline as the Chain
    /// Builder. The running price starts from the top's derived price.
    pub async fn commit(
        &self,
        store: &dyn FormatStore,
    ) -> std::result::Result<Vec<FormatNode>, ChainBuildFailure> {
        let fail = |source: FormatoError| ChainBuildFailure {
            created: Vec::new(),
            source,
        };
        let Some(top) = self.top else {
            return Err(fail(FormatoError::NotFound(
                "no existing chain to extend".to_string(),
            )));
        };
        let template = self
            .nodes
            .get(&top)
            .ok_or_else(|| fail(FormatoError::NotFound(format!("top node {top}"))))?;
        let (supplier_id, material_id) = (template.supplier_id, template.material_id);

        let mut deriver = Deriver::new(&self.nodes);
        let mut accumulated_price = deriver.derive(top).map(|d| d.price).unwrap_or(0.0);
        let mut previous_id = top;
        let mut created: Vec<FormatNode> = Vec::new();

        for step in self.steps.iter().filter(|step| step.is_pending()) {
            // is_pending guarantees the multiplier.
            let Some(multiplier) = step.multiplier else {
                continue;
            };
            accumulated_price *= multiplier;
            let payload = NewFormat::level(
                supplier_id,
                material_id,
                step.label.trim(),
                step.unit.clone(),
                previous_id,
                multiplier,
                accumulated_price,
            );
            let node = match store.create(payload).await {
                Ok(node) => node,
                Err(source) => return Err(ChainBuildFailure { created, source }),
            };
            previous_id = node.id;
            created.push(node);
        }

        tracing::info!(
            "extended chain above {top} with {} new level(s)",
            created.len()
        );
        Ok(created)
    }
}
