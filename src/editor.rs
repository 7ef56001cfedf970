//! Batch Editor: draft many format nodes at once, persist only the dirty
//! ones.
//!
//! The editor seeds a draft copy of every node for a supplier (optionally
//! narrowed to one material) and tracks per-node dirtiness. Field edits are
//! synchronous and never touch the store; `save` fires one update per
//! dirty node concurrently with all-settle semantics, keeps the successes,
//! reports the failures, and always resynchronizes from the authoritative
//! store afterwards.

use futures::future::join_all;
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};

use crate::{
    derive::would_create_cycle,
    error::{FormatoError, Result},
    format::{FormatId, FormatNode, FormatSet, FormatUpdate, MaterialId, SupplierId},
    store::FormatStore,
};

/// Unsaved-state summary for display above the edit grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorSummary {
    pub records: usize,
    pub materials: usize,
    pub dirty: usize,
}

/// Aggregate outcome of one save pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
}

/// Draft map plus dirty set — the explicit state the editor reduces over.
#[derive(Debug, Default)]
pub struct EditorState {
    pub drafts: FormatSet,
    pub dirty: BTreeSet<FormatId>,
}

/// Batched, partial-failure-tolerant editing over one supplier's nodes.
///
/// State lives behind an `Arc<RwLock>` so several UI surfaces can share one
/// editor; all mutation is synchronous under the lock, and only `save`,
/// `load` and `discard` perform I/O.
pub struct BatchEditor<S> {
    store: S,
    supplier_id: SupplierId,
    material_id: Option<MaterialId>,
    state: Arc<RwLock<EditorState>>,
}

impl<S: FormatStore> BatchEditor<S> {
    pub fn new(store: S, supplier_id: SupplierId, material_id: Option<MaterialId>) -> Self {
        BatchEditor {
            store,
            supplier_id,
            material_id,
            state: Arc::new(RwLock::new(EditorState::default())),
        }
    }

    /// Seed (or reseed) the drafts from the store and clear the dirty set.
    pub async fn load(&self) -> Result<()> {
        let nodes = self.store.list(self.supplier_id, self.material_id).await?;
        let mut state = self.state.write();
        state.drafts = nodes.into_iter().collect();
        state.dirty.clear();
        Ok(())
    }

    /// Snapshot of the current drafts.
    pub fn drafts(&self) -> FormatSet {
        self.state.read().drafts.clone()
    }

    pub fn is_dirty(&self, id: FormatId) -> bool {
        self.state.read().dirty.contains(&id)
    }

    pub fn summary(&self) -> EditorSummary {
        let state = self.state.read();
        EditorSummary {
            records: state.drafts.len(),
            materials: state.drafts.group_by_material().len(),
            dirty: state.dirty.len(),
        }
    }

    fn edit<F: FnOnce(&mut FormatNode)>(&self, id: FormatId, apply: F) -> Result<()> {
        let mut state = self.state.write();
        let node = state
            .drafts
            .get_mut(&id)
            .ok_or_else(|| FormatoError::NotFound(format!("format node {id}")))?;
        apply(node);
        state.dirty.insert(id);
        Ok(())
    }

    pub fn set_label(&self, id: FormatId, label: impl Into<String>) -> Result<()> {
        self.edit(id, |node| node.label = label.into())
    }

    pub fn set_unit(&self, id: FormatId, unit: impl Into<String>) -> Result<()> {
        self.edit(id, |node| node.unit = unit.into())
    }

    pub fn set_currency(&self, id: FormatId, currency: impl Into<String>) -> Result<()> {
        self.edit(id, |node| node.currency = currency.into())
    }

    pub fn set_base_content(&self, id: FormatId, content: f64) -> Result<()> {
        self.edit(id, |node| node.base_content = content)
    }

    pub fn set_base_price(&self, id: FormatId, price: f64) -> Result<()> {
        self.edit(id, |node| node.base_price = price)
    }

    pub fn set_child_multiplier(&self, id: FormatId, multiplier: f64) -> Result<()> {
        self.edit(id, |node| node.child_multiplier = multiplier)
    }

    /// Flip the consumption-unit flag. The flag decides which update shape
    /// `save` sends for this node.
    pub fn set_consumption_unit(&self, id: FormatId, flag: bool) -> Result<()> {
        self.edit(id, |node| {
            node.is_consumption_unit = flag;
            if flag {
                node.child_id = None;
            }
        })
    }

    /// Repoint a node at another child. Rejected when the new reference
    /// would close a loop over the drafted set; the draft is left untouched
    /// and the node does not become dirty.
    pub fn set_child(&self, id: FormatId, child_id: Option<FormatId>) -> Result<()> {
        if let Some(child_id) = child_id {
            let state = self.state.read();
            if would_create_cycle(&state.drafts, id, child_id) {
                return Err(FormatoError::Cycle(format!(
                    "pointing {id} at {child_id} would loop"
                )));
            }
        }
        self.edit(id, |node| node.child_id = child_id)
    }

    /// Persist every dirty node. All updates are issued concurrently and
    /// settle independently; a failing update never cancels the others.
    /// Whatever the outcome, the drafts are reloaded from the store so the
    /// editor reflects authoritative state.
    pub async fn save(&self) -> Result<SaveReport> {
        let payloads: Vec<(FormatId, FormatUpdate)> = {
            let state = self.state.read();
            state
                .dirty
                .iter()
                .filter_map(|id| {
                    state
                        .drafts
                        .get(id)
                        .map(|draft| (*id, FormatUpdate::from_draft(draft)))
                })
                .collect()
        };

        let outcomes = join_all(
            payloads
                .into_iter()
                .map(|(id, update)| async move { (id, self.store.update(id, update).await) }),
        )
        .await;

        let mut report = SaveReport {
            saved: 0,
            failed: 0,
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(_) => report.saved += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!("update of format node {id} failed: {err}");
                }
            }
        }
        tracing::info!(
            "batch save for supplier {}: {} succeeded, {} failed",
            self.supplier_id,
            report.saved,
            report.failed
        );

        self.load().await?;
        Ok(report)
    }

    /// Drop all unsaved edits and resynchronize from the store.
    pub async fn discard(&self) -> Result<()> {
        self.load().await
    }
}
