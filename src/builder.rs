//! Chain Builder: construct a new format chain from scratch.
//!
//! The builder validates its base specification before touching the
//! network, then issues one create per node, strictly in order, because
//! every level's `child_id` is the id the store assigned to the previous
//! step. A failure mid-sequence aborts the remaining steps and surfaces the
//! nodes already created; there is no rollback, the user resumes through
//! the Chain Extender.

use thiserror::Error;

use crate::{
    error::{FormatoError, Result},
    format::{FormatNode, MaterialId, NewFormat, SupplierId},
    store::FormatStore,
};

/// Specification of the chain's unit of consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSpec {
    pub label: String,
    /// Quantity (in `unit`) contained in one base unit.
    pub content: f64,
    /// Absolute unit price.
    pub price: f64,
    pub unit: String,
    pub currency: String,
}

/// One ascending level over the previous one: "one unit of this format
/// contains `multiplier` units of the level below".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelSpec {
    pub label: String,
    pub multiplier: Option<f64>,
    pub unit: String,
}

impl LevelSpec {
    /// A level the user never started filling in — the trailing empty
    /// editor row. Skipped, not persisted.
    pub fn is_blank(&self) -> bool {
        self.label.trim().is_empty() || self.multiplier.is_none()
    }
}

/// A creation sequence that failed partway through. `created` holds the
/// nodes that were persisted before the failing step.
#[derive(Debug, Error)]
#[error("chain creation aborted after {} node(s): {source}", created.len())]
pub struct ChainBuildFailure {
    pub created: Vec<FormatNode>,
    pub source: FormatoError,
}

pub struct ChainBuilder {
    supplier_id: SupplierId,
    material_id: MaterialId,
    base: BaseSpec,
    levels: Vec<LevelSpec>,
}

impl ChainBuilder {
    pub fn new(supplier_id: SupplierId, material_id: MaterialId, base: BaseSpec) -> Self {
        ChainBuilder {
            supplier_id,
            material_id,
            base,
            levels: Vec::new(),
        }
    }

    pub fn push_level(&mut self, level: LevelSpec) -> &mut Self {
        self.levels.push(level);
        self
    }

    /// Field-level validation of the base, checked before any network call
    /// so a rejected chain creates no partial state.
    pub fn validate(&self) -> Result<()> {
        if self.base.label.trim().is_empty() {
            return Err(FormatoError::validation("label", "label must not be empty"));
        }
        if !self.base.content.is_finite() || self.base.content <= 0.0 {
            return Err(FormatoError::validation(
                "content",
                "base content must be a number greater than zero",
            ));
        }
        if !self.base.price.is_finite() || self.base.price <= 0.0 {
            return Err(FormatoError::validation(
                "price",
                "base price must be a number greater than zero",
            ));
        }
        Ok(())
    }

    /// Execute the creation plan: base first, then each filled-in level in
    /// order, each linked to the id returned by the previous step. The
    /// running price accumulates per level and is stored on the created
    /// node for display; derivation recomputes it from the chain.
    pub async fn build(
        &self,
        store: &dyn FormatStore,
    ) -> std::result::Result<Vec<FormatNode>, ChainBuildFailure> {
        if let Err(source) = self.validate() {
            return Err(ChainBuildFailure {
                created: Vec::new(),
                source,
            });
        }

        let mut created: Vec<FormatNode> = Vec::new();
        let base_payload = NewFormat::base(
            self.supplier_id,
            self.material_id,
            self.base.label.trim(),
            self.base.unit.clone(),
            self.base.content,
            self.base.price,
            self.base.currency.clone(),
        );
        let base = match store.create(base_payload).await {
            Ok(node) => node,
            Err(source) => return Err(ChainBuildFailure { created, source }),
        };
        let mut previous_id = base.id;
        let mut accumulated_price = self.base.price;
        created.push(base);

        for level in &self.levels {
            let Some(multiplier) = level.multiplier.filter(|_| !level.is_blank()) else {
                tracing::debug!("skipping unstarted level row '{}'", level.label);
                continue;
            };
            accumulated_price *= multiplier;
            let payload = NewFormat::level(
                self.supplier_id,
                self.material_id,
                level.label.trim(),
                level.unit.clone(),
                previous_id,
                multiplier,
                accumulated_price,
            );
            let node = match store.create(payload).await {
                Ok(node) => node,
                Err(source) => {
                    tracing::warn!(
                        "chain creation aborted at level '{}' with {} node(s) already persisted",
                        level.label,
                        created.len()
                    );
                    return Err(ChainBuildFailure { created, source });
                }
            };
            previous_id = node.id;
            created.push(node);
        }

        tracing::info!(
            "created format chain of {} node(s) for supplier {} material {}",
            created.len(),
            self.supplier_id,
            self.material_id
        );
        Ok(created)
    }
}
