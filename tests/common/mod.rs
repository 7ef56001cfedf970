//! Shared integration-test fixtures: an in-memory [`FormatStore`] with
//! failure injection and a recorded call log.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;

use formato_core::{
    error::{FormatoError, Result},
    format::{FormatId, FormatNode, FormatSet, FormatUpdate, MaterialId, NewFormat, SupplierId},
    store::FormatStore,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Build a linked chain for the given pair. The first entry becomes the
/// base (25 kg at 100 EUR; its multiplier is ignored), each following entry
/// a level containing `multiplier` units of the previous one.
pub fn chain_of(
    supplier_id: SupplierId,
    material_id: MaterialId,
    levels: &[(&str, f64)],
) -> FormatSet {
    let mut set = FormatSet::default();
    let mut previous: Option<FormatId> = None;
    let mut running_price = 100.0;

    for (index, (label, multiplier)) in levels.iter().enumerate() {
        let id = FormatId::new();
        let node = FormatNode {
            id,
            supplier_id,
            material_id,
            label: label.to_string(),
            unit: "kg".to_string(),
            is_consumption_unit: index == 0,
            child_id: previous,
            child_multiplier: if index == 0 { 1.0 } else { *multiplier },
            base_content: if index == 0 { 25.0 } else { 0.0 },
            base_price: if index == 0 {
                100.0
            } else {
                running_price *= multiplier;
                running_price
            },
            currency: if index == 0 {
                "EUR".to_string()
            } else {
                String::new()
            },
        };
        set.insert(id, node);
        previous = Some(id);
    }
    set
}

pub fn id_of(set: &FormatSet, label: &str) -> FormatId {
    set.values().find(|node| node.label == label).unwrap().id
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    List,
    Create(NewFormat),
    Update(FormatId),
}

/// In-memory store with per-id update failure injection and an optional
/// failing create step.
#[derive(Default)]
pub struct MockStore {
    nodes: Mutex<FormatSet>,
    calls: Mutex<Vec<StoreCall>>,
    fail_updates: Mutex<BTreeSet<FormatId>>,
    fail_create_at: Mutex<Option<usize>>,
    creates_seen: Mutex<usize>,
}

impl MockStore {
    pub fn with_nodes(nodes: FormatSet) -> Self {
        MockStore {
            nodes: Mutex::new(nodes),
            ..MockStore::default()
        }
    }

    /// Make every update of `id` fail.
    pub fn fail_update(&self, id: FormatId) {
        self.fail_updates.lock().insert(id);
    }

    /// Make the `index`-th create call (0-based) fail.
    pub fn fail_create_at(&self, index: usize) {
        *self.fail_create_at.lock() = Some(index);
    }

    pub fn nodes(&self) -> FormatSet {
        self.nodes.lock().clone()
    }

    pub fn node(&self, id: FormatId) -> Option<FormatNode> {
        self.nodes.lock().get(&id).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Labels of the create payloads, in call order.
    pub fn created_labels(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                StoreCall::Create(new) => Some(new.label.clone()),
                _ => None,
            })
            .collect()
    }

    fn injected() -> FormatoError {
        FormatoError::Store {
            status: Some(500),
            message: "injected failure".to_string(),
        }
    }
}

#[async_trait]
impl FormatStore for MockStore {
    async fn list(
        &self,
        supplier: SupplierId,
        material: Option<MaterialId>,
    ) -> Result<Vec<FormatNode>> {
        self.calls.lock().push(StoreCall::List);
        Ok(self
            .nodes
            .lock()
            .values()
            .filter(|node| {
                node.supplier_id == supplier
                    && material.map_or(true, |material| node.material_id == material)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, new: NewFormat) -> Result<FormatNode> {
        self.calls.lock().push(StoreCall::Create(new.clone()));
        let index = {
            let mut seen = self.creates_seen.lock();
            let index = *seen;
            *seen += 1;
            index
        };
        if *self.fail_create_at.lock() == Some(index) {
            return Err(Self::injected());
        }
        let node = FormatNode {
            id: FormatId::new(),
            supplier_id: new.supplier_id,
            material_id: new.material_id,
            label: new.label,
            unit: new.unit,
            is_consumption_unit: new.is_consumption_unit,
            child_id: new.child_id,
            child_multiplier: new.child_multiplier.unwrap_or(1.0),
            base_content: new.base_content.unwrap_or(0.0),
            base_price: new.base_price.unwrap_or(0.0),
            currency: new.currency.unwrap_or_default(),
        };
        self.nodes.lock().insert(node.id, node.clone());
        Ok(node)
    }

    async fn update(&self, id: FormatId, update: FormatUpdate) -> Result<FormatNode> {
        self.calls.lock().push(StoreCall::Update(id));
        if self.fail_updates.lock().contains(&id) {
            return Err(Self::injected());
        }
        let mut nodes = self.nodes.lock();
        let node = nodes
            .get_mut(&id)
            .ok_or_else(|| FormatoError::NotFound(format!("format node {id}")))?;
        match update {
            FormatUpdate::Base {
                label,
                unit,
                base_content,
                base_price,
                currency,
            } => {
                node.label = label;
                node.unit = unit;
                node.is_consumption_unit = true;
                node.child_id = None;
                node.base_content = base_content;
                node.base_price = base_price;
                node.currency = currency;
            }
            FormatUpdate::Derived {
                label,
                unit,
                child_id,
                child_multiplier,
            } => {
                node.label = label;
                node.unit = unit;
                node.is_consumption_unit = false;
                node.child_id = child_id;
                node.child_multiplier = child_multiplier;
            }
        }
        Ok(node.clone())
    }
}
