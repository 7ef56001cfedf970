//! Shared test utilities for format-chain testing.

use crate::format::{FormatId, FormatNode, FormatSet, MaterialId, SupplierId};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Build a linked chain for one (supplier, material) pair. The first entry
/// becomes the base (25 kg at 100 EUR; its multiplier is ignored), each
/// following entry a level containing `multiplier` units of the previous.
pub fn chain_of(levels: &[(&str, f64)]) -> FormatSet {
    let supplier_id = SupplierId::new();
    let material_id = MaterialId::new();
    let mut set = FormatSet::default();
    let mut previous: Option<FormatId> = None;
    let mut running_price = 100.0;

    for (index, (label, multiplier)) in levels.iter().enumerate() {
        let id = FormatId::new();
        let node = if index == 0 {
            FormatNode {
                id,
                supplier_id,
                material_id,
                label: label.to_string(),
                unit: "kg".to_string(),
                is_consumption_unit: true,
                child_id: None,
                child_multiplier: 1.0,
                base_content: 25.0,
                base_price: 100.0,
                currency: "EUR".to_string(),
            }
        } else {
            running_price *= multiplier;
            FormatNode {
                id,
                supplier_id,
                material_id,
                label: label.to_string(),
                unit: "kg".to_string(),
                is_consumption_unit: false,
                child_id: previous,
                child_multiplier: *multiplier,
                base_content: 0.0,
                base_price: running_price,
                currency: String::new(),
            }
        };
        set.insert(id, node);
        previous = Some(id);
    }
    set
}

/// A detached level node over `child_id`, in the same pair as `set`.
pub fn level_node(set: &FormatSet, label: &str, child_id: FormatId, multiplier: f64) -> FormatNode {
    let template = set.values().next().expect("fixture set is never empty");
    FormatNode {
        id: FormatId::new(),
        supplier_id: template.supplier_id,
        material_id: template.material_id,
        label: label.to_string(),
        unit: template.unit.clone(),
        is_consumption_unit: false,
        child_id: Some(child_id),
        child_multiplier: multiplier,
        base_content: 0.0,
        base_price: 0.0,
        currency: String::new(),
    }
}
