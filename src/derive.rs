//! Derivation Engine: effective quantity and price of any format node.
//!
//! Derivation walks a node's `child_id` chain down to the base and
//! multiplies content and price back up. It is a pure, synchronous
//! computation over a borrowed [`FormatSet`], memoized per pass, and safe to
//! call repeatedly during display. Malformed data (dangling references,
//! cycles, garbage numerics) degrades to a local anchor value instead of
//! failing, so display code always receives something finite.

use petgraph::algo::kosaraju_scc;
use std::collections::{BTreeMap, BTreeSet};

use crate::format::{FormatId, FormatNode, FormatSet};

/// The derived value of one node: what one unit of this format effectively
/// contains and costs.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub price: f64,
    pub content: f64,
    pub currency: String,
    pub unit: String,
}

/// One derivation pass over a node set.
///
/// The memo is only valid for the borrowed set, so a `Deriver` is cheap and
/// short-lived by design: build one per render pass, drop it when the set
/// changes.
pub struct Deriver<'a> {
    nodes: &'a FormatSet,
    memo: BTreeMap<FormatId, Derivation>,
    visiting: BTreeSet<FormatId>,
}

impl<'a> Deriver<'a> {
    pub fn new(nodes: &'a FormatSet) -> Self {
        Deriver {
            nodes,
            memo: BTreeMap::new(),
            visiting: BTreeSet::new(),
        }
    }

    /// Derive the effective price and content of `id`. Returns `None` only
    /// when `id` is not in the set at all; every reachable malformation
    /// (missing child, cycle, bad numerics) resolves to an anchor value.
    pub fn derive(&mut self, id: FormatId) -> Option<Derivation> {
        self.nodes.get(&id)?;
        Some(self.resolve(id))
    }

    fn resolve(&mut self, id: FormatId) -> Derivation {
        if let Some(hit) = self.memo.get(&id) {
            return hit.clone();
        }
        // Caller guarantees membership; a dangling child_id never reaches
        // here because the parent anchors instead of recursing.
        let nodes: &'a FormatSet = self.nodes;
        let node = &nodes[&id];
        if self.visiting.contains(&id) {
            tracing::warn!(
                "format chain cycle at node {} ({}); anchoring locally",
                id,
                node.label
            );
            // Not memoized: this is the inner fallback of a cycle, and the
            // node's outer frame still owes the memo its real result.
            return anchor(node);
        }

        self.visiting.insert(id);
        let result = match node.child_id {
            Some(child_id) if !node.is_consumption_unit && self.nodes.contains_key(&child_id) => {
                let child = self.resolve(child_id);
                let multiplier = positive_or_zero(node.child_multiplier);
                Derivation {
                    price: finite_or_zero(child.price * multiplier),
                    content: finite_or_zero(child.content * multiplier),
                    currency: child.currency,
                    unit: child.unit,
                }
            }
            _ => anchor(node),
        };
        self.visiting.remove(&id);
        self.memo.insert(id, result.clone());
        result
    }
}

/// Treat a node as its own anchor: base nodes legitimately, malformed nodes
/// as the deliberate fallback that keeps partially built chains rendering.
fn anchor(node: &FormatNode) -> Derivation {
    Derivation {
        price: finite_or_zero(node.base_price),
        content: finite_or_zero(node.base_content),
        currency: node.currency.clone(),
        unit: node.unit.clone(),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn positive_or_zero(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// All `child_id` loops in the set, as strongly connected components of the
/// parent→child projection. Self-references count.
pub fn find_cycles(nodes: &FormatSet) -> Vec<Vec<FormatId>> {
    let graph = nodes.child_graph();
    kosaraju_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || scc.iter().any(|id| graph.contains_edge(*id, *id)))
        .collect()
}

/// Would pointing `id` at `new_child` close a loop? Bounded walk from
/// `new_child` down existing `child_id` references.
pub fn would_create_cycle(nodes: &FormatSet, id: FormatId, new_child: FormatId) -> bool {
    if id == new_child {
        return true;
    }
    let mut seen = BTreeSet::new();
    let mut cursor = Some(new_child);
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        if !seen.insert(current) {
            // Pre-existing loop below the edit point; the edit itself does
            // not reach back to `id`.
            return false;
        }
        cursor = nodes.get(&current).and_then(|node| node.child_id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::helpers::{chain_of, init_logging};

    fn id_of(set: &FormatSet, label: &str) -> FormatId {
        set.values().find(|node| node.label == label).unwrap().id
    }

    #[test]
    fn derives_through_a_clean_chain() {
        init_logging();
        // saco: 25 kg at 100; caja = 5 sacos; pallet = 2 cajas.
        let set = chain_of(&[("saco", 1.0), ("caja", 5.0), ("pallet", 2.0)]);
        let mut deriver = Deriver::new(&set);
        let pallet = deriver.derive(id_of(&set, "pallet")).unwrap();
        assert_eq!(pallet.price, 100.0 * 5.0 * 2.0);
        assert_eq!(pallet.content, 25.0 * 5.0 * 2.0);
        assert_eq!(pallet.currency, "EUR");
        assert_eq!(pallet.unit, "kg");
    }

    #[test]
    fn anchors_on_missing_child() {
        init_logging();
        let mut set = chain_of(&[("saco", 1.0), ("caja", 5.0)]);
        let caja = id_of(&set, "caja");
        {
            let node = set.get_mut(&caja).unwrap();
            node.child_id = Some(FormatId::new());
            node.base_price = 7.5;
            node.base_content = 3.0;
        }
        let mut deriver = Deriver::new(&set);
        let derived = deriver.derive(caja).unwrap();
        assert_eq!(derived.price, 7.5);
        assert_eq!(derived.content, 3.0);
    }

    #[test]
    fn cycle_terminates_with_finite_values() {
        init_logging();
        let mut set = chain_of(&[("saco", 1.0), ("caja", 5.0), ("pallet", 2.0)]);
        let caja = id_of(&set, "caja");
        let pallet = id_of(&set, "pallet");
        // Corrupt the chain: caja points back up at pallet.
        set.get_mut(&caja).unwrap().child_id = Some(pallet);
        set.get_mut(&caja).unwrap().is_consumption_unit = false;

        let mut deriver = Deriver::new(&set);
        for id in [caja, pallet] {
            let derived = deriver.derive(id).unwrap();
            assert!(derived.price.is_finite());
            assert!(derived.content.is_finite());
        }
        assert_eq!(find_cycles(&set).len(), 1);
    }

    #[test]
    fn garbage_multiplier_coerces_to_zero() {
        init_logging();
        let mut set = chain_of(&[("saco", 1.0), ("caja", 5.0)]);
        let caja = id_of(&set, "caja");
        set.get_mut(&caja).unwrap().child_multiplier = f64::NAN;
        let mut deriver = Deriver::new(&set);
        let derived = deriver.derive(caja).unwrap();
        assert_eq!(derived.price, 0.0);
        assert_eq!(derived.content, 0.0);

        set.get_mut(&caja).unwrap().child_multiplier = -4.0;
        let mut deriver = Deriver::new(&set);
        assert_eq!(deriver.derive(caja).unwrap().price, 0.0);
    }

    #[test]
    fn derivation_is_idempotent() {
        init_logging();
        let set = chain_of(&[("saco", 1.0), ("caja", 5.0), ("pallet", 2.0)]);
        let snapshot = set.clone();
        let mut deriver = Deriver::new(&set);
        let pallet = id_of(&set, "pallet");
        let first = deriver.derive(pallet).unwrap();
        let second = deriver.derive(pallet).unwrap();
        assert_eq!(first, second);
        assert_eq!(set, snapshot);
    }

    #[test]
    fn unknown_id_derives_to_none() {
        let set = chain_of(&[("saco", 1.0)]);
        let mut deriver = Deriver::new(&set);
        assert!(deriver.derive(FormatId::new()).is_none());
    }

    #[test]
    fn would_create_cycle_walks_the_chain() {
        let set = chain_of(&[("saco", 1.0), ("caja", 5.0), ("pallet", 2.0)]);
        let saco = id_of(&set, "saco");
        let pallet = id_of(&set, "pallet");
        assert!(would_create_cycle(&set, saco, pallet));
        assert!(would_create_cycle(&set, pallet, pallet));
        assert!(!would_create_cycle(&set, pallet, saco));
    }
}
