//! Data model for packaging-format chains.
//!
//! A chain is stored as a flat arena of [`FormatNode`] records keyed by id
//! ([`FormatSet`]), where each non-base node points at the next-smaller
//! format through `child_id`. Nothing at the storage layer enforces
//! acyclicity, so every traversal over the arena must be bounded and
//! cycle-checked (see [`crate::derive`]).

use petgraph::graphmap::GraphMap;
use petgraph::Directed;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{Deref, DerefMut};
use uuid::Uuid;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn nil() -> Self {
                $name(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok($name(Uuid::parse_str(s)?))
            }
        }
    };
}

id_newtype!(
    /// Opaque identifier of a [`FormatNode`], assigned by the store on creation.
    FormatId
);
id_newtype!(SupplierId);
id_newtype!(MaterialId);

/// One persisted packaging-format record for a (supplier, material) pair.
///
/// `base_content` and `base_price` are only meaningful on the chain's base
/// node (the unit of consumption); for every other node the effective
/// quantity and price are derived, never stored (exception: the Chain
/// Builder stores the running price on new level nodes for display, and
/// derivation recomputes it regardless).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatNode {
    pub id: FormatId,
    pub supplier_id: SupplierId,
    pub material_id: MaterialId,
    /// Human name of the format, e.g. "caja", "pallet".
    pub label: String,
    /// Unit of measure label for the base content, e.g. "kg".
    pub unit: String,
    /// True for exactly one node per chain: the unit of consumption.
    pub is_consumption_unit: bool,
    /// The next-smaller format this node is composed of. `None` only on the
    /// base node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<FormatId>,
    /// How many units of the child format one unit of this node contains.
    /// Conceptually 1 and unused on the base node.
    #[serde(default)]
    pub child_multiplier: f64,
    /// Quantity (in `unit`) contained in one base unit. Base node only.
    #[serde(default)]
    pub base_content: f64,
    /// Absolute unit price. Base node only.
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub currency: String,
}

/// Flat arena of format nodes keyed by id.
///
/// This is the unit the Derivation Engine, Chain Extender and Batch Editor
/// all operate over. It may span several (supplier, material) chains when
/// loaded supplier-wide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatSet(pub BTreeMap<FormatId, FormatNode>);

impl Deref for FormatSet {
    type Target = BTreeMap<FormatId, FormatNode>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for FormatSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<FormatNode> for FormatSet {
    fn from_iter<I: IntoIterator<Item = FormatNode>>(iter: I) -> Self {
        FormatSet(iter.into_iter().map(|node| (node.id, node)).collect())
    }
}

impl FormatSet {
    /// Resolve the chain's base node: prefer the consumption-unit flag, and
    /// when no node carries it fall back to the smallest `base_content`,
    /// ties broken by id so the choice is deterministic.
    pub fn base(&self) -> Option<&FormatNode> {
        self.values()
            .find(|node| node.is_consumption_unit)
            .or_else(|| {
                self.values().min_by(|a, b| {
                    a.base_content
                        .total_cmp(&b.base_content)
                        .then(a.id.cmp(&b.id))
                })
            })
    }

    /// Ids that no other node references as its `child_id` — the candidate
    /// extension points of each chain in the set.
    pub fn tops(&self) -> BTreeSet<FormatId> {
        let referenced: BTreeSet<FormatId> =
            self.values().filter_map(|node| node.child_id).collect();
        self.keys()
            .filter(|id| !referenced.contains(id))
            .copied()
            .collect()
    }

    /// Project the arena onto a directed parent→child graph. Edges carry the
    /// parent's `child_multiplier`. Dangling `child_id` references are
    /// dropped rather than materialized as phantom nodes.
    pub fn child_graph(&self) -> GraphMap<FormatId, f64, Directed> {
        let mut graph = GraphMap::new();
        for node in self.values() {
            graph.add_node(node.id);
            if let Some(child) = node.child_id {
                if self.contains_key(&child) {
                    graph.add_edge(node.id, child, node.child_multiplier);
                }
            }
        }
        graph
    }

    /// Group the set per material, in stable material order. Used by the
    /// Batch Editor's summary and per-material display.
    pub fn group_by_material(&self) -> BTreeMap<MaterialId, Vec<&FormatNode>> {
        let mut groups: BTreeMap<MaterialId, Vec<&FormatNode>> = BTreeMap::new();
        for node in self.values() {
            groups.entry(node.material_id).or_default().push(node);
        }
        groups
    }
}

/// Creation payload for `POST /format-associations`.
///
/// Constructed through [`NewFormat::base`] or [`NewFormat::level`] so a base
/// node can never carry a `child_id` and a level node always carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFormat {
    pub supplier_id: SupplierId,
    pub material_id: MaterialId,
    pub label: String,
    pub unit: String,
    pub is_consumption_unit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_content: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_id: Option<FormatId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_multiplier: Option<f64>,
}

impl NewFormat {
    /// A new unit-of-consumption node anchoring a fresh chain.
    pub fn base(
        supplier_id: SupplierId,
        material_id: MaterialId,
        label: impl Into<String>,
        unit: impl Into<String>,
        content: f64,
        price: f64,
        currency: impl Into<String>,
    ) -> Self {
        NewFormat {
            supplier_id,
            material_id,
            label: label.into(),
            unit: unit.into(),
            is_consumption_unit: true,
            base_content: Some(content),
            base_price: Some(price),
            currency: Some(currency.into()),
            child_id: None,
            child_multiplier: None,
        }
    }

    /// A new level node stacked on top of `child_id`. `running_price` is the
    /// accumulated price down the chain, stored for display only.
    pub fn level(
        supplier_id: SupplierId,
        material_id: MaterialId,
        label: impl Into<String>,
        unit: impl Into<String>,
        child_id: FormatId,
        multiplier: f64,
        running_price: f64,
    ) -> Self {
        NewFormat {
            supplier_id,
            material_id,
            label: label.into(),
            unit: unit.into(),
            is_consumption_unit: false,
            base_content: None,
            base_price: Some(running_price),
            currency: None,
            child_id: Some(child_id),
            child_multiplier: Some(multiplier),
        }
    }
}

/// Update payload for `PUT /format-associations/{id}`.
///
/// The shape is discriminated by whether the draft currently carries the
/// consumption-unit flag: base nodes persist absolute content/price, level
/// nodes persist linkage. The split makes a base node with a `child_id`
/// unrepresentable on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatUpdate {
    Base {
        label: String,
        unit: String,
        base_content: f64,
        base_price: f64,
        currency: String,
    },
    Derived {
        label: String,
        unit: String,
        child_id: Option<FormatId>,
        child_multiplier: f64,
    },
}

impl FormatUpdate {
    /// Build the update payload for a drafted node, picking the variant from
    /// the draft's current `is_consumption_unit` flag.
    pub fn from_draft(draft: &FormatNode) -> Self {
        if draft.is_consumption_unit {
            FormatUpdate::Base {
                label: draft.label.clone(),
                unit: draft.unit.clone(),
                base_content: draft.base_content,
                base_price: draft.base_price,
                currency: draft.currency.clone(),
            }
        } else {
            FormatUpdate::Derived {
                label: draft.label.clone(),
                unit: draft.unit.clone(),
                child_id: draft.child_id,
                child_multiplier: draft.child_multiplier,
            }
        }
    }
}

impl Serialize for FormatUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormatUpdate::Base {
                label,
                unit,
                base_content,
                base_price,
                currency,
            } => {
                let mut s = serializer.serialize_struct("FormatUpdate", 6)?;
                s.serialize_field("label", label)?;
                s.serialize_field("unit", unit)?;
                s.serialize_field("isConsumptionUnit", &true)?;
                s.serialize_field("baseContent", base_content)?;
                s.serialize_field("basePrice", base_price)?;
                s.serialize_field("currency", currency)?;
                s.end()
            }
            FormatUpdate::Derived {
                label,
                unit,
                child_id,
                child_multiplier,
            } => {
                let mut s = serializer.serialize_struct("FormatUpdate", 5)?;
                s.serialize_field("label", label)?;
                s.serialize_field("unit", unit)?;
                s.serialize_field("isConsumptionUnit", &false)?;
                s.serialize_field("childId", child_id)?;
                s.serialize_field("childMultiplier", child_multiplier)?;
                s.end()
            }
        }
    }
}
