//! # formato-core
//!
//! A Rust library for managing packaging-format hierarchies of
//! supplier/raw-material pairs: a raw material is purchased in a base "unit
//! of consumption" (kilogram, liter) that is packed into successively
//! larger formats (bag → box → pallet), each declaring how many of the
//! next-smaller format it contains.
//!
//! ## Overview
//!
//! Chains are persisted as flat format-node records linked by a `child_id`
//! reference, and the effective quantity and cost of any node are never
//! stored — they are derived by walking the chain down to the base and
//! multiplying back up. The data may be incomplete, freshly created or,
//! through data-entry mistakes, cyclic, so every traversal is bounded and
//! cycle-checked and derivation degrades to local anchor values instead of
//! failing.
//!
//! ### Key Features
//!
//! - **Derivation Engine**: pure, memoized, cycle-safe resolution of
//!   effective content and price ([`derive::Deriver`])
//! - **Chain Builder**: validated, strictly sequential construction of a
//!   new chain ([`builder::ChainBuilder`])
//! - **Chain Extender**: top-candidate discovery and base→top
//!   reconstruction for resuming a chain ([`extend::ExtendSession`])
//! - **Batch Editor**: draft map with per-node dirty tracking and
//!   partial-failure-tolerant concurrent saves ([`editor::BatchEditor`])
//! - **Store seam**: the REST store behind a trait so tests run against an
//!   in-memory implementation ([`store::FormatStore`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formato_core::{
//!     builder::{BaseSpec, ChainBuilder, LevelSpec},
//!     config::StoreConfig,
//!     derive::Deriver,
//!     format::{MaterialId, SupplierId},
//!     store::{FormatStore, RestStore},
//! };
//! use url::Url;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RestStore::new(StoreConfig::new(Url::parse(
//!         "https://erp.example.com/api/",
//!     )?))?;
//!     let (supplier, material) = (SupplierId::new(), MaterialId::new());
//!
//!     // A 25 kg sack, boxed in fives, palletized in pairs.
//!     let mut builder = ChainBuilder::new(
//!         supplier,
//!         material,
//!         BaseSpec {
//!             label: "saco".into(),
//!             content: 25.0,
//!             price: 100.0,
//!             unit: "kg".into(),
//!             currency: "EUR".into(),
//!         },
//!     );
//!     builder
//!         .push_level(LevelSpec {
//!             label: "caja".into(),
//!             multiplier: Some(5.0),
//!             unit: "kg".into(),
//!         })
//!         .push_level(LevelSpec {
//!             label: "pallet".into(),
//!             multiplier: Some(2.0),
//!             unit: "kg".into(),
//!         });
//!     builder.build(&store).await.map_err(|failure| failure.source)?;
//!
//!     // Derive what one pallet effectively contains and costs.
//!     let nodes: formato_core::format::FormatSet =
//!         store.list(supplier, Some(material)).await?.into_iter().collect();
//!     let mut deriver = Deriver::new(&nodes);
//!     for (id, node) in nodes.iter() {
//!         if let Some(derived) = deriver.derive(*id) {
//!             println!("{}: {} {} at {} {}", node.label, derived.content, derived.unit,
//!                 derived.price, derived.currency);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Guide
//!
//! Start with [`format`] for the data model, then [`derive`] for how values
//! propagate through a chain. [`builder`], [`extend`] and [`editor`] cover
//! the three write paths; [`store`] and [`config`] the REST collaborator.

pub mod builder;
pub mod config;
pub mod derive;
pub mod editor;
pub mod error;
pub mod extend;
pub mod format;
pub mod store;
#[cfg(test)]
mod tests;

pub use error::*;
