//! # gedcom
//!
//! A grammar-driven parser and writer for the GEDCOM format.
//!
//! The shape of legal GEDCOM is not hardcoded: a lineage-linked grammar
//! file is compiled first and every data file is validated against it
//! while the node tree is built. See the [gedcom] module for the
//! pipeline, and [gedcom::store::Store] for the high-level API:
//!
//! ```no_run
//! use gedcom::gedcom::Store;
//!
//! let store = Store::load("grammars/gedcom.gedg", "family.ged").expect("load failed");
//! for individual in store.individuals() {
//!     println!("{:?}", individual.children_with_tag("NAME"));
//! }
//! ```

pub mod gedcom;
