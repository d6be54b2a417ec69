#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

mod catalog;
mod chemical;
mod error;
mod fragment;
mod molecule;
mod smarts;
pub use catalog::{FunctionalGroup, GroupCatalog};
pub use chemical::{Chemical, ChemicalDatabase, ChemicalRecord};
pub use error::{FragmentError, FragmentResult};
pub use fragment::{
    smarts_fragment_priority, FragmentAssignment, FragmentStatus, SegmentAndBondCount,
};
pub use molecule::{element_symbol, Atom, BondOrder, Molecule};
pub use smarts::{AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, SmartsPattern};

#[cfg(feature = "python")]
mod python;
