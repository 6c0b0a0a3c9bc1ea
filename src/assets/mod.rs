//! Asset readers.

pub mod off;

pub use off::OffMesh;
