//! PDF writing: object serialization and incremental updates.

pub mod incremental;
pub mod object_serializer;

pub use incremental::{IncrementalUpdate, Revision};
pub use object_serializer::ObjectSerializer;
