//! Structured conversion events.
//!
//! Components emit [`ConversionEvent`]s through an [`EventSink`]. In the
//! server that sink is an [`EventHandle`] feeding a background
//! [`EventWriter`], which stores records in a bounded [`MemoryEventStore`].

mod handle;
mod store;
mod types;
mod writer;

pub use handle::*;
pub use store::*;
pub use types::*;
pub use writer::*;
