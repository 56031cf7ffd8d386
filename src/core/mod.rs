//! Core runtime components: the livestatus client, metric rendering and the
//! collection cycle tying them together.

pub mod collector;
pub mod command;
pub mod livestatus;
pub mod metric;
pub mod perfdata;

pub use collector::{render, CollectionSettings, Collector, SelectionPolicy};
