//! Native boundary: the entry-point table and the callback trampolines.

pub mod bindings;
pub mod callback;
