//! Case-file parsing: the textual top-level descriptor of an EnSight Gold
//! dataset.
pub mod model;
pub mod parser;
pub mod wildcard;
