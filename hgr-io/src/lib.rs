//! Encoders and decoders for the file formats around hypergraph
//! partitioning: hMetis hypergraph files, partition files (one block id per
//! line) and fixed-vertex files (`-1` or a block id per line).

pub mod fixed;
pub mod hmetis;
pub mod partition;

pub use hmetis::Hypergraph;
