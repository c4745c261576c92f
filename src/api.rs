//! Typed client for the content-addressed storage and workflow platform

/// Blocking JSON client with bearer auth
pub mod client;
/// Collections: bundles of stored files with a key-value property bag
pub mod collection;
/// Container requests and the derived job status table
pub mod container;
/// Projects (groups) owning collections and workflow runs
pub mod group;
/// Content-addressed block upload and manifest assembly
pub mod storage;
