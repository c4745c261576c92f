//! Build workflow input documents and hand them to the external runner

/// Input documents are serialised into a set of structs defined here
pub mod input;
/// Create a sub-project and submit through the runner subprocess
pub mod submit;
