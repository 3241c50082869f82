//! Collaborator pieces of the `genex` CLI exposed as a library so the
//! integration test suite can exercise them against real files.

pub mod loader;
