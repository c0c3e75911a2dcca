//! Persisted rules document management.
//!
//! The document is JSON: `{rules: [...], log_file: string, debug:
//! bool}`, written with two-space indentation. The engine itself never
//! writes it; everything here is on behalf of the operator surface.

mod rules;

pub use rules::{load, save, Manager};
