//! Batch contrast adjustment and 8-bit TIFF export for OBF microscopy stacks.
//!
//! ```text
//!  input dir ─► loader ─► filter ─► smooth ─► ContrastPicker ─► normalize ─► TIFF
//! ```
//!
//! The picker is either the interactive viewer ([`app::ViewerPicker`]) or a
//! non-interactive one from [`pipeline`].

pub mod app;
pub mod color;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod process;
pub mod state;
pub mod ui;
