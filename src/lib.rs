//! Mind map generation pipeline
//!
//! Turns unstructured text into a hierarchical mind map and exposes what a
//! renderer needs to draw it.
//!
//! ## Call chain
//!
//! ```text
//! extract text -> generate flat records (retrying) -> build tree -> layout -> viewport
//!                                                                      \-> search / export
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use mindmap::graph::{build_tree, LayoutEngine};
//! use mindmap::FlatRecord;
//!
//! let records = vec![
//!     FlatRecord::new("a", "", "Root", ""),
//!     FlatRecord::new("b", "a", "Child", ""),
//! ];
//! let tree = build_tree(&records).unwrap();
//! let positioned = LayoutEngine::default().layout(&tree);
//! assert_eq!((positioned.x, positioned.y), (0.0, 0.0));
//! ```

// Core error handling
pub mod error;

// Configuration (YAML file + environment)
pub mod config;

// Tree building, layout, search, rendering boundary
pub mod graph;

// Generation collaborator and retry wrapper
pub mod ai;

// File text extraction collaborator
pub mod extract;

// Outline export
pub mod export;

// Per-map session state
pub mod session;

pub use config::MindMapConfig;
pub use error::{MindMapError, MindMapResult, ValidationError};
pub use export::{export_lines, export_text};
pub use graph::{build_tree, search, LayoutConfig, LayoutEngine, TreeBuilder};
pub use session::{Completion, MapSession, MindMap, RequestTicket};

// Shared types
pub use mindmap_types::{
    Bounds, FlatRecord, MapNode, MindMapNode, Point, PositionedNode, ViewBox,
};
pub use viewport::{GesturePhase, SurfaceSize, ViewportConfig, ViewportController};
