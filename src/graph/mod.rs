//! Mind map graph module
//!
//! Flat records in, positioned tree out, plus the read-only consumers of the
//! positioned tree (search and the render boundary).

pub mod builder;
pub mod layout;
pub mod render;
pub mod search;

pub use builder::{
    build_tree, normalize_value, records_from_value, TreeBuilder, SYNTHETIC_ROOT_ID,
    SYNTHETIC_ROOT_TOPIC,
};
pub use layout::{LayoutConfig, LayoutEngine};
pub use render::{connectors, render_svg, Connector};
pub use search::{highlight_ids, search};
