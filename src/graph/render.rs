//! Rendering boundary
//!
//! The positioned tree plus a view box is the whole contract with a
//! renderer. This module derives connector geometry from it and writes a
//! plain SVG document (no theming) for the CLI.

use std::collections::HashSet;
use std::fmt::Write;

use mindmap_types::{MapNode, Point, PositionedNode, ViewBox};

use super::layout::LayoutConfig;

/// Cubic curve from a parent's box center to a child's box top-center
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub parent_id: String,
    pub child_id: String,
    pub start: Point,
    pub control_1: Point,
    pub control_2: Point,
    pub end: Point,
}

impl Connector {
    /// SVG path data
    pub fn path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control_1.x,
            self.control_1.y,
            self.control_2.x,
            self.control_2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// One connector per parent/child edge, pre-order
pub fn connectors(root: &PositionedNode, config: &LayoutConfig) -> Vec<Connector> {
    let half_w = config.node_width / 2.0;
    let half_h = config.node_height / 2.0;

    root.preorder()
        .flat_map(|parent| {
            let start = Point::new(parent.x + half_w, parent.y + half_h);
            parent.children.iter().map(move |child| {
                let end = Point::new(child.x + half_w, child.y);
                let mid_y = (start.y + end.y) / 2.0;
                Connector {
                    parent_id: parent.id.clone(),
                    child_id: child.id.clone(),
                    start,
                    control_1: Point::new(start.x, mid_y),
                    control_2: Point::new(end.x, mid_y),
                    end,
                }
            })
        })
        .collect()
}

/// Write an SVG document; nodes whose id is in `highlighted` get a marker class
pub fn render_svg(
    root: &PositionedNode,
    view_box: &ViewBox,
    config: &LayoutConfig,
    highlighted: &HashSet<String>,
) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{}">"#,
        view_box.to_attribute()
    );

    for connector in connectors(root, config) {
        let _ = writeln!(
            svg,
            r#"  <path class="edge" d="{}" fill="none" stroke="currentColor"/>"#,
            connector.path()
        );
    }

    for node in root.preorder() {
        let class = if highlighted.contains(&node.id) {
            "node highlighted"
        } else {
            "node"
        };
        let _ = writeln!(
            svg,
            r#"  <g class="{class}" data-id="{id}">"#,
            id = escape(&node.id)
        );
        let _ = writeln!(
            svg,
            r#"    <rect x="{}" y="{}" width="{}" height="{}" rx="8"/>"#,
            node.x, node.y, config.node_width, config.node_height
        );
        let _ = writeln!(
            svg,
            r#"    <text x="{}" y="{}" text-anchor="middle" dominant-baseline="middle">{}</text>"#,
            node.x + config.node_width / 2.0,
            node.y + config.node_height / 2.0,
            escape(node.topic())
        );
        svg.push_str("  </g>\n");
    }

    svg.push_str("</svg>\n");
    svg
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}
