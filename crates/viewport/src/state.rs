//! Viewport controller
//!
//! Holds the view box, the rendering surface size and the gesture state.
//! Every operation is a synchronous state transition; none can fail.

use mindmap_types::{Bounds, Point, PositionedNode, ViewBox};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gesture::{GestureState, PinchSnapshot, PointerId};

/// Distances below this are treated as coincident pointers
const MIN_PINCH_DISTANCE: f64 = 1e-6;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Viewport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Drawn node box width (scene units)
    pub node_width: f64,
    /// Drawn node box height (scene units)
    pub node_height: f64,
    /// Margin added on every side when fitting content
    pub spacing: f64,
    /// Scale applied per wheel step
    pub zoom_factor: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 60.0,
            spacing: 80.0,
            zoom_factor: 1.1,
        }
    }
}

/// Rendering surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl SurfaceSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for SurfaceSize {
    fn default() -> Self {
        Self::new(1000.0, 800.0)
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Continuous 2D window over the laid-out scene
#[derive(Debug, Clone)]
pub struct ViewportController {
    view_box: ViewBox,
    surface: SurfaceSize,
    config: ViewportConfig,
    gesture: GestureState,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default(), SurfaceSize::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewportConfig, surface: SurfaceSize) -> Self {
        Self {
            view_box: ViewBox::new(0.0, 0.0, surface.width, surface.height),
            surface,
            config,
            gesture: GestureState::Idle,
        }
    }

    /// Create a controller already fitted to a laid-out tree
    pub fn fitted(config: ViewportConfig, surface: SurfaceSize, root: &PositionedNode) -> Self {
        let mut controller = Self::new(config, surface);
        controller.fit_to_content(root);
        controller
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    /// Pixels per scene unit along x
    pub fn zoom_level(&self) -> f64 {
        if self.view_box.width > 0.0 {
            self.surface.width / self.view_box.width
        } else {
            1.0
        }
    }

    /// The surface may be resized between any two calls
    pub fn set_surface_size(&mut self, width: f64, height: f64) {
        self.surface = SurfaceSize::new(width, height);
    }

    // =========================================================================
    // COORDINATE TRANSFORMS
    // =========================================================================

    /// Scene units per pixel, recomputed from the current state
    fn ratios(&self) -> (f64, f64) {
        let rx = if self.surface.width > 0.0 {
            self.view_box.width / self.surface.width
        } else {
            1.0
        };
        let ry = if self.surface.height > 0.0 {
            self.view_box.height / self.surface.height
        } else {
            1.0
        };
        (rx, ry)
    }

    /// Surface pixel → scene point
    pub fn to_scene(&self, pixel: Point) -> Point {
        let (rx, ry) = self.ratios();
        Point::new(
            self.view_box.x + pixel.x * rx,
            self.view_box.y + pixel.y * ry,
        )
    }

    /// Scene point → surface pixel
    pub fn to_pixel(&self, scene: Point) -> Point {
        let (rx, ry) = self.ratios();
        Point::new(
            (scene.x - self.view_box.x) / rx,
            (scene.y - self.view_box.y) / ry,
        )
    }

    // =========================================================================
    // FIT
    // =========================================================================

    /// Replace the view box with the content bounds plus one spacing unit
    ///
    /// Cancels any gesture in progress.
    pub fn fit_to_content(&mut self, root: &PositionedNode) {
        let bounds = root.bounds(self.config.node_width, self.config.node_height);
        self.fit_to_bounds(bounds);
    }

    pub fn fit_to_bounds(&mut self, bounds: Bounds) {
        self.view_box = ViewBox::from_bounds(bounds.expand(self.config.spacing));
        self.gesture = GestureState::Idle;
        debug!(view_box = ?self.view_box, "viewport fitted to content");
    }

    // =========================================================================
    // PAN / ZOOM
    // =========================================================================

    /// Pan by a pointer movement in pixels; the content follows the pointer
    pub fn pan_by(&mut self, dx_pixels: f64, dy_pixels: f64) {
        let (rx, ry) = self.ratios();
        self.view_box.x -= dx_pixels * rx;
        self.view_box.y -= dy_pixels * ry;
    }

    /// Scale the view box by `factor` keeping the scene point under `pixel` fixed
    ///
    /// `factor > 1` zooms out, `factor < 1` zooms in.
    pub fn zoom_at(&mut self, pixel: Point, factor: f64) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let anchor = self.to_scene(pixel);
        self.view_box = self.view_box.scaled_about(anchor, factor);
    }

    /// One wheel step: positive delta zooms out, negative zooms in
    pub fn wheel_zoom(&mut self, pixel: Point, delta_y: f64) {
        let factor = if delta_y > 0.0 {
            self.config.zoom_factor
        } else if delta_y < 0.0 {
            1.0 / self.config.zoom_factor
        } else {
            return;
        };
        self.zoom_at(pixel, factor);
    }

    // =========================================================================
    // POINTER GESTURES
    // =========================================================================

    pub fn pointer_down(&mut self, id: PointerId, pixel: Point) {
        self.gesture = match self.gesture {
            GestureState::Idle => GestureState::Tracking {
                pointer: id,
                anchor: pixel,
            },
            GestureState::Tracking { pointer, .. } if pointer == id => GestureState::Tracking {
                pointer: id,
                anchor: pixel,
            },
            GestureState::Tracking { pointer, anchor } => {
                let snapshot = PinchSnapshot {
                    initial_distance: anchor.distance(pixel),
                    midpoint: self.to_scene(anchor.midpoint(pixel)),
                    view_box: self.view_box,
                };
                debug!(?snapshot, "pinch started");
                GestureState::Pinching {
                    pointers: [(pointer, anchor), (id, pixel)],
                    snapshot,
                }
            }
            // A third pointer is ignored
            pinching @ GestureState::Pinching { .. } => pinching,
        };
    }

    /// Drag-pans while tracking one pointer, zooms while pinching
    pub fn pointer_move(&mut self, id: PointerId, pixel: Point) {
        match self.gesture {
            GestureState::Tracking { pointer, anchor } if pointer == id => {
                self.pan_by(pixel.x - anchor.x, pixel.y - anchor.y);
                self.gesture = GestureState::Tracking {
                    pointer,
                    anchor: pixel,
                };
            }
            GestureState::Pinching { .. } => self.pinch_update(id, pixel),
            _ => {}
        }
    }

    /// Update one pinching pointer and rescale about the snapshotted midpoint
    pub fn pinch_update(&mut self, id: PointerId, pixel: Point) {
        let GestureState::Pinching {
            mut pointers,
            snapshot,
        } = self.gesture
        else {
            return;
        };
        let Some(slot) = pointers.iter_mut().find(|(p, _)| *p == id) else {
            return;
        };
        slot.1 = pixel;
        self.gesture = GestureState::Pinching { pointers, snapshot };

        let current = pointers[0].1.distance(pointers[1].1);
        if snapshot.initial_distance < MIN_PINCH_DISTANCE || current < MIN_PINCH_DISTANCE {
            return;
        }
        let scale = snapshot.initial_distance / current;
        self.view_box = snapshot.view_box.scaled_about(snapshot.midpoint, scale);
    }

    pub fn pointer_up(&mut self, id: PointerId) {
        self.gesture = match self.gesture {
            GestureState::Tracking { pointer, .. } if pointer == id => GestureState::Idle,
            GestureState::Pinching { pointers, .. } if pointers.iter().any(|(p, _)| *p == id) => {
                let (pointer, anchor) = if pointers[0].0 == id {
                    pointers[1]
                } else {
                    pointers[0]
                };
                debug!(pointer, "pinch ended");
                GestureState::Tracking { pointer, anchor }
            }
            other => other,
        };
    }

    /// Abandon any gesture in progress
    pub fn cancel_gesture(&mut self) {
        self.gesture = GestureState::Idle;
    }
}
