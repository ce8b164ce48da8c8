//! Gesture state machine
//!
//! Transient, per-input-session state. A snapshot is captured on entry to
//! `Pinching` and dropped as soon as the state is left.

use mindmap_types::{Point, ViewBox};

/// Pointer identifier as reported by the input surface
pub type PointerId = i64;

/// Captured when two pointers are first down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchSnapshot {
    /// Pixel distance between the two pointers at entry
    pub initial_distance: f64,
    /// Scene-space midpoint of the two pointers at entry (the fixed point)
    pub midpoint: Point,
    /// View box at entry
    pub view_box: ViewBox,
}

/// Current gesture state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    /// No pointer down
    #[default]
    Idle,

    /// One pointer down, dragging pans the view
    Tracking {
        pointer: PointerId,
        /// Last seen pixel position of the pointer
        anchor: Point,
    },

    /// Two pointers down, distance changes zoom the view
    Pinching {
        /// Pointer registry with last seen pixel positions
        pointers: [(PointerId, Point); 2],
        snapshot: PinchSnapshot,
    },
}

/// State name without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Tracking,
    Pinching,
}

impl GesturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GesturePhase::Idle => "IDLE",
            GesturePhase::Tracking => "TRACKING",
            GesturePhase::Pinching => "PINCHING",
        }
    }
}

impl GestureState {
    pub fn phase(&self) -> GesturePhase {
        match self {
            GestureState::Idle => GesturePhase::Idle,
            GestureState::Tracking { .. } => GesturePhase::Tracking,
            GestureState::Pinching { .. } => GesturePhase::Pinching,
        }
    }

    /// Number of pointers the state is tracking
    pub fn pointer_count(&self) -> usize {
        match self {
            GestureState::Idle => 0,
            GestureState::Tracking { .. } => 1,
            GestureState::Pinching { .. } => 2,
        }
    }

    pub fn snapshot(&self) -> Option<&PinchSnapshot> {
        match self {
            GestureState::Pinching { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_tracking(&self, id: PointerId) -> bool {
        match self {
            GestureState::Idle => false,
            GestureState::Tracking { pointer, .. } => *pointer == id,
            GestureState::Pinching { pointers, .. } => pointers.iter().any(|(p, _)| *p == id),
        }
    }
}
