//! Viewport state management for mind map navigation
//!
//! The controller owns a single [`ViewBox`](mindmap_types::ViewBox) and
//! applies drag-pan, wheel-zoom and two-finger pinch-zoom to it as affine
//! transforms. All inputs arrive in surface pixels and are converted to
//! scene units with the ratio of the *current* view box to the *current*
//! surface size.
//!
//! ```text
//!            pointer_down            pointer_down (2nd)
//!   Idle ───────────────► Tracking ───────────────────► Pinching
//!    ▲                      │  ▲                           │
//!    └──── pointer_up ──────┘  └─────── pointer_up ────────┘
//! ```

pub mod gesture;
pub mod state;

pub use gesture::{GesturePhase, GestureState, PinchSnapshot, PointerId};
pub use state::{SurfaceSize, ViewportConfig, ViewportController};
