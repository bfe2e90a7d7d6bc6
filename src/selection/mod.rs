//! Selection overlay domain, running in the page context.
//!
//! Owns the overlay, the selection rectangle and the per-gesture session.
//! Talks to the capture service only through the channel.

mod controller;
mod rect;
mod runtime;
mod surface;

pub use controller::{
    MouseButton, PendingCapture, PointerEvent, SelectionController, SelectionState, SessionId,
    SessionOrigin, EXCLUDED_CLASS,
};
pub use rect::{Point, SelectionRect};
pub use runtime::{allow_paint_to_settle, ContentEvent, ContentRuntime};
pub use surface::{
    MemorySurface, OverlayLayer, OverlaySurface, PageSink, RectNode, RectStyle, SurfaceTree,
};
