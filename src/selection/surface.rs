//! The page-side drawing surface: overlay, selection rectangle, and the
//! broadcast channel back to the embedding page.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::rect::SelectionRect;
use crate::protocol::PageMessage;

/// Stacking layer for the full-viewport overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayer {
    /// Page-started sessions: stays under the page's own UI.
    Base,
    /// Launcher-started sessions: above everything.
    Top,
}

impl OverlayLayer {
    pub fn z_index(self) -> u32 {
        match self {
            OverlayLayer::Base => 1,
            OverlayLayer::Top => 9999,
        }
    }
}

/// Visual state of the selection rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectStyle {
    Valid,
    Invalid,
    /// Invisible, so the capture does not contain the rectangle itself.
    Frozen,
}

impl RectStyle {
    pub fn for_size(valid: bool) -> Self {
        if valid {
            RectStyle::Valid
        } else {
            RectStyle::Invalid
        }
    }

    pub fn fill(self) -> &'static str {
        match self {
            RectStyle::Valid => "rgba(3,3,4,0.2)",
            RectStyle::Invalid => "rgba(255,0,0,0.2)",
            RectStyle::Frozen => "rgba(0,0,0,0)",
        }
    }

    pub fn border(self) -> &'static str {
        match self {
            RectStyle::Valid => "2px dashed #605DFF",
            RectStyle::Invalid => "2px dashed #FF0000",
            RectStyle::Frozen => "none",
        }
    }
}

/// DOM operations the controller needs. Installing the overlay also
/// registers the pointer handlers; removing it unregisters them.
pub trait OverlaySurface {
    fn install_overlay(&mut self, layer: OverlayLayer);
    fn remove_overlay(&mut self);
    /// Append a fresh, still empty, selection rectangle.
    fn create_rect(&mut self);
    fn place_rect(&mut self, rect: &SelectionRect, style: RectStyle);
    fn style_rect(&mut self, style: RectStyle);
    /// Bounding box of the current rectangle as laid out.
    fn rect_bounds(&self) -> Option<SelectionRect>;
    /// Removes every selection rectangle, including stale ones.
    fn remove_rects(&mut self);
    fn device_pixel_ratio(&self) -> f64;
}

/// Same-window broadcast to the embedding page.
pub trait PageSink {
    fn post(&mut self, message: PageMessage);
}

impl PageSink for mpsc::UnboundedSender<PageMessage> {
    fn post(&mut self, message: PageMessage) {
        if self.send(message).is_err() {
            log::debug!("[SELECTION] Page listener gone, message dropped");
        }
    }
}

impl PageSink for Vec<PageMessage> {
    fn post(&mut self, message: PageMessage) {
        self.push(message);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectNode {
    pub bounds: Option<SelectionRect>,
    pub style: Option<RectStyle>,
}

#[derive(Debug, Default)]
pub struct SurfaceTree {
    pub overlays: Vec<OverlayLayer>,
    pub rects: Vec<RectNode>,
}

/// In-memory surface for headless runs and tests. Clones share one tree,
/// so a caller can keep a handle after giving the surface away.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    tree: Arc<Mutex<SurfaceTree>>,
    device_pixel_ratio: f64,
}

impl MemorySurface {
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            tree: Arc::new(Mutex::new(SurfaceTree::default())),
            device_pixel_ratio,
        }
    }

    pub fn tree(&self) -> MutexGuard<'_, SurfaceTree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn overlay_count(&self) -> usize {
        self.tree().overlays.len()
    }

    pub fn rect_count(&self) -> usize {
        self.tree().rects.len()
    }

    pub fn current_rect(&self) -> Option<RectNode> {
        self.tree().rects.last().cloned()
    }
}

impl OverlaySurface for MemorySurface {
    fn install_overlay(&mut self, layer: OverlayLayer) {
        self.tree().overlays.push(layer);
    }

    fn remove_overlay(&mut self) {
        self.tree().overlays.clear();
    }

    fn create_rect(&mut self) {
        self.tree().rects.push(RectNode {
            bounds: None,
            style: None,
        });
    }

    fn place_rect(&mut self, rect: &SelectionRect, style: RectStyle) {
        if let Some(node) = self.tree().rects.last_mut() {
            node.bounds = Some(*rect);
            node.style = Some(style);
        }
    }

    fn style_rect(&mut self, style: RectStyle) {
        if let Some(node) = self.tree().rects.last_mut() {
            node.style = Some(style);
        }
    }

    fn rect_bounds(&self) -> Option<SelectionRect> {
        self.tree().rects.last().and_then(|node| node.bounds)
    }

    fn remove_rects(&mut self) {
        self.tree().rects.clear();
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}
