//! Selection state machine.
//!
//! `Idle → OverlayActive → Dragging → AwaitingCapture → Idle`, with reset
//! returning to `Idle` from anywhere. All per-gesture state lives in one
//! `Session`; dropping it is the teardown.

use super::rect::{Point, SelectionRect};
use super::surface::{OverlayLayer, OverlaySurface, PageSink, RectStyle};
use crate::channel::ChannelError;
use crate::config::Settings;
use crate::protocol::{
    CaptureRequest, CaptureResponse, ExtensionMessage, PageCommand, PageMessage, QualitySettings,
    StartSelectionPayload,
};

/// Elements carrying this class stay interactive under the overlay.
pub const EXCLUDED_CLASS: &str = "screenshot-helper-exclude";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    OverlayActive,
    Dragging,
    AwaitingCapture,
}

/// Who started the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// The embedding page, via window message.
    Page,
    /// The launcher, via the extension runtime. These sessions are saved.
    Launcher,
}

impl SessionOrigin {
    fn layer(self) -> OverlayLayer {
        match self {
            SessionOrigin::Page => OverlayLayer::Base,
            SessionOrigin::Launcher => OverlayLayer::Top,
        }
    }

    fn persists(self) -> bool {
        matches!(self, SessionOrigin::Launcher)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Auxiliary,
    Secondary,
    Other(i16),
}

impl MouseButton {
    /// From a DOM `MouseEvent.button` code.
    pub fn from_code(code: i16) -> Self {
        match code {
            0 => MouseButton::Primary,
            1 => MouseButton::Auxiliary,
            2 => MouseButton::Secondary,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub client_x: f64,
    pub client_y: f64,
    pub button: MouseButton,
    /// Class list of the element under the pointer.
    pub target_classes: Vec<String>,
}

impl PointerEvent {
    pub fn primary(client_x: f64, client_y: f64) -> Self {
        Self {
            client_x,
            client_y,
            button: MouseButton::Primary,
            target_classes: Vec::new(),
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn on_class(mut self, class: impl Into<String>) -> Self {
        self.target_classes.push(class.into());
        self
    }

    fn position(&self) -> Point {
        Point::new(self.client_x, self.client_y)
    }

    fn targets_excluded(&self) -> bool {
        self.target_classes.iter().any(|c| c == EXCLUDED_CLASS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    OverlayActive,
    Dragging { anchor: Point },
    AwaitingCapture,
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    origin: SessionOrigin,
    quality: QualitySettings,
    phase: Phase,
}

/// A capture the runtime must dispatch on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCapture {
    pub session: SessionId,
    pub request: CaptureRequest,
}

pub struct SelectionController<S, P> {
    surface: S,
    page: P,
    min_size: f64,
    default_quality: QualitySettings,
    session: Option<Session>,
    next_session: u64,
}

impl<S: OverlaySurface, P: PageSink> SelectionController<S, P> {
    pub fn new(surface: S, page: P, settings: &Settings) -> Self {
        Self {
            surface,
            page,
            min_size: settings.min_size,
            default_quality: settings.default_quality,
            session: None,
            next_session: 0,
        }
    }

    pub fn state(&self) -> SelectionState {
        match self.session.as_ref().map(|s| s.phase) {
            None => SelectionState::Idle,
            Some(Phase::OverlayActive) => SelectionState::OverlayActive,
            Some(Phase::Dragging { .. }) => SelectionState::Dragging,
            Some(Phase::AwaitingCapture) => SelectionState::AwaitingCapture,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn handle_page_command(&mut self, command: PageCommand) {
        match command {
            PageCommand::StartSelection { message } => {
                log::info!("[SELECTION] start-selection received from page");
                self.start(SessionOrigin::Page, message);
            }
            PageCommand::Reset => {
                log::info!("[SELECTION] reset received");
                self.reset();
            }
            PageCommand::Ping => self.page.post(PageMessage::Pong),
        }
    }

    pub fn handle_extension_message(&mut self, message: ExtensionMessage) {
        match message {
            ExtensionMessage::StartSelection { message } => {
                log::info!("[SELECTION] start-selection received from launcher");
                self.start(SessionOrigin::Launcher, message);
            }
            ExtensionMessage::CaptureRequest(_) => {
                log::debug!("[SELECTION] Ignoring capture request addressed to the service");
            }
        }
    }

    /// Begin a new session, discarding whatever was there before.
    pub fn start(&mut self, origin: SessionOrigin, payload: Option<StartSelectionPayload>) -> SessionId {
        self.teardown();

        let quality = payload
            .map(|p| p.resolve(self.default_quality))
            .unwrap_or(self.default_quality);
        let id = SessionId(self.next_session);
        self.next_session += 1;

        self.surface.install_overlay(origin.layer());
        self.session = Some(Session {
            id,
            origin,
            quality,
            phase: Phase::OverlayActive,
        });

        log::debug!(
            "[SELECTION] Session {:?} active ({:?}, tab quality {}, canvas quality {})",
            id,
            origin,
            quality.capture_tab_quality,
            quality.canvas_quality
        );
        id
    }

    pub fn reset(&mut self) {
        self.teardown();
    }

    pub fn pointer_down(&mut self, event: &PointerEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if matches!(session.phase, Phase::AwaitingCapture) {
            return;
        }
        if event.button != MouseButton::Primary || event.targets_excluded() {
            return;
        }

        session.phase = Phase::Dragging {
            anchor: event.position(),
        };
        self.surface.remove_rects();
        self.surface.create_rect();
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) {
        let Some(Phase::Dragging { anchor }) = self.session.as_ref().map(|s| s.phase) else {
            return;
        };

        let rect = SelectionRect::square_from_drag(anchor, event.position());
        let style = RectStyle::for_size(rect.meets_minimum(self.min_size));
        self.surface.place_rect(&rect, style);
    }

    /// Finish the drag. Returns the capture to dispatch for a valid
    /// selection; an undersized one ends the session with a too-small
    /// notice and nothing else.
    pub fn pointer_up(&mut self, _event: &PointerEvent) -> Option<PendingCapture> {
        let session = self.session.as_ref()?;
        if !matches!(session.phase, Phase::Dragging { .. }) {
            return None;
        }

        let rect = match self.surface.rect_bounds() {
            Some(rect) if rect.meets_minimum(self.min_size) => rect,
            _ => {
                log::info!("[SELECTION] Selection below {}px, discarded", self.min_size);
                self.teardown();
                self.page.post(PageMessage::CaptureTooSmall);
                return None;
            }
        };

        self.surface.style_rect(RectStyle::Frozen);

        let session = self.session.as_mut()?;
        session.phase = Phase::AwaitingCapture;

        let request = CaptureRequest {
            rect,
            device_pixel_ratio: self.surface.device_pixel_ratio(),
            tab_quality: session.quality.capture_tab_quality,
            encode_quality: session.quality.canvas_quality,
            persist: session.origin.persists(),
        };

        log::info!(
            "[SELECTION] Requesting capture of {}x{} at {},{}",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );

        Some(PendingCapture {
            session: session.id,
            request,
        })
    }

    /// Deliver the outcome of a capture. Outcomes for a session that has
    /// since been reset or replaced are dropped.
    pub fn complete_capture(
        &mut self,
        session: SessionId,
        outcome: Result<CaptureResponse, ChannelError>,
    ) {
        let current = match self.session.as_ref() {
            Some(s) if s.id == session && matches!(s.phase, Phase::AwaitingCapture) => s,
            _ => {
                log::debug!("[SELECTION] Ignoring late capture response for {:?}", session);
                return;
            }
        };
        let origin = current.origin;

        let delivered = outcome.map(CaptureResponse::into_result);
        match delivered {
            Ok(Ok(payload)) => {
                match origin {
                    SessionOrigin::Page => self.surface.style_rect(RectStyle::Valid),
                    SessionOrigin::Launcher => self.surface.remove_rects(),
                }
                self.page.post(PageMessage::SelectionDone {
                    image: payload.image,
                });
            }
            Ok(Err(failure)) => {
                log::error!("[SELECTION] Capture service error: {}", failure.message);
                self.surface.remove_rects();
                self.page.post(PageMessage::Error {
                    error: failure.message,
                });
            }
            Err(channel) => {
                log::error!("[SELECTION] Failed to capture: {}", channel);
                self.surface.remove_rects();
                self.page.post(PageMessage::Error {
                    error: channel.to_string(),
                });
            }
        }

        self.surface.remove_overlay();
        self.session = None;
    }

    fn teardown(&mut self) {
        self.surface.remove_rects();
        self.surface.remove_overlay();
        self.session = None;
    }
}
