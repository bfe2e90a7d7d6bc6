//! Page-context event loop.
//!
//! Feeds commands and pointer events into the controller, dispatches its
//! capture requests over the channel, and routes each outcome back tagged
//! with the session that asked for it.

use std::time::Duration;

use tokio::sync::mpsc;

use super::controller::{PendingCapture, PointerEvent, SelectionController, SessionId};
use super::surface::{OverlaySurface, PageSink};
use crate::channel::{CaptureClient, ChannelError};
use crate::protocol::{CaptureResponse, ExtensionMessage, PageCommand};

/// Everything the page context can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentEvent {
    /// Window message from the embedding page, already parsed.
    Page(PageCommand),
    /// Raw window traffic. Anything that is not a command is dropped.
    WindowMessage(serde_json::Value),
    /// Extension runtime message (launcher).
    Extension(ExtensionMessage),
    PointerDown(PointerEvent),
    PointerMove(PointerEvent),
    PointerUp(PointerEvent),
}

struct Completion {
    session: SessionId,
    outcome: Result<CaptureResponse, ChannelError>,
}

/// Waits long enough for the frozen (invisible) selection rectangle to be
/// painted. Must complete before the tab is captured, otherwise the
/// rectangle's own border ends up in the screenshot.
pub async fn allow_paint_to_settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

pub struct ContentRuntime<S, P> {
    controller: SelectionController<S, P>,
    client: CaptureClient,
    paint_settle: Duration,
}

impl<S: OverlaySurface, P: PageSink> ContentRuntime<S, P> {
    pub fn new(controller: SelectionController<S, P>, client: CaptureClient, paint_settle: Duration) -> Self {
        Self {
            controller,
            client,
            paint_settle,
        }
    }

    /// Run until `events` closes. Hands the controller back so callers can
    /// inspect its final state.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ContentEvent>) -> SelectionController<S, P> {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event, &done_tx),
                    None => break,
                },
                Some(done) = done_rx.recv() => {
                    self.controller.complete_capture(done.session, done.outcome);
                }
            }
        }

        log::debug!("[SELECTION] Event source closed, runtime exiting");
        self.controller
    }

    fn dispatch(&mut self, event: ContentEvent, done_tx: &mpsc::UnboundedSender<Completion>) {
        match event {
            ContentEvent::Page(command) => self.controller.handle_page_command(command),
            ContentEvent::WindowMessage(data) => match PageCommand::from_window_message(&data) {
                Some(command) => self.controller.handle_page_command(command),
                None => log::trace!("[SELECTION] Ignoring unrelated window message"),
            },
            ContentEvent::Extension(message) => self.controller.handle_extension_message(message),
            ContentEvent::PointerDown(e) => self.controller.pointer_down(&e),
            ContentEvent::PointerMove(e) => self.controller.pointer_move(&e),
            ContentEvent::PointerUp(e) => {
                if let Some(pending) = self.controller.pointer_up(&e) {
                    self.spawn_capture(pending, done_tx.clone());
                }
            }
        }
    }

    fn spawn_capture(&self, pending: PendingCapture, done_tx: mpsc::UnboundedSender<Completion>) {
        let client = self.client.clone();
        let paint_settle = self.paint_settle;

        tokio::spawn(async move {
            allow_paint_to_settle(paint_settle).await;
            let outcome = client.request(pending.request).await;
            let _ = done_tx.send(Completion {
                session: pending.session,
                outcome,
            });
        });
    }
}
