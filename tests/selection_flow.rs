//! End-to-end tests: page runtime, channel, capture service, back to the page.
//!
//! The visible tab is a synthetic frame; the overlay is the in-memory
//! surface, so every DOM side effect can be inspected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tab_snip_lib::capture::{
    frame_to_data_uri, spawn_capture_service, CaptureError, CaptureService, DownloadDir,
    TabCapturer,
};
use tab_snip_lib::channel::capture_channel;
use tab_snip_lib::launcher::{Launcher, TabId, TabRegistry};
use tab_snip_lib::protocol::{PageCommand, PageMessage};
use tab_snip_lib::selection::{
    ContentEvent, ContentRuntime, MemorySurface, PointerEvent, SelectionController,
    SelectionState,
};
use tab_snip_lib::Settings;

type Page = SelectionController<MemorySurface, mpsc::UnboundedSender<PageMessage>>;

// ── Fixtures ───────────────────────────────────────────────────────

/// Visible tab: a flat green frame, counting capture calls.
struct GreenTab {
    frame: DynamicImage,
    calls: AtomicUsize,
}

impl GreenTab {
    fn new(width: u32, height: u32) -> Arc<Self> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 200, 0, 255]));
        Arc::new(Self {
            frame: DynamicImage::ImageRgba8(img),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TabCapturer for GreenTab {
    async fn capture_visible_tab(&self, quality: u8) -> Result<String, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        frame_to_data_uri(&self.frame, quality)
    }
}

struct RevokedTab;

#[async_trait]
impl TabCapturer for RevokedTab {
    async fn capture_visible_tab(&self, _quality: u8) -> Result<String, CaptureError> {
        Err(CaptureError::Denied("tab is not capturable".into()))
    }
}

struct Harness {
    events: mpsc::UnboundedSender<ContentEvent>,
    page: mpsc::UnboundedReceiver<PageMessage>,
    surface: MemorySurface,
    runtime: JoinHandle<Page>,
}

impl Harness {
    fn start(service: CaptureService, ratio: f64) -> Self {
        let settings = Settings::default();
        let client = spawn_capture_service(service, settings.channel_capacity);
        Self::with_client(client, ratio)
    }

    fn with_client(client: tab_snip_lib::channel::CaptureClient, ratio: f64) -> Self {
        let settings = Settings::default();
        let surface = MemorySurface::new(ratio);
        let (page_tx, page) = mpsc::unbounded_channel();
        let controller = SelectionController::new(surface.clone(), page_tx, &settings);
        let runtime = ContentRuntime::new(controller, client, settings.paint_settle);
        let (events, rx) = mpsc::unbounded_channel();

        Self {
            events,
            page,
            surface,
            runtime: tokio::spawn(runtime.run(rx)),
        }
    }

    fn send(&self, event: ContentEvent) {
        self.events.send(event).unwrap();
    }

    fn start_from_page(&self) {
        self.send(ContentEvent::Page(PageCommand::StartSelection { message: None }));
    }

    fn drag(&self, from: (f64, f64), to: (f64, f64)) {
        self.send(ContentEvent::PointerDown(PointerEvent::primary(from.0, from.1)));
        self.send(ContentEvent::PointerMove(PointerEvent::primary(to.0, to.1)));
        self.send(ContentEvent::PointerUp(PointerEvent::primary(to.0, to.1)));
    }

    async fn finish(self) -> (Page, Vec<PageMessage>) {
        let Harness {
            events,
            mut page,
            runtime,
            ..
        } = self;
        drop(events);
        let controller = runtime.await.unwrap();
        let mut rest = Vec::new();
        while let Ok(msg) = page.try_recv() {
            rest.push(msg);
        }
        (controller, rest)
    }
}

fn decode(image: &str) -> DynamicImage {
    image::load_from_memory(&STANDARD.decode(image).unwrap()).unwrap()
}

// ── Page-started sessions ──────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn valid_selection_yields_exactly_one_image() {
    let tab = GreenTab::new(1200, 1200);
    let mut h = Harness::start(CaptureService::new(tab.clone()), 2.0);

    h.start_from_page();
    h.drag((10.0, 10.0), (210.0, 260.0));

    let Some(PageMessage::SelectionDone { image }) = h.page.recv().await else {
        panic!("expected selection-done");
    };
    let cropped = decode(&image);
    assert_eq!(cropped.dimensions(), (800, 800));
    let px = cropped.get_pixel(400, 400);
    assert!(px[1] > 150 && px[0] < 50, "unexpected colour {:?}", px);

    let surface = h.surface.clone();
    let (controller, rest) = h.finish().await;
    assert!(rest.is_empty(), "extra page messages: {:?}", rest);
    assert_eq!(controller.state(), SelectionState::Idle);
    assert_eq!(tab.calls(), 1);
    assert_eq!(surface.overlay_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn undersized_selection_never_reaches_the_service() {
    let tab = GreenTab::new(800, 800);
    let mut h = Harness::start(CaptureService::new(tab.clone()), 1.0);

    h.start_from_page();
    h.drag((100.0, 100.0), (150.0, 500.0));

    assert_eq!(h.page.recv().await, Some(PageMessage::CaptureTooSmall));
    tokio::time::sleep(Duration::from_millis(500)).await;

    let surface = h.surface.clone();
    let (controller, rest) = h.finish().await;
    assert!(rest.is_empty());
    assert_eq!(tab.calls(), 0);
    assert_eq!(controller.state(), SelectionState::Idle);
    assert_eq!(surface.overlay_count(), 0);
    assert_eq!(surface.rect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn capture_failure_is_relayed_as_error() {
    let mut h = Harness::start(CaptureService::new(Arc::new(RevokedTab)), 1.0);

    h.start_from_page();
    h.drag((0.0, 0.0), (300.0, 300.0));

    let Some(PageMessage::Error { error }) = h.page.recv().await else {
        panic!("expected error");
    };
    assert!(error.contains("tab is not capturable"));

    let surface = h.surface.clone();
    let (controller, _) = h.finish().await;
    assert_eq!(controller.state(), SelectionState::Idle);
    assert_eq!(surface.rect_count(), 0);
}

// ── Channel and teardown ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn missing_service_is_a_channel_error() {
    let (client, inbox) = capture_channel(1);
    drop(inbox);
    let mut h = Harness::with_client(client, 1.0);

    h.start_from_page();
    h.drag((0.0, 0.0), (300.0, 300.0));

    let Some(PageMessage::Error { error }) = h.page.recv().await else {
        panic!("expected error");
    };
    assert!(error.contains("Receiving end does not exist"));

    let (controller, _) = h.finish().await;
    assert_eq!(controller.state(), SelectionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn reset_during_capture_swallows_late_response() {
    let (client, mut inbox) = capture_channel(1);
    let h = Harness::with_client(client, 1.0);

    h.start_from_page();
    h.drag((0.0, 0.0), (300.0, 300.0));

    // The request is in flight; the page resets before the service answers.
    let envelope = inbox.recv().await.unwrap();
    h.send(ContentEvent::Page(PageCommand::Reset));
    tokio::time::sleep(Duration::from_millis(1)).await;

    let service = CaptureService::new(GreenTab::new(600, 600));
    let response = service.capture(envelope.request.clone()).await;
    envelope.respond(response);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let surface = h.surface.clone();
    let (controller, rest) = h.finish().await;
    assert!(rest.is_empty(), "late response leaked: {:?}", rest);
    assert_eq!(controller.state(), SelectionState::Idle);
    assert_eq!(surface.overlay_count(), 0);
    assert_eq!(surface.rect_count(), 0);
}

// ── Page commands ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn double_start_leaves_one_overlay() {
    let h = Harness::start(CaptureService::new(GreenTab::new(600, 600)), 1.0);

    h.start_from_page();
    h.start_from_page();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.surface.overlay_count(), 1);
    let (controller, _) = h.finish().await;
    assert_eq!(controller.state(), SelectionState::OverlayActive);
}

#[tokio::test(start_paused = true)]
async fn ping_is_answered() {
    let mut h = Harness::start(CaptureService::new(GreenTab::new(10, 10)), 1.0);
    h.send(ContentEvent::Page(PageCommand::Ping));
    assert_eq!(h.page.recv().await, Some(PageMessage::Pong));
    h.finish().await;
}

#[tokio::test(start_paused = true)]
async fn raw_window_traffic_only_acts_on_commands() {
    let mut h = Harness::start(CaptureService::new(GreenTab::new(10, 10)), 1.0);

    h.send(ContentEvent::WindowMessage(json!({ "type": "analytics-beacon" })));
    h.send(ContentEvent::WindowMessage(json!("hello")));
    h.send(ContentEvent::WindowMessage(json!({ "type": "screenshot-pong" })));
    h.send(ContentEvent::WindowMessage(json!({ "type": "screenshot-start-selection" })));
    h.send(ContentEvent::WindowMessage(json!({ "type": "screenshot-ping" })));

    assert_eq!(h.page.recv().await, Some(PageMessage::Pong));
    assert_eq!(h.surface.overlay_count(), 1);

    let (controller, rest) = h.finish().await;
    assert!(rest.is_empty(), "unexpected page messages: {:?}", rest);
    assert_eq!(controller.state(), SelectionState::OverlayActive);
}

// ── Launcher ───────────────────────────────────────────────────────

#[tokio::test]
async fn launcher_session_saves_png() {
    let dir = tempfile::tempdir().unwrap();
    let service = CaptureService::new(GreenTab::new(900, 900))
        .with_downloader(Arc::new(DownloadDir::new(dir.path())));
    let mut h = Harness::start(service, 1.0);

    {
        let mut tabs = TabRegistry::new();
        tabs.register(TabId(42), h.events.clone());
        tabs.activate(TabId(42));
        Launcher::new(tabs, &Settings::default()).launch().unwrap();
    }
    h.drag((50.0, 50.0), (300.0, 300.0));

    let Some(PageMessage::SelectionDone { image }) = h.page.recv().await else {
        panic!("expected selection-done");
    };
    assert_eq!(decode(&image).dimensions(), (250, 250));
    assert_eq!(h.surface.rect_count(), 0);
    h.finish().await;

    // The save runs detached from the response; give it a moment.
    let mut saved = Vec::new();
    for _ in 0..100 {
        saved = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        if !saved.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("screenshot-") && name.ends_with(".png"));
}
