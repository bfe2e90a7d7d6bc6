//! Headless driver for Tab-Snip.
//!
//! Treats an image file as the visible tab and runs one full selection
//! session against it: start, drag a square, capture, relay.
//!
//! Usage:
//!   tab-snip <frame.png> <x> <y> <size>                    Page-started session
//!   tab-snip <frame.png> <x> <y> <size> --dpr 2            Retina frame
//!   tab-snip <frame.png> <x> <y> <size> --save             Launcher session, also saved to Downloads
//!   tab-snip <frame.png> <x> <y> <size> --out crop.jpg     Where to write the relayed image

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::sync::mpsc;

use tab_snip_lib::capture::{spawn_capture_service, CaptureService, DownloadDir, FileTabCapturer};
use tab_snip_lib::launcher::{Launcher, TabId, TabRegistry};
use tab_snip_lib::protocol::PageMessage;
use tab_snip_lib::selection::{ContentEvent, ContentRuntime, MemorySurface, PointerEvent, SelectionController};
use tab_snip_lib::Settings;

struct Options {
    frame: PathBuf,
    x: f64,
    y: f64,
    size: f64,
    dpr: f64,
    save: bool,
    out: PathBuf,
}

impl Options {
    fn parse(args: &[String]) -> Result<Self, String> {
        if args.len() < 5 {
            return Err("Missing arguments".to_string());
        }

        let number = |name: &str, raw: &str| {
            raw.parse::<f64>()
                .map_err(|_| format!("{} must be a number, got {:?}", name, raw))
        };

        let mut options = Options {
            frame: PathBuf::from(&args[1]),
            x: number("x", &args[2])?,
            y: number("y", &args[3])?,
            size: number("size", &args[4])?,
            dpr: 1.0,
            save: false,
            out: PathBuf::from("selection.jpg"),
        };

        let mut rest = args[5..].iter();
        while let Some(flag) = rest.next() {
            match flag.as_str() {
                "--save" => options.save = true,
                "--dpr" => {
                    let raw = rest.next().ok_or("--dpr requires a value")?;
                    options.dpr = number("--dpr", raw)?;
                }
                "--out" => {
                    let raw = rest.next().ok_or("--out requires a path")?;
                    options.out = PathBuf::from(raw);
                }
                other => return Err(format!("Unknown flag {:?}", other)),
            }
        }

        Ok(options)
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tab-snip <frame.png> <x> <y> <size> [--dpr <ratio>] [--save] [--out <file.jpg>]");
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tab_snip_lib::init_logging();

    let args: Vec<String> = std::env::args().collect();
    let options = match Options::parse(&args) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{}", msg);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(options).await {
        eprintln!("[tab-snip] {}", e);
        std::process::exit(1);
    }
}

async fn run(options: Options) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env();
    let start = std::time::Instant::now();

    // Step 1: capture service in its own task
    let mut service = CaptureService::new(Arc::new(FileTabCapturer::new(&options.frame)));
    if options.save {
        let downloads = DownloadDir::resolve(settings.download_dir.as_deref())?;
        log::info!("Saving screenshots to {}", downloads.path().display());
        service = service.with_downloader(Arc::new(downloads));
    }
    let client = spawn_capture_service(service, settings.channel_capacity);

    // Step 2: page runtime with an in-memory overlay
    let (page_tx, mut page_rx) = mpsc::unbounded_channel();
    let controller = SelectionController::new(MemorySurface::new(options.dpr), page_tx, &settings);
    let runtime = ContentRuntime::new(controller, client, settings.paint_settle);
    let (events, rx) = mpsc::unbounded_channel();
    let page = tokio::spawn(runtime.run(rx));

    // Step 3: start the session
    if options.save {
        let mut tabs = TabRegistry::new();
        tabs.register(TabId(1), events.clone());
        tabs.activate(TabId(1));
        Launcher::new(tabs, &settings).launch()?;
    } else {
        let start = serde_json::json!({ "type": "screenshot-start-selection" });
        events.send(ContentEvent::WindowMessage(start))?;
    }

    // Step 4: drag the square
    let (x, y, size) = (options.x, options.y, options.size);
    events.send(ContentEvent::PointerDown(PointerEvent::primary(x, y)))?;
    events.send(ContentEvent::PointerMove(PointerEvent::primary(x + size, y + size)))?;
    events.send(ContentEvent::PointerUp(PointerEvent::primary(x + size, y + size)))?;

    let message = page_rx.recv().await.ok_or("Page channel closed without a reply")?;
    drop(events);
    page.await?;

    match message {
        PageMessage::SelectionDone { image } => {
            let bytes = STANDARD.decode(image)?;
            std::fs::write(&options.out, &bytes)?;
            println!(
                "Wrote {} ({} bytes) in {}ms",
                options.out.display(),
                bytes.len(),
                start.elapsed().as_millis()
            );
            Ok(())
        }
        PageMessage::CaptureTooSmall => {
            Err(format!("Selection smaller than {}px", settings.min_size).into())
        }
        PageMessage::Error { error } => Err(error.into()),
        PageMessage::Pong => Err("Unexpected pong".into()),
    }
}
