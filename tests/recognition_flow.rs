use anyhow::{anyhow, Result};
use inktex::overlay::boundary::RecognitionBoundary;
use inktex::overlay::clipboard::ClipboardCapability;
use inktex::overlay::model::{CanvasSize, Point};
use inktex::overlay::orchestrator::RecognitionState;
use inktex::overlay::surface::{KeyCommand, OverlaySurface, SurfaceOptions};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One scripted answer per recognition call; `WaitFor` entries block the
/// worker until the test releases the gate.
enum Script {
    Reply(Result<String, String>),
    WaitFor(Receiver<Result<String, String>>),
}

struct ScriptedBoundary {
    steps: Mutex<Vec<Script>>,
}

impl ScriptedBoundary {
    fn new(mut steps: Vec<Script>) -> Arc<Self> {
        steps.reverse();
        Arc::new(Self {
            steps: Mutex::new(steps),
        })
    }
}

impl RecognitionBoundary for ScriptedBoundary {
    fn recognize(&self, _image_png: &[u8], _prompt: &str) -> Result<String> {
        let step = {
            self.steps
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .pop()
                .ok_or_else(|| anyhow!("script exhausted"))?
        };
        let reply = match step {
            Script::Reply(reply) => reply,
            Script::WaitFor(gate) => gate.recv().map_err(|_| anyhow!("gate closed"))?,
        };
        reply.map_err(|message| anyhow!(message))
    }
}

#[derive(Clone, Default)]
struct MemoryClipboard {
    copied: Arc<Mutex<Option<String>>>,
}

impl ClipboardCapability for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        *self.copied.lock().map_err(|_| anyhow!("poisoned"))? = Some(text.to_string());
        Ok(())
    }
}

fn test_surface(
    boundary: Arc<dyn RecognitionBoundary>,
    clipboard: Option<Box<dyn ClipboardCapability>>,
) -> OverlaySurface {
    let options = SurfaceOptions {
        scratch_dir: None,
        cancel_wait: Duration::from_millis(50),
        ..SurfaceOptions::default()
    };
    OverlaySurface::with_options(
        CanvasSize::new(640, 480),
        boundary,
        clipboard,
        "convert to latex".into(),
        options,
    )
}

fn draw_mark(surface: &mut OverlaySurface, origin: Point) {
    surface.pointer_down(origin);
    surface.pointer_move(Point::new(origin.x + 40, origin.y));
    surface.pointer_up(Point::new(origin.x + 40, origin.y + 40));
}

fn pump_until(surface: &mut OverlaySurface, condition: impl Fn(&OverlaySurface) -> bool) {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        surface.poll(Instant::now());
        if condition(surface) {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not reached in time");
}

fn release(gate: &Sender<Result<String, String>>, reply: Result<String, String>) {
    gate.send(reply).expect("gate send");
}

#[test]
fn only_the_superseding_request_reaches_the_buffer() {
    let (gate_tx, gate_rx) = channel();
    let boundary = ScriptedBoundary::new(vec![
        Script::WaitFor(gate_rx),
        Script::Reply(Ok("E = mc^2".into())),
    ]);
    let mut surface = test_surface(boundary, None);

    draw_mark(&mut surface, Point::new(50, 50));
    surface.handle_key(KeyCommand::Commit);
    assert!(matches!(
        surface.recognition_state(),
        RecognitionState::Pending(_)
    ));

    // Second commit while the first worker is still stuck on the gate.
    draw_mark(&mut surface, Point::new(200, 200));
    surface.handle_key(KeyCommand::Commit);
    pump_until(&mut surface, |s| s.latex() == "E = mc^2");

    // The first worker finishes late; its result must not overwrite anything.
    release(&gate_tx, Ok("STALE".into()));
    std::thread::sleep(Duration::from_millis(100));
    surface.poll(Instant::now());
    assert_eq!(surface.latex(), "E = mc^2");
    assert_eq!(surface.recognition_state(), RecognitionState::Idle);
}

#[test]
fn recognition_failure_degrades_to_visible_error_state() {
    let boundary = ScriptedBoundary::new(vec![Script::Reply(Err("network unreachable".into()))]);
    let mut surface = test_surface(boundary, None);

    draw_mark(&mut surface, Point::new(50, 50));
    surface.handle_key(KeyCommand::Commit);
    pump_until(&mut surface, |s| !s.latex().is_empty());

    assert!(surface.latex().starts_with("Error:"));
    assert!(surface.latex().contains("network unreachable"));
    assert!(surface.preview().is_placeholder());
}

#[test]
fn dismissal_with_a_pending_request_copies_and_tears_down() {
    let (gate_tx, gate_rx) = channel();
    let boundary = ScriptedBoundary::new(vec![Script::WaitFor(gate_rx)]);
    let clipboard = MemoryClipboard::default();
    let copied = clipboard.copied.clone();
    let mut surface = test_surface(boundary, Some(Box::new(clipboard)));

    draw_mark(&mut surface, Point::new(50, 50));
    surface.handle_key(KeyCommand::Commit);
    *surface.latex_mut() = "\\alpha".into();
    surface.handle_key(KeyCommand::Dismiss);

    assert!(surface.is_dismissed());
    assert_eq!(copied.lock().unwrap().as_deref(), Some("\\alpha"));

    // Late completion after teardown must be inert.
    release(&gate_tx, Ok("too late".into()));
    std::thread::sleep(Duration::from_millis(50));
    surface.poll(Instant::now());
    assert_eq!(surface.latex(), "\\alpha");
}

#[test]
fn typing_overwrites_a_previous_recognition_result() {
    let boundary = ScriptedBoundary::new(vec![Script::Reply(Ok("x_1".into()))]);
    let mut surface = test_surface(boundary, None);

    draw_mark(&mut surface, Point::new(50, 50));
    surface.handle_key(KeyCommand::Commit);
    pump_until(&mut surface, |s| s.latex() == "x_1");

    // Last writer wins: direct typing replaces the recognition result.
    *surface.latex_mut() = "x_2".into();
    let now = Instant::now();
    surface.note_latex_edited(now);
    surface.poll(now + Duration::from_secs(1));
    assert_eq!(surface.latex(), "x_2");
    assert!(!surface.preview().is_placeholder());
}
