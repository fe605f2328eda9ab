//! Desktop front end: a winit window rendered with wgpu, or a headless run.

use std::any::Any;
use std::env;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use glam::Vec2;
use log::{info, warn};
use pollster::block_on;
use winit::dpi::LogicalSize;
use winit::event::{
    ElementState, Event, KeyboardInput, MouseButton as WinitMouseButton, MouseScrollDelta,
    TouchPhase, VirtualKeyCode, WindowEvent,
};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::WindowBuilder;

use orbit_viewer::{
    print_final_state, AssetLoader, InputEvent, KeyCode, MouseButton, NamedKey, Renderer, Scene,
    Viewer,
};

/// Pixels per wheel notch, roughly what browsers report.
const LINE_HEIGHT_PX: f32 = 100.0;
const SIMULATED_FRAME_MS: f64 = 1000.0 / 60.0;
const ASSET_WAIT: Duration = Duration::from_secs(5);

pub fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read scene {}", options.path.display()))?;
    let scene = Scene::from_xml(&xml).context("failed to parse scene XML")?;

    println!(
        "Loaded scene with {} objects ({} lights)",
        scene.objects.len(),
        scene.lights.len()
    );
    for object in &scene.objects {
        println!(" - {} ({})", object.name, object.object_type);
    }

    let asset_root = options
        .path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    if options.summary_only {
        return run_headless(&scene, asset_root, options.frames);
    }
    match run_interactive(&scene, asset_root.clone()) {
        Ok(()) => Ok(()),
        Err(err) if err.downcast_ref::<WindowInitError>().is_some() => {
            eprintln!(
                "{err}. Falling back to --summary-only mode (set DISPLAY or install X11 libs to enable rendering)."
            );
            run_headless(&scene, asset_root, options.frames)
        }
        Err(err) => Err(err),
    }
}

/// Steps the viewer on a simulated 60 Hz clock without opening a window.
fn run_headless(scene: &Scene, asset_root: PathBuf, frames: u32) -> Result<()> {
    let mut viewer = Viewer::new(scene, AssetLoader::from_directory(asset_root), 0.0);

    let started = Instant::now();
    let mut now_ms = 0.0;
    while viewer.pending_assets() > 0 && started.elapsed() < ASSET_WAIT {
        viewer.tick(now_ms);
        thread::sleep(Duration::from_millis(5));
    }
    for _ in 0..frames {
        now_ms += SIMULATED_FRAME_MS;
        viewer.tick(now_ms);
    }
    if frames > 0 {
        println!("Simulated {frames} frame(s)");
    }

    print_final_state(viewer.world());
    Ok(())
}

fn run_interactive(scene: &Scene, asset_root: PathBuf) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let mut event_loop =
        event_loop.map_err(|panic| WindowInitError::from_panic("event loop", panic))?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Orbit Viewer")
            .with_inner_size(LogicalSize::new(1280.0, 720.0))
            .build(&event_loop)
            .map_err(|err| WindowInitError::from_error("window", err))?,
    );

    let renderer = block_on(Renderer::new(Arc::clone(&window)))?;
    let clock = Instant::now();
    let mut viewer = Viewer::new(scene, AssetLoader::from_directory(asset_root), 0.0);
    let size = renderer.size();
    viewer.handle_input(
        InputEvent::Resize {
            width: size.width,
            height: size.height,
        },
        0.0,
    );

    let mut app = AppState {
        renderer,
        viewer,
        clock,
        cursor: Vec2::ZERO,
        press: None,
        last_error: None,
    };

    event_loop.run_return(|event, _, control_flow| {
        *control_flow = ControlFlow::Poll;
        if let Err(err) = app.process_event(&event, control_flow) {
            app.last_error = Some(err);
            control_flow.set_exit();
        }
    });

    print_final_state(app.viewer.world());
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct AppState {
    renderer: Renderer,
    viewer: Viewer,
    clock: Instant,
    cursor: Vec2,
    press: Option<PointerPress>,
    last_error: Option<anyhow::Error>,
}

/// Button held down and how far the cursor travelled since it was pressed.
struct PointerPress {
    button: MouseButton,
    travel: f32,
}

impl AppState {
    fn now_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    fn input(&mut self, event: InputEvent) {
        let now = self.now_ms();
        self.viewer.handle_input(event, now);
    }

    fn process_event(&mut self, event: &Event<()>, control_flow: &mut ControlFlow) -> Result<()> {
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => control_flow.set_exit(),
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.input(InputEvent::Resize {
                            width: size.width,
                            height: size.height,
                        });
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        self.renderer.resize(**new_inner_size);
                        self.input(InputEvent::Resize {
                            width: new_inner_size.width,
                            height: new_inner_size.height,
                        });
                    }
                    WindowEvent::KeyboardInput { input, .. } => self.handle_keyboard(input),
                    WindowEvent::MouseWheel { delta, .. } => {
                        let delta_y = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT_PX,
                            MouseScrollDelta::PixelDelta(position) => -position.y as f32,
                        };
                        self.input(InputEvent::Wheel { delta_y });
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        self.handle_mouse_button(*state, *button);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let cursor = Vec2::new(position.x as f32, position.y as f32);
                        let delta = cursor - self.cursor;
                        self.cursor = cursor;
                        if let Some(press) = self.press.as_mut() {
                            press.travel += delta.length();
                            let button = press.button;
                            self.input(InputEvent::PointerDrag { button, delta });
                        }
                    }
                    WindowEvent::Touch(touch) => {
                        let id = touch.id;
                        let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                        self.input(match touch.phase {
                            TouchPhase::Started => InputEvent::TouchStart { id, position },
                            TouchPhase::Moved => InputEvent::TouchMove { id, position },
                            TouchPhase::Ended | TouchPhase::Cancelled => InputEvent::TouchEnd { id },
                        });
                    }
                    _ => {}
                }
            }
            Event::RedrawRequested(window_id) if *window_id == self.renderer.window_id() => {
                let now = self.now_ms();
                let frame = self.viewer.tick(now);
                let viewer = &self.viewer;
                if let Err(err) = self.renderer.render(&frame, |name| viewer.mesh(name)) {
                    match err {
                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                            let size = self.renderer.window().inner_size();
                            self.renderer.resize(size);
                        }
                        wgpu::SurfaceError::OutOfMemory => {
                            return Err(anyhow!("GPU is out of memory"));
                        }
                        wgpu::SurfaceError::Timeout => {
                            warn!("Surface timeout; retrying next frame");
                        }
                    }
                }
            }
            Event::MainEventsCleared => {
                self.renderer.window().request_redraw();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, input: &KeyboardInput) {
        if input.state != ElementState::Pressed {
            return;
        }
        if let Some(key) = input.virtual_keycode.and_then(map_keycode) {
            self.input(InputEvent::KeyDown(key));
        }
    }

    fn handle_mouse_button(&mut self, state: ElementState, button: WinitMouseButton) {
        let button = match button {
            WinitMouseButton::Left => MouseButton::LEFT,
            WinitMouseButton::Middle => MouseButton::MIDDLE,
            WinitMouseButton::Right => MouseButton::RIGHT,
            WinitMouseButton::Other(index) => MouseButton::new(index.min(u16::from(u8::MAX)) as u8),
        };
        match state {
            ElementState::Pressed => {
                self.press = Some(PointerPress { button, travel: 0.0 });
            }
            ElementState::Released => {
                let Some(press) = self.press.take() else {
                    return;
                };
                let tolerance = self.viewer.config().click_drag_tolerance_px;
                if press.button == MouseButton::LEFT && press.travel <= tolerance {
                    let position = self.cursor;
                    self.input(InputEvent::Click { position });
                }
            }
        }
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

/// Winit names mostly match [`KeyCode::from_name`]; digits are `Key0`..`Key9`.
fn map_keycode(code: VirtualKeyCode) -> Option<KeyCode> {
    let name = format!("{code:?}");
    match name.as_str() {
        "Back" => Some(KeyCode::Named(NamedKey::Backspace)),
        _ => match name.strip_prefix("Key") {
            Some(digit) => KeyCode::from_name(digit),
            None => KeyCode::from_name(&name),
        },
    }
}

#[derive(Debug)]
struct CliOptions {
    path: PathBuf,
    summary_only: bool,
    frames: u32,
}

impl CliOptions {
    const USAGE: &'static str = "Usage: orbit-viewer <scene.xml> [--summary-only] [--frames N]";

    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(path) = args.next() else {
            return Err(anyhow!(Self::USAGE));
        };
        let mut summary_only = false;
        let mut frames = 0;
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => summary_only = true,
                "--frames" => {
                    let value = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames needs a value. {}", Self::USAGE))?;
                    frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count {value}"))?;
                }
                other => {
                    return Err(anyhow!(
                        "Unknown argument: {other}. Expected --summary-only or --frames N"
                    ));
                }
            }
        }
        info!("scene path: {path}");
        Ok(Self {
            path: PathBuf::from(path),
            summary_only,
            frames,
        })
    }
}
