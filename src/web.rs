#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use glam::Vec2;
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent, WheelEvent};

use crate::app::Viewer;
use crate::assets::AssetLoader;
use crate::input::{InputEvent, KeyCode, MouseButton};
use crate::render::Renderer;
use crate::scene::Scene;

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

/// Browser entry point.
///
/// Register model files with [`WasmViewer::add_asset`] before calling
/// [`WasmViewer::start`]; models are resolved when the viewer starts.
#[wasm_bindgen]
pub struct WasmViewer {
    canvas: HtmlCanvasElement,
    scene: Scene,
    assets: Option<AssetLoader>,
    running: Option<Rc<RefCell<WebState>>>,
}

#[wasm_bindgen]
impl WasmViewer {
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, scene_xml: String) -> Result<WasmViewer, JsValue> {
        let scene = Scene::from_xml(&scene_xml)
            .map_err(|err| JsValue::from_str(&format!("failed to parse scene XML: {err}")))?;
        log::info!(
            "Loaded scene with {} objects ({} lights)",
            scene.objects.len(),
            scene.lights.len()
        );

        let document = window()
            .and_then(|win| win.document())
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(&canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        Ok(Self {
            canvas,
            scene,
            assets: Some(AssetLoader::in_memory()),
            running: None,
        })
    }

    /// Makes an OBJ document available under the path used by `<mesh>`.
    pub fn add_asset(&mut self, name: String, text: String) -> Result<(), JsValue> {
        let assets = self
            .assets
            .as_mut()
            .ok_or_else(|| JsValue::from_str("viewer already started"))?;
        assets
            .insert(name, text)
            .map_err(|err| JsValue::from_str(&err.to_string()))
    }

    pub fn start(&mut self) -> Result<(), JsValue> {
        let assets = self
            .assets
            .take()
            .ok_or_else(|| JsValue::from_str("viewer already started"))?;
        let state = WebState::new(self.canvas.clone(), &self.scene, assets)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        let state = Rc::new(RefCell::new(state));
        let listeners = attach_listeners(&self.canvas, &state)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        state.borrow_mut().listeners = listeners;
        start_animation_loop(Rc::clone(&state))
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.running = Some(state);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

struct WebState {
    viewer: Viewer,
    renderer: Renderer,
    pointer: Option<PointerPress>,
    listeners: Vec<EventListener>,
}

/// Button held down on the canvas and how far the pointer travelled since.
struct PointerPress {
    button: MouseButton,
    travel: f32,
}

impl WebState {
    fn new(canvas: HtmlCanvasElement, scene: &Scene, assets: AssetLoader) -> Result<Self> {
        let size = canvas_client_size(&canvas);
        let mut renderer = Renderer::new(canvas)?;
        renderer.resize(size);
        let mut viewer = Viewer::new(scene, assets, now_ms());
        viewer.handle_input(
            InputEvent::Resize {
                width: size.0,
                height: size.1,
            },
            now_ms(),
        );
        Ok(Self {
            viewer,
            renderer,
            pointer: None,
            listeners: Vec::new(),
        })
    }

    fn render_frame(&mut self) -> Result<()> {
        let frame = self.viewer.tick(now_ms());
        self.renderer.render(&frame).map_err(|err| {
            let message = err
                .as_string()
                .unwrap_or_else(|| "unknown canvas error".to_string());
            anyhow!("render failed: {message}")
        })
    }

    fn input(&mut self, event: InputEvent) {
        self.viewer.handle_input(event, now_ms());
    }
}

fn attach_listeners(
    canvas: &HtmlCanvasElement,
    state: &Rc<RefCell<WebState>>,
) -> Result<Vec<EventListener>> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let document = window
        .document()
        .ok_or_else(|| anyhow!("document not available"))?;
    let tolerance = state.borrow().viewer.config().click_drag_tolerance_px;
    let mut listeners = Vec::new();

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new_with_options(
            canvas,
            "wheel",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                event.prevent_default();
                state.borrow_mut().input(InputEvent::Wheel {
                    delta_y: event.delta_y() as f32,
                });
            },
        ));
    }

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(canvas, "mousedown", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            state.borrow_mut().pointer = Some(PointerPress {
                button: MouseButton::new(event.button() as u8),
                travel: 0.0,
            });
        }));
    }

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(canvas, "mousemove", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let delta = Vec2::new(event.movement_x() as f32, event.movement_y() as f32);
            let mut state = state.borrow_mut();
            let Some(press) = state.pointer.as_mut() else {
                return;
            };
            press.travel += delta.length();
            let button = press.button;
            state.input(InputEvent::PointerDrag { button, delta });
        }));
    }

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(canvas, "click", move |event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let mut state = state.borrow_mut();
            let dragged = state
                .pointer
                .take()
                .is_some_and(|press| press.travel > tolerance);
            if !dragged {
                let position = Vec2::new(event.offset_x() as f32, event.offset_y() as f32);
                state.input(InputEvent::Click { position });
            }
        }));
    }

    listeners.push(EventListener::new_with_options(
        canvas,
        "contextmenu",
        EventListenerOptions::enable_prevent_default(),
        |event| event.prevent_default(),
    ));

    for name in ["mouseup", "mouseleave"] {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(canvas, name, move |event| {
            // `click` fires after `mouseup` and still needs the recorded travel.
            let is_primary_release = event
                .dyn_ref::<MouseEvent>()
                .is_some_and(|mouse| mouse.type_() == "mouseup" && mouse.button() == 0);
            if !is_primary_release {
                state.borrow_mut().pointer = None;
            }
        }));
    }

    for name in ["touchstart", "touchmove", "touchend", "touchcancel"] {
        let state = Rc::clone(state);
        let element = canvas.clone();
        listeners.push(EventListener::new_with_options(
            canvas,
            name,
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(event) = event.dyn_ref::<TouchEvent>() else {
                    return;
                };
                event.prevent_default();
                let rect = element.get_bounding_client_rect();
                let touches = event.changed_touches();
                let mut state = state.borrow_mut();
                for index in 0..touches.length() {
                    let Some(touch) = touches.get(index) else {
                        continue;
                    };
                    let id = u64::from(touch.identifier() as u32);
                    let position = Vec2::new(
                        (f64::from(touch.client_x()) - rect.left()) as f32,
                        (f64::from(touch.client_y()) - rect.top()) as f32,
                    );
                    let input = match name {
                        "touchstart" => InputEvent::TouchStart { id, position },
                        "touchmove" => InputEvent::TouchMove { id, position },
                        _ => InputEvent::TouchEnd { id },
                    };
                    state.input(input);
                }
            },
        ));
    }

    {
        let state = Rc::clone(state);
        listeners.push(EventListener::new(&document, "keydown", move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if event.repeat() {
                return;
            }
            if let Some(code) = KeyCode::from_dom_code(&event.code()) {
                state.borrow_mut().input(InputEvent::KeyDown(code));
            }
        }));
    }

    {
        let state = Rc::clone(state);
        let canvas = canvas.clone();
        listeners.push(EventListener::new(&window, "resize", move |_| {
            let size = canvas_client_size(&canvas);
            let mut state = state.borrow_mut();
            state.renderer.resize(size);
            state.input(InputEvent::Resize {
                width: size.0,
                height: size.1,
            });
        }));
    }

    Ok(listeners)
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn start_animation_loop(state: Rc<RefCell<WebState>>) -> Result<()> {
    let callback: FrameCallback = Rc::new(RefCell::new(None));
    let next = Rc::clone(&callback);
    *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        if let Err(err) = state.borrow_mut().render_frame() {
            log::error!("{err}");
        }
        if let Err(err) = request_frame(&next) {
            log::error!("{err}");
        }
    }) as Box<dyn FnMut()>));
    request_frame(&callback)
}

fn request_frame(callback: &FrameCallback) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let callback = callback.borrow();
    let closure = callback
        .as_ref()
        .ok_or_else(|| anyhow!("animation callback missing"))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

fn canvas_client_size(canvas: &HtmlCanvasElement) -> (u32, u32) {
    let width = canvas.client_width().max(1) as u32;
    let height = canvas.client_height().max(1) as u32;
    (width, height)
}

fn now_ms() -> f64 {
    window()
        .and_then(|win| win.performance())
        .map_or(0.0, |performance| performance.now())
}
