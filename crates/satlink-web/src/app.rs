//! Page wiring: builds the console and hooks it to map and DOM events

use std::cell::RefCell;
use std::rc::Rc;

use satlink_core::{Console, ConsoleConfig, FlowOutcome};
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, KeyboardEvent, Window};

use crate::dom::{DomView, INPUT_ID};
use crate::map::LeafletMap;
use crate::network::{backend_from_browser, GlooBackend};

pub type PageConsole = Console<GlooBackend, DomView, LeafletMap>;

const MAP_ID: &str = "map";
const GLOBAL_LOADER_ID: &str = "global-loader";
const SEND_BUTTON_ID: &str = "send-btn";
const SCAN_BUTTON_ID: &str = "scan-btn";

thread_local! {
    static CONSOLE: RefCell<Option<Rc<PageConsole>>> = const { RefCell::new(None) };
}

/// The page's console, once `run` has built it
pub fn console() -> Option<Rc<PageConsole>> {
    CONSOLE.with(|c| c.borrow().clone())
}

pub fn run() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let mut config = ConsoleConfig::default();
    config.backend = backend_from_browser(&config.backend);
    info!(
        chat = %config.backend.chat_url(),
        scan = %config.backend.scan_url(),
        "SAT-LINK starting"
    );

    let map = LeafletMap::create(MAP_ID, &config.map)?;
    let backend = GlooBackend::new(&config.backend);
    let view = DomView::new(document.clone());
    let invalidate_ms = config.timing.invalidate_interval_ms;
    let loader_delay_ms = config.timing.loader_delay_ms;
    let loader_fade_ms = config.timing.loader_fade_ms;

    let console = Rc::new(Console::new(config, backend, view, map));
    CONSOLE.with(|c| *c.borrow_mut() = Some(console.clone()));

    console.on_viewport_change();
    wire_map(&window, &console, invalidate_ms)?;
    wire_controls(&document)?;
    schedule_global_loader(&window, &document, loader_delay_ms, loader_fade_ms)?;

    Ok(())
}

/// Start a chat flow
pub fn send_message() {
    let Some(console) = console() else {
        warn!("send_message called before the console was ready");
        return;
    };
    spawn_local(async move {
        let outcome = console.send_message().await;
        debug!(?outcome, "Chat flow finished");
    });
}

/// Start a scan of the current viewport
pub fn perform_scan() {
    let Some(console) = console() else {
        warn!("perform_scan called before the console was ready");
        return;
    };
    spawn_local(async move {
        if console.scan_viewport().await == FlowOutcome::Failed {
            debug!("Scan flow failed");
        }
    });
}

fn wire_map(window: &Window, console: &Rc<PageConsole>, invalidate_ms: u32) -> Result<(), JsValue> {
    let map = console.map().inner();
    let container = map.get_container();

    // HUD follows pans, zooms and fitBounds animations
    let hud_console = Rc::downgrade(console);
    let on_move = Closure::wrap(Box::new(move |_: JsValue| {
        if let Some(console) = hud_console.upgrade() {
            console.on_viewport_change();
        }
    }) as Box<dyn FnMut(JsValue)>);
    map.on("move", on_move.as_ref().unchecked_ref());
    on_move.forget();

    let drag_container = container.clone();
    let on_drag_start = Closure::wrap(Box::new(move |_: JsValue| {
        let _ = drag_container.style().set_property("cursor", "grabbing");
    }) as Box<dyn FnMut(JsValue)>);
    map.on("dragstart", on_drag_start.as_ref().unchecked_ref());
    on_drag_start.forget();

    let drag_container = container.clone();
    let on_drag_end = Closure::wrap(Box::new(move |_: JsValue| {
        let _ = drag_container.style().set_property("cursor", "grab");
    }) as Box<dyn FnMut(JsValue)>);
    map.on("dragend", on_drag_end.as_ref().unchecked_ref());
    on_drag_end.forget();

    let focus_container = container.clone();
    let on_mouse_down = Closure::wrap(Box::new(move |_: web_sys::Event| {
        let _ = focus_container.focus();
    }) as Box<dyn FnMut(web_sys::Event)>);
    container.add_event_listener_with_callback("mousedown", on_mouse_down.as_ref().unchecked_ref())?;
    on_mouse_down.forget();

    // Container resizes leave stale tiles otherwise; runs for the page's lifetime
    let resize_console = Rc::downgrade(console);
    let on_tick = Closure::wrap(Box::new(move || {
        if let Some(console) = resize_console.upgrade() {
            console.map().inner().invalidate_size();
        }
    }) as Box<dyn FnMut()>);
    window.set_interval_with_callback_and_timeout_and_arguments_0(
        on_tick.as_ref().unchecked_ref(),
        invalidate_ms as i32,
    )?;
    on_tick.forget();

    Ok(())
}

fn wire_controls(document: &Document) -> Result<(), JsValue> {
    if let Some(input) = document.get_element_by_id(INPUT_ID) {
        let on_key = Closure::wrap(Box::new(move |event: KeyboardEvent| {
            if event.key() == "Enter" {
                send_message();
            }
        }) as Box<dyn FnMut(KeyboardEvent)>);
        input.add_event_listener_with_callback("keypress", on_key.as_ref().unchecked_ref())?;
        on_key.forget();
    }

    if let Some(button) = document.get_element_by_id(SEND_BUTTON_ID) {
        on_click(&button, send_message)?;
    }
    if let Some(button) = document.get_element_by_id(SCAN_BUTTON_ID) {
        on_click(&button, perform_scan)?;
    }
    Ok(())
}

fn on_click(element: &Element, action: fn()) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |_: web_sys::Event| action()) as Box<dyn FnMut(web_sys::Event)>);
    element.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Fade the page loader out a moment after the page has loaded, then drop it
fn schedule_global_loader(
    window: &Window,
    document: &Document,
    delay_ms: u32,
    fade_ms: u32,
) -> Result<(), JsValue> {
    let fade_window = window.clone();
    let fade_document = document.clone();
    let start_fade = Closure::wrap(Box::new(move || {
        let Some(loader) = fade_document.get_element_by_id(GLOBAL_LOADER_ID) else {
            return;
        };
        let _ = loader.class_list().add_1("fade-out");

        let remove = Closure::once_into_js(move || {
            loader.remove();
            debug!("Global loader removed");
        });
        let _ = fade_window.set_timeout_with_callback_and_timeout_and_arguments_0(
            remove.unchecked_ref(),
            fade_ms as i32,
        );
    }) as Box<dyn FnMut()>);
    let start_fade = start_fade.into_js_value();

    // The module may start after `load` has already fired
    if document.ready_state() == "complete" {
        window.set_timeout_with_callback_and_timeout_and_arguments_0(
            start_fade.unchecked_ref(),
            delay_ms as i32,
        )?;
        return Ok(());
    }

    let load_window = window.clone();
    let on_load = Closure::once_into_js(move || {
        let _ = load_window.set_timeout_with_callback_and_timeout_and_arguments_0(
            start_fade.unchecked_ref(),
            delay_ms as i32,
        );
    });
    window.add_event_listener_with_callback("load", on_load.unchecked_ref())?;
    Ok(())
}
