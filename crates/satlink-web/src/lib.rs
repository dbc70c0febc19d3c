//! SAT-LINK Web - Browser console on a Leaflet satellite map
//!
//! Implements the core ports against the DOM, Leaflet and `fetch`, then wires
//! the page's events to the console flows.

mod app;
mod dom;
mod leaflet;
mod map;
mod network;

use wasm_bindgen::prelude::*;

/// Entry point for WASM module
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    if let Err(e) = app::run() {
        tracing::error!(error = ?e, "SAT-LINK failed to start");
    }
}

/// Send the typed message (the page's send button and Enter key)
#[wasm_bindgen(js_name = sendMessage)]
pub fn send_message() {
    app::send_message();
}

/// Scan the visible map region
#[wasm_bindgen(js_name = performScan)]
pub fn perform_scan() {
    app::perform_scan();
}
