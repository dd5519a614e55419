//! WASM bindings
//!
//! Runs the jacket build in the browser; requests and responses are the same
//! JSON records the HTTP server uses.

use wasm_bindgen::prelude::*;

use crate::api::handle_json;

// Use wee_alloc for smaller WASM binary
#[cfg(feature = "wasm")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// Build a jacket from a JSON request and return the JSON response.
///
/// Build failures come back as `{"success": false, "error": ...}`.
#[wasm_bindgen]
pub fn build_jacket(request_json: &str) -> String {
    let start = js_sys::Date::now();
    let response = handle_json(request_json);
    web_sys::console::debug_1(&format!("jacket build took {:.0} ms", js_sys::Date::now() - start).into());
    response
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
