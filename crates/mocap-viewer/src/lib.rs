//! Mocap Viewer - BVH motion-capture playback in the browser
//!
//! Reads the sources to play from the hosting page, loads them
//! concurrently and plays them back in sync around an orbit camera.

mod app;
mod file_loader;
mod page_config;
mod storage;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    app::run();
}
