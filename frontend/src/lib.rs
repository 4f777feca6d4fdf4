mod components;
pub mod composer;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;
pub mod transport;
pub mod utils;
pub mod view;

#[cfg(test)]
mod test_support;

use components::ChatWidget;

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn run_app() {
    wasm_logger::init(wasm_logger::Config::default());

    let root = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.get_element_by_id("chat-root"));
    match root {
        Some(root) => {
            yew::Renderer::<ChatWidget>::with_root(root).render();
        }
        None => {
            yew::Renderer::<ChatWidget>::new().render();
        }
    }
}
