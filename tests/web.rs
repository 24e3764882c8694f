#![cfg(target_arch = "wasm32")]

use fiber_background::components::fiber_background::config::FiberConfig;
use fiber_background::components::fiber_background::device::{DeviceCapabilities, DeviceSignals};
use fiber_background::components::fiber_background::state::FiberBackgroundState;
use fiber_background::components::fiber_background::storage::{
	LocalQualityStore, QUALITY_STORAGE_KEY, QualityStore,
};
use fiber_background::components::fiber_background::types::QualityTier;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn canvas(width: u32, height: u32) -> web_sys::HtmlCanvasElement {
	let document = web_sys::window().unwrap().document().unwrap();
	let canvas: web_sys::HtmlCanvasElement = document
		.create_element("canvas")
		.unwrap()
		.dyn_into()
		.unwrap();
	canvas.set_width(width);
	canvas.set_height(height);
	canvas
}

#[wasm_bindgen_test]
fn quality_survives_local_storage() {
	let mut store = LocalQualityStore;
	store.save(QualityTier::Low).unwrap();
	assert_eq!(store.load(), Some(QualityTier::Low));

	let storage = web_sys::window().unwrap().local_storage().unwrap().unwrap();
	storage.set_item(QUALITY_STORAGE_KEY, "ultra").unwrap();
	assert_eq!(store.load(), None);
	storage.remove_item(QUALITY_STORAGE_KEY).unwrap();
}

#[wasm_bindgen_test]
fn probing_a_real_browser() {
	let signals = DeviceSignals::probe();
	assert!(!signals.user_agent.is_empty());
	let caps = DeviceCapabilities::classify(&signals);
	assert!(caps.optimal_path_count() > 0);
}

#[wasm_bindgen_test]
fn draws_into_a_canvas_context() {
	let canvas = canvas(640, 360);
	let ctx: web_sys::CanvasRenderingContext2d = canvas
		.get_context("2d")
		.unwrap()
		.unwrap()
		.dyn_into()
		.unwrap();
	let caps = DeviceCapabilities::classify(&DeviceSignals::probe());
	let mut state = FiberBackgroundState::new(
		FiberConfig::default(),
		DeviceCapabilities {
			reduced_motion: false,
			..caps
		},
		Some(QualityTier::High),
		640.0,
		360.0,
		Some(6),
	);
	let mut t = 0.0;
	for _ in 0..30 {
		t += 16.0;
		state.tick(t, None);
		state.render(&ctx);
	}
	assert!(!state.has_failed());
	assert_eq!(state.paths().len(), 6);
}
