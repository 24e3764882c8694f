use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
	BatteryManager, CanvasRenderingContext2d, Event, EventTarget, HtmlCanvasElement, PointerEvent,
	Window,
};

use super::config::FiberConfig;
use super::device::{DeviceCapabilities, DeviceSignals};
use super::enhancement::create_enhancement;
use super::error::RenderError;
use super::state::FiberBackgroundState;
use super::storage::{LocalQualityStore, QualityStore};
use super::types::QualityTier;

type SharedState = Rc<RefCell<Option<FiberBackgroundState>>>;
type SharedListeners = Rc<RefCell<Listeners>>;

/// DOM listeners registered by one background, detached again on unmount.
#[derive(Default)]
struct Listeners(Vec<(EventTarget, &'static str, Closure<dyn FnMut(Event)>)>);

impl Listeners {
	fn add(&mut self, target: &EventTarget, kind: &'static str, cb: Closure<dyn FnMut(Event)>) {
		let _ = target.add_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
		self.0.push((target.clone(), kind, cb));
	}

	fn remove_all(&mut self) {
		for (target, kind, cb) in self.0.drain(..) {
			let _ = target.remove_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
		}
	}
}

/// Signals shared between the background and the page hosting it.
#[derive(Clone, Copy)]
pub struct FiberControls {
	/// Manual tier choice written by the host. Persisted when applied.
	pub selected: RwSignal<Option<QualityTier>>,
	/// Effective tier, written by the background.
	pub tier: RwSignal<QualityTier>,
	pub paused: RwSignal<bool>,
	/// Set once rendering has been given up; the host shows its static backdrop.
	pub failed: RwSignal<bool>,
	/// Last sampled frame rate.
	pub fps: RwSignal<f64>,
}

impl FiberControls {
	/// Fresh signals with the background running at the default tier.
	pub fn new() -> Self {
		Self {
			selected: RwSignal::new(None),
			tier: RwSignal::new(QualityTier::default()),
			paused: RwSignal::new(false),
			failed: RwSignal::new(false),
			fps: RwSignal::new(0.0),
		}
	}

	/// Requests a manual quality tier.
	pub fn select(&self, tier: QualityTier) {
		self.selected.set(Some(tier));
	}

	/// Flips the paused flag.
	pub fn toggle_pause(&self) {
		self.paused.update(|p| *p = !*p);
	}

	/// Whether the animated canvas is currently visible.
	pub fn is_animating(&self) -> bool {
		!self.failed.get() && self.tier.get().is_animated()
	}
}

impl Default for FiberControls {
	fn default() -> Self {
		Self::new()
	}
}

/// Full-viewport animated fiber background.
///
/// Falls back to a static gradient when the tier is `static` or rendering failed.
/// Changing `path_count` rebuilds the path set.
#[component]
pub fn FiberBackground(
	#[prop(optional)] controls: Option<FiberControls>,
	#[prop(optional, into)] path_count: MaybeProp<usize>,
	#[prop(optional, into)] hero_glow: Option<Signal<f64>>,
	#[prop(optional)] config: Option<FiberConfig>,
) -> impl IntoView {
	let controls = controls.unwrap_or_default();
	let config = config.unwrap_or_default();
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let gl_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let listeners: SharedListeners = Rc::new(RefCell::new(Listeners::default()));
	// One pending animation frame per instance, cancelled before any reschedule.
	let frame_id = StoredValue::new(None::<i32>);
	let alive = StoredValue::new(true);
	let owned = StoredValue::new_local((state.clone(), animate.clone(), listeners.clone()));

	let cancel_frame = move || {
		if let Some(id) = frame_id.try_get_value().flatten() {
			if let Some(window) = web_sys::window() {
				let _ = window.cancel_animation_frame(id);
			}
			let _ = frame_id.try_set_value(None);
		}
	};

	let request_frame = {
		let animate = animate.clone();
		move || {
			if !is_alive(alive) {
				return;
			}
			let Some(window) = web_sys::window() else {
				return;
			};
			cancel_frame();
			let id = animate
				.borrow()
				.as_ref()
				.and_then(|cb| window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
			let _ = frame_id.try_set_value(id);
		}
	};

	on_cleanup(move || {
		let _ = alive.try_set_value(false);
		cancel_frame();
		owned.try_with_value(|(state, animate, listeners)| {
			listeners.borrow_mut().remove_all();
			animate.borrow_mut().take();
			state.borrow_mut().take();
		});
	});

	let (state_init, animate_init, request_init) =
		(state.clone(), animate.clone(), request_frame.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		if state_init.borrow().is_some() {
			return;
		}
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx = match context_2d(&canvas) {
			Ok(ctx) => ctx,
			Err(err) => {
				warn!("fiber background disabled: {err}");
				controls.failed.set(true);
				return;
			}
		};
		let gl_canvas: Option<HtmlCanvasElement> = gl_ref.get_untracked().map(Into::into);

		let (w, h) = viewport(&window);
		size_canvas(&canvas, w, h);
		if let Some(gl) = &gl_canvas {
			size_canvas(gl, w, h);
		}

		let caps = DeviceCapabilities::classify(&DeviceSignals::probe());
		info!("device capabilities: {caps:?}");
		let saved = LocalQualityStore.load();
		let s = FiberBackgroundState::new(
			config.clone(),
			caps,
			saved,
			w,
			h,
			path_count.get_untracked(),
		);
		controls.tier.set(s.tier());
		*state_init.borrow_mut() = Some(s);

		let (state_anim, request_anim) = (state_init.clone(), request_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			let _ = frame_id.try_set_value(None);
			if !is_alive(alive) {
				return;
			}
			let mut keep_going = false;
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				let report = s.tick(now, hero_glow.map(|g| g.get_untracked()));
				s.render(&ctx);
				if let Some(fps) = report.fps {
					controls.fps.set(fps);
				}
				if let Some(tier) = report.tier_changed {
					controls.tier.set(tier);
				}
				if s.has_failed() {
					controls.failed.set(true);
				}
				keep_going = s.wants_frames();
			}
			if keep_going {
				request_anim();
			}
		}));

		let mut l = listeners.borrow_mut();
		let (canvas_resize, gl_resize) = (canvas.clone(), gl_canvas.clone());
		let shared = state_init.clone();
		watch_resize(&mut l, &window, canvas_resize, gl_resize, shared, request_init.clone());
		watch_reduced_motion(&mut l, &window, state_init.clone(), request_init.clone(), controls);
		watch_visibility(&mut l, &window, state_init.clone(), request_init.clone(), cancel_frame);
		watch_pointer(&mut l, &window, canvas, gl_canvas, state_init.clone());
		drop(l);
		watch_battery(&window, state_init.clone(), listeners.clone(), controls, alive);
		request_init();
	});

	let (state_count, request_count) = (state.clone(), request_frame.clone());
	Effect::new(move |_| {
		let count = path_count.get();
		if let Some(ref mut s) = *state_count.borrow_mut() {
			s.set_path_count(count);
		}
		request_count();
	});

	let (state_select, request_select) = (state.clone(), request_frame.clone());
	Effect::new(move |_| {
		let Some(tier) = controls.selected.get() else {
			return;
		};
		let applied = state_select
			.borrow_mut()
			.as_mut()
			.map(|s| s.set_quality(tier, &mut LocalQualityStore));
		if let Some(applied) = applied {
			controls.tier.set(applied);
			request_select();
		}
	});

	let (state_pause, request_pause) = (state, request_frame);
	Effect::new(move |_| {
		let paused = controls.paused.get();
		if let Some(ref mut s) = *state_pause.borrow_mut() {
			s.set_paused(paused);
		}
		request_pause();
	});

	// Both layers hide together so a failed or static background never shows a stale frame.
	let layer_style = move || {
		if controls.is_animating() {
			"position: absolute; inset: 0; display: block;"
		} else {
			"display: none;"
		}
	};

	view! {
		<div
			class="fiber-background"
			style="position: fixed; inset: 0; z-index: 0; overflow: hidden; pointer-events: none; background: radial-gradient(ellipse at 50% 40%, #0b1e33 0%, #02060d 70%);"
		>
			<canvas node_ref=canvas_ref class="fiber-background-canvas" style=layer_style />
			<canvas node_ref=gl_ref class="fiber-background-webgl" style=layer_style />
		</div>
	}
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, RenderError> {
	canvas
		.get_context("2d")
		.map_err(|e| RenderError::surface("get_context", e))?
		.ok_or_else(|| RenderError::surface("get_context", "no 2d context"))?
		.dyn_into()
		.map_err(|_| RenderError::surface("get_context", "not a 2d context"))
}

fn viewport(window: &Window) -> (f64, f64) {
	let dim = |v: Result<JsValue, JsValue>, fallback: f64| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	(dim(window.inner_width(), 1280.0), dim(window.inner_height(), 720.0))
}

fn size_canvas(canvas: &HtmlCanvasElement, w: f64, h: f64) {
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
}

fn is_alive(alive: StoredValue<bool>) -> bool {
	alive.try_get_value().unwrap_or(false)
}

fn watch_resize(
	listeners: &mut Listeners,
	window: &Window,
	canvas: HtmlCanvasElement,
	gl_canvas: Option<HtmlCanvasElement>,
	state: SharedState,
	request: impl Fn() + 'static,
) {
	let cb = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
		let Some(win) = web_sys::window() else {
			return;
		};
		let (w, h) = viewport(&win);
		size_canvas(&canvas, w, h);
		if let Some(gl) = &gl_canvas {
			size_canvas(gl, w, h);
		}
		if let Some(ref mut s) = *state.borrow_mut() {
			s.resize(w, h);
		}
		request();
	});
	listeners.add(window, "resize", cb);
}

fn watch_reduced_motion(
	listeners: &mut Listeners,
	window: &Window,
	state: SharedState,
	request: impl Fn() + 'static,
	controls: FiberControls,
) {
	let Ok(Some(query)) = window.match_media("(prefers-reduced-motion: reduce)") else {
		return;
	};
	let query_cb = query.clone();
	let cb = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
		let reduced = query_cb.matches();
		let tier = state
			.borrow_mut()
			.as_mut()
			.and_then(|s| s.set_reduced_motion(reduced));
		if let Some(tier) = tier {
			controls.tier.set(tier);
			request();
		}
	});
	listeners.add(&query, "change", cb);
}

fn watch_visibility(
	listeners: &mut Listeners,
	window: &Window,
	state: SharedState,
	request: impl Fn() + 'static,
	cancel: impl Fn() + 'static,
) {
	let Some(document) = window.document() else {
		return;
	};
	let doc = document.clone();
	let cb = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
		if doc.hidden() {
			cancel();
			return;
		}
		let resume = match *state.borrow_mut() {
			Some(ref mut s) => {
				s.reset_timing();
				s.wants_frames()
			}
			None => false,
		};
		if resume {
			request();
		}
	});
	listeners.add(&document, "visibilitychange", cb);
}

/// Tracks the pointer for proximity glow and, on the first interaction at the top tier,
/// tries to bring up the WebGL layer.
fn watch_pointer(
	listeners: &mut Listeners,
	window: &Window,
	canvas: HtmlCanvasElement,
	gl_canvas: Option<HtmlCanvasElement>,
	state: SharedState,
) {
	let state_move = state.clone();
	let on_move = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
		let Some(ev) = ev.dyn_ref::<PointerEvent>() else {
			return;
		};
		let rect = canvas.get_bounding_client_rect();
		let pointer = (
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		);
		if let Some(ref mut s) = *state_move.borrow_mut() {
			s.set_pointer(Some(pointer));
		}
	});
	let state_out = state.clone();
	let on_out = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
		// Only when the pointer leaves the window entirely.
		let left_window = ev
			.dyn_ref::<PointerEvent>()
			.is_some_and(|ev| ev.related_target().is_none());
		if !left_window {
			return;
		}
		if let Some(ref mut s) = *state_out.borrow_mut() {
			s.set_pointer(None);
		}
	});

	let attempted = Rc::new(Cell::new(false));
	let interact = move || {
		if attempted.get() {
			return;
		}
		let mut guard = state.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		if s.tier() != QualityTier::High {
			return;
		}
		attempted.set(true);
		let layer = create_enhancement(s.capabilities(), s.tier(), true, gl_canvas.as_ref());
		if layer.is_active() {
			s.attach_enhancement(layer);
		}
	};

	listeners.add(window, "pointermove", on_move);
	listeners.add(window, "pointerout", on_out);
	for kind in ["pointerdown", "keydown"] {
		let interact = interact.clone();
		listeners.add(window, kind, Closure::new(move |_: Event| interact()));
	}
}

/// `navigator.getBattery()`, looked up dynamically since not every browser exposes it.
fn battery_promise(window: &Window) -> Option<js_sys::Promise> {
	let navigator = window.navigator();
	let get_battery = js_sys::Reflect::get(&navigator, &JsValue::from_str("getBattery"))
		.ok()?
		.dyn_into::<js_sys::Function>()
		.ok()?;
	get_battery.call0(&navigator).ok()?.dyn_into().ok()
}

fn watch_battery(
	window: &Window,
	state: SharedState,
	listeners: SharedListeners,
	controls: FiberControls,
	alive: StoredValue<bool>,
) {
	let Some(promise) = battery_promise(window) else {
		info!("battery status unsupported");
		return;
	};
	wasm_bindgen_futures::spawn_local(async move {
		let resolved = JsFuture::from(promise).await;
		let Ok(Ok(battery)) = resolved.map(|v| v.dyn_into::<BatteryManager>()) else {
			info!("battery status unavailable");
			return;
		};
		// The component may have unmounted while the promise was pending.
		if !is_alive(alive) {
			return;
		}
		let reader = battery.clone();
		let apply = move || {
			let tier = state
				.borrow_mut()
				.as_mut()
				.and_then(|s| s.on_battery(reader.level(), reader.charging()));
			if let Some(tier) = tier {
				controls.tier.set(tier);
			}
		};
		apply();
		let mut l = listeners.borrow_mut();
		for kind in ["levelchange", "chargingchange"] {
			let apply = apply.clone();
			l.add(&battery, kind, Closure::new(move |_: Event| apply()));
		}
	});
}
