use log::{info, warn};

use super::animator::{FrameInput, hero_glow, update_paths};
use super::config::FiberConfig;
use super::device::DeviceCapabilities;
use super::enhancement::{Enhancement, NoEnhancement};
use super::generator::PathGenerator;
use super::performance::{PerformanceMonitor, resolve_initial_tier};
use super::render::{FiberSurface, RenderFrame, RenderHealth, RenderStats, render_frame};
use super::storage::QualityStore;
use super::types::{Path, QualityTier};

/// What a tick changed, for the host to mirror into its own state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickReport {
	/// Set when a sampling bucket closed this frame.
	pub fps: Option<f64>,
	pub tier_changed: Option<QualityTier>,
	pub failed_paths: usize,
}

/// Owns one background instance: generated paths, quality monitor and render health.
/// The host drives it with [`tick`](Self::tick) and [`render`](Self::render) once per
/// animation frame.
pub struct FiberBackgroundState {
	config: FiberConfig,
	caps: DeviceCapabilities,
	monitor: PerformanceMonitor,
	health: RenderHealth,
	paths: Vec<Path>,
	path_count: Option<usize>,
	width: f64,
	height: f64,
	time: f64,
	last_frame: Option<f64>,
	pointer: Option<(f64, f64)>,
	enhancement: Box<dyn Enhancement>,
}

impl FiberBackgroundState {
	pub fn new(
		config: FiberConfig,
		caps: DeviceCapabilities,
		saved: Option<QualityTier>,
		width: f64,
		height: f64,
		path_count: Option<usize>,
	) -> Self {
		let tier = resolve_initial_tier(&caps, saved);
		let monitor = PerformanceMonitor::new(
			config.monitor.clone(),
			caps.is_handheld(),
			tier,
			caps.reduced_motion,
		);
		let health = RenderHealth::new(config.monitor.render_failure_limit);
		info!("fiber background starting at {tier} quality ({width}x{height})");
		let mut state = Self {
			config,
			caps,
			monitor,
			health,
			paths: Vec::new(),
			path_count,
			width,
			height,
			time: 0.0,
			last_frame: None,
			pointer: None,
			enhancement: Box::new(NoEnhancement),
		};
		state.regenerate();
		state
	}

	pub fn tier(&self) -> QualityTier {
		self.monitor.tier()
	}

	pub fn paths(&self) -> &[Path] {
		&self.paths
	}

	pub fn capabilities(&self) -> &DeviceCapabilities {
		&self.caps
	}

	pub fn is_paused(&self) -> bool {
		self.monitor.is_paused()
	}

	pub fn current_fps(&self) -> f64 {
		self.monitor.current_fps()
	}

	pub fn has_failed(&self) -> bool {
		self.health.has_failed()
	}

	/// Whether the host should keep requesting animation frames.
	pub fn wants_frames(&self) -> bool {
		!self.monitor.is_paused() && self.tier().is_animated() && !self.health.has_failed()
	}

	/// Paths to generate for the current tier: the override or the device optimum,
	/// scaled by the tier.
	pub fn desired_path_count(&self) -> usize {
		let settings = self.tier().settings();
		if !settings.animated {
			return 0;
		}
		let base = self.path_count.unwrap_or_else(|| self.caps.optimal_path_count());
		if base == 0 {
			return 0;
		}
		((base as f64 * settings.path_scale).round() as usize).max(1)
	}

	/// Replaces the whole path set. Nothing from the old set survives.
	pub fn regenerate(&mut self) {
		let count = self.desired_path_count();
		let generator = PathGenerator::new(
			&self.config.generator,
			self.tier().settings(),
			self.caps.is_handheld(),
		);
		self.paths = generator.generate(self.width, self.height, count);
	}

	pub fn resize(&mut self, width: f64, height: f64) -> bool {
		if width == self.width && height == self.height {
			return false;
		}
		self.width = width;
		self.height = height;
		self.enhancement.resize(width, height);
		self.regenerate();
		true
	}

	/// Changes the requested count. The set is rebuilt only when the value differs.
	pub fn set_path_count(&mut self, path_count: Option<usize>) {
		if self.path_count != path_count {
			self.path_count = path_count;
			self.regenerate();
		}
	}

	pub fn set_quality(&mut self, tier: QualityTier, store: &mut dyn QualityStore) -> QualityTier {
		let before = self.tier();
		let after = self.monitor.set_quality(tier, store);
		self.tier_changed(before);
		after
	}

	pub fn set_reduced_motion(&mut self, reduced: bool) -> Option<QualityTier> {
		let before = self.tier();
		let changed = self.monitor.set_reduced_motion(reduced);
		self.tier_changed(before);
		changed
	}

	pub fn on_battery(&mut self, level: f64, charging: bool) -> Option<QualityTier> {
		let before = self.tier();
		let changed = self.monitor.on_battery(level, charging);
		self.tier_changed(before);
		changed
	}

	/// Stops or resumes advancement. Paths are kept as they are.
	pub fn toggle_pause(&mut self) -> bool {
		let paused = self.monitor.toggle_pause();
		self.last_frame = None;
		paused
	}

	pub fn set_paused(&mut self, paused: bool) {
		if self.monitor.is_paused() != paused {
			self.toggle_pause();
		}
	}

	/// Forgets frame timing after the host stopped delivering frames for a while.
	pub fn reset_timing(&mut self) {
		self.last_frame = None;
		self.monitor.reset_window();
	}

	pub fn set_pointer(&mut self, pointer: Option<(f64, f64)>) {
		self.pointer = pointer;
	}

	pub fn attach_enhancement(&mut self, enhancement: Box<dyn Enhancement>) {
		self.enhancement.clear();
		self.enhancement = enhancement;
		self.enhancement.resize(self.width, self.height);
	}

	fn tier_changed(&mut self, before: QualityTier) {
		let after = self.tier();
		if after == before {
			return;
		}
		if after != QualityTier::High && self.enhancement.is_active() {
			self.attach_enhancement(Box::new(NoEnhancement));
		}
		self.regenerate();
	}

	/// Samples timing and advances every path. `now` is the frame timestamp in
	/// milliseconds; `external_glow` overrides the built-in ambient oscillator.
	pub fn tick(&mut self, now: f64, external_glow: Option<f64>) -> TickReport {
		let mut report = TickReport::default();
		if !self.monitor.has_started() {
			self.monitor.start(now);
		}
		let delta = self.last_frame.map_or(0.0, |last| (now - last).max(0.0));
		self.last_frame = Some(now);

		report.fps = self.monitor.record_frame(now);
		if report.fps.is_some() {
			let before = self.tier();
			report.tier_changed = self.monitor.auto_adjust();
			self.tier_changed(before);
		}
		if !self.wants_frames() {
			return report;
		}

		self.time += delta;
		let frame = FrameInput {
			time: self.time,
			delta,
			hero_glow: external_glow.unwrap_or_else(|| hero_glow(self.time)),
			pointer: self.pointer,
		};
		report.failed_paths = update_paths(&mut self.paths, frame, &self.config.animator);
		report
	}

	/// Paints the current state. Draws nothing at the static tier or once rendering has failed.
	pub fn render<S: FiberSurface + ?Sized>(&mut self, surface: &S) -> Option<RenderStats> {
		if self.health.has_failed() || !self.tier().is_animated() {
			return None;
		}
		let frame = RenderFrame {
			width: self.width,
			height: self.height,
			time: self.time,
			mobile: self.caps.is_handheld(),
			glow_passes: self.tier().settings().glow_passes,
		};
		let stats = self
			.health
			.record(render_frame(&self.paths, surface, &frame, &self.config.render));
		if self.health.has_failed() {
			// The overlay must not outlive the canvas it decorates.
			if self.enhancement.is_active() {
				self.attach_enhancement(Box::new(NoEnhancement));
			}
			return stats;
		}

		if self.enhancement.is_active() {
			let delta = if self.monitor.is_paused() {
				0.0
			} else {
				1000.0 / self.current_fps().max(1.0)
			};
			if let Err(err) = self.enhancement.render(&self.paths, self.time, delta) {
				warn!("dropping webgl enhancement: {err}");
				self.attach_enhancement(Box::new(NoEnhancement));
			}
		}
		stats
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use super::*;
	use crate::components::fiber_background::device::DeviceClass;
	use crate::components::fiber_background::error::RenderError;
	use crate::components::fiber_background::render::tests::{Op, RecordingSurface};
	use crate::components::fiber_background::storage::MemoryQualityStore;

	fn desktop() -> DeviceCapabilities {
		DeviceCapabilities {
			class: DeviceClass::Desktop,
			ram_gb: 16.0,
			legacy_browser: false,
			webgl: true,
			reduced_motion: false,
			touch: false,
		}
	}

	fn state(path_count: Option<usize>) -> FiberBackgroundState {
		with_saved(None, path_count)
	}

	fn with_saved(saved: Option<QualityTier>, path_count: Option<usize>) -> FiberBackgroundState {
		let config = FiberConfig::default();
		FiberBackgroundState::new(config, desktop(), saved, 1920.0, 1080.0, path_count)
	}

	fn run(s: &mut FiberBackgroundState, from: f64, ms: f64, fps: f64) -> f64 {
		let step = 1000.0 / fps;
		let mut t = from;
		while t < from + ms {
			t += step;
			s.tick(t, None);
		}
		t
	}

	#[test]
	fn requested_ten_on_high_desktop() {
		let s = state(Some(10));
		assert_eq!(s.tier(), QualityTier::High);
		let main = s.paths().iter().filter(|p| p.is_main()).count();
		assert_eq!((main, s.paths().len() - main), (7, 3));
	}

	#[test]
	fn changing_the_requested_count_rebuilds_the_set() {
		let mut s = state(Some(10));
		let before: Vec<_> = s.paths().iter().map(|p| (p.id, p.nodes.len())).collect();
		s.set_path_count(Some(10));
		let same: Vec<_> = s.paths().iter().map(|p| (p.id, p.nodes.len())).collect();
		assert_eq!(before, same);

		s.set_path_count(Some(4));
		let main = s.paths().iter().filter(|p| p.is_main()).count();
		assert_eq!((main, s.paths().len() - main), (2, 2));

		s.set_path_count(None);
		assert_eq!(s.paths().len(), desktop().optimal_path_count());
	}

	#[test]
	fn zero_paths_render_nothing_without_error() {
		let mut s = state(Some(0));
		assert!(s.paths().is_empty());
		s.tick(0.0, None);
		s.tick(16.0, None);
		let surface = RecordingSurface::default();
		let stats = s.render(&surface).unwrap();
		assert_eq!(stats.paths_drawn, 0);
		assert!(!s.has_failed());
	}

	#[test]
	fn segments_stay_in_bounds_across_frames() {
		let mut s = state(None);
		run(&mut s, 0.0, 3_000.0, 60.0);
		s.tick(13_000.0, Some(1.0));
		for p in s.paths() {
			assert!(p.active_segment >= 0.0 && p.active_segment < p.node_count() as f64);
			assert!(p.nodes.iter().all(|n| (0.0..=1.0).contains(&n.intensity)));
		}
	}

	#[test]
	fn corrupted_path_is_isolated() {
		let mut s = state(Some(10));
		s.tick(0.0, None);
		s.paths[4].nodes.clear();
		let report = s.tick(16.0, None);
		assert_eq!(report.failed_paths, 1);
		assert_eq!(s.paths()[4].active_segment, state(Some(10)).paths()[4].active_segment);
		let surface = RecordingSurface::default();
		assert!(s.render(&surface).is_some());
	}

	#[test]
	fn pause_freezes_without_regenerating() {
		let mut s = state(Some(6));
		run(&mut s, 0.0, 500.0, 60.0);
		assert!(s.toggle_pause());
		assert!(!s.wants_frames());
		let frozen = s.paths().to_vec();
		s.tick(5_000.0, None);
		assert_eq!(s.paths(), frozen.as_slice());

		assert!(!s.toggle_pause());
		// Resuming continues from the frozen positions instead of jumping.
		s.tick(5_016.0, None);
		s.tick(5_032.0, None);
		for (now, then) in s.paths().iter().zip(&frozen) {
			assert_eq!(now.node_count(), then.node_count());
			let moved = (now.active_segment - then.active_segment).abs();
			assert!(moved < 1.0 || now.active_segment == 0.0);
		}
	}

	#[test]
	fn hidden_gap_does_not_degrade_quality() {
		let mut s = state(Some(6));
		let t = run(&mut s, 0.0, 800.0, 60.0);
		s.reset_timing();
		run(&mut s, t + 30_000.0, 1_500.0, 60.0);
		assert_eq!(s.tier(), QualityTier::High);
		assert!(s.current_fps() > 50.0);
	}

	#[test]
	fn resize_rebuilds_for_the_new_viewport() {
		let mut s = state(Some(6));
		let before = s.paths()[0].node_count();
		assert!(s.resize(800.0, 600.0));
		assert!(!s.resize(800.0, 600.0));
		assert!(s.paths()[0].node_count() < before);
		assert!(s.paths()[0].nodes.iter().all(|n| n.x <= 800.0));
	}

	#[test]
	fn slow_frames_step_quality_down_and_regenerate() {
		let mut s = state(Some(10));
		let mut tiers = vec![s.tier()];
		let mut t = 0.0;
		for _ in 0..3 {
			t = run(&mut s, t, 1_050.0, 10.0);
			if tiers.last() != Some(&s.tier()) {
				tiers.push(s.tier());
			}
		}
		assert_eq!(
			tiers,
			vec![QualityTier::High, QualityTier::Medium, QualityTier::Low, QualityTier::Static]
		);
		assert!(s.paths().is_empty());
		assert!(!s.wants_frames());
	}

	#[test]
	fn manual_quality_persists_and_rescales() {
		let mut store = MemoryQualityStore::default();
		let mut s = state(Some(10));
		assert_eq!(s.set_quality(QualityTier::Low, &mut store), QualityTier::Low);
		assert_eq!(store.load(), Some(QualityTier::Low));
		assert_eq!(s.paths().len(), 4);
		assert!(s.paths().iter().all(|p| p.layer == 0));

		let reloaded = with_saved(store.load(), Some(10));
		assert_eq!(reloaded.tier(), QualityTier::Low);
	}

	#[test]
	fn reduced_motion_wins_over_saved_choice() {
		let caps = DeviceCapabilities {
			reduced_motion: true,
			..desktop()
		};
		let mut s = FiberBackgroundState::new(
			FiberConfig::default(),
			caps,
			Some(QualityTier::High),
			1920.0,
			1080.0,
			None,
		);
		assert_eq!(s.tier(), QualityTier::Static);
		assert!(s.paths().is_empty());
		let surface = RecordingSurface::default();
		assert!(s.render(&surface).is_none());
		assert_eq!(surface.count(|_| true), 0);
	}

	#[test]
	fn repeated_render_failures_flag_the_renderer() {
		let mut s = state(Some(4));
		s.tick(0.0, None);
		s.tick(16.0, None);
		let surface = RecordingSurface::default();
		surface.fail_arcs.set(true);
		assert!(s.render(&surface).is_none());
		assert!(!s.has_failed());
		s.render(&surface);
		s.render(&surface);
		assert!(s.has_failed());
		assert!(!s.wants_frames());

		let after = surface.count(|_| true);
		surface.fail_arcs.set(false);
		assert!(s.render(&surface).is_none());
		assert_eq!(surface.count(|_| true), after);
	}

	struct Overlay {
		cleared: Rc<Cell<bool>>,
	}

	impl Enhancement for Overlay {
		fn is_active(&self) -> bool {
			true
		}

		fn resize(&mut self, _width: f64, _height: f64) {}

		fn render(&mut self, _paths: &[Path], _time: f64, _delta: f64) -> Result<(), RenderError> {
			Ok(())
		}

		fn clear(&mut self) {
			self.cleared.set(true);
		}
	}

	#[test]
	fn render_failure_clears_the_overlay() {
		let mut s = state(Some(4));
		s.tick(0.0, None);
		s.tick(16.0, None);
		let cleared = Rc::new(Cell::new(false));
		s.attach_enhancement(Box::new(Overlay {
			cleared: cleared.clone(),
		}));

		let surface = RecordingSurface::default();
		surface.fail_arcs.set(true);
		s.render(&surface);
		s.render(&surface);
		assert!(!cleared.get());
		s.render(&surface);
		assert!(s.has_failed());
		assert!(cleared.get());
	}

	#[test]
	fn render_draws_strokes_for_lit_paths() {
		let mut s = state(Some(5));
		s.tick(0.0, None);
		s.tick(16.0, None);
		let surface = RecordingSurface::default();
		let stats = s.render(&surface).unwrap();
		assert_eq!(stats.paths_drawn, 5);
		assert!(surface.count(|op| *op == Op::DoStroke) >= 5 * 3);
	}
}
