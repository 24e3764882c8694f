use log::{debug, info, warn};

use super::config::MonitorConfig;
use super::device::DeviceCapabilities;
use super::storage::QualityStore;
use super::types::QualityTier;

/// Reduced motion beats everything, then the saved choice, then the device default.
pub fn resolve_initial_tier(caps: &DeviceCapabilities, saved: Option<QualityTier>) -> QualityTier {
	if caps.reduced_motion {
		QualityTier::Static
	} else {
		saved.unwrap_or_else(|| caps.default_tier())
	}
}

/// Samples frame rate and steps the quality tier down when a device can't keep up.
///
/// Tiers only ever move down on their own. Going back up takes a manual selection.
#[derive(Clone, Debug)]
pub struct PerformanceMonitor {
	cfg: MonitorConfig,
	mobile: bool,
	tier: QualityTier,
	is_monitoring: bool,
	is_paused: bool,
	should_auto_degrade: bool,
	current_fps: f64,
	frames: u32,
	window_start: Option<f64>,
	monitor_start: Option<f64>,
	reduced_motion: bool,
	before_reduced_motion: Option<QualityTier>,
	battery_low: bool,
}

impl PerformanceMonitor {
	pub fn new(cfg: MonitorConfig, mobile: bool, tier: QualityTier, reduced_motion: bool) -> Self {
		Self {
			cfg,
			mobile,
			tier: if reduced_motion { QualityTier::Static } else { tier },
			is_monitoring: false,
			is_paused: false,
			should_auto_degrade: false,
			current_fps: 60.0,
			frames: 0,
			window_start: None,
			monitor_start: None,
			reduced_motion,
			before_reduced_motion: reduced_motion.then_some(tier),
			battery_low: false,
		}
	}

	pub fn tier(&self) -> QualityTier {
		self.tier
	}

	pub fn is_monitoring(&self) -> bool {
		self.is_monitoring
	}

	pub fn has_started(&self) -> bool {
		self.monitor_start.is_some()
	}

	pub fn is_paused(&self) -> bool {
		self.is_paused
	}

	pub fn should_auto_degrade(&self) -> bool {
		self.should_auto_degrade
	}

	pub fn current_fps(&self) -> f64 {
		self.current_fps
	}

	pub fn min_fps(&self) -> f64 {
		if self.mobile {
			self.cfg.mobile_min_fps
		} else {
			self.cfg.desktop_min_fps
		}
	}

	/// Opens the bounded monitoring window.
	pub fn start(&mut self, now: f64) {
		self.is_monitoring = true;
		self.monitor_start = Some(now);
		self.window_start = Some(now);
		self.frames = 0;
	}

	/// Counts a rendered frame. Returns the bucket's FPS when a sample window closes.
	pub fn record_frame(&mut self, now: f64) -> Option<f64> {
		let Some(window_start) = self.window_start else {
			self.window_start = Some(now);
			self.frames = 0;
			return None;
		};
		self.frames += 1;
		let elapsed = now - window_start;
		if elapsed < self.cfg.sample_window_ms {
			return None;
		}
		let fps = self.frames as f64 * 1000.0 / elapsed;
		self.current_fps = fps;
		self.frames = 0;
		self.window_start = Some(now);

		if self.is_monitoring {
			if fps < self.min_fps() && !self.should_auto_degrade {
				debug!("fps {fps:.1} under floor {}, auto-degrade armed", self.min_fps());
				self.should_auto_degrade = true;
			}
			let started = self.monitor_start.unwrap_or(now);
			if now - started >= self.cfg.monitoring_duration_ms {
				self.is_monitoring = false;
				debug!("fps monitoring window closed at {fps:.1} fps");
			}
		}
		Some(fps)
	}

	/// Drops one tier when armed and the live FPS is still under the floor.
	pub fn auto_adjust(&mut self) -> Option<QualityTier> {
		if !self.should_auto_degrade || self.current_fps >= self.min_fps() {
			return None;
		}
		self.step_down("low frame rate")
	}

	/// Reacts to a battery reading. Drops one tier per low-battery episode.
	pub fn on_battery(&mut self, level: f64, charging: bool) -> Option<QualityTier> {
		let low = !charging && level < self.cfg.battery_threshold;
		if !low {
			self.battery_low = false;
			return None;
		}
		if self.battery_low {
			return None;
		}
		self.battery_low = true;
		if self.reduced_motion {
			// Applied to the tier that comes back once reduced motion is lifted.
			if let Some(before) = self.before_reduced_motion.as_mut() {
				*before = before.step_down(self.mobile);
			}
			return None;
		}
		self.step_down("low battery")
	}

	pub fn set_reduced_motion(&mut self, reduced: bool) -> Option<QualityTier> {
		if reduced == self.reduced_motion {
			return None;
		}
		self.reduced_motion = reduced;
		let next = if reduced {
			self.before_reduced_motion = Some(self.tier);
			QualityTier::Static
		} else {
			self.before_reduced_motion.take().unwrap_or(self.tier)
		};
		self.change_to(next, "reduced-motion preference")
	}

	/// Manual selection: persisted, and the only way to move up a tier.
	/// Reduced motion still wins over the returned effective tier.
	pub fn set_quality(&mut self, tier: QualityTier, store: &mut dyn QualityStore) -> QualityTier {
		if let Err(err) = store.save(tier) {
			warn!("could not persist quality {tier}: {err}");
		}
		if self.reduced_motion {
			self.before_reduced_motion = Some(tier);
			return self.tier;
		}
		self.should_auto_degrade = false;
		self.change_to(tier, "manual selection");
		self.tier
	}

	pub fn toggle_pause(&mut self) -> bool {
		self.set_paused(!self.is_paused);
		self.is_paused
	}

	pub fn set_paused(&mut self, paused: bool) {
		if self.is_paused != paused {
			self.is_paused = paused;
			self.reset_window();
		}
	}

	/// Restarts the current sample bucket, so a gap with no frames (paused, hidden tab)
	/// is not read as one very slow bucket.
	pub fn reset_window(&mut self) {
		self.window_start = None;
		self.frames = 0;
	}

	fn step_down(&mut self, cause: &str) -> Option<QualityTier> {
		let next = self.tier.step_down(self.mobile);
		self.change_to(next, cause)
	}

	fn change_to(&mut self, next: QualityTier, cause: &str) -> Option<QualityTier> {
		if next == self.tier {
			return None;
		}
		info!("quality {} -> {} ({cause})", self.tier, next);
		self.tier = next;
		Some(next)
	}
}
