//! Tuning for the fiber background. Everything the generator, animator, renderer and
//! monitor read lives here and is handed to them at construction.

use super::types::{QualityTier, Rgb};

pub const PALETTE: &[Rgb] = &[
	Rgb(0, 212, 255),
	Rgb(0, 150, 255),
	Rgb(64, 224, 208),
	Rgb(120, 90, 255),
	Rgb(0, 255, 170),
];

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
	/// Share of the requested paths that become main paths.
	pub main_ratio: f64,
	pub desktop_spacing: f64,
	pub mobile_spacing: f64,
	pub main_segment_length: usize,
	pub branch_segment_length: usize,
	pub branch_node_count: usize,
	pub branch_length: f64,
	pub branch_length_mobile: f64,
	pub branch_grid_cols: usize,
	pub branch_grid_rows: usize,
	pub main_speed: f64,
	pub branch_speed: f64,
	pub main_opacity: f64,
	pub branch_opacity: f64,
	pub main_glow: f64,
	pub branch_glow: f64,
}

impl Default for GeneratorConfig {
	fn default() -> Self {
		Self {
			main_ratio: 0.7,
			desktop_spacing: 40.0,
			mobile_spacing: 60.0,
			main_segment_length: 8,
			branch_segment_length: 4,
			branch_node_count: 8,
			branch_length: 160.0,
			branch_length_mobile: 100.0,
			branch_grid_cols: 4,
			branch_grid_rows: 3,
			main_speed: 0.4,
			branch_speed: 0.6,
			main_opacity: 0.7,
			branch_opacity: 0.45,
			main_glow: 0.7,
			branch_glow: 0.5,
		}
	}
}

/// Inclusive `[min, max]` band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Band {
	pub min: f64,
	pub max: f64,
}

impl Band {
	pub const fn new(min: f64, max: f64) -> Self {
		Self { min, max }
	}

	pub fn clamp(self, v: f64) -> f64 {
		v.clamp(self.min, self.max)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimatorConfig {
	pub speed_floor: f64,
	pub main_multiplier: f64,
	pub branch_multiplier: f64,
	/// Nodes advanced per millisecond at speed 1.0.
	pub progression: f64,
	/// Lower bound of the distance falloff inside the lit window.
	pub min_intensity: f64,
	/// No lit node ever drops below this.
	pub min_visibility: f64,
	pub pulse_frequency: f64,
	pub pulse_base: f64,
	pub pulse_amplitude: f64,
	pub glow_boost: f64,
	pub pointer_radius: f64,
	pub pointer_boost: f64,
	/// Fraction of the gap to the target opacity closed per millisecond.
	pub easing: f64,
	pub main_opacity: Band,
	pub branch_opacity: Band,
	pub main_glow: Band,
	pub branch_glow: Band,
}

impl Default for AnimatorConfig {
	fn default() -> Self {
		Self {
			speed_floor: 0.1,
			main_multiplier: 1.0,
			branch_multiplier: 1.6,
			progression: 0.012,
			min_intensity: 0.15,
			min_visibility: 0.05,
			pulse_frequency: 0.003,
			pulse_base: 0.7,
			pulse_amplitude: 0.3,
			glow_boost: 0.25,
			pointer_radius: 140.0,
			pointer_boost: 0.35,
			easing: 0.004,
			main_opacity: Band::new(0.45, 1.0),
			branch_opacity: Band::new(0.25, 0.75),
			main_glow: Band::new(0.5, 1.0),
			branch_glow: Band::new(0.3, 0.8),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
	/// Alpha of the black wash painted at the start of each frame.
	pub trail_alpha: f64,
	pub outer_blur: f64,
	pub middle_blur: f64,
	pub core_blur: f64,
	/// Multiplier applied to every blur radius on mobile.
	pub mobile_blur_scale: f64,
	pub halo_radius: f64,
	pub dot_radius: f64,
	pub halo_frequency: f64,
}

impl Default for RenderConfig {
	fn default() -> Self {
		Self {
			trail_alpha: 0.12,
			outer_blur: 24.0,
			middle_blur: 12.0,
			core_blur: 4.0,
			mobile_blur_scale: 0.4,
			halo_radius: 4.0,
			dot_radius: 1.6,
			halo_frequency: 0.004,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct MonitorConfig {
	pub sample_window_ms: f64,
	pub monitoring_duration_ms: f64,
	pub desktop_min_fps: f64,
	pub mobile_min_fps: f64,
	pub battery_threshold: f64,
	pub render_failure_limit: u32,
}

impl Default for MonitorConfig {
	fn default() -> Self {
		Self {
			sample_window_ms: 1000.0,
			monitoring_duration_ms: 5000.0,
			desktop_min_fps: 30.0,
			mobile_min_fps: 20.0,
			battery_threshold: 0.2,
			render_failure_limit: 3,
		}
	}
}

/// Immutable configuration bundle for one background instance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FiberConfig {
	pub generator: GeneratorConfig,
	pub animator: AnimatorConfig,
	pub render: RenderConfig,
	pub monitor: MonitorConfig,
}

/// Cost knobs derived from a [`QualityTier`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualitySettings {
	/// Multiplier applied to the device's optimal path count.
	pub path_scale: f64,
	pub stroke_width: f64,
	pub layers: u8,
	pub glow_passes: u8,
	pub animated: bool,
}

impl QualityTier {
	pub fn settings(self) -> QualitySettings {
		match self {
			QualityTier::High => QualitySettings {
				path_scale: 1.0,
				stroke_width: 2.0,
				layers: 3,
				glow_passes: 3,
				animated: true,
			},
			QualityTier::Medium => QualitySettings {
				path_scale: 0.7,
				stroke_width: 1.5,
				layers: 2,
				glow_passes: 2,
				animated: true,
			},
			QualityTier::Low => QualitySettings {
				path_scale: 0.4,
				stroke_width: 1.0,
				layers: 1,
				glow_passes: 1,
				animated: true,
			},
			QualityTier::Static => QualitySettings {
				path_scale: 0.0,
				stroke_width: 1.0,
				layers: 1,
				glow_passes: 0,
				animated: false,
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settings_get_cheaper_down_the_tiers() {
		let mut prev = QualityTier::High.settings();
		for tier in &QualityTier::ALL[1..] {
			let s = tier.settings();
			assert!(s.path_scale < prev.path_scale);
			assert!(s.layers <= prev.layers);
			assert!(s.glow_passes < prev.glow_passes);
			prev = s;
		}
		assert!(!QualityTier::Static.settings().animated);
	}
}
