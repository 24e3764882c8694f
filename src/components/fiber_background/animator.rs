use std::f64::consts::TAU;

use log::warn;

use super::config::AnimatorConfig;
use super::error::FiberError;
use super::types::{Path, PathKind};

const HERO_GLOW_PERIOD_MS: f64 = 4000.0;

/// Per-frame inputs shared by every path.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
	/// Animation clock, milliseconds.
	pub time: f64,
	/// Milliseconds since the previous update.
	pub delta: f64,
	/// Ambient brightness signal in `[0, 1]`.
	pub hero_glow: f64,
	pub pointer: Option<(f64, f64)>,
}

impl FrameInput {
	fn sanitized(self) -> Self {
		let finite_or = |v: f64, d: f64| if v.is_finite() { v } else { d };
		Self {
			time: finite_or(self.time, 0.0),
			delta: finite_or(self.delta, 0.0).max(0.0),
			hero_glow: finite_or(self.hero_glow, 0.0).clamp(0.0, 1.0),
			pointer: self.pointer.filter(|(x, y)| x.is_finite() && y.is_finite()),
		}
	}
}

/// Slow ambient oscillator used when the host page does not drive the glow itself.
pub fn hero_glow(time_ms: f64) -> f64 {
	0.5 + 0.5 * (time_ms * TAU / HERO_GLOW_PERIOD_MS).sin()
}

/// Advances one path by a frame. On error the path is left exactly as it was.
pub fn update_path(
	path: &mut Path,
	frame: FrameInput,
	cfg: &AnimatorConfig,
) -> Result<(), FiberError> {
	let n = path.nodes.len();
	if n == 0 {
		return Err(FiberError::EmptyPath { path: path.id });
	}
	if !path.active_segment.is_finite() {
		return Err(FiberError::CorruptSegment {
			path: path.id,
			value: path.active_segment,
		});
	}
	let frame = frame.sanitized();

	let (multiplier, opacity_band, glow_band) = match path.kind {
		PathKind::Main => (cfg.main_multiplier, cfg.main_opacity, cfg.main_glow),
		PathKind::Branch => (cfg.branch_multiplier, cfg.branch_opacity, cfg.branch_glow),
	};

	let current = if (0.0..n as f64).contains(&path.active_segment) {
		path.active_segment
	} else {
		0.0
	};
	let speed = if path.speed.is_finite() {
		path.speed.max(cfg.speed_floor)
	} else {
		cfg.speed_floor
	};
	let mut next = current + speed * multiplier * frame.delta * cfg.progression;
	if !next.is_finite() || next >= (n - 1) as f64 {
		next = 0.0;
	}
	path.active_segment = next;

	let segment = path.segment_length.max(1) as f64;
	let boost = frame.hero_glow * cfg.glow_boost;
	for (i, node) in path.nodes.iter_mut().enumerate() {
		let distance = (i as f64 - next).abs();
		if distance >= segment {
			node.active = false;
			node.intensity = 0.0;
			continue;
		}
		let falloff = (1.0 - distance / segment).max(cfg.min_intensity);
		let wave = (frame.time * cfg.pulse_frequency + node.pulse_phase).sin();
		let pulse = cfg.pulse_base + cfg.pulse_amplitude * wave;
		let proximity = frame
			.pointer
			.map(|(px, py)| {
				let d = (node.x - px).hypot(node.y - py);
				(1.0 - d / cfg.pointer_radius).max(0.0) * cfg.pointer_boost
			})
			.unwrap_or(0.0);
		let value = falloff * pulse * node.connection_strength + boost + proximity;
		node.active = true;
		// NaN from corrupt node data collapses to the visibility floor via `max`.
		node.intensity = value.clamp(0.0, 1.0).max(cfg.min_visibility);
	}

	let ease = (frame.delta * cfg.easing).min(1.0);
	let lift = 0.4 + 0.6 * frame.hero_glow;
	let target_opacity = opacity_band.min + (opacity_band.max - opacity_band.min) * lift;
	let target_glow = glow_band.min + (glow_band.max - glow_band.min) * lift;
	path.opacity = opacity_band.clamp(approach(path.opacity, target_opacity, ease));
	path.glow_intensity = glow_band.clamp(approach(path.glow_intensity, target_glow, ease));
	Ok(())
}

fn approach(current: f64, target: f64, ease: f64) -> f64 {
	if current.is_finite() {
		current + (target - current) * ease
	} else {
		target
	}
}

/// Updates every path; a failing path is passed through untouched and retried next frame.
/// Returns how many paths failed.
pub fn update_paths(paths: &mut [Path], frame: FrameInput, cfg: &AnimatorConfig) -> usize {
	let mut failures = 0;
	for path in paths.iter_mut() {
		if let Err(err) = update_path(path, frame, cfg) {
			warn!("skipping path update: {err}");
			failures += 1;
		}
	}
	failures
}
