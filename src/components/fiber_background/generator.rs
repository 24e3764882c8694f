use std::f64::consts::{PI, TAU};

use log::debug;

use super::config::{GeneratorConfig, PALETTE, QualitySettings};
use super::types::{Direction, Node, Path, PathKind};

const GOLDEN: f64 = 0.618_033_988_75;

/// Main/branch split for a requested path count.
pub fn split_count(main_ratio: f64, count: usize) -> (usize, usize) {
	if count == 0 {
		return (0, 0);
	}
	let main = ((count as f64 * main_ratio).floor() as usize).clamp(1, count);
	(main, count - main)
}

/// Builds fiber layouts for a viewport. Output depends only on the inputs, so
/// regenerating with the same viewport and count reproduces the same structure.
pub struct PathGenerator<'a> {
	cfg: &'a GeneratorConfig,
	settings: QualitySettings,
	mobile: bool,
}

impl<'a> PathGenerator<'a> {
	pub fn new(cfg: &'a GeneratorConfig, settings: QualitySettings, mobile: bool) -> Self {
		Self {
			cfg,
			settings,
			mobile,
		}
	}

	/// An invalid viewport or a zero count yields an empty set.
	pub fn generate(&self, width: f64, height: f64, count: usize) -> Vec<Path> {
		if count == 0 || !(width > 0.0 && height > 0.0) || !width.is_finite() || !height.is_finite()
		{
			return Vec::new();
		}
		let (main_count, branch_count) = split_count(self.cfg.main_ratio, count);

		let mut paths = Vec::with_capacity(count);
		for k in 0..main_count {
			paths.push(self.main_path(k, width, height));
		}
		for b in 0..branch_count {
			paths.push(self.branch_path(main_count + b, b, width, height));
		}
		debug!(
			"generated {} main + {} branch paths for {}x{} (mobile: {})",
			main_count, branch_count, width, height, self.mobile
		);
		paths
	}

	fn spacing(&self) -> f64 {
		if self.mobile {
			self.cfg.mobile_spacing
		} else {
			self.cfg.desktop_spacing
		}
	}

	fn main_path(&self, index: usize, width: f64, height: f64) -> Path {
		let (direction, points) = match index % 3 {
			0 => (Direction::Horizontal, self.horizontal_sweep(index, width, height)),
			1 => (Direction::Diagonal, self.diagonal_sweep(index, width, height)),
			_ => (Direction::Curved, self.curved_sweep(index, width, height)),
		};
		let nodes = points
			.into_iter()
			.enumerate()
			.map(|(i, (x, y))| Node {
				id: i,
				x,
				y,
				active: false,
				intensity: 0.0,
				pulse_phase: pulse_phase(i),
				connection_strength: 0.7 + 0.3 * (i as f64 * 0.35 + index as f64).sin().abs(),
			})
			.collect();
		self.assemble(
			index,
			nodes,
			direction,
			PathKind::Main,
			self.cfg.main_speed * (1.0 + 0.25 * (index % 3) as f64),
		)
	}

	fn horizontal_sweep(&self, index: usize, width: f64, height: f64) -> Vec<(f64, f64)> {
		let n = ((width / self.spacing()).floor() as usize).max(2) + 1;
		let band = height * (0.1 + 0.8 * (index as f64 * GOLDEN).fract());
		let amplitude = height * 0.05;
		(0..n)
			.map(|i| {
				let x = width * i as f64 / (n - 1) as f64;
				let y = band + (i as f64 * 0.25 + index as f64).sin() * amplitude;
				(x, y.clamp(0.0, height))
			})
			.collect()
	}

	fn diagonal_sweep(&self, index: usize, width: f64, height: f64) -> Vec<(f64, f64)> {
		let x0 = width * 0.4 * (index as f64 * 0.29).fract();
		let x1 = width * (0.6 + 0.4 * (index as f64 * 0.41).fract());
		let (y0, y1) = if index % 2 == 0 { (0.0, height) } else { (height, 0.0) };
		let len = (x1 - x0).hypot(y1 - y0);
		let n = ((len / self.spacing()).floor() as usize).max(2) + 1;
		(0..n)
			.map(|i| {
				let t = i as f64 / (n - 1) as f64;
				(x0 + (x1 - x0) * t, y0 + (y1 - y0) * t)
			})
			.collect()
	}

	fn curved_sweep(&self, index: usize, width: f64, height: f64) -> Vec<(f64, f64)> {
		let (cx, cy) = (width / 2.0, height / 2.0);
		let radius = width.min(height) * (0.25 + 0.06 * (index % 4) as f64);
		let start = index as f64 * 0.7;
		let sweep = 1.5 * PI;
		let n = ((radius * sweep / self.spacing()).floor() as usize).max(3) + 1;
		(0..n)
			.map(|i| {
				let a = start + sweep * i as f64 / (n - 1) as f64;
				(cx + radius * a.cos(), cy + radius * a.sin())
			})
			.collect()
	}

	fn branch_path(&self, id: usize, index: usize, width: f64, height: f64) -> Path {
		let (cols, rows) = (
			self.cfg.branch_grid_cols.max(1),
			self.cfg.branch_grid_rows.max(1),
		);
		let cell = index % (cols * rows);
		let (col, row) = (cell % cols, cell / cols);
		let sx = (col as f64 + 0.5) * width / cols as f64;
		let sy = (row as f64 + 0.5) * height / rows as f64;

		let angle = (index as f64 * 60.0).to_radians();
		let length = if self.mobile {
			self.cfg.branch_length_mobile
		} else {
			self.cfg.branch_length
		};
		let n = self.cfg.branch_node_count.max(2);
		let nodes = (0..n)
			.map(|i| {
				let t = i as f64 / (n - 1) as f64;
				Node {
					id: i,
					x: sx + angle.cos() * length * t,
					y: sy + angle.sin() * length * t,
					active: false,
					intensity: 0.0,
					pulse_phase: pulse_phase(i),
					connection_strength: 0.6 + 0.4 * (angle + i as f64 * 0.5).cos().abs(),
				}
			})
			.collect();
		self.assemble(
			id,
			nodes,
			classify(angle),
			PathKind::Branch,
			self.cfg.branch_speed,
		)
	}

	fn assemble(
		&self,
		id: usize,
		nodes: Vec<Node>,
		direction: Direction,
		kind: PathKind,
		speed: f64,
	) -> Path {
		let n = nodes.len();
		let (segment_length, width_scale, opacity, glow) = match kind {
			PathKind::Main => (
				self.cfg.main_segment_length,
				1.0,
				self.cfg.main_opacity,
				self.cfg.main_glow,
			),
			PathKind::Branch => (
				self.cfg.branch_segment_length,
				0.6,
				self.cfg.branch_opacity,
				self.cfg.branch_glow,
			),
		};
		let segment_length = segment_length.clamp(1, n.max(1));
		let active_segment = match n.checked_sub(segment_length) {
			Some(span) if span > 0 => (id % span) as f64,
			_ => 0.0,
		};
		Path {
			id,
			nodes,
			direction,
			kind,
			speed,
			color: PALETTE[id % PALETTE.len()],
			stroke_width: self.settings.stroke_width * width_scale,
			active_segment,
			segment_length,
			opacity,
			glow_intensity: glow,
			layer: (id % self.settings.layers.max(1) as usize) as u8,
		}
	}
}

/// Derived from the node's sequence index so initial visibility is stable across loads.
fn pulse_phase(i: usize) -> f64 {
	(i as f64 * 0.5) % TAU
}

fn classify(angle: f64) -> Direction {
	let (dx, dy) = (angle.cos().abs(), angle.sin().abs());
	if dy < 1e-6 {
		Direction::Horizontal
	} else if dx < 1e-6 {
		Direction::Vertical
	} else {
		Direction::Diagonal
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::fiber_background::types::QualityTier;

	fn generate(width: f64, height: f64, count: usize, mobile: bool) -> Vec<Path> {
		let cfg = GeneratorConfig::default();
		PathGenerator::new(&cfg, QualityTier::High.settings(), mobile)
			.generate(width, height, count)
	}

	#[test]
	fn desktop_hd_splits_seven_three() {
		let paths = generate(1920.0, 1080.0, 10, false);
		assert_eq!(paths.len(), 10);
		let main = paths.iter().filter(|p| p.is_main()).count();
		assert_eq!((main, paths.len() - main), (7, 3));
	}

	#[test]
	fn single_path_is_main() {
		assert_eq!(split_count(0.7, 1), (1, 0));
		assert_eq!(split_count(0.7, 0), (0, 0));
		assert_eq!(split_count(0.7, 3), (2, 1));
	}

	#[test]
	fn invalid_input_yields_nothing() {
		assert!(generate(1920.0, 1080.0, 0, false).is_empty());
		assert!(generate(0.0, 1080.0, 10, false).is_empty());
		assert!(generate(1920.0, -5.0, 10, false).is_empty());
		assert!(generate(f64::NAN, 1080.0, 10, false).is_empty());
	}

	#[test]
	fn active_segment_starts_in_bounds() {
		for &(w, h) in &[(1920.0, 1080.0), (375.0, 812.0), (10.0, 10.0)] {
			for p in generate(w, h, 24, w < 800.0) {
				assert!(p.node_count() >= 2);
				assert!(p.active_segment >= 0.0);
				assert!(p.active_segment < p.node_count() as f64);
			}
		}
	}

	#[test]
	fn regeneration_is_deterministic() {
		let a = generate(1280.0, 720.0, 14, false);
		let b = generate(1280.0, 720.0, 14, false);
		assert_eq!(a, b);
		let starts: Vec<f64> = a.iter().map(|p| p.active_segment).collect();
		assert!(starts.iter().any(|&s| s > 0.0), "paths should not all start at 0");
	}

	#[test]
	fn layouts_cycle_through_three_sweeps() {
		let paths = generate(1920.0, 1080.0, 10, false);
		let dirs: Vec<Direction> = paths.iter().take(3).map(|p| p.direction).collect();
		assert_eq!(
			dirs,
			vec![Direction::Horizontal, Direction::Diagonal, Direction::Curved]
		);
	}

	#[test]
	fn mobile_spacing_is_sparser() {
		let desktop = generate(1200.0, 800.0, 1, false);
		let mobile = generate(1200.0, 800.0, 1, true);
		assert!(mobile[0].node_count() < desktop[0].node_count());
	}

	#[test]
	fn branches_are_short_and_fixed_size() {
		let cfg = GeneratorConfig::default();
		for p in generate(1920.0, 1080.0, 20, false)
			.iter()
			.filter(|p| !p.is_main())
		{
			assert_eq!(p.node_count(), cfg.branch_node_count);
			let (first, last) = (&p.nodes[0], &p.nodes[p.node_count() - 1]);
			let len = (last.x - first.x).hypot(last.y - first.y);
			assert!((len - cfg.branch_length).abs() < 1e-6);
		}
	}

	#[test]
	fn node_weights_stay_in_unit_range() {
		for p in generate(1920.0, 1080.0, 18, false) {
			for n in &p.nodes {
				assert!((0.0..=1.0).contains(&n.connection_strength));
				assert!((0.0..TAU).contains(&n.pulse_phase));
			}
		}
	}
}
