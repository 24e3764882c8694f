use std::f64::consts::PI;

use log::{error, warn};
use web_sys::CanvasRenderingContext2d;

use super::config::RenderConfig;
use super::error::RenderError;
use super::types::{Node, Path};

/// The subset of a 2D canvas context the fiber renderer draws with.
pub trait FiberSurface {
	fn set_fill_style(&self, style: &str);
	fn set_stroke_style(&self, style: &str);
	fn set_line_width(&self, width: f64);
	fn set_line_cap(&self, cap: &str);
	fn set_shadow(&self, blur: f64, color: &str);
	fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64);
	fn begin_path(&self);
	fn move_to(&self, x: f64, y: f64);
	fn line_to(&self, x: f64, y: f64);
	fn arc(&self, x: f64, y: f64, radius: f64) -> Result<(), RenderError>;
	fn stroke(&self);
	fn fill(&self);
}

impl FiberSurface for CanvasRenderingContext2d {
	fn set_fill_style(&self, style: &str) {
		self.set_fill_style_str(style);
	}

	fn set_stroke_style(&self, style: &str) {
		self.set_stroke_style_str(style);
	}

	fn set_line_width(&self, width: f64) {
		CanvasRenderingContext2d::set_line_width(self, width);
	}

	fn set_line_cap(&self, cap: &str) {
		CanvasRenderingContext2d::set_line_cap(self, cap);
	}

	fn set_shadow(&self, blur: f64, color: &str) {
		self.set_shadow_blur(blur);
		self.set_shadow_color(color);
	}

	fn fill_rect(&self, x: f64, y: f64, w: f64, h: f64) {
		CanvasRenderingContext2d::fill_rect(self, x, y, w, h);
	}

	fn begin_path(&self) {
		CanvasRenderingContext2d::begin_path(self);
	}

	fn move_to(&self, x: f64, y: f64) {
		CanvasRenderingContext2d::move_to(self, x, y);
	}

	fn line_to(&self, x: f64, y: f64) {
		CanvasRenderingContext2d::line_to(self, x, y);
	}

	fn arc(&self, x: f64, y: f64, radius: f64) -> Result<(), RenderError> {
		CanvasRenderingContext2d::arc(self, x, y, radius.max(0.0), 0.0, 2.0 * PI)
			.map_err(|e| RenderError::surface("arc", e))
	}

	fn stroke(&self) {
		CanvasRenderingContext2d::stroke(self);
	}

	fn fill(&self) {
		CanvasRenderingContext2d::fill(self);
	}
}

/// Per-frame render parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderFrame {
	pub width: f64,
	pub height: f64,
	/// Animation clock, milliseconds.
	pub time: f64,
	pub mobile: bool,
	pub glow_passes: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
	pub paths_drawn: usize,
	pub nodes_drawn: usize,
}

struct StrokePass {
	width: f64,
	alpha: f64,
	blur: f64,
	white: bool,
}

/// Paints one frame: a translucent black wash for the motion trail, then every path
/// back to front.
pub fn render_frame<S: FiberSurface + ?Sized>(
	paths: &[Path],
	surface: &S,
	frame: &RenderFrame,
	cfg: &RenderConfig,
) -> Result<RenderStats, RenderError> {
	surface.set_shadow(0.0, "transparent");
	surface.set_fill_style(&format!("rgba(0, 0, 0, {})", cfg.trail_alpha));
	surface.fill_rect(0.0, 0.0, frame.width, frame.height);
	surface.set_line_cap("round");

	let mut ordered: Vec<&Path> = paths.iter().collect();
	ordered.sort_by_key(|p| p.layer);

	let mut stats = RenderStats::default();
	for path in ordered {
		let lit: Vec<&Node> = path.active_nodes().collect();
		if lit.len() < 2 {
			continue;
		}
		for pass in stroke_passes(path, frame, cfg) {
			let color = if pass.white {
				format!("rgba(255, 255, 255, {:.3})", pass.alpha.clamp(0.0, 1.0))
			} else {
				path.color.rgba(pass.alpha)
			};
			surface.set_shadow(pass.blur, &path.color.rgba(1.0));
			surface.set_stroke_style(&color);
			surface.set_line_width(pass.width);
			surface.begin_path();
			surface.move_to(lit[0].x, lit[0].y);
			for node in &lit[1..] {
				surface.line_to(node.x, node.y);
			}
			surface.stroke();
		}
		draw_nodes(path, &lit, surface, frame, cfg)?;
		stats.paths_drawn += 1;
		stats.nodes_drawn += lit.len();
	}
	surface.set_shadow(0.0, "transparent");
	Ok(stats)
}

fn stroke_passes(path: &Path, frame: &RenderFrame, cfg: &RenderConfig) -> Vec<StrokePass> {
	let blur_scale = if frame.mobile { cfg.mobile_blur_scale } else { 1.0 };
	let (w, glow) = (path.stroke_width, path.opacity * path.glow_intensity);
	let mut passes = Vec::with_capacity(4);
	if frame.glow_passes >= 2 {
		passes.push(StrokePass {
			width: w * 6.0,
			alpha: glow * 0.12,
			blur: cfg.outer_blur * blur_scale,
			white: false,
		});
	}
	if frame.glow_passes >= 3 && !frame.mobile {
		passes.push(StrokePass {
			width: w * 3.0,
			alpha: glow * 0.3,
			blur: cfg.middle_blur,
			white: false,
		});
	}
	passes.push(StrokePass {
		width: w,
		alpha: path.opacity,
		blur: cfg.core_blur * blur_scale,
		white: false,
	});
	if path.is_main() {
		passes.push(StrokePass {
			width: (w * 0.4).max(0.5),
			alpha: path.opacity * 0.8,
			blur: 0.0,
			white: true,
		});
	}
	passes
}

fn draw_nodes<S: FiberSurface + ?Sized>(
	path: &Path,
	lit: &[&Node],
	surface: &S,
	frame: &RenderFrame,
	cfg: &RenderConfig,
) -> Result<(), RenderError> {
	let blur_scale = if frame.mobile { cfg.mobile_blur_scale } else { 1.0 };
	for node in lit {
		let pulse = 1.0 + 0.3 * (frame.time * cfg.halo_frequency + node.pulse_phase).sin();
		surface.set_shadow(0.0, "transparent");
		surface.set_fill_style(&path.color.rgba(node.intensity * path.opacity * 0.25));
		surface.begin_path();
		surface.arc(node.x, node.y, cfg.halo_radius * (0.6 + node.intensity) * pulse)?;
		surface.fill();

		surface.set_shadow(cfg.core_blur * blur_scale, &path.color.rgba(1.0));
		surface.set_fill_style(&format!(
			"rgba(255, 255, 255, {:.3})",
			(node.intensity * node.connection_strength).clamp(0.0, 1.0)
		));
		surface.begin_path();
		surface.arc(node.x, node.y, cfg.dot_radius * (1.0 + 0.5 * node.intensity))?;
		surface.fill();
	}
	Ok(())
}

/// Tracks render failures. The first ones are logged and tolerated; reaching the limit
/// flags the renderer as failed so the host can fall back to a static background.
#[derive(Clone, Debug)]
pub struct RenderHealth {
	limit: u32,
	failures: u32,
	failed: bool,
}

impl RenderHealth {
	pub fn new(limit: u32) -> Self {
		Self {
			limit: limit.max(1),
			failures: 0,
			failed: false,
		}
	}

	pub fn record<T>(&mut self, result: Result<T, RenderError>) -> Option<T> {
		match result {
			Ok(v) => Some(v),
			Err(err) => {
				self.failures += 1;
				warn!("frame render failed ({}/{}): {err}", self.failures, self.limit);
				if self.failures >= self.limit && !self.failed {
					error!("fiber renderer disabled after {} failures", self.failures);
					self.failed = true;
				}
				None
			}
		}
	}

	pub fn has_failed(&self) -> bool {
		self.failed
	}
}
