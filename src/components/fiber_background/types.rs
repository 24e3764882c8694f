use std::fmt;
use std::str::FromStr;

/// One point along a fiber path.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: usize,
	pub x: f64,
	pub y: f64,
	pub active: bool,
	/// Brightness in `[0, 1]`.
	pub intensity: f64,
	/// Fixed per node, radians.
	pub pulse_phase: f64,
	/// Static brightness weight in `[0, 1]`.
	pub connection_strength: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
	Horizontal,
	Vertical,
	Diagonal,
	Curved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
	Main,
	Branch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
	pub fn rgba(self, alpha: f64) -> String {
		format!(
			"rgba({}, {}, {}, {:.3})",
			self.0,
			self.1,
			self.2,
			alpha.clamp(0.0, 1.0)
		)
	}
}

/// A generated fiber: an ordered node sequence plus its motion and render parameters.
///
/// `active_segment` is the leading edge of the lit window and always satisfies
/// `0 <= active_segment < nodes.len()` for non-empty paths.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
	pub id: usize,
	pub nodes: Vec<Node>,
	pub direction: Direction,
	pub kind: PathKind,
	pub speed: f64,
	pub color: Rgb,
	pub stroke_width: f64,
	pub active_segment: f64,
	pub segment_length: usize,
	pub opacity: f64,
	pub glow_intensity: f64,
	pub layer: u8,
}

impl Path {
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_main(&self) -> bool {
		self.kind == PathKind::Main
	}

	pub fn active_nodes(&self) -> impl Iterator<Item = &Node> {
		self.nodes.iter().filter(|n| n.active && n.intensity > 0.0)
	}
}

/// Named bundle of rendering cost settings, ordered from most to least expensive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
	#[default]
	High,
	Medium,
	Low,
	Static,
}

impl QualityTier {
	pub const ALL: [QualityTier; 4] = [
		QualityTier::High,
		QualityTier::Medium,
		QualityTier::Low,
		QualityTier::Static,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			QualityTier::High => "high",
			QualityTier::Medium => "medium",
			QualityTier::Low => "low",
			QualityTier::Static => "static",
		}
	}

	/// One level cheaper. Mobile devices skip `medium` when leaving `high`.
	pub fn step_down(self, mobile: bool) -> Self {
		match self {
			QualityTier::High if mobile => QualityTier::Low,
			QualityTier::High => QualityTier::Medium,
			QualityTier::Medium => QualityTier::Low,
			QualityTier::Low | QualityTier::Static => QualityTier::Static,
		}
	}

	pub fn is_animated(self) -> bool {
		self != QualityTier::Static
	}
}

impl fmt::Display for QualityTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for QualityTier {
	type Err = super::error::FiberError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"high" => Ok(QualityTier::High),
			"medium" => Ok(QualityTier::Medium),
			"low" => Ok(QualityTier::Low),
			"static" => Ok(QualityTier::Static),
			other => Err(super::error::FiberError::UnknownQuality(other.to_string())),
		}
	}
}
