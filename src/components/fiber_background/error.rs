use thiserror::Error;

/// Failures local to generation, animation and persistence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FiberError {
	#[error("path {path} has no nodes")]
	EmptyPath { path: usize },

	#[error("path {path} has a non-finite active segment ({value})")]
	CorruptSegment { path: usize, value: f64 },

	#[error("unknown quality tier: {0:?}")]
	UnknownQuality(String),

	#[error("storage unavailable: {0}")]
	Storage(String),
}

/// Failures raised while painting a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
	#[error("drawing surface rejected {op}: {message}")]
	Surface { op: &'static str, message: String },

	#[error("webgl: {0}")]
	WebGl(String),
}

impl RenderError {
	pub fn surface(op: &'static str, err: impl std::fmt::Debug) -> Self {
		RenderError::Surface {
			op,
			message: format!("{err:?}"),
		}
	}
}
