//! Optional WebGL2 layer drawn above the 2D canvas on capable desktops.
//!
//! The core renderer never talks to WebGL directly. It holds a `Box<dyn Enhancement>`
//! which is [`NoEnhancement`] until [`create_enhancement`] decides the device and the
//! current tier can afford more.

use log::{info, warn};
use wasm_bindgen::JsCast;
use web_sys::{
	HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
	WebGlUniformLocation, WebGlVertexArrayObject,
};

use super::device::{DeviceCapabilities, DeviceClass};
use super::error::RenderError;
use super::types::{Path, QualityTier};

const FADE_IN_MS: f64 = 800.0;
const MIN_RAM_GB: f64 = 8.0;
/// x, y, intensity
const FLOATS_PER_VERTEX: usize = 3;

const VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec2 a_pos;
layout(location = 1) in float a_intensity;
uniform vec2 u_resolution;
uniform float u_time;
uniform float u_mode;
out float v_intensity;
void main() {
	vec2 clip = (a_pos / u_resolution) * 2.0 - 1.0;
	gl_Position = vec4(clip.x, -clip.y, 0.0, 1.0);
	float shimmer = 0.85 + 0.15 * sin(u_time * 0.002 + a_pos.x * 0.01);
	v_intensity = a_intensity * shimmer;
	gl_PointSize = u_mode > 0.5 ? 4.0 + 10.0 * a_intensity : 1.0;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
uniform float u_mode;
uniform float u_fade;
in float v_intensity;
out vec4 color;
void main() {
	float a = v_intensity;
	if (u_mode > 0.5) {
		a *= smoothstep(0.5, 0.0, length(gl_PointCoord - vec2(0.5)));
	}
	vec3 tint = mix(vec3(0.0, 0.6, 1.0), vec3(0.85, 0.95, 1.0), v_intensity);
	color = vec4(tint * a, a) * u_fade;
}
"#;

/// A renderer layered above the canvas fibers.
pub trait Enhancement {
	fn is_active(&self) -> bool;
	fn resize(&mut self, width: f64, height: f64);
	/// `delta` drives the cross-fade in, milliseconds.
	fn render(&mut self, paths: &[Path], time: f64, delta: f64) -> Result<(), RenderError>;
	/// Wipes anything left on screen before the layer is dropped.
	fn clear(&mut self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoEnhancement;

impl Enhancement for NoEnhancement {
	fn is_active(&self) -> bool {
		false
	}

	fn resize(&mut self, _width: f64, _height: f64) {}

	fn render(&mut self, _paths: &[Path], _time: f64, _delta: f64) -> Result<(), RenderError> {
		Ok(())
	}
}

/// Desktop only, WebGL available, modern browser, plenty of RAM, top tier, and only once
/// the user has interacted with the page.
pub fn enhancement_allowed(caps: &DeviceCapabilities, tier: QualityTier, interacted: bool) -> bool {
	interacted
		&& tier == QualityTier::High
		&& caps.class == DeviceClass::Desktop
		&& caps.webgl
		&& !caps.legacy_browser
		&& !caps.reduced_motion
		&& caps.ram_gb >= MIN_RAM_GB
}

pub fn create_enhancement(
	caps: &DeviceCapabilities,
	tier: QualityTier,
	interacted: bool,
	canvas: Option<&HtmlCanvasElement>,
) -> Box<dyn Enhancement> {
	if !enhancement_allowed(caps, tier, interacted) {
		return Box::new(NoEnhancement);
	}
	let Some(canvas) = canvas else {
		return Box::new(NoEnhancement);
	};
	match WebGlEnhancement::new(canvas) {
		Ok(layer) => {
			info!("webgl enhancement enabled");
			Box::new(layer)
		}
		Err(err) => {
			warn!("webgl enhancement unavailable: {err}");
			Box::new(NoEnhancement)
		}
	}
}

pub struct WebGlEnhancement {
	gl: GL,
	program: WebGlProgram,
	vao: WebGlVertexArrayObject,
	buffer: WebGlBuffer,
	u_resolution: Option<WebGlUniformLocation>,
	u_time: Option<WebGlUniformLocation>,
	u_mode: Option<WebGlUniformLocation>,
	u_fade: Option<WebGlUniformLocation>,
	width: f64,
	height: f64,
	fade: f64,
	vertices: Vec<f32>,
}

impl WebGlEnhancement {
	pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, RenderError> {
		let gl: GL = canvas
			.get_context("webgl2")
			.map_err(|e| RenderError::WebGl(format!("{e:?}")))?
			.ok_or_else(|| RenderError::WebGl("WebGL2 not supported".into()))?
			.dyn_into()
			.map_err(|_| RenderError::WebGl("context is not WebGL2".into()))?;

		let vs = compile_shader(&gl, GL::VERTEX_SHADER, VERTEX_SHADER)?;
		let fs = compile_shader(&gl, GL::FRAGMENT_SHADER, FRAGMENT_SHADER)?;
		let program = link_program(&gl, &vs, &fs)?;

		let vao = gl
			.create_vertex_array()
			.ok_or_else(|| RenderError::WebGl("create_vertex_array failed".into()))?;
		let buffer = gl
			.create_buffer()
			.ok_or_else(|| RenderError::WebGl("create_buffer failed".into()))?;
		gl.bind_vertex_array(Some(&vao));
		gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
		let stride = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;
		gl.vertex_attrib_pointer_with_i32(0, 2, GL::FLOAT, false, stride, 0);
		gl.enable_vertex_attrib_array(0);
		gl.vertex_attrib_pointer_with_i32(1, 1, GL::FLOAT, false, stride, 8);
		gl.enable_vertex_attrib_array(1);
		gl.bind_vertex_array(None);

		gl.enable(GL::BLEND);
		gl.blend_func(GL::SRC_ALPHA, GL::ONE);

		Ok(Self {
			u_resolution: gl.get_uniform_location(&program, "u_resolution"),
			u_time: gl.get_uniform_location(&program, "u_time"),
			u_mode: gl.get_uniform_location(&program, "u_mode"),
			u_fade: gl.get_uniform_location(&program, "u_fade"),
			width: canvas.width() as f64,
			height: canvas.height() as f64,
			gl,
			program,
			vao,
			buffer,
			fade: 0.0,
			vertices: Vec::new(),
		})
	}

	/// Lines first, then one point sprite per lit node. Returns the line vertex count.
	fn fill_vertices(&mut self, paths: &[Path]) -> i32 {
		self.vertices.clear();
		for path in paths {
			let lit: Vec<_> = path.active_nodes().collect();
			for pair in lit.windows(2) {
				for n in pair {
					self.vertices
						.extend_from_slice(&[
							n.x as f32,
							n.y as f32,
							(n.intensity * path.opacity) as f32,
						]);
				}
			}
		}
		let lines = (self.vertices.len() / FLOATS_PER_VERTEX) as i32;
		for path in paths {
			for n in path.active_nodes() {
				self.vertices.extend_from_slice(&[n.x as f32, n.y as f32, n.intensity as f32]);
			}
		}
		lines
	}
}

impl Enhancement for WebGlEnhancement {
	fn is_active(&self) -> bool {
		true
	}

	fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.gl.viewport(0, 0, width as i32, height as i32);
	}

	fn render(&mut self, paths: &[Path], time: f64, delta: f64) -> Result<(), RenderError> {
		self.fade = (self.fade + delta.max(0.0) / FADE_IN_MS).min(1.0);
		let line_vertices = self.fill_vertices(paths);
		let total = (self.vertices.len() / FLOATS_PER_VERTEX) as i32;

		let gl = &self.gl;
		gl.clear_color(0.0, 0.0, 0.0, 0.0);
		gl.clear(GL::COLOR_BUFFER_BIT);
		if total == 0 {
			return Ok(());
		}

		gl.use_program(Some(&self.program));
		gl.bind_vertex_array(Some(&self.vao));
		gl.bind_buffer(GL::ARRAY_BUFFER, Some(&self.buffer));
		let data = js_sys::Float32Array::from(self.vertices.as_slice());
		gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &data, GL::DYNAMIC_DRAW);

		gl.uniform2f(self.u_resolution.as_ref(), self.width as f32, self.height as f32);
		gl.uniform1f(self.u_time.as_ref(), time as f32);
		gl.uniform1f(self.u_fade.as_ref(), self.fade as f32);

		gl.uniform1f(self.u_mode.as_ref(), 0.0);
		gl.draw_arrays(GL::LINES, 0, line_vertices);
		gl.uniform1f(self.u_mode.as_ref(), 1.0);
		gl.draw_arrays(GL::POINTS, line_vertices, total - line_vertices);
		gl.bind_vertex_array(None);

		match gl.get_error() {
			GL::NO_ERROR => Ok(()),
			code => Err(RenderError::WebGl(format!("draw failed with error 0x{code:x}"))),
		}
	}

	fn clear(&mut self) {
		self.gl.clear_color(0.0, 0.0, 0.0, 0.0);
		self.gl.clear(GL::COLOR_BUFFER_BIT);
	}
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, RenderError> {
	let shader = gl
		.create_shader(kind)
		.ok_or_else(|| RenderError::WebGl("create_shader failed".into()))?;
	gl.shader_source(&shader, source);
	gl.compile_shader(&shader);
	if gl
		.get_shader_parameter(&shader, GL::COMPILE_STATUS)
		.as_bool()
		.unwrap_or(false)
	{
		Ok(shader)
	} else {
		Err(RenderError::WebGl(
			gl.get_shader_info_log(&shader)
				.unwrap_or_else(|| "shader compile failed".into()),
		))
	}
}

fn link_program(gl: &GL, vs: &WebGlShader, fs: &WebGlShader) -> Result<WebGlProgram, RenderError> {
	let program = gl
		.create_program()
		.ok_or_else(|| RenderError::WebGl("create_program failed".into()))?;
	gl.attach_shader(&program, vs);
	gl.attach_shader(&program, fs);
	gl.link_program(&program);
	if gl
		.get_program_parameter(&program, GL::LINK_STATUS)
		.as_bool()
		.unwrap_or(false)
	{
		Ok(program)
	} else {
		Err(RenderError::WebGl(
			gl.get_program_info_log(&program)
				.unwrap_or_else(|| "program link failed".into()),
		))
	}
}
