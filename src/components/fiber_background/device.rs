//! One-shot heuristic snapshot of the client device.
//!
//! [`DeviceSignals::probe`] reads the raw browser hints; [`DeviceCapabilities::classify`]
//! turns them into the snapshot the rest of the background works from. Classification is
//! pure so it can be exercised off-browser.

use log::debug;
use wasm_bindgen::{JsCast, JsValue};

use super::types::QualityTier;

const DESKTOP_RAM_GB: f64 = 8.0;
const IOS_RAM_GB: f64 = 4.0;
const ANDROID_RAM_GB: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
	Mobile,
	Tablet,
	Desktop,
}

/// Raw hints gathered from the host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceSignals {
	pub user_agent: String,
	/// `navigator.deviceMemory`, when the browser exposes it.
	pub device_memory: Option<f64>,
	pub max_touch_points: i32,
	pub webgl: bool,
	pub reduced_motion: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DeviceCapabilities {
	pub class: DeviceClass,
	pub ram_gb: f64,
	pub legacy_browser: bool,
	pub webgl: bool,
	pub reduced_motion: bool,
	pub touch: bool,
}

impl DeviceCapabilities {
	pub fn classify(signals: &DeviceSignals) -> Self {
		let ua = signals.user_agent.as_str();
		let class = device_class(ua, signals.max_touch_points);
		let ram_gb = signals
			.device_memory
			.filter(|m| m.is_finite() && *m > 0.0)
			.unwrap_or_else(|| estimated_ram(ua, class, signals.max_touch_points));
		Self {
			class,
			ram_gb,
			legacy_browser: is_legacy_browser(ua),
			webgl: signals.webgl,
			reduced_motion: signals.reduced_motion,
			touch: signals.max_touch_points > 0,
		}
	}

	/// Phones and tablets share the sparser layouts and the lower FPS floor.
	pub fn is_handheld(&self) -> bool {
		self.class != DeviceClass::Desktop
	}

	pub fn default_tier(&self) -> QualityTier {
		if self.reduced_motion {
			QualityTier::Static
		} else if self.legacy_browser || self.ram_gb <= 2.0 {
			QualityTier::Low
		} else if self.is_handheld() || self.ram_gb < DESKTOP_RAM_GB {
			QualityTier::Medium
		} else {
			QualityTier::High
		}
	}

	/// Path count at the `high` tier.
	pub fn optimal_path_count(&self) -> usize {
		let count = match self.class {
			DeviceClass::Mobile => 6,
			DeviceClass::Tablet => 8,
			DeviceClass::Desktop if self.ram_gb < 4.0 => 10,
			DeviceClass::Desktop if self.ram_gb < 8.0 => 14,
			DeviceClass::Desktop => 18,
		};
		if self.legacy_browser { count.min(8) } else { count }
	}
}

fn device_class(ua: &str, max_touch_points: i32) -> DeviceClass {
	const PHONES: &[&str] = &[
		"iPhone",
		"iPod",
		"IEMobile",
		"Windows Phone",
		"Opera Mini",
		"BlackBerry",
		"webOS",
	];
	if ua.contains("iPad") || ua.contains("Tablet") || ua.contains("Silk/") {
		return DeviceClass::Tablet;
	}
	if ua.contains("Android") {
		return if ua.contains("Mobile") {
			DeviceClass::Mobile
		} else {
			DeviceClass::Tablet
		};
	}
	if PHONES.iter().any(|p| ua.contains(p)) {
		return DeviceClass::Mobile;
	}
	// iPadOS reports a desktop Safari user agent.
	if ua.contains("Macintosh") && max_touch_points > 1 {
		return DeviceClass::Tablet;
	}
	DeviceClass::Desktop
}

fn estimated_ram(ua: &str, class: DeviceClass, max_touch_points: i32) -> f64 {
	let ios = ["iPhone", "iPad", "iPod"].iter().any(|p| ua.contains(p))
		|| (ua.contains("Macintosh") && max_touch_points > 1);
	if ios {
		IOS_RAM_GB
	} else if ua.contains("Android") || class != DeviceClass::Desktop {
		ANDROID_RAM_GB
	} else {
		DESKTOP_RAM_GB
	}
}

/// Major version number directly following `token`, e.g. `Chrome/` in `Chrome/118.0`.
fn major_version(ua: &str, token: &str) -> Option<u32> {
	let start = ua.find(token)? + token.len();
	let digits: String = ua[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
	digits.parse().ok()
}

fn is_legacy_browser(ua: &str) -> bool {
	if ua.contains("MSIE ") || ua.contains("Trident/") || ua.contains("Edge/") {
		return true;
	}
	if let Some(v) = major_version(ua, "Firefox/") {
		return v < 60;
	}
	if let Some(v) = major_version(ua, "Chrome/") {
		return v < 60;
	}
	if ua.contains("Safari/") {
		if let Some(v) = major_version(ua, "Version/") {
			return v < 12;
		}
	}
	false
}

impl DeviceSignals {
	/// Reads hints from the browser. Anything unavailable falls back to its default; a
	/// failing WebGL probe reads as unsupported.
	pub fn probe() -> Self {
		let Some(window) = web_sys::window() else {
			return Self::default();
		};
		let navigator = window.navigator();
		let device_memory = js_sys::Reflect::get(&navigator, &JsValue::from_str("deviceMemory"))
			.ok()
			.and_then(|v| v.as_f64());
		let reduced_motion = window
			.match_media("(prefers-reduced-motion: reduce)")
			.ok()
			.flatten()
			.is_some_and(|mql| mql.matches());
		let signals = Self {
			user_agent: navigator.user_agent().unwrap_or_default(),
			device_memory,
			max_touch_points: navigator.max_touch_points(),
			webgl: probe_webgl(&window),
			reduced_motion,
		};
		debug!("device signals: {signals:?}");
		signals
	}
}

fn probe_webgl(window: &web_sys::Window) -> bool {
	let Some(canvas) = window
		.document()
		.and_then(|d| d.create_element("canvas").ok())
		.and_then(|e| e.dyn_into::<web_sys::HtmlCanvasElement>().ok())
	else {
		return false;
	};
	["webgl2", "webgl"]
		.iter()
		.any(|kind| matches!(canvas.get_context(kind), Ok(Some(_))))
}

#[cfg(test)]
mod tests {
	use super::*;

	const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
	const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
	const ANDROID_PHONE: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Mobile Safari/537.36";
	const ANDROID_TABLET: &str = "Mozilla/5.0 (Linux; Android 12; SM-X700) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
	const IE11: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko";
	const OLD_SAFARI: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_6) AppleWebKit/603.3.8 (KHTML, like Gecko) Version/10.1.2 Safari/603.3.8";
	const OLD_FIREFOX: &str = "Mozilla/5.0 (Windows NT 6.1; rv:52.0) Gecko/20100101 Firefox/52.0";

	fn caps(ua: &str) -> DeviceCapabilities {
		DeviceCapabilities::classify(&DeviceSignals {
			user_agent: ua.into(),
			webgl: true,
			..Default::default()
		})
	}

	#[test]
	fn classifies_device_families() {
		assert_eq!(caps(CHROME_DESKTOP).class, DeviceClass::Desktop);
		assert_eq!(caps(IPHONE).class, DeviceClass::Mobile);
		assert_eq!(caps(ANDROID_PHONE).class, DeviceClass::Mobile);
		assert_eq!(caps(ANDROID_TABLET).class, DeviceClass::Tablet);
		let ipados = DeviceCapabilities::classify(&DeviceSignals {
			user_agent: OLD_SAFARI
				.replace("10_12_6", "10_15_7")
				.replace("Version/10.1.2", "Version/17.0"),
			max_touch_points: 5,
			..Default::default()
		});
		assert_eq!(ipados.class, DeviceClass::Tablet);
		assert!(ipados.touch);
	}

	#[test]
	fn ram_prefers_hint_then_platform() {
		assert_eq!(caps(CHROME_DESKTOP).ram_gb, DESKTOP_RAM_GB);
		assert_eq!(caps(IPHONE).ram_gb, IOS_RAM_GB);
		assert_eq!(caps(ANDROID_PHONE).ram_gb, ANDROID_RAM_GB);
		let hinted = DeviceCapabilities::classify(&DeviceSignals {
			user_agent: CHROME_DESKTOP.into(),
			device_memory: Some(4.0),
			..Default::default()
		});
		assert_eq!(hinted.ram_gb, 4.0);
	}

	#[test]
	fn flags_legacy_browsers() {
		assert!(caps(IE11).legacy_browser);
		assert!(caps(OLD_SAFARI).legacy_browser);
		assert!(caps(OLD_FIREFOX).legacy_browser);
		assert!(!caps(CHROME_DESKTOP).legacy_browser);
		assert!(!caps(IPHONE).legacy_browser);
	}

	#[test]
	fn default_tier_follows_constraints() {
		assert_eq!(caps(CHROME_DESKTOP).default_tier(), QualityTier::High);
		assert_eq!(caps(IPHONE).default_tier(), QualityTier::Medium);
		assert_eq!(caps(ANDROID_PHONE).default_tier(), QualityTier::Low);
		assert_eq!(caps(IE11).default_tier(), QualityTier::Low);
		let reduced = DeviceCapabilities {
			reduced_motion: true,
			..caps(CHROME_DESKTOP)
		};
		assert_eq!(reduced.default_tier(), QualityTier::Static);
	}

	#[test]
	fn path_count_scales_with_device() {
		let phone = caps(IPHONE).optimal_path_count();
		let tablet = caps(ANDROID_TABLET).optimal_path_count();
		let desktop = caps(CHROME_DESKTOP).optimal_path_count();
		assert!(phone < tablet && tablet < desktop);
		let big = DeviceCapabilities {
			ram_gb: 2.0,
			..caps(CHROME_DESKTOP)
		};
		assert!(big.optimal_path_count() < desktop);
	}

	#[test]
	fn version_parsing() {
		assert_eq!(major_version(CHROME_DESKTOP, "Chrome/"), Some(120));
		assert_eq!(major_version(CHROME_DESKTOP, "Firefox/"), None);
	}
}
