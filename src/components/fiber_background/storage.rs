use log::warn;

use super::error::FiberError;
use super::types::QualityTier;

pub const QUALITY_STORAGE_KEY: &str = "fiber-background.quality";

/// Where the user's quality choice survives between visits.
pub trait QualityStore {
	fn load(&self) -> Option<QualityTier>;
	fn save(&mut self, tier: QualityTier) -> Result<(), FiberError>;
}

/// Browser `localStorage`, a single string value under [`QUALITY_STORAGE_KEY`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalQualityStore;

fn local_storage() -> Option<web_sys::Storage> {
	web_sys::window().and_then(|w| w.local_storage().ok().flatten())
}

impl QualityStore for LocalQualityStore {
	fn load(&self) -> Option<QualityTier> {
		let raw = local_storage()?.get_item(QUALITY_STORAGE_KEY).ok().flatten()?;
		match raw.parse() {
			Ok(tier) => Some(tier),
			Err(err) => {
				warn!("ignoring saved quality: {err}");
				None
			}
		}
	}

	fn save(&mut self, tier: QualityTier) -> Result<(), FiberError> {
		let storage = local_storage().ok_or_else(|| FiberError::Storage("no localStorage".into()))?;
		storage
			.set_item(QUALITY_STORAGE_KEY, tier.as_str())
			.map_err(|e| FiberError::Storage(format!("{e:?}")))
	}
}

/// In-process store for hosts without persistent storage.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryQualityStore {
	value: Option<QualityTier>,
}

impl QualityStore for MemoryQualityStore {
	fn load(&self) -> Option<QualityTier> {
		self.value
	}

	fn save(&mut self, tier: QualityTier) -> Result<(), FiberError> {
		self.value = Some(tier);
		Ok(())
	}
}
