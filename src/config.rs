use serde::{Deserialize, Serialize};

/// Selection ceiling used when no explicit count is configured.
pub const DEFAULT_SELECTION_COUNT: usize = 9;

/// What kind of media a picking session works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerMode {
    SingleImage,
    MultiImage,
    Video,
}

/// Configuration for one picking session.
///
/// Constructed once per session and handed to the catalog, coordinator and
/// compressor by value; there is no process-wide instance.
///
/// ```
/// use media_picker::{PickerConfig, PickerMode};
///
/// let config = PickerConfig::new(PickerMode::MultiImage)
///     .with_gif()
///     .with_max_selection_count(4);
/// assert_eq!(config.max_selection_count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickerConfig {
    pub mode: PickerMode,
    max_selection_count: usize,
    pub include_gif: bool,
    pub paging_enabled: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            mode: PickerMode::SingleImage,
            max_selection_count: DEFAULT_SELECTION_COUNT,
            include_gif: false,
            paging_enabled: true,
        }
    }
}

impl PickerConfig {
    pub fn new(mode: PickerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the selection ceiling. Requests for zero are ignored.
    pub fn with_max_selection_count(mut self, count: usize) -> Self {
        if count > 0 {
            self.max_selection_count = count;
        }
        self
    }

    /// Include GIFs in image queries.
    pub fn with_gif(mut self) -> Self {
        self.include_gif = true;
        self
    }

    /// Toggle the paged query window, on by default.
    pub fn with_paging(mut self, enabled: bool) -> Self {
        self.paging_enabled = enabled;
        self
    }

    /// The configured selection ceiling, falling back to
    /// [`DEFAULT_SELECTION_COUNT`] if an unset value ever sneaks in.
    pub fn max_selection_count(&self) -> usize {
        if self.max_selection_count > 0 {
            self.max_selection_count
        } else {
            DEFAULT_SELECTION_COUNT
        }
    }

    pub fn is_video_mode(&self) -> bool {
        self.mode == PickerMode::Video
    }

    pub fn is_multi_image_mode(&self) -> bool {
        self.mode == PickerMode::MultiImage
    }

    pub fn is_single_image_mode(&self) -> bool {
        self.mode == PickerMode::SingleImage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PickerConfig::default();
        assert_eq!(config.mode, PickerMode::SingleImage);
        assert_eq!(config.max_selection_count(), DEFAULT_SELECTION_COUNT);
        assert!(!config.include_gif);
        assert!(config.paging_enabled);
    }

    #[test]
    fn zero_max_count_falls_back_to_default() {
        let config = PickerConfig::new(PickerMode::MultiImage).with_max_selection_count(0);
        assert_eq!(config.max_selection_count(), DEFAULT_SELECTION_COUNT);
    }

    #[test]
    fn explicit_max_count() {
        let config = PickerConfig::new(PickerMode::MultiImage).with_max_selection_count(3);
        assert_eq!(config.max_selection_count(), 3);
    }

    #[test]
    fn mode_helpers() {
        assert!(PickerConfig::new(PickerMode::Video).is_video_mode());
        assert!(PickerConfig::new(PickerMode::MultiImage).is_multi_image_mode());
        assert!(PickerConfig::new(PickerMode::SingleImage).is_single_image_mode());
    }
}
