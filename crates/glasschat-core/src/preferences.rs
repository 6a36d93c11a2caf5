//! Theme and background preferences, persisted as JSON under fixed keys.
//!
//! Loading never fails: a missing or malformed value falls back to the
//! default and the problem is only logged. Saving failures are logged too.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

pub const THEME_KEY: &str = "theme";
pub const BACKGROUND_KEY: &str = "background";

pub const DEFAULT_ACCENT_COLOR: &str = "#3B82F6";

/// Preset accent colours as `(hex, name)`.
pub const ACCENT_COLORS: [(&str, &str); 8] = [
    ("#3B82F6", "Blue"),
    ("#10B981", "Green"),
    ("#F59E0B", "Amber"),
    ("#EF4444", "Red"),
    ("#8B5CF6", "Purple"),
    ("#EC4899", "Pink"),
    ("#06B6D4", "Cyan"),
    ("#F97316", "Orange"),
];

pub const BACKGROUNDS: [&str; 4] = ["Blue Buildings", "Leaves", "Gray Wood", "Colored Wood"];

pub const MAX_BLUR: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid colour {0:?}, expected #RRGGBB")]
    InvalidColor(String),
    #[error("unknown background {0:?}")]
    UnknownBackground(String),
}

/// Minimal string key-value storage for preference snapshots.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config_dir>/glasschat/`, or the working directory if there is none.
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .map(|p| p.join("glasschat"))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub accent_color: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundSettings {
    pub current: String,
    pub blur: u32,
    pub opacity: f32,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            current: BACKGROUNDS[0].to_string(),
            blur: 8,
            opacity: 0.15,
        }
    }
}

impl BackgroundSettings {
    /// Pull stored values back into range: blur up to [`MAX_BLUR`], opacity
    /// into `0.0..=1.0`, an unknown background to the first preset.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if !BACKGROUNDS.contains(&self.current.as_str()) {
            warn!(background = %self.current, "Unknown saved background, using default");
            self.current = defaults.current;
        }
        if self.blur > MAX_BLUR {
            warn!(blur = self.blur, "Saved blur out of range, clamping");
            self.blur = MAX_BLUR;
        }
        self.opacity = clamp_opacity(self.opacity);
        self
    }
}

impl ThemeSettings {
    /// Replace an accent colour that doesn't parse as `#RRGGBB` with the default.
    pub fn normalized(self) -> Self {
        if parse_hex_color(&self.accent_color).is_some() {
            return self;
        }
        warn!(accent_color = %self.accent_color, "Invalid saved accent colour, using default");
        Self::default()
    }
}

fn clamp_opacity(value: f32) -> f32 {
    if value.is_nan() {
        BackgroundSettings::default().opacity
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Parse `#RRGGBB` into its components.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Theme and background state, loaded from storage and saved on every change.
pub struct Appearance {
    storage: Box<dyn KeyValueStore>,
    theme: ThemeSettings,
    background: BackgroundSettings,
}

impl Appearance {
    pub fn load(storage: Box<dyn KeyValueStore>) -> Self {
        let theme = load_or_default::<ThemeSettings>(storage.as_ref(), THEME_KEY).normalized();
        let background =
            load_or_default::<BackgroundSettings>(storage.as_ref(), BACKGROUND_KEY).normalized();
        Self {
            storage,
            theme,
            background,
        }
    }

    pub fn theme(&self) -> &ThemeSettings {
        &self.theme
    }

    pub fn background(&self) -> &BackgroundSettings {
        &self.background
    }

    /// Accent colour as RGB, falling back to the default if the stored value
    /// doesn't parse.
    pub fn accent_rgb(&self) -> (u8, u8, u8) {
        parse_hex_color(&self.theme.accent_color)
            .or_else(|| parse_hex_color(DEFAULT_ACCENT_COLOR))
            .unwrap_or((0x3B, 0x82, 0xF6))
    }

    pub fn change_accent_color(&mut self, color: &str) -> Result<(), PreferenceError> {
        if parse_hex_color(color).is_none() {
            return Err(PreferenceError::InvalidColor(color.to_string()));
        }
        self.theme.accent_color = color.to_uppercase();
        save(self.storage.as_ref(), THEME_KEY, &self.theme);
        Ok(())
    }

    /// Move to the preset after the current accent colour.
    pub fn cycle_accent_color(&mut self) {
        let current = ACCENT_COLORS
            .iter()
            .position(|(hex, _)| hex.eq_ignore_ascii_case(&self.theme.accent_color));
        let next = current.map(|i| (i + 1) % ACCENT_COLORS.len()).unwrap_or(0);
        self.theme.accent_color = ACCENT_COLORS[next].0.to_string();
        save(self.storage.as_ref(), THEME_KEY, &self.theme);
    }

    pub fn change_background(&mut self, name: &str) -> Result<(), PreferenceError> {
        if !BACKGROUNDS.contains(&name) {
            return Err(PreferenceError::UnknownBackground(name.to_string()));
        }
        self.background.current = name.to_string();
        save(self.storage.as_ref(), BACKGROUND_KEY, &self.background);
        Ok(())
    }

    pub fn cycle_background(&mut self) {
        let current = BACKGROUNDS
            .iter()
            .position(|b| *b == self.background.current);
        let next = current.map(|i| (i + 1) % BACKGROUNDS.len()).unwrap_or(0);
        self.background.current = BACKGROUNDS[next].to_string();
        save(self.storage.as_ref(), BACKGROUND_KEY, &self.background);
    }

    pub fn adjust_blur(&mut self, value: u32) {
        self.background.blur = value.min(MAX_BLUR);
        save(self.storage.as_ref(), BACKGROUND_KEY, &self.background);
    }

    pub fn adjust_opacity(&mut self, value: f32) {
        self.background.opacity = clamp_opacity(value);
        save(self.storage.as_ref(), BACKGROUND_KEY, &self.background);
    }

    /// Move blur by `delta` pixels, staying within `0..=MAX_BLUR`.
    pub fn step_blur(&mut self, delta: i32) {
        let blur = self.background.blur.saturating_add_signed(delta);
        self.adjust_blur(blur);
    }

    /// Move opacity by `delta`, rounded to whole percent.
    pub fn step_opacity(&mut self, delta: f32) {
        let opacity = ((self.background.opacity + delta) * 100.0).round() / 100.0;
        self.adjust_opacity(opacity);
    }
}

fn load_or_default<T>(storage: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(raw) = storage.get(key) else {
        debug!(key, "No saved preference, using default");
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to parse saved preference, using default");
            T::default()
        }
    }
}

fn save<T: Serialize>(storage: &dyn KeyValueStore, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(PreferenceError::from)
        .and_then(|json| storage.set(key, &json));
    if let Err(e) = result {
        warn!(key, error = %e, "Failed to save preference");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_storage_empty() {
        let appearance = Appearance::load(Box::new(MemoryStore::new()));
        assert_eq!(appearance.theme(), &ThemeSettings::default());
        assert_eq!(appearance.background(), &BackgroundSettings::default());
    }

    #[test]
    fn test_malformed_json_falls_back_to_default() {
        let storage = MemoryStore::new();
        storage.set(THEME_KEY, "{not json").unwrap();
        storage.set(BACKGROUND_KEY, "[1, 2, 3]").unwrap();

        let appearance = Appearance::load(Box::new(storage));
        assert_eq!(appearance.theme().accent_color, DEFAULT_ACCENT_COLOR);
        assert_eq!(appearance.background().current, "Blue Buildings");
    }

    #[test]
    fn test_out_of_range_values_are_clamped_on_load() {
        let storage = MemoryStore::new();
        storage
            .set(BACKGROUND_KEY, r#"{"current":"Leaves","blur":5000,"opacity":7.5}"#)
            .unwrap();
        storage.set(THEME_KEY, r#"{"accentColor":"chartreuse"}"#).unwrap();

        let appearance = Appearance::load(Box::new(storage));
        assert_eq!(appearance.background().current, "Leaves");
        assert_eq!(appearance.background().blur, MAX_BLUR);
        assert_eq!(appearance.background().opacity, 1.0);
        assert_eq!(appearance.theme().accent_color, DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn test_unknown_saved_background_falls_back() {
        let storage = MemoryStore::new();
        storage
            .set(BACKGROUND_KEY, r#"{"current":"Moon","blur":3,"opacity":-2.0}"#)
            .unwrap();

        let appearance = Appearance::load(Box::new(storage));
        assert_eq!(appearance.background().current, "Blue Buildings");
        assert_eq!(appearance.background().blur, 3);
        assert_eq!(appearance.background().opacity, 0.0);
    }

    #[test]
    fn test_reads_existing_camel_case_theme() {
        let storage = MemoryStore::new();
        storage.set(THEME_KEY, r##"{"accentColor":"#10B981"}"##).unwrap();

        let appearance = Appearance::load(Box::new(storage));
        assert_eq!(appearance.theme().accent_color, "#10B981");
        assert_eq!(appearance.accent_rgb(), (0x10, 0xB9, 0x81));
    }

    #[test]
    fn test_blur_and_opacity_are_clamped() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        appearance.adjust_blur(500);
        appearance.adjust_opacity(1.7);
        assert_eq!(appearance.background().blur, MAX_BLUR);
        assert_eq!(appearance.background().opacity, 1.0);

        appearance.adjust_opacity(-0.5);
        assert_eq!(appearance.background().opacity, 0.0);
    }

    #[test]
    fn test_step_blur_and_opacity_stay_in_range() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        appearance.step_blur(-20);
        assert_eq!(appearance.background().blur, 0);
        appearance.step_blur(150);
        assert_eq!(appearance.background().blur, MAX_BLUR);
        appearance.step_blur(-1);
        assert_eq!(appearance.background().blur, 99);

        appearance.step_opacity(0.01);
        assert_eq!(appearance.background().opacity, 0.16);
        appearance.step_opacity(-5.0);
        assert_eq!(appearance.background().opacity, 0.0);
    }

    #[test]
    fn test_rejects_bad_colour_and_unknown_background() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        assert!(appearance.change_accent_color("blue").is_err());
        assert!(appearance.change_background("Moon").is_err());
        assert_eq!(appearance.theme(), &ThemeSettings::default());
    }

    #[test]
    fn test_cycle_accent_wraps_around() {
        let mut appearance = Appearance::load(Box::new(MemoryStore::new()));
        for _ in 0..ACCENT_COLORS.len() {
            appearance.cycle_accent_color();
        }
        assert_eq!(appearance.theme().accent_color, DEFAULT_ACCENT_COLOR);

        appearance.change_accent_color("#123abc").unwrap();
        appearance.cycle_accent_color();
        assert_eq!(appearance.theme().accent_color, ACCENT_COLORS[0].0);
    }

    #[test]
    fn test_file_store_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();

        let mut appearance = Appearance::load(Box::new(FileStore::new(dir.path())));
        appearance.change_accent_color("#EF4444").unwrap();
        appearance.change_background("Leaves").unwrap();
        appearance.adjust_blur(20);

        let reloaded = Appearance::load(Box::new(FileStore::new(dir.path())));
        assert_eq!(reloaded.theme().accent_color, "#EF4444");
        assert_eq!(reloaded.background().current, "Leaves");
        assert_eq!(reloaded.background().blur, 20);
        assert!(dir.path().join("theme.json").exists());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FFFFFF"), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("#3b82f6"), Some((0x3B, 0x82, 0xF6)));
        assert_eq!(parse_hex_color("3B82F6"), None);
        assert_eq!(parse_hex_color("#3B82F"), None);
        assert_eq!(parse_hex_color("#GGGGGG"), None);
    }
}
