use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteConfig {
    pub idle_sheet: String,
    pub walk_sheet: String,
    pub logo_file: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub scale: f32,
    pub logo_size: u32,
    pub icon_size: u32,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            idle_sheet: "Idle.png".to_owned(),
            walk_sheet: "Walk.png".to_owned(),
            logo_file: "logo.png".to_owned(),
            frame_width: 128,
            frame_height: 128,
            scale: 1.4,
            logo_size: 18,
            icon_size: 22,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Pixels moved per tick.
    pub step_size: f32,
    pub tick_ms: u64,
    pub float_amplitude: f32,
    /// Bob phase increment per tick, in radians.
    pub float_speed: f32,
    /// Gap between the bottom of the screen and the character surface.
    pub ground_margin: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_size: 4.0,
            tick_ms: 70,
            float_amplitude: 5.0,
            float_speed: 0.15,
            ground_margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleConfig {
    pub interval_ms: u64,
    pub duration_ms: u64,
    pub fade_steps: u32,
    pub fade_interval_ms: u64,
    pub width: f32,
    pub height: f32,
    pub fill_color: String,
    pub outline_color: String,
    pub text_color: String,
    pub font_size: f32,
}

impl Default for BubbleConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
            duration_ms: 10_000,
            fade_steps: 10,
            fade_interval_ms: 40,
            width: 170.0,
            height: 70.0,
            fill_color: "#fffbe6".to_owned(),
            outline_color: "#f0c48a".to_owned(),
            text_color: "#ff5abf".to_owned(),
            font_size: 12.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuddyConfig {
    /// Overrides asset root detection when set.
    pub asset_dir: Option<PathBuf>,
    /// Directory scanned for icons; falls back to the first asset root.
    pub icon_dir: Option<PathBuf>,
    pub icon_prefix: String,
    pub sprite: SpriteConfig,
    pub motion: MotionConfig,
    pub bubble: BubbleConfig,
    pub credit_text: String,
    pub credit_color: String,
    /// Used until the host reports the real monitor size.
    pub fallback_screen: [f32; 2],
    pub messages: Vec<String>,
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self {
            asset_dir: None,
            icon_dir: None,
            icon_prefix: "emoji_".to_owned(),
            sprite: SpriteConfig::default(),
            motion: MotionConfig::default(),
            bubble: BubbleConfig::default(),
            credit_text: "Creations by Kashiro".to_owned(),
            credit_color: "#ff5abf".to_owned(),
            fallback_screen: [1920.0, 1080.0],
            messages: Vec::new(),
        }
    }
}

impl BuddyConfig {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("unable to locate OS config directory")?
            .join("desktop-buddy");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed creating config dir at {}", dir.display()))?;
        Ok(dir)
    }

    pub fn load_or_create() -> Result<(Self, PathBuf)> {
        let config_path = Self::config_dir()?.join("config.json");
        let config = Self::load_or_create_at(&config_path);
        Ok((config, config_path))
    }

    /// Falls back to defaults when the file is missing or unusable. A broken
    /// file is left in place so the user can fix it.
    pub fn load_or_create_at(config_path: &Path) -> Self {
        if !config_path.exists() {
            let default = Self::default();
            if let Err(err) = default.save(config_path) {
                warn!(?err, "failed writing default config; continuing with defaults");
            }
            return default;
        }

        match Self::read(config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(?err, "unusable config; continuing with defaults");
                Self::default()
            }
        }
    }

    fn read(config_path: &Path) -> Result<Self> {
        let text = fs::read_to_string(config_path)
            .with_context(|| format!("failed reading {}", config_path.display()))?;
        let config = serde_json::from_str::<Self>(&text)
            .with_context(|| format!("invalid json in {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self).context("failed serializing config")?;
        fs::write(path, payload).with_context(|| format!("failed writing {}", path.display()))?;
        Ok(())
    }
}
