use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use eframe::egui;
use image::{
    imageops::{self, FilterType},
    RgbaImage,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BuddyConfig;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0} not found in any asset root")]
    Missing(String),
    #[error("failed decoding {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sheet {} is narrower than one {frame_width}px frame", .path.display())]
    EmptySheet { path: PathBuf, frame_width: u32 },
    #[error("failed listing {}", .path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Ordered frames of one animation in one direction. Never empty.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: Vec<RgbaImage>,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> &RgbaImage {
        &self.frames[index % self.frames.len()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &RgbaImage> {
        self.frames.iter()
    }
}

#[derive(Debug, Clone)]
pub struct DirectionalFrames {
    pub right: FrameSet,
    pub left: FrameSet,
}

impl DirectionalFrames {
    pub fn len(&self) -> usize {
        self.right.len()
    }

    pub fn frame_size(&self) -> [u32; 2] {
        let first = self.right.frame(0);
        [first.width(), first.height()]
    }
}

/// Decorative icons keyed by the file stem without the prefix.
#[derive(Debug, Clone, Default)]
pub struct IconCatalog {
    icons: BTreeMap<String, RgbaImage>,
}

impl IconCatalog {
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&RgbaImage> {
        self.icons.get(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.icons.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RgbaImage)> {
        self.icons.iter()
    }
}

/// Splits a horizontal strip into equal frames, scales each with nearest
/// filtering, and builds the mirrored left-facing copy.
pub fn slice_sheet(
    sheet: &RgbaImage,
    frame_width: u32,
    frame_height: u32,
    scale: f32,
) -> Option<DirectionalFrames> {
    if frame_width == 0 || frame_height == 0 {
        return None;
    }
    let columns = sheet.width() / frame_width;
    if columns == 0 {
        return None;
    }
    let target_w = ((frame_width as f32 * scale) as u32).max(1);
    let target_h = ((frame_height as f32 * scale) as u32).max(1);

    let mut right = Vec::with_capacity(columns as usize);
    let mut left = Vec::with_capacity(columns as usize);
    for column in 0..columns {
        let frame = imageops::crop_imm(sheet, column * frame_width, 0, frame_width, frame_height)
            .to_image();
        let scaled = imageops::resize(&frame, target_w, target_h, FilterType::Nearest);
        left.push(imageops::flip_horizontal(&scaled));
        right.push(scaled);
    }
    Some(DirectionalFrames {
        right: FrameSet { frames: right },
        left: FrameSet { frames: left },
    })
}

pub fn load_sheet(
    path: &Path,
    frame_width: u32,
    frame_height: u32,
    scale: f32,
) -> Result<DirectionalFrames, AssetError> {
    let sheet = decode(path)?;
    slice_sheet(&sheet, frame_width, frame_height, scale).ok_or_else(|| AssetError::EmptySheet {
        path: path.to_path_buf(),
        frame_width,
    })
}

pub fn load_logo(path: &Path, size: u32) -> Option<RgbaImage> {
    match decode(path) {
        Ok(logo) => Some(imageops::resize(&logo, size, size, FilterType::Lanczos3)),
        Err(err) => {
            debug!(?err, "skipping logo");
            None
        }
    }
}

/// Loads every `<prefix>*.png` in `dir`. Unreadable files are skipped.
pub fn load_icons(dir: &Path, prefix: &str, size: u32) -> Result<IconCatalog, AssetError> {
    let entries = fs::read_dir(dir).map_err(|source| AssetError::ListDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut catalog = IconCatalog::default();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(key) = icon_key(&path, prefix) else {
            continue;
        };
        match decode(&path) {
            Ok(icon) => {
                let icon = imageops::resize(&icon, size, size, FilterType::Lanczos3);
                catalog.icons.insert(key, icon);
            }
            Err(err) => debug!(?err, "skipping icon"),
        }
    }
    Ok(catalog)
}

fn icon_key(path: &Path, prefix: &str) -> Option<String> {
    if !path.extension()?.to_str()?.eq_ignore_ascii_case("png") {
        return None;
    }
    let key = path.file_stem()?.to_str()?.strip_prefix(prefix)?;
    if key.is_empty() {
        return None;
    }
    Some(key.to_owned())
}

fn decode(path: &Path) -> Result<RgbaImage, AssetError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

pub fn to_color_image(img: &RgbaImage) -> egui::ColorImage {
    let size = [img.width() as usize, img.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw())
}

pub fn detect_asset_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("assets"));
        candidates.push(cwd.clone());
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            candidates.push(exe_dir.join("assets"));
            candidates.push(exe_dir.to_path_buf());
        }
    }
    for path in candidates {
        if path.is_dir() && !roots.iter().any(|existing| existing == &path) {
            roots.push(path);
        }
    }
    roots
}

pub fn resolve_asset_path(filename: &str, roots: &[PathBuf]) -> Option<PathBuf> {
    let clean = filename.trim().trim_start_matches(['/', '\\']);
    if clean.is_empty() {
        return None;
    }
    let rel = clean.replace('\\', "/");
    roots
        .iter()
        .map(|root| root.join(&rel))
        .find(|candidate| candidate.is_file())
}

/// Everything the buddy draws, decoded once at startup.
#[derive(Debug, Clone)]
pub struct BuddyAssets {
    pub idle: DirectionalFrames,
    pub walk: DirectionalFrames,
    pub logo: Option<RgbaImage>,
    pub icons: IconCatalog,
}

impl BuddyAssets {
    pub fn load(config: &BuddyConfig) -> Result<Self, AssetError> {
        let roots = match &config.asset_dir {
            Some(dir) => vec![dir.clone()],
            None => detect_asset_roots(),
        };
        Self::load_from(config, &roots)
    }

    pub fn load_from(config: &BuddyConfig, roots: &[PathBuf]) -> Result<Self, AssetError> {
        let sprite = &config.sprite;
        let required = |filename: &str| {
            resolve_asset_path(filename, roots)
                .ok_or_else(|| AssetError::Missing(filename.to_owned()))
        };

        let idle = load_sheet(
            &required(&sprite.idle_sheet)?,
            sprite.frame_width,
            sprite.frame_height,
            sprite.scale,
        )?;
        let walk = load_sheet(
            &required(&sprite.walk_sheet)?,
            sprite.frame_width,
            sprite.frame_height,
            sprite.scale,
        )?;

        let logo = resolve_asset_path(&sprite.logo_file, roots)
            .and_then(|path| load_logo(&path, sprite.logo_size));

        let icon_dir = config
            .icon_dir
            .clone()
            .or_else(|| roots.first().cloned());
        let icons = match icon_dir {
            Some(dir) => load_icons(&dir, &config.icon_prefix, sprite.icon_size)
                .unwrap_or_else(|err| {
                    warn!(?err, "icon directory unavailable; bubbles will have no icons");
                    IconCatalog::default()
                }),
            None => IconCatalog::default(),
        };

        info!(
            idle_frames = idle.len(),
            walk_frames = walk.len(),
            logo = logo.is_some(),
            icons = icons.len(),
            "loaded buddy assets"
        );
        Ok(Self {
            idle,
            walk,
            logo,
            icons,
        })
    }
}
