mod app;
mod assets;
mod bubble;
mod companion;
mod config;
mod identity;
mod messages;
mod motion;
mod render;
mod timers;

use anyhow::{Context, Result};
use eframe::egui;
use tracing::info;

use crate::{
    app::{BuddyApp, BuddyState, PROMPT_SIZE},
    assets::BuddyAssets,
    config::BuddyConfig,
    identity::IdentityStore,
    render::FOOTER_HEIGHT,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_path) = BuddyConfig::load_or_create()?;
    info!(path = %config_path.display(), "loaded config");

    let assets = BuddyAssets::load(&config).context("failed loading sprite assets")?;
    let identity = IdentityStore::new(config_path.with_file_name("helper_config.json"));

    let [sprite_w, sprite_h] = assets.walk.frame_size();
    let initial_size = if identity.load().is_some() {
        egui::vec2(sprite_w as f32, sprite_h as f32 + FOOTER_HEIGHT)
    } else {
        PROMPT_SIZE
    };

    let viewport = egui::ViewportBuilder::default()
        .with_title("Desktop Buddy")
        .with_transparent(true)
        .with_decorations(false)
        .with_resizable(false)
        .with_always_on_top()
        .with_taskbar(false)
        .with_inner_size(initial_size);

    let native_options = eframe::NativeOptions {
        viewport,
        renderer: eframe::Renderer::Glow,
        ..Default::default()
    };

    eframe::run_native(
        "Desktop Buddy",
        native_options,
        Box::new(move |cc| {
            let state = BuddyState::new(&cc.egui_ctx, config, &assets, identity);
            Ok(Box::new(BuddyApp::new(state)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("failed starting buddy window: {err}"))?;

    Ok(())
}
