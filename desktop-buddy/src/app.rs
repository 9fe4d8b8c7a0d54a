use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
    time::{Duration, Instant},
};

use eframe::egui::{
    self, Color32, Pos2, RichText, Sense, TextureHandle, TextureOptions, Vec2, ViewportCommand,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;

use crate::{
    assets::{to_color_image, BuddyAssets, DirectionalFrames},
    bubble::SurfaceId,
    companion::{BubbleView, Companion, Layout},
    config::BuddyConfig,
    identity::IdentityStore,
    motion::{Animation, Facing, FrameRef},
    render::{
        paint_bubble, paint_character, parse_hex_color, BubbleLayout, BubbleStyle, FOOTER_HEIGHT,
    },
};

pub const PROMPT_SIZE: Vec2 = Vec2::new(260.0, 130.0);

struct FrameTextures {
    right: Vec<TextureHandle>,
    left: Vec<TextureHandle>,
}

impl FrameTextures {
    fn upload(ctx: &egui::Context, name: &str, frames: &DirectionalFrames) -> Self {
        let upload = |side: &str, set: &crate::assets::FrameSet| {
            set.iter()
                .enumerate()
                .map(|(i, frame)| {
                    ctx.load_texture(
                        format!("sprite://{name}/{side}/{i}"),
                        to_color_image(frame),
                        TextureOptions::NEAREST,
                    )
                })
                .collect::<Vec<_>>()
        };
        Self {
            right: upload("right", &frames.right),
            left: upload("left", &frames.left),
        }
    }

    fn get(&self, facing: Facing, index: usize) -> Option<&TextureHandle> {
        let set = match facing {
            Facing::Right => &self.right,
            Facing::Left => &self.left,
        };
        if set.is_empty() {
            return None;
        }
        set.get(index % set.len())
    }
}

struct BuddyTextures {
    idle: FrameTextures,
    walk: FrameTextures,
    logo: Option<TextureHandle>,
    icons: HashMap<String, TextureHandle>,
}

impl BuddyTextures {
    fn upload(ctx: &egui::Context, assets: &BuddyAssets) -> Self {
        Self {
            idle: FrameTextures::upload(ctx, "idle", &assets.idle),
            walk: FrameTextures::upload(ctx, "walk", &assets.walk),
            logo: assets.logo.as_ref().map(|logo| {
                ctx.load_texture("asset://logo", to_color_image(logo), TextureOptions::LINEAR)
            }),
            icons: assets
                .icons
                .iter()
                .map(|(key, icon)| {
                    let texture = ctx.load_texture(
                        format!("icon://{key}"),
                        to_color_image(icon),
                        TextureOptions::LINEAR,
                    );
                    (key.clone(), texture)
                })
                .collect(),
        }
    }

    fn frame(&self, frame: FrameRef) -> Option<&TextureHandle> {
        match frame.animation {
            Animation::Idle => self.idle.get(frame.facing, frame.index),
            Animation::Walk => self.walk.get(frame.facing, frame.index),
        }
    }
}

enum Stage {
    AskingName { input: String },
    Running { companion: Companion<StdRng>, clock: Instant },
}

pub struct BuddyState {
    config: BuddyConfig,
    identity: IdentityStore,
    textures: BuddyTextures,
    icon_keys: Vec<String>,
    walk_frames: usize,
    surface_size: Vec2,
    screen: Vec2,
    bubble_layout: BubbleLayout,
    bubble_style: BubbleStyle,
    credit_color: Color32,
    stage: Stage,
    last_window_pos: Option<Pos2>,
    last_bubble_pos: Option<(SurfaceId, Pos2)>,
}

impl BuddyState {
    pub fn new(
        ctx: &egui::Context,
        config: BuddyConfig,
        assets: &BuddyAssets,
        identity: IdentityStore,
    ) -> Self {
        let [sprite_w, sprite_h] = assets.walk.frame_size();
        let surface_size = Vec2::new(sprite_w as f32, sprite_h as f32 + FOOTER_HEIGHT);
        let bubble_size = Vec2::new(config.bubble.width, config.bubble.height);
        let mut state = Self {
            screen: Vec2::from(config.fallback_screen),
            bubble_layout: BubbleLayout::for_size(bubble_size),
            bubble_style: BubbleStyle::from_config(&config),
            credit_color: parse_hex_color(&config.credit_color)
                .unwrap_or(Color32::from_rgb(255, 90, 191)),
            textures: BuddyTextures::upload(ctx, assets),
            icon_keys: assets.icons.keys(),
            walk_frames: assets.walk.len(),
            surface_size,
            identity,
            config,
            stage: Stage::AskingName {
                input: String::new(),
            },
            last_window_pos: None,
            last_bubble_pos: None,
        };
        if let Some(name) = state.identity.load() {
            state.start(name);
        }
        state
    }

    #[cfg(test)]
    fn surface_size(&self) -> Vec2 {
        self.surface_size
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        matches!(self.stage, Stage::Running { .. })
    }

    #[cfg(test)]
    fn identity_name(&self) -> Option<&str> {
        match &self.stage {
            Stage::Running { companion, .. } => Some(companion.identity()),
            Stage::AskingName { .. } => None,
        }
    }

    fn start(&mut self, name: String) {
        info!(name = %name, "starting buddy");
        let layout = Layout {
            surface_size: self.surface_size,
            bubble_size: Vec2::new(self.config.bubble.width, self.config.bubble.height),
            screen: self.screen,
            ground_margin: self.config.motion.ground_margin,
            walk_frames: self.walk_frames,
        };
        let companion = Companion::new(
            &self.config,
            layout,
            name,
            self.icon_keys.clone(),
            StdRng::from_entropy(),
        );
        self.stage = Stage::Running {
            companion,
            clock: Instant::now(),
        };
    }

    pub fn submit_name(&mut self) {
        let answer = match &self.stage {
            Stage::AskingName { input } => input.clone(),
            Stage::Running { .. } => return,
        };
        let name = self.identity.remember(&answer);
        self.start(name);
    }

    fn sync_screen(&mut self, ctx: &egui::Context) {
        let Some(monitor) = ctx.input(|i| i.viewport().monitor_size) else {
            return;
        };
        if monitor.x <= 0.0 || monitor.y <= 0.0 || monitor == self.screen {
            return;
        }
        self.screen = monitor;
        if let Stage::Running { companion, .. } = &mut self.stage {
            companion.set_screen(monitor);
        }
    }

    /// Feeds elapsed time into the companion and returns how long the host may
    /// sleep before the next timer is due.
    fn advance(&mut self) -> Option<Duration> {
        let Stage::Running { companion, clock } = &mut self.stage else {
            return None;
        };
        let now_ms = clock.elapsed().as_millis() as u64;
        companion.advance_to(now_ms);
        companion
            .next_deadline()
            .map(|due| Duration::from_millis(due.saturating_sub(now_ms)))
    }

    fn bubble_view(&self) -> Option<BubbleView> {
        match &self.stage {
            Stage::Running { companion, .. } => companion.bubble_view(),
            Stage::AskingName { .. } => None,
        }
    }

    fn dismiss_bubble(&mut self) {
        if let Stage::Running { companion, .. } = &mut self.stage {
            companion.dismiss();
        }
    }

    fn draw_main(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(ViewportCommand::Close);
        }
        match &self.stage {
            Stage::AskingName { .. } => self.draw_prompt(ctx),
            Stage::Running { .. } => self.draw_character(ctx),
        }
    }

    fn draw_prompt(&mut self, ctx: &egui::Context) {
        let mut submitted = false;
        egui::CentralPanel::default()
            .frame(
                egui::Frame::none()
                    .fill(self.bubble_style.fill)
                    .stroke(egui::Stroke::new(2.0, self.bubble_style.outline))
                    .rounding(6.0)
                    .inner_margin(egui::Margin::same(12.0)),
            )
            .show(ctx, |ui| {
                let Stage::AskingName { input } = &mut self.stage else {
                    return;
                };
                ui.label(
                    RichText::new("Hi! What should I call you?")
                        .color(self.bubble_style.text)
                        .strong(),
                );
                ui.add_space(6.0);
                let response = ui.add(
                    egui::TextEdit::singleline(input)
                        .hint_text("friend")
                        .desired_width(f32::INFINITY),
                );
                response.request_focus();
                let entered =
                    response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.add_space(6.0);
                if ui.button("OK").clicked() || entered {
                    submitted = true;
                }
            });
        if submitted {
            self.submit_name();
            ctx.send_viewport_cmd(ViewportCommand::InnerSize(self.surface_size));
        }
    }

    fn draw_character(&mut self, ctx: &egui::Context) {
        let Stage::Running { companion, .. } = &self.stage else {
            return;
        };
        let position = companion.character_position();
        let frame = companion.frame();

        if self.last_window_pos != Some(position) {
            ctx.send_viewport_cmd(ViewportCommand::OuterPosition(position));
            self.last_window_pos = Some(position);
        }

        let texture = self.textures.frame(frame);
        let logo = self.textures.logo.as_ref();
        let credit = self.config.credit_text.as_str();
        let credit_color = self.credit_color;
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::TRANSPARENT))
            .show(ctx, |ui| {
                ui.spacing_mut().item_spacing = Vec2::ZERO;
                if let Some(texture) = texture {
                    paint_character(ui, texture, logo, credit, credit_color);
                }
            });
    }

    fn draw_bubble(&mut self, ctx: &egui::Context, view: &BubbleView) {
        if self.last_bubble_pos != Some((view.surface, view.position)) {
            ctx.send_viewport_cmd(ViewportCommand::OuterPosition(view.position));
            self.last_bubble_pos = Some((view.surface, view.position));
        }

        let icon = view
            .icon_key
            .as_ref()
            .and_then(|key| self.textures.icons.get(key));
        let mut clicked = false;
        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::TRANSPARENT))
            .show(ctx, |ui| {
                let rect = ui.max_rect();
                let response = ui.interact(rect, egui::Id::new("bubble_click"), Sense::click());
                paint_bubble(
                    ui.painter(),
                    rect.min,
                    &self.bubble_layout,
                    &self.bubble_style,
                    view.opacity,
                    &view.message,
                    icon,
                );
                clicked = response.clicked() && accepts_click(view);
            });
        if clicked {
            self.dismiss_bubble();
        }
    }
}

/// A bubble still fully transparent at the start of its fade-in cannot be
/// clicked away.
fn accepts_click(view: &BubbleView) -> bool {
    view.opacity > 0.0
}

pub struct BuddyApp {
    state: Rc<RefCell<BuddyState>>,
}

impl BuddyApp {
    pub fn new(state: BuddyState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }
}

impl eframe::App for BuddyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut state = self.state.borrow_mut();
        state.sync_screen(ctx);
        let wait = state.advance();
        state.draw_main(ctx);

        let view = state.bubble_view();
        drop(state); // the bubble viewport borrows the state again

        if let Some(view) = view {
            let state_rc = self.state.clone();
            ctx.show_viewport_immediate(
                egui::ViewportId::from_hash_of(("buddy_bubble", view.surface)),
                egui::ViewportBuilder::default()
                    .with_title("Buddy bubble")
                    .with_transparent(true)
                    .with_decorations(false)
                    .with_resizable(false)
                    .with_always_on_top()
                    .with_taskbar(false)
                    .with_inner_size(view.size)
                    .with_position(view.position),
                move |ctx, _class| {
                    state_rc.borrow_mut().draw_bubble(ctx, &view);
                },
            );
        }

        if let Some(wait) = wait {
            ctx.request_repaint_after(wait.max(Duration::from_millis(1)));
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}
