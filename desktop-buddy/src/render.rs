use eframe::egui::{
    self, text::LayoutJob, Align, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke,
    TextureHandle, Vec2,
};

use crate::config::BuddyConfig;

const PANEL_MARGIN: f32 = 4.0;
const PANEL_TOP: f32 = 6.0;
/// Space under the panel reserved for the tail.
const TAIL_SPACE: f32 = 18.0;
const TAIL_HALF_WIDTH: f32 = 7.0;
const TEXT_SIDE_PADDING: f32 = 30.0;
pub const FOOTER_HEIGHT: f32 = 20.0;

/// Bubble geometry in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleLayout {
    pub panel: Rect,
    pub tail: [Pos2; 3],
    pub text_center: Pos2,
    pub text_wrap_width: f32,
    pub icon_center: Pos2,
}

impl BubbleLayout {
    pub fn for_size(size: Vec2) -> Self {
        let (w, h) = (size.x, size.y);
        let panel_bottom = h - TAIL_SPACE;
        let mid_x = (w / 2.0).floor();
        Self {
            panel: Rect::from_min_max(
                Pos2::new(PANEL_MARGIN, PANEL_TOP),
                Pos2::new(w - PANEL_MARGIN, panel_bottom),
            ),
            tail: [
                Pos2::new(mid_x - TAIL_HALF_WIDTH, panel_bottom),
                Pos2::new(mid_x + TAIL_HALF_WIDTH, panel_bottom),
                Pos2::new(mid_x, h - PANEL_MARGIN),
            ],
            text_center: Pos2::new(mid_x - 4.0, ((PANEL_TOP + panel_bottom) / 2.0).floor() - 8.0),
            text_wrap_width: (w - TEXT_SIDE_PADDING).max(1.0),
            icon_center: Pos2::new(mid_x, panel_bottom - 3.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleStyle {
    pub fill: Color32,
    pub outline: Color32,
    pub text: Color32,
    pub font_size: f32,
}

impl BubbleStyle {
    pub fn from_config(config: &BuddyConfig) -> Self {
        let bubble = &config.bubble;
        Self {
            fill: parse_hex_color(&bubble.fill_color).unwrap_or(Color32::from_rgb(255, 251, 230)),
            outline: parse_hex_color(&bubble.outline_color)
                .unwrap_or(Color32::from_rgb(240, 196, 138)),
            text: parse_hex_color(&bubble.text_color).unwrap_or(Color32::from_rgb(255, 90, 191)),
            font_size: bubble.font_size.max(6.0),
        }
    }
}

/// Paints the bubble panel, tail, wrapped message and optional icon, every
/// colour scaled by `opacity`.
pub fn paint_bubble(
    painter: &Painter,
    origin: Pos2,
    layout: &BubbleLayout,
    style: &BubbleStyle,
    opacity: f32,
    message: &str,
    icon: Option<&TextureHandle>,
) {
    let offset = origin.to_vec2();
    let fill = faded(style.fill, opacity);
    let stroke = Stroke::new(2.0, faded(style.outline, opacity));

    let panel = layout.panel.translate(offset);
    painter.rect(panel, 4.0, fill, stroke);
    painter.add(Shape::convex_polygon(
        layout.tail.iter().map(|p| *p + offset).collect(),
        fill,
        stroke,
    ));
    // Hide the panel outline where the tail joins it.
    painter.line_segment(
        [
            layout.tail[0] + offset + Vec2::new(2.0, 0.0),
            layout.tail[1] + offset - Vec2::new(2.0, 0.0),
        ],
        Stroke::new(2.5, fill),
    );

    let mut job = LayoutJob::simple(
        message.to_owned(),
        FontId::proportional(style.font_size),
        faded(style.text, opacity),
        layout.text_wrap_width,
    );
    job.halign = Align::Center;
    let galley = painter.layout_job(job);
    let text_pos = layout.text_center + offset - Vec2::new(0.0, galley.size().y / 2.0);
    painter.galley(text_pos, galley, faded(style.text, opacity));

    if let Some(icon) = icon {
        let rect = Rect::from_center_size(layout.icon_center + offset, icon.size_vec2());
        painter.image(
            icon.id(),
            rect,
            Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
            faded(Color32::WHITE, opacity),
        );
    }
}

/// Draws the sprite with the logo and credit line centred underneath.
pub fn paint_character(
    ui: &mut egui::Ui,
    frame: &TextureHandle,
    logo: Option<&TextureHandle>,
    credit: &str,
    credit_color: Color32,
) -> Rect {
    let sprite_size = frame.size_vec2();
    let (sprite_rect, _) = ui.allocate_exact_size(sprite_size, egui::Sense::hover());
    ui.painter().image(
        frame.id(),
        sprite_rect,
        Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
        Color32::WHITE,
    );

    ui.allocate_ui_with_layout(
        Vec2::new(sprite_size.x, FOOTER_HEIGHT),
        egui::Layout::left_to_right(Align::Center),
        |ui| {
            ui.spacing_mut().item_spacing.x = 3.0;
            let logo_width = logo.map(|l| l.size_vec2().x + 3.0).unwrap_or(0.0);
            let credit_width = credit.chars().count() as f32 * 4.5;
            ui.add_space(((sprite_size.x - logo_width - credit_width) / 2.0).max(0.0));
            if let Some(logo) = logo {
                ui.image((logo.id(), logo.size_vec2()));
            }
            if !credit.is_empty() {
                ui.label(egui::RichText::new(credit).size(9.0).color(credit_color));
            }
        },
    );
    sprite_rect
}

pub fn faded(color: Color32, opacity: f32) -> Color32 {
    color.gamma_multiply(opacity.clamp(0.0, 1.0))
}

pub fn parse_hex_color(value: &str) -> Option<Color32> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let [_, r, g, b] = u32::from_str_radix(hex, 16).ok()?.to_be_bytes();
    Some(Color32::from_rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Color32, Pos2, Vec2};

    use super::{faded, parse_hex_color, BubbleLayout, BubbleStyle};
    use crate::config::BuddyConfig;

    #[test]
    fn default_bubble_layout_matches_classic_geometry() {
        let layout = BubbleLayout::for_size(Vec2::new(170.0, 70.0));
        assert_eq!(layout.panel.min, Pos2::new(4.0, 6.0));
        assert_eq!(layout.panel.max, Pos2::new(166.0, 52.0));
        assert_eq!(layout.tail[2], Pos2::new(85.0, 66.0));
        assert_eq!(layout.tail[0], Pos2::new(78.0, 52.0));
        assert_eq!(layout.text_center, Pos2::new(81.0, 21.0));
        assert_eq!(layout.text_wrap_width, 140.0);
        assert_eq!(layout.icon_center, Pos2::new(85.0, 49.0));
    }

    #[test]
    fn tail_tip_is_where_placement_expects_it() {
        let size = Vec2::new(170.0, 70.0);
        let layout = BubbleLayout::for_size(size);
        assert_eq!(layout.tail[2].x, (size.x / 2.0).floor());
        assert_eq!(layout.tail[2].y, size.y - 4.0);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(parse_hex_color("#ff5abf"), Some(Color32::from_rgb(255, 90, 191)));
        assert_eq!(parse_hex_color(" 00f2ff "), Some(Color32::from_rgb(0, 242, 255)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
        assert_eq!(parse_hex_color("+12345"), None);
    }

    #[test]
    fn non_ascii_colors_are_rejected_without_panicking() {
        assert_eq!(parse_hex_color("aé123"), None);
        assert_eq!(parse_hex_color("#ééé"), None);

        let mut config = BuddyConfig::default();
        config.bubble.fill_color = "#aé123".to_owned();
        config.bubble.outline_color = "€€".to_owned();
        let style = BubbleStyle::from_config(&config);
        assert_eq!(style.fill, Color32::from_rgb(255, 251, 230));
        assert_eq!(style.outline, Color32::from_rgb(240, 196, 138));
    }

    #[test]
    fn style_falls_back_on_bad_colors() {
        let mut config = BuddyConfig::default();
        config.bubble.fill_color = "nope".to_owned();
        let style = BubbleStyle::from_config(&config);
        assert_eq!(style.fill, Color32::from_rgb(255, 251, 230));
        assert_eq!(style.text, Color32::from_rgb(255, 90, 191));
    }

    #[test]
    fn fading_scales_alpha() {
        assert_eq!(faded(Color32::WHITE, 1.0), Color32::WHITE);
        assert_eq!(faded(Color32::WHITE, 0.0).a(), 0);
        assert_eq!(faded(Color32::WHITE, 2.0), Color32::WHITE);
    }
}
