use eframe::egui::{Pos2, Rect, Vec2};
use tracing::debug;

/// Fraction of the character box where the bubble tail points.
const MOUTH_FRACTION: f32 = 0.35;
/// Distance from the bubble's bottom edge to the tail tip.
const TAIL_INSET: f32 = 4.0;
const TAIL_GAP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubblePhase {
    Absent,
    Appearing,
    Steady,
    Disappearing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BubbleContent {
    pub message: String,
    pub icon_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    Allocated(SurfaceId),
    Reused(SurfaceId),
}

impl ShowOutcome {
    pub fn surface(self) -> SurfaceId {
        match self {
            Self::Allocated(id) | Self::Reused(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeProgress {
    /// Another fade step should be scheduled.
    Continue,
    /// Fade-in reached full opacity, or was halted by a fade-out request.
    Settled,
    /// Fade-out reached zero and the surface was released.
    Closed(SurfaceId),
}

/// Content, visibility and opacity of the single speech bubble.
#[derive(Debug, Clone)]
pub struct BubbleLifecycle {
    phase: BubblePhase,
    step: u32,
    fade_steps: u32,
    content: Option<BubbleContent>,
    surface: Option<SurfaceId>,
    next_surface: u64,
    position: Pos2,
}

impl BubbleLifecycle {
    pub fn new(fade_steps: u32) -> Self {
        Self {
            phase: BubblePhase::Absent,
            step: 0,
            fade_steps: fade_steps.max(1),
            content: None,
            surface: None,
            next_surface: 1,
            position: Pos2::ZERO,
        }
    }

    pub fn phase(&self) -> BubblePhase {
        self.phase
    }

    pub fn is_attached(&self) -> bool {
        self.phase != BubblePhase::Absent
    }

    #[cfg(test)]
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn opacity(&self) -> f32 {
        if self.phase == BubblePhase::Absent {
            return 0.0;
        }
        self.step as f32 / self.fade_steps as f32
    }

    pub fn content(&self) -> Option<&BubbleContent> {
        self.content.as_ref()
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn position(&self) -> Pos2 {
        self.position
    }

    /// Shows new content, allocating a surface only when none exists, and
    /// restarts the fade-in from zero.
    pub fn show(&mut self, content: BubbleContent) -> ShowOutcome {
        let outcome = match self.surface {
            Some(id) if self.phase != BubblePhase::Absent => ShowOutcome::Reused(id),
            _ => {
                let id = SurfaceId(self.next_surface);
                self.next_surface += 1;
                self.surface = Some(id);
                debug!(surface = id.0, "allocated bubble surface");
                ShowOutcome::Allocated(id)
            }
        };
        self.content = Some(content);
        self.phase = BubblePhase::Appearing;
        self.step = 0;
        outcome
    }

    pub fn fade_in_step(&mut self) -> FadeProgress {
        if self.phase != BubblePhase::Appearing {
            return FadeProgress::Settled;
        }
        self.step = (self.step + 1).min(self.fade_steps);
        if self.step == self.fade_steps {
            self.phase = BubblePhase::Steady;
            FadeProgress::Settled
        } else {
            FadeProgress::Continue
        }
    }

    /// Starts the fade-out from full opacity. Returns false when there is
    /// nothing to fade or a fade-out is already running.
    pub fn begin_fade_out(&mut self) -> bool {
        match self.phase {
            BubblePhase::Absent | BubblePhase::Disappearing => false,
            BubblePhase::Appearing | BubblePhase::Steady => {
                self.phase = BubblePhase::Disappearing;
                self.step = self.fade_steps;
                true
            }
        }
    }

    pub fn fade_out_step(&mut self) -> FadeProgress {
        if self.phase != BubblePhase::Disappearing {
            return FadeProgress::Settled;
        }
        self.step = self.step.saturating_sub(1);
        if self.step > 0 {
            return FadeProgress::Continue;
        }
        self.phase = BubblePhase::Absent;
        self.content = None;
        match self.surface.take() {
            Some(id) => {
                debug!(surface = id.0, "released bubble surface");
                FadeProgress::Closed(id)
            }
            None => FadeProgress::Settled,
        }
    }

    pub fn reposition(&mut self, position: Pos2) {
        self.position = position;
    }
}

/// Top-left corner of the bubble so its tail sits under the character's mouth,
/// kept fully on screen.
pub fn place_bubble(character: Rect, bubble_size: Vec2, screen: Vec2) -> Pos2 {
    let mouth_x = character.min.x + (character.width() * MOUTH_FRACTION).trunc();
    let mouth_y = character.min.y + (character.height() * MOUTH_FRACTION).trunc();

    let tail_x_offset = (bubble_size.x / 2.0).floor();
    let tail_y_offset = bubble_size.y - TAIL_INSET;

    let x = mouth_x - tail_x_offset;
    let y = mouth_y - tail_y_offset - TAIL_GAP;

    Pos2::new(
        x.min(screen.x - bubble_size.x).max(0.0),
        y.min(screen.y - bubble_size.y).max(0.0),
    )
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Pos2, Rect, Vec2};

    use super::{
        place_bubble, BubbleContent, BubbleLifecycle, BubblePhase, FadeProgress, ShowOutcome,
        SurfaceId,
    };

    fn content(message: &str, icon: Option<&str>) -> BubbleContent {
        BubbleContent {
            message: message.to_owned(),
            icon_key: icon.map(str::to_owned),
        }
    }

    #[test]
    fn fade_in_walks_tenths_up_to_steady() {
        let mut bubble = BubbleLifecycle::new(10);
        assert_eq!(bubble.show(content("hi", None)), ShowOutcome::Allocated(SurfaceId(1)));
        let mut opacities = vec![bubble.opacity()];
        loop {
            let progress = bubble.fade_in_step();
            opacities.push(bubble.opacity());
            if progress != FadeProgress::Continue {
                break;
            }
        }
        assert_eq!(opacities.len(), 11);
        for (i, opacity) in opacities.iter().enumerate() {
            assert!((opacity - i as f32 / 10.0).abs() < 1e-6);
        }
        assert_eq!(bubble.phase(), BubblePhase::Steady);
    }

    #[test]
    fn fade_out_request_halts_fade_in() {
        let mut bubble = BubbleLifecycle::new(10);
        bubble.show(content("hi", None));
        bubble.fade_in_step();
        bubble.fade_in_step();
        assert!(bubble.begin_fade_out());
        assert_eq!(bubble.fade_in_step(), FadeProgress::Settled);
        assert_eq!(bubble.phase(), BubblePhase::Disappearing);
        assert_eq!(bubble.step(), 10);
    }

    #[test]
    fn fade_out_releases_surface_and_clears_content() {
        let mut bubble = BubbleLifecycle::new(4);
        bubble.show(content("bye", Some("star")));
        assert!(bubble.begin_fade_out());
        let mut last = bubble.opacity();
        let closed = loop {
            match bubble.fade_out_step() {
                FadeProgress::Continue => {
                    assert!(bubble.opacity() <= last);
                    last = bubble.opacity();
                }
                other => break other,
            }
        };
        assert_eq!(closed, FadeProgress::Closed(SurfaceId(1)));
        assert_eq!(bubble.phase(), BubblePhase::Absent);
        assert!(bubble.content().is_none());
        assert!(bubble.surface().is_none());
        assert_eq!(bubble.opacity(), 0.0);

        assert_eq!(bubble.show(content("again", None)), ShowOutcome::Allocated(SurfaceId(2)));
        assert_eq!(bubble.content(), Some(&content("again", None)));
    }

    #[test]
    fn show_while_steady_reuses_surface_and_resets_counter() {
        let mut bubble = BubbleLifecycle::new(10);
        bubble.show(content("A", None));
        while bubble.fade_in_step() == FadeProgress::Continue {}
        assert_eq!(bubble.phase(), BubblePhase::Steady);

        assert_eq!(bubble.show(content("B", None)), ShowOutcome::Reused(SurfaceId(1)));
        assert_eq!(bubble.step(), 0);
        assert_eq!(bubble.phase(), BubblePhase::Appearing);
        assert_eq!(bubble.content().map(|c| c.message.as_str()), Some("B"));
    }

    #[test]
    fn show_while_disappearing_overrides_fade_out() {
        let mut bubble = BubbleLifecycle::new(10);
        bubble.show(content("A", None));
        bubble.begin_fade_out();
        bubble.fade_out_step();
        assert_eq!(bubble.show(content("B", None)), ShowOutcome::Reused(SurfaceId(1)));
        assert_eq!(bubble.phase(), BubblePhase::Appearing);
        assert_eq!(bubble.fade_out_step(), FadeProgress::Settled);
        assert_eq!(bubble.fade_in_step(), FadeProgress::Continue);
    }

    #[test]
    fn repeated_dismiss_does_not_restart_fade_out() {
        let mut bubble = BubbleLifecycle::new(10);
        assert!(!bubble.begin_fade_out());
        bubble.show(content("A", None));
        assert!(bubble.begin_fade_out());
        bubble.fade_out_step();
        assert!(!bubble.begin_fade_out());
        assert_eq!(bubble.step(), 9);
    }

    #[test]
    fn places_tail_under_mouth() {
        let character = Rect::from_min_size(Pos2::new(500.0, 700.0), Vec2::new(179.0, 200.0));
        let pos = place_bubble(character, Vec2::new(170.0, 70.0), Vec2::new(1920.0, 1080.0));
        // mouth = (500 + 62, 700 + 70), tail offset = (85, 66), gap 4
        assert_eq!(pos, Pos2::new(477.0, 700.0));
    }

    #[test]
    fn clamps_bubble_onto_screen() {
        let size = Vec2::new(170.0, 70.0);
        let screen = Vec2::new(1000.0, 600.0);
        let near_left = Rect::from_min_size(Pos2::new(0.0, 10.0), Vec2::new(100.0, 100.0));
        assert_eq!(place_bubble(near_left, size, screen), Pos2::new(0.0, 0.0));

        let near_right = Rect::from_min_size(Pos2::new(990.0, 400.0), Vec2::new(100.0, 100.0));
        assert_eq!(place_bubble(near_right, size, screen), Pos2::new(830.0, 365.0));

        let tiny_screen = Vec2::new(100.0, 50.0);
        assert_eq!(place_bubble(near_right, size, tiny_screen), Pos2::new(0.0, 0.0));
    }
}
