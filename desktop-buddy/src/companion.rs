use eframe::egui::{Pos2, Vec2};
use rand::Rng;
use tracing::debug;

use crate::{
    bubble::{
        place_bubble, BubbleContent, BubbleLifecycle, BubblePhase, FadeProgress, ShowOutcome,
        SurfaceId,
    },
    config::BuddyConfig,
    messages::MessageCatalog,
    motion::{FrameRef, MotionController, MotionParams},
    timers::{FiredTimer, TimerPurpose, TimerQueue},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub tick_ms: u64,
    pub display_interval_ms: u64,
    pub display_duration_ms: u64,
    pub fade_interval_ms: u64,
    pub fade_steps: u32,
}

impl From<&BuddyConfig> for Schedule {
    fn from(config: &BuddyConfig) -> Self {
        Self {
            tick_ms: config.motion.tick_ms.max(1),
            display_interval_ms: config.bubble.interval_ms.max(1),
            display_duration_ms: config.bubble.duration_ms,
            fade_interval_ms: config.bubble.fade_interval_ms.max(1),
            fade_steps: config.bubble.fade_steps.max(1),
        }
    }
}

/// Sizes the companion needs to lay itself out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Character surface, sprite plus footer.
    pub surface_size: Vec2,
    pub bubble_size: Vec2,
    pub screen: Vec2,
    pub ground_margin: f32,
    pub walk_frames: usize,
}

impl Layout {
    fn base_y(&self) -> f32 {
        (self.screen.y - self.surface_size.y - self.ground_margin).max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BubbleView {
    pub surface: SurfaceId,
    pub phase: BubblePhase,
    pub position: Pos2,
    pub size: Vec2,
    pub opacity: f32,
    pub message: String,
    pub icon_key: Option<String>,
}

/// Owns all choreography state: motion, bubble and the timers driving them.
pub struct Companion<R: Rng> {
    schedule: Schedule,
    layout: Layout,
    motion: MotionController,
    bubble: BubbleLifecycle,
    timers: TimerQueue,
    messages: MessageCatalog,
    icon_keys: Vec<String>,
    identity: String,
    rng: R,
}

impl<R: Rng> Companion<R> {
    pub fn new(
        config: &BuddyConfig,
        layout: Layout,
        identity: String,
        icon_keys: Vec<String>,
        mut rng: R,
    ) -> Self {
        let schedule = Schedule::from(config);
        let max_x = (layout.screen.x - layout.surface_size.x).max(0.0) as i64;
        let start_x = rng.gen_range(0..=max_x) as f32;
        let motion = MotionController::new(
            MotionParams::from(&config.motion),
            layout.surface_size,
            layout.screen,
            layout.base_y(),
            start_x,
            layout.walk_frames,
        );

        let mut timers = TimerQueue::new();
        timers.arm(TimerPurpose::MotionTick, 0);
        timers.arm(TimerPurpose::DisplayTrigger, schedule.display_interval_ms);

        Self {
            schedule,
            layout,
            motion,
            bubble: BubbleLifecycle::new(schedule.fade_steps),
            timers,
            messages: MessageCatalog::from_templates(&config.messages),
            icon_keys,
            identity,
            rng,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    #[cfg(test)]
    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    #[cfg(test)]
    pub fn bubble(&self) -> &BubbleLifecycle {
        &self.bubble
    }

    #[cfg(test)]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn character_position(&self) -> Pos2 {
        self.motion.position()
    }

    pub fn frame(&self) -> FrameRef {
        self.motion.state().frame
    }

    pub fn bubble_view(&self) -> Option<BubbleView> {
        let surface = self.bubble.surface()?;
        let content = self.bubble.content()?;
        Some(BubbleView {
            surface,
            phase: self.bubble.phase(),
            position: self.bubble.position(),
            size: self.layout.bubble_size,
            opacity: self.bubble.opacity(),
            message: content.message.clone(),
            icon_key: content.icon_key.clone(),
        })
    }

    /// Runs every timer due at or before `now_ms`, in deadline order.
    pub fn advance_to(&mut self, now_ms: u64) {
        while let Some(fired) = self.timers.pop_due(now_ms) {
            self.dispatch(fired);
        }
        self.timers.settle(now_ms);
    }

    /// Pointer click on the bubble.
    pub fn dismiss(&mut self) {
        self.begin_fade_out();
    }

    pub fn set_screen(&mut self, screen: Vec2) {
        if self.layout.screen == screen {
            return;
        }
        self.layout.screen = screen;
        self.motion.set_screen(screen, self.layout.base_y());
        if self.bubble.is_attached() {
            self.reposition_bubble();
        }
    }

    fn dispatch(&mut self, fired: FiredTimer) {
        match fired.purpose {
            TimerPurpose::MotionTick => self.on_motion_tick(),
            TimerPurpose::DisplayTrigger => self.on_display_trigger(),
            TimerPurpose::FadeOutStart => self.begin_fade_out(),
            TimerPurpose::FadeStep => self.on_fade_step(),
        }
    }

    fn on_motion_tick(&mut self) {
        self.motion.tick();
        if self.bubble.is_attached() {
            self.reposition_bubble();
        }
        self.timers.arm(TimerPurpose::MotionTick, self.schedule.tick_ms);
    }

    fn on_display_trigger(&mut self) {
        let message = self.messages.pick(&self.identity, &mut self.rng);
        let icon_key = if self.icon_keys.is_empty() {
            None
        } else {
            let index = self.rng.gen_range(0..self.icon_keys.len());
            Some(self.icon_keys[index].clone())
        };
        debug!(%message, icon = ?icon_key, now_ms = self.now_ms(), "display trigger");

        let outcome = self.bubble.show(BubbleContent { message, icon_key });
        debug!(
            surface = outcome.surface().0,
            reused = matches!(outcome, ShowOutcome::Reused(_)),
            "bubble shown"
        );
        self.reposition_bubble();

        // Arming replaces any fade timers left over from the previous cycle.
        self.timers.arm(TimerPurpose::FadeStep, self.schedule.fade_interval_ms);
        self.timers.arm(TimerPurpose::FadeOutStart, self.schedule.display_duration_ms);
        self.timers.arm(TimerPurpose::DisplayTrigger, self.schedule.display_interval_ms);
    }

    fn begin_fade_out(&mut self) {
        if self.bubble.begin_fade_out() {
            self.timers.cancel(TimerPurpose::FadeOutStart);
            self.timers.arm(TimerPurpose::FadeStep, self.schedule.fade_interval_ms);
        }
    }

    fn on_fade_step(&mut self) {
        let progress = match self.bubble.phase() {
            BubblePhase::Appearing => self.bubble.fade_in_step(),
            BubblePhase::Disappearing => self.bubble.fade_out_step(),
            BubblePhase::Absent | BubblePhase::Steady => FadeProgress::Settled,
        };
        match progress {
            FadeProgress::Continue => {
                self.timers.arm(TimerPurpose::FadeStep, self.schedule.fade_interval_ms);
            }
            FadeProgress::Settled => {}
            FadeProgress::Closed(_) => {
                self.timers.cancel(TimerPurpose::FadeOutStart);
            }
        }
    }

    fn reposition_bubble(&mut self) {
        let position = place_bubble(
            self.motion.bounds(),
            self.layout.bubble_size,
            self.layout.screen,
        );
        self.bubble.reposition(position);
    }
}
