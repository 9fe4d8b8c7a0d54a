use eframe::egui::{Pos2, Rect, Vec2};

use crate::config::MotionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Idle,
    Walk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef {
    pub animation: Animation,
    pub facing: Facing,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    pub step: f32,
    pub amplitude: f32,
    pub bob_speed: f32,
}

impl From<&MotionConfig> for MotionParams {
    fn from(config: &MotionConfig) -> Self {
        Self {
            step: config.step_size.abs(),
            amplitude: config.float_amplitude,
            bob_speed: config.float_speed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionState {
    pub x: f32,
    pub base_y: f32,
    pub y: f32,
    pub bob_phase: f32,
    pub velocity: f32,
    pub facing: Facing,
    pub frame: FrameRef,
}

/// Walks the character back and forth along the bottom of the screen.
#[derive(Debug, Clone)]
pub struct MotionController {
    params: MotionParams,
    state: MotionState,
    sprite_size: Vec2,
    screen: Vec2,
    walk_frames: usize,
}

impl MotionController {
    pub fn new(
        params: MotionParams,
        sprite_size: Vec2,
        screen: Vec2,
        base_y: f32,
        start_x: f32,
        walk_frames: usize,
    ) -> Self {
        let mut controller = Self {
            params,
            state: MotionState {
                x: start_x,
                base_y,
                y: base_y,
                bob_phase: 0.0,
                velocity: params.step,
                facing: Facing::Right,
                frame: FrameRef {
                    animation: Animation::Idle,
                    facing: Facing::Right,
                    index: 0,
                },
            },
            sprite_size,
            screen,
            walk_frames: walk_frames.max(1),
        };
        controller.state.x = controller.state.x.min(controller.max_x()).max(0.0);
        controller
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn position(&self) -> Pos2 {
        Pos2::new(self.state.x, self.state.y)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(self.position(), self.sprite_size)
    }

    pub fn max_x(&self) -> f32 {
        (self.screen.x - self.sprite_size.x).max(0.0)
    }

    pub fn set_screen(&mut self, screen: Vec2, base_y: f32) {
        self.screen = screen;
        self.state.base_y = base_y;
        self.state.x = self.state.x.min(self.max_x()).max(0.0);
        self.state.y = base_y + self.bob_offset();
    }

    pub fn bob_offset(&self) -> f32 {
        (self.params.amplitude * self.state.bob_phase.sin()).round()
    }

    pub fn tick(&mut self) {
        let step = self.params.step;
        let state = &mut self.state;

        state.x += state.velocity;
        let max_x = (self.screen.x - self.sprite_size.x).max(0.0);
        if state.x <= 0.0 {
            state.x = 0.0;
            state.velocity = step;
        } else if state.x + self.sprite_size.x >= self.screen.x {
            state.x = max_x;
            state.velocity = -step;
        }

        state.facing = if state.velocity > 0.0 {
            Facing::Right
        } else {
            Facing::Left
        };

        state.bob_phase += self.params.bob_speed;
        state.y = state.base_y + (self.params.amplitude * state.bob_phase.sin()).round();

        // The idle frame only shows before the first tick; from then on it walks.
        state.frame = FrameRef {
            animation: Animation::Walk,
            facing: state.facing,
            index: (state.frame.index + 1) % self.walk_frames,
        };
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::Vec2;

    use super::{Animation, Facing, MotionController, MotionParams};

    fn params(step: f32) -> MotionParams {
        MotionParams {
            step,
            amplitude: 5.0,
            bob_speed: 0.15,
        }
    }

    fn controller(start_x: f32, frames: usize) -> MotionController {
        MotionController::new(
            params(4.0),
            Vec2::new(200.0, 180.0),
            Vec2::new(1000.0, 800.0),
            600.0,
            start_x,
            frames,
        )
    }

    #[test]
    fn first_tick_bobs_by_rounded_sine() {
        let mut motion = controller(100.0, 8);
        motion.tick();
        assert_eq!(motion.state().y - motion.state().base_y, 1.0);
        assert_eq!(motion.state().x, 104.0);
        assert_eq!(motion.state().frame.animation, Animation::Walk);
    }

    #[test]
    fn right_edge_clamps_and_reverses() {
        let mut motion = controller(810.0, 8);
        assert_eq!(motion.state().x, 800.0);
        motion.state.x = 810.0;
        motion.tick();
        assert_eq!(motion.state().x, 800.0);
        assert_eq!(motion.state().velocity, -4.0);
        assert_eq!(motion.state().facing, Facing::Left);
        assert_eq!(motion.state().frame.facing, Facing::Left);
    }

    #[test]
    fn left_edge_clamps_and_keeps_heading_right_until_next_edge() {
        let mut motion = controller(2.0, 8);
        motion.state.velocity = -4.0;
        motion.tick();
        assert_eq!(motion.state().x, 0.0);
        assert_eq!(motion.state().velocity, 4.0);

        let mut touched_right = false;
        for _ in 0..400 {
            motion.tick();
            if motion.state().x >= motion.max_x() {
                touched_right = true;
                break;
            }
            assert!(motion.state().velocity > 0.0);
            assert_eq!(motion.state().facing, Facing::Right);
        }
        assert!(touched_right);
    }

    #[test]
    fn position_and_bob_stay_bounded_over_long_runs() {
        let mut motion = controller(500.0, 6);
        for _ in 0..5_000 {
            motion.tick();
            let state = motion.state();
            assert!(state.x >= 0.0 && state.x <= 800.0);
            let offset = state.y - state.base_y;
            assert!((-5.0..=5.0).contains(&offset));
        }
    }

    #[test]
    fn frame_index_cycles_with_frame_count() {
        let mut motion = controller(300.0, 6);
        motion.tick();
        let start = motion.state().frame.index;
        for _ in 0..6 {
            motion.tick();
        }
        assert_eq!(motion.state().frame.index, start);
        assert_eq!(motion.state().facing, Facing::Right);
    }

    #[test]
    fn narrow_screen_pins_character_to_left_edge() {
        let mut motion = MotionController::new(
            params(4.0),
            Vec2::new(200.0, 180.0),
            Vec2::new(150.0, 300.0),
            100.0,
            50.0,
            4,
        );
        assert_eq!(motion.state().x, 0.0);
        for _ in 0..10 {
            motion.tick();
            assert_eq!(motion.state().x, 0.0);
        }
    }

    #[test]
    fn shrinking_screen_reclamps_position() {
        let mut motion = controller(780.0, 4);
        motion.set_screen(Vec2::new(600.0, 500.0), 300.0);
        assert_eq!(motion.state().x, 400.0);
        assert_eq!(motion.state().base_y, 300.0);
    }
}
