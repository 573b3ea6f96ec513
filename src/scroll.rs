//! Physical scroll model: an exponentially eased offset that input nudges
//! toward a target and the frame loop advances once per frame.

/// Direction of travel inferred from the last physics step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct ScrollState {
    current: f32,
    target: f32,
    last: f32,
    ease: f32,
}

impl ScrollState {
    pub fn new(ease: f32) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            last: 0.0,
            ease: ease.clamp(f32::EPSILON, 1.0),
        }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn ease(&self) -> f32 {
        self.ease
    }

    /// Offset the engine is easing toward. Input handlers may only touch this.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn nudge_target(&mut self, delta: f32) {
        self.target += delta;
    }

    /// One physics step: snapshot `last`, then close a fixed fraction of the
    /// remaining distance. Runs unconditionally once per frame so the strip
    /// keeps decelerating after input stops.
    pub fn advance(&mut self) {
        self.last = self.current;
        self.current += (self.target - self.current) * self.ease;
    }

    /// Travel direction since the previous frame. Stationary reads as `Left`,
    /// which is harmless: a tile that is not moving cannot newly exit the
    /// viewport, so the wrap step sees stable flags.
    pub fn direction(&self) -> Direction {
        if self.current > self.last {
            Direction::Right
        } else {
            Direction::Left
        }
    }
}
