use serde::{Deserialize, Serialize};

/// Maps the engine's (position, location) axes to output coordinates.
///
/// Implementations must be pure and `inverse_transform` must undo
/// `transform`. Orientation is chosen entirely here.
pub trait CoordinateTransform {
    fn transform(&self, position: f32, location: f32) -> (f32, f32);
    fn inverse_transform(&self, x: f32, y: f32) -> (f32, f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "LR" => Some(Self::LeftRight),
            _ => None,
        }
    }
}

impl CoordinateTransform for Direction {
    fn transform(&self, position: f32, location: f32) -> (f32, f32) {
        match self {
            Direction::TopDown => (position, location),
            Direction::LeftRight => (location, position),
        }
    }

    fn inverse_transform(&self, x: f32, y: f32) -> (f32, f32) {
        match self {
            Direction::TopDown => (x, y),
            Direction::LeftRight => (y, x),
        }
    }
}

/// Transform built from a pair of closures.
pub struct FnTransform<F, G> {
    forward: F,
    inverse: G,
}

impl<F, G> FnTransform<F, G>
where
    F: Fn(f32, f32) -> (f32, f32),
    G: Fn(f32, f32) -> (f32, f32),
{
    pub fn new(forward: F, inverse: G) -> Self {
        Self { forward, inverse }
    }
}

impl<F, G> CoordinateTransform for FnTransform<F, G>
where
    F: Fn(f32, f32) -> (f32, f32),
    G: Fn(f32, f32) -> (f32, f32),
{
    fn transform(&self, position: f32, location: f32) -> (f32, f32) {
        (self.forward)(position, location)
    }

    fn inverse_transform(&self, x: f32, y: f32) -> (f32, f32) {
        (self.inverse)(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_round_trip() {
        for direction in [Direction::TopDown, Direction::LeftRight] {
            let (x, y) = direction.transform(3.0, 7.0);
            assert_eq!(direction.inverse_transform(x, y), (3.0, 7.0));
        }
        assert_eq!(Direction::LeftRight.transform(3.0, 7.0), (7.0, 3.0));
    }

    #[test]
    fn parses_direction_tokens() {
        assert_eq!(Direction::from_token("TB"), Some(Direction::TopDown));
        assert_eq!(Direction::from_token("LR"), Some(Direction::LeftRight));
        assert_eq!(Direction::from_token("RL"), None);
    }

    #[test]
    fn closure_transform_applies_both_directions() {
        let scaled = FnTransform::new(|p, l| (p * 2.0, l), |x, y| (x / 2.0, y));
        assert_eq!(scaled.transform(4.0, 1.0), (8.0, 1.0));
        assert_eq!(scaled.inverse_transform(8.0, 1.0), (4.0, 1.0));
    }
}
