//! Collision shape descriptors
//!
//! Every body part is either an axis-aligned rectangle or a circle, centered
//! on the part's position. Nothing ever rotates, so rectangles stay aligned.
//! The physics engine gets its own shape via [`Shape::to_collider_shape`].

use glam::Vec2;
use rapier2d::prelude::SharedShape;
use serde::{Deserialize, Serialize};

/// Collision shape of a body part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned rectangle given by its half extents
    Rect { half: Vec2 },
    Circle { radius: f32 },
}

impl Shape {
    pub fn rect(width: f32, height: f32) -> Self {
        Shape::Rect {
            half: Vec2::new(width / 2.0, height / 2.0),
        }
    }

    pub fn square(size: f32) -> Self {
        Self::rect(size, size)
    }

    pub fn circle(radius: f32) -> Self {
        Shape::Circle { radius }
    }

    /// Half extents of the shape's bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Rect { half } => half,
            Shape::Circle { radius } => Vec2::splat(radius),
        }
    }

    pub fn to_collider_shape(&self) -> SharedShape {
        match *self {
            Shape::Rect { half } => SharedShape::cuboid(half.x, half.y),
            Shape::Circle { radius } => SharedShape::ball(radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_becomes_cuboid() {
        let shape = Shape::rect(40.0, 10.0).to_collider_shape();
        let cuboid = shape.as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents.x, 20.0);
        assert_eq!(cuboid.half_extents.y, 5.0);
    }

    #[test]
    fn test_circle_becomes_ball() {
        let shape = Shape::circle(10.0).to_collider_shape();
        assert_eq!(shape.as_ball().unwrap().radius, 10.0);
        assert_eq!(Shape::circle(10.0).half_extents(), Vec2::splat(10.0));
    }
}
