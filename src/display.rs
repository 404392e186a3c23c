//! Translation between on-screen (display) coordinates and image pixels.

use crate::selection::{Point, SelectionRect};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayScale {
    /// Top-left corner of the rendered image in display coordinates.
    pub origin: Point,
    /// Rendered width divided by intrinsic width.
    pub scale: f32,
}

impl Default for DisplayScale {
    fn default() -> Self {
        Self {
            origin: Point::default(),
            scale: 1.0,
        }
    }
}

impl DisplayScale {
    pub fn new(origin: Point, rendered_width: f32, intrinsic_width: u32) -> Self {
        let scale = if intrinsic_width == 0 || rendered_width <= 0.0 {
            1.0
        } else {
            rendered_width / intrinsic_width as f32
        };
        Self { origin, scale }
    }

    pub fn to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.origin.x) / self.scale,
            (p.y - self.origin.y) / self.scale,
        )
    }

    pub fn to_display(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.origin.x,
            p.y * self.scale + self.origin.y,
        )
    }

    /// Top-left corner and side length of the selection on screen.
    pub fn rect_to_display(&self, rect: &SelectionRect) -> (Point, f32) {
        (
            self.to_display(rect.top_left()),
            rect.size.side() as f32 * self.scale,
        )
    }
}
