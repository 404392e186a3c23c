//! Fixed-size square selection over an image, and the drag gesture that moves it.
//!
//! Everything here works in image-pixel space. Pointer positions arrive in
//! display space and are translated through [`DisplayScale`] before they reach
//! the geometry.

use crate::display::DisplayScale;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Intrinsic pixel dimensions of the loaded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageBounds {
    pub width: u32,
    pub height: u32,
}

impl ImageBounds {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when a square of `size` fits on both axes.
    pub fn fits(&self, size: SelectionSize) -> bool {
        size.side() <= self.width && size.side() <= self.height
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SelectionSize {
    S256,
    #[default]
    S512,
    S1024,
}

impl SelectionSize {
    pub const ALL: [SelectionSize; 3] = [Self::S256, Self::S512, Self::S1024];

    pub const fn side(self) -> u32 {
        match self {
            SelectionSize::S256 => 256,
            SelectionSize::S512 => 512,
            SelectionSize::S1024 => 1024,
        }
    }
}

impl std::fmt::Display for SelectionSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let side = self.side();
        write!(f, "{side} × {side}")
    }
}

/// Top-left corner in image pixels plus the square's side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub size: SelectionSize,
}

impl SelectionRect {
    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        let side = self.size.side() as f32;
        p.x >= self.x && p.x <= self.x + side && p.y >= self.y && p.y <= self.y + side
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DragState {
    pub active: bool,
    pub grab_offset: Point,
}

/// Where a press landed: on the canvas body, or on the selection overlay itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragOrigin {
    Canvas,
    Handle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Leave,
}

/// Mouse or first-touch input, in display coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub position: Point,
    pub origin: DragOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    NoImage,
    Idle,
    Dragging,
}

// max(0, min(v, bound - size)); a selection larger than the bound pins to 0.
fn clamp_axis(value: f32, bound: u32, size: SelectionSize) -> f32 {
    value.min(bound as f32 - size.side() as f32).max(0.0)
}

fn centered(bound: u32, size: SelectionSize) -> f32 {
    ((i64::from(bound) - i64::from(size.side())) / 2).max(0) as f32
}

pub fn initialize(bounds: ImageBounds, size: SelectionSize) -> SelectionRect {
    SelectionRect {
        x: centered(bounds.width, size),
        y: centered(bounds.height, size),
        size,
    }
}

/// Keeps the top-left corner and only moves it as far as the new size requires.
pub fn change_size(
    new_size: SelectionSize,
    bounds: ImageBounds,
    current: SelectionRect,
) -> SelectionRect {
    SelectionRect {
        x: clamp_axis(current.x, bounds.width, new_size),
        y: clamp_axis(current.y, bounds.height, new_size),
        size: new_size,
    }
}

pub fn begin_drag(pointer: Point, current: SelectionRect, origin: DragOrigin) -> DragState {
    if origin == DragOrigin::Canvas && !current.contains(pointer) {
        return DragState::default();
    }
    DragState {
        active: true,
        grab_offset: Point::new(pointer.x - current.x, pointer.y - current.y),
    }
}

/// Returns `None` when no drag is in progress.
pub fn update_drag(
    pointer: Point,
    drag: DragState,
    bounds: ImageBounds,
    size: SelectionSize,
) -> Option<SelectionRect> {
    if !drag.active {
        return None;
    }
    Some(SelectionRect {
        x: clamp_axis(pointer.x - drag.grab_offset.x, bounds.width, size),
        y: clamp_axis(pointer.y - drag.grab_offset.y, bounds.height, size),
        size,
    })
}

pub fn end_drag() -> DragState {
    DragState::default()
}

/// Owns the selection for the currently loaded image.
#[derive(Debug, Default)]
pub struct SelectionController {
    bounds: Option<ImageBounds>,
    size: SelectionSize,
    rect: Option<SelectionRect>,
    drag: DragState,
}

impl SelectionController {
    pub fn new(size: SelectionSize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    pub fn state(&self) -> ControllerState {
        match (self.rect, self.drag.active) {
            (None, _) => ControllerState::NoImage,
            (Some(_), false) => ControllerState::Idle,
            (Some(_), true) => ControllerState::Dragging,
        }
    }

    pub fn rect(&self) -> Option<SelectionRect> {
        self.rect
    }

    pub fn size(&self) -> SelectionSize {
        self.size
    }

    pub fn bounds(&self) -> Option<ImageBounds> {
        self.bounds
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    /// Replaces the bounds wholesale and re-centers, abandoning any drag.
    pub fn load_image(&mut self, bounds: ImageBounds) -> SelectionRect {
        let rect = initialize(bounds, self.size);
        self.bounds = Some(bounds);
        self.rect = Some(rect);
        self.drag = end_drag();
        if !bounds.fits(self.size) {
            log::info!(
                "selection {} is larger than the {}x{} image; it will be padded on export",
                self.size,
                bounds.width,
                bounds.height
            );
        }
        rect
    }

    /// The size is always remembered; the rectangle only changes once an image is loaded.
    pub fn change_size(&mut self, new_size: SelectionSize) -> Option<SelectionRect> {
        self.size = new_size;
        let (bounds, current) = (self.bounds?, self.rect?);
        let rect = change_size(new_size, bounds, current);
        self.rect = Some(rect);
        Some(rect)
    }

    pub fn begin_drag(&mut self, pointer: Point, origin: DragOrigin) -> bool {
        if let Some(current) = self.rect {
            self.drag = begin_drag(pointer, current, origin);
            if self.drag.active {
                log::debug!("drag started at ({:.1}, {:.1})", pointer.x, pointer.y);
            }
        }
        self.drag.active
    }

    pub fn update_drag(&mut self, pointer: Point) -> Option<SelectionRect> {
        let rect = update_drag(pointer, self.drag, self.bounds?, self.size)?;
        self.rect = Some(rect);
        Some(rect)
    }

    pub fn end_drag(&mut self) {
        if self.drag.active {
            log::debug!("drag ended");
        }
        self.drag = end_drag();
    }

    /// Single entry point for pointer input; dispatches on the current state.
    /// Returns the new rectangle when the geometry changed.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        display: &DisplayScale,
    ) -> Option<SelectionRect> {
        let pointer = display.to_image(event.position);
        match (self.state(), event.phase) {
            (ControllerState::NoImage, _) => None,
            (ControllerState::Idle, PointerPhase::Down) => {
                self.begin_drag(pointer, event.origin);
                None
            }
            (ControllerState::Dragging, PointerPhase::Move) => self.update_drag(pointer),
            (_, PointerPhase::Up | PointerPhase::Leave) => {
                self.end_drag();
                None
            }
            _ => None,
        }
    }
}
