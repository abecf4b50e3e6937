//! Drag state machine for the crop selection.
//!
//! The interaction is an explicit tagged union processed by a pure reducer:
//!
//! ```text
//! Idle --down(Outside)--------> Draw      --up/cancel--> Idle
//! Idle --down(Interior)-------> Move      --up/cancel--> Idle
//! Idle --down(Corner/Edge d)--> Resize(d) --up/cancel--> Idle
//! ```
//!
//! Each active mode carries the [`DragAnchor`] captured at pointer-down, so a
//! mode without an anchor (or two modes at once) cannot be represented. The
//! selection rectangle survives the return to `Idle`; only a new draw gesture
//! replaces it.

use serde::{Deserialize, Serialize};

use crate::geometry::{
    classify, clamp_rect, clamp_translation, client_delta_to_bitmap, to_bitmap, Direction, Hit,
    Rect, Viewport,
};

/// Snapshot taken at pointer-down, the reference for all deltas in a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragAnchor {
    pub client_x: f64,
    pub client_y: f64,
    pub rect_at_start: Option<Rect>,
}

/// The active pointer interaction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DragMode {
    #[default]
    Idle,
    /// Drawing a new selection from the anchor point.
    Draw(DragAnchor),
    /// Translating the selection.
    Move(DragAnchor),
    /// Dragging one of the eight handles.
    Resize(Direction, DragAnchor),
}

impl DragMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, DragMode::Idle)
    }

    pub fn anchor(&self) -> Option<&DragAnchor> {
        match self {
            DragMode::Idle => None,
            DragMode::Draw(anchor) | DragMode::Move(anchor) | DragMode::Resize(_, anchor) => {
                Some(anchor)
            }
        }
    }

    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DragMode::Idle => "idle",
            DragMode::Draw(_) => "draw",
            DragMode::Move(_) => "move",
            DragMode::Resize(..) => "resize",
        }
    }
}

/// Unified pointer input, mouse and touch alike, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    Up,
    Cancel,
}

/// Geometry limits the reducer enforces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragLimits {
    /// Minimum rectangle side, bitmap pixels.
    pub min_size: f64,
    /// Handle hit radius, client pixels.
    pub tolerance_px: f64,
}

impl Default for DragLimits {
    fn default() -> Self {
        Self {
            min_size: crate::config::DEFAULT_MIN_SIZE,
            tolerance_px: crate::config::DEFAULT_TOLERANCE_PX,
        }
    }
}

/// Reducer state: the selection plus the active mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropState {
    pub rect: Option<Rect>,
    pub mode: DragMode,
}

impl CropState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rect(rect: Rect) -> Self {
        Self {
            rect: Some(rect),
            mode: DragMode::Idle,
        }
    }
}

/// Compute the next state for a pointer event.
///
/// Down and move events are ignored while the viewport is not ready, so no
/// coordinate is ever derived from a zero-sized layout. Up and cancel always
/// return to `Idle` and never touch the rectangle.
pub fn reduce(
    state: CropState,
    event: PointerEvent,
    viewport: &Viewport,
    limits: &DragLimits,
) -> CropState {
    match event {
        PointerEvent::Down { x, y } => pointer_down(state, x, y, viewport, limits),
        PointerEvent::Move { x, y } => pointer_move(state, x, y, viewport, limits),
        PointerEvent::Up | PointerEvent::Cancel => CropState {
            mode: DragMode::Idle,
            ..state
        },
    }
}

fn pointer_down(
    state: CropState,
    x: f64,
    y: f64,
    viewport: &Viewport,
    limits: &DragLimits,
) -> CropState {
    // One gesture at a time; a second button or finger is ignored
    if !state.mode.is_idle() || !viewport.is_ready() || !x.is_finite() || !y.is_finite() {
        return state;
    }

    let anchor = DragAnchor {
        client_x: x,
        client_y: y,
        rect_at_start: state.rect,
    };

    let hit = classify(
        x,
        y,
        state.rect.as_ref(),
        &viewport.display,
        &viewport.image,
        limits.tolerance_px,
    );

    let mode = match hit {
        Hit::Outside => DragMode::Draw(anchor),
        Hit::Interior => DragMode::Move(anchor),
        Hit::Corner(dir) | Hit::Edge(dir) => DragMode::Resize(dir, anchor),
    };

    CropState { mode, ..state }
}

fn pointer_move(
    state: CropState,
    x: f64,
    y: f64,
    viewport: &Viewport,
    limits: &DragLimits,
) -> CropState {
    if !viewport.is_ready() {
        return state;
    }

    let next = match state.mode {
        DragMode::Idle => None,
        DragMode::Draw(anchor) => draw(&anchor, x, y, viewport, limits),
        DragMode::Move(anchor) => translate(&anchor, x, y, viewport),
        DragMode::Resize(dir, anchor) => resize(dir, &anchor, x, y, viewport, limits),
    };

    match next {
        Some(rect) => CropState {
            rect: Some(rect),
            ..state
        },
        None => state,
    }
}

fn draw(anchor: &DragAnchor, x: f64, y: f64, viewport: &Viewport, limits: &DragLimits) -> Option<Rect> {
    let Viewport { image, display } = viewport;
    let start = to_bitmap(anchor.client_x, anchor.client_y, display, image)?;
    let current = to_bitmap(x, y, display, image)?;

    Some(clamp_rect(
        Rect::from_corners(start, current),
        image,
        limits.min_size,
    ))
}

fn translate(anchor: &DragAnchor, x: f64, y: f64, viewport: &Viewport) -> Option<Rect> {
    let start = anchor.rect_at_start?;
    let delta = client_delta_to_bitmap(
        x - anchor.client_x,
        y - anchor.client_y,
        &viewport.display,
        &viewport.image,
    )?;

    Some(clamp_translation(
        start.translated(delta.x, delta.y),
        &viewport.image,
    ))
}

fn resize(
    dir: Direction,
    anchor: &DragAnchor,
    x: f64,
    y: f64,
    viewport: &Viewport,
    limits: &DragLimits,
) -> Option<Rect> {
    let start = anchor.rect_at_start?;
    let pointer = to_bitmap(x, y, &viewport.display, &viewport.image)?;

    Some(clamp_rect(
        resize_edges(dir, &start, pointer.x, pointer.y),
        &viewport.image,
        limits.min_size,
    ))
}

/// Move the edges named by `dir` to the pointer, leaving the opposite edges
/// where they were at the start of the gesture. Unclamped.
pub fn resize_edges(dir: Direction, start: &Rect, mx: f64, my: f64) -> Rect {
    let mut rect = *start;

    if dir.has_north() {
        rect.y = my;
        rect.h = start.y + start.h - my;
    }
    if dir.has_south() {
        rect.h = my - start.y;
    }
    if dir.has_west() {
        rect.x = mx;
        rect.w = start.x + start.w - mx;
    }
    if dir.has_east() {
        rect.w = mx - start.x;
    }

    rect
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::geometry::{satisfies_invariants, DisplayRect, ImageDimensions};
    use proptest::prelude::*;

    /// Image and display sizes, with arbitrary scale and offset.
    fn viewport_strategy() -> impl Strategy<Value = Viewport> {
        (
            20u32..=2000,
            20u32..=2000,
            -200.0f64..200.0,
            -200.0f64..200.0,
            0.1f64..4.0,
        )
            .prop_map(|(w, h, left, top, scale)| {
                Viewport::new(
                    ImageDimensions::new(w, h),
                    DisplayRect::new(left, top, w as f64 * scale, h as f64 * scale),
                )
            })
    }

    /// Mostly ordinary client coordinates, occasionally NaN or infinite.
    fn coordinate() -> impl Strategy<Value = f64> {
        prop_oneof![
            20 => -3000.0f64..9000.0,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
            1 => Just(f64::NEG_INFINITY),
        ]
    }

    /// Pointer events anywhere near (and well outside) the display.
    fn event_strategy() -> impl Strategy<Value = PointerEvent> {
        prop_oneof![
            3 => (coordinate(), coordinate())
                .prop_map(|(x, y)| PointerEvent::Down { x, y }),
            6 => (coordinate(), coordinate())
                .prop_map(|(x, y)| PointerEvent::Move { x, y }),
            2 => Just(PointerEvent::Up),
            1 => Just(PointerEvent::Cancel),
        ]
    }

    proptest! {
        /// Property: every reachable rectangle satisfies the invariants.
        #[test]
        fn prop_bounds_invariant(
            viewport in viewport_strategy(),
            events in prop::collection::vec(event_strategy(), 1..60),
        ) {
            let limits = DragLimits::default();
            let mut state = CropState::new();

            for event in events {
                state = reduce(state, event, &viewport, &limits);
                if let Some(rect) = state.rect {
                    prop_assert!(
                        satisfies_invariants(&rect, &viewport.image, limits.min_size),
                        "rect {:?} violates invariants for {:?} after {:?}",
                        rect,
                        viewport.image,
                        event
                    );
                }
            }
        }

        /// Property: up and cancel never change the rectangle.
        #[test]
        fn prop_release_preserves_rect(
            viewport in viewport_strategy(),
            events in prop::collection::vec(event_strategy(), 1..30),
            cancel in any::<bool>(),
        ) {
            let limits = DragLimits::default();
            let state = events
                .into_iter()
                .fold(CropState::new(), |s, e| reduce(s, e, &viewport, &limits));

            let end = if cancel { PointerEvent::Cancel } else { PointerEvent::Up };
            let released = reduce(state, end, &viewport, &limits);

            prop_assert!(released.mode.is_idle());
            prop_assert_eq!(released.rect, state.rect);
        }

        /// Property: draw direction does not matter.
        #[test]
        fn prop_draw_direction_independent(
            viewport in viewport_strategy(),
            ax in -500.0f64..3000.0,
            ay in -500.0f64..3000.0,
            bx in -500.0f64..3000.0,
            by in -500.0f64..3000.0,
        ) {
            let limits = DragLimits::default();
            let gesture = |from: (f64, f64), to: (f64, f64)| {
                [
                    PointerEvent::Down { x: from.0, y: from.1 },
                    PointerEvent::Move { x: to.0, y: to.1 },
                    PointerEvent::Up,
                ]
                .into_iter()
                .fold(CropState::new(), |s, e| reduce(s, e, &viewport, &limits))
            };

            prop_assert_eq!(
                gesture((ax, ay), (bx, by)).rect,
                gesture((bx, by), (ax, ay)).rect
            );
        }
    }
}
