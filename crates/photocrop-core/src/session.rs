//! Crop session: wires pointer input to the geometry and the rasterizer.
//!
//! A session lives as long as the photo picker is mounted. It owns the only
//! copy of the selection and drag mode, and talks to the hosting UI through
//! [`CropHost`].
//!
//! # Pointer capture
//!
//! While a gesture is active the host must deliver move/up events even when
//! the pointer leaves the image, which usually means window-level listeners.
//! The session asks the host for a [`CropHost::Capture`] on drag start and
//! drops it on pointer-up, pointer-cancel, cancel, close, or when the session
//! itself is dropped. Hosts remove their listeners in the capture's `Drop`.
//!
//! # Asynchronous encode
//!
//! Encoding the final square can be moved off the event handler:
//!
//! ```ignore
//! if let Some(job) = session.begin_confirm() {
//!     let result = job.run(); // on a worker, a microtask, ...
//!     session.finish_confirm(result);
//! }
//! ```
//!
//! Every job carries a ticket. A result whose ticket is no longer current
//! (the session was cancelled, closed, or a newer confirm was issued) is
//! dropped without calling the host.

use std::sync::Arc;

use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::config::{ConfigError, CropConfig};
use crate::decode::{DecodedImage, FilterType};
use crate::drag::{reduce, CropState, DragMode, PointerEvent};
use crate::geometry::{classify, is_confirmable, DisplayRect, Hit, ImageDimensions, Rect, Viewport};
use crate::raster::{encode_square_crop, to_square_crop, RasterError, RasterOutput};

/// The hosting UI's side of a crop session.
pub trait CropHost {
    /// Registration of the listeners that follow a drag outside the image.
    /// Released by dropping it.
    type Capture;

    /// Start delivering pointer move/up/cancel events for an active drag.
    fn capture_pointer(&mut self) -> Self::Capture;

    /// The user confirmed; `output` is the encoded square for upload.
    fn confirmed(&mut self, output: RasterOutput);

    /// The user cancelled; nothing is emitted.
    fn cancelled(&mut self);

    /// The selection changed. Hosts typically refresh the live preview here.
    fn selection_changed(&mut self, _rect: Option<&Rect>) {}
}

/// Errors from starting a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Source image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

/// Identifies the confirm request an encode result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodeTicket {
    generation: u64,
}

/// A snapshot of everything needed to encode the confirmed crop.
///
/// Owns its inputs, so it can be sent to another thread or deferred to a
/// later tick of the event loop.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    ticket: EncodeTicket,
    image: Arc<DecodedImage>,
    rect: Rect,
    output_size: u32,
    quality: u8,
    filter: FilterType,
}

impl EncodeJob {
    pub fn ticket(&self) -> EncodeTicket {
        self.ticket
    }

    /// The selection at the moment confirm was pressed.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Rasterize and encode. Pure; does not touch the session.
    pub fn run(self) -> EncodeResult {
        let output = encode_square_crop(
            &self.image,
            &self.rect,
            self.output_size,
            self.quality,
            self.filter,
        );
        EncodeResult {
            ticket: self.ticket,
            output,
        }
    }
}

/// Outcome of an [`EncodeJob`], to be handed back to the session.
#[derive(Debug)]
pub struct EncodeResult {
    pub ticket: EncodeTicket,
    pub output: Result<RasterOutput, RasterError>,
}

/// What happened to an encode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Passed to [`CropHost::confirmed`]; the session is now closed.
    Delivered,
    /// Stale ticket or closed session; the host was not called.
    Discarded,
    /// Rasterization failed; the session stays open and nothing was emitted.
    Aborted,
}

/// Interactive crop over one source image.
pub struct CropSession<H: CropHost> {
    image: Arc<DecodedImage>,
    dimensions: ImageDimensions,
    display: DisplayRect,
    config: CropConfig,
    state: CropState,
    capture: Option<H::Capture>,
    generation: u64,
    pending: Option<u64>,
    open: bool,
    host: H,
}

impl<H: CropHost> CropSession<H> {
    /// Start a session once the source image has loaded.
    ///
    /// The display rect starts out empty; pointer input is ignored until
    /// [`set_display_rect`](Self::set_display_rect) reports a laid-out image.
    pub fn new(
        image: impl Into<Arc<DecodedImage>>,
        config: CropConfig,
        host: H,
    ) -> Result<Self, SessionError> {
        config.validate()?;

        let image = image.into();
        if image.is_empty() {
            return Err(SessionError::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }

        debug!(
            "crop session opened on {}x{} image",
            image.width, image.height
        );

        Ok(Self {
            dimensions: image.dimensions(),
            image,
            display: DisplayRect::default(),
            config,
            state: CropState::new(),
            capture: None,
            generation: 0,
            pending: None,
            open: true,
            host,
        })
    }

    /// Update where the image is rendered on screen.
    pub fn set_display_rect(&mut self, display: DisplayRect) {
        self.display = display;
    }

    pub fn display_rect(&self) -> DisplayRect {
        self.display
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.dimensions, self.display)
    }

    pub fn config(&self) -> &CropConfig {
        &self.config
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn rect(&self) -> Option<Rect> {
        self.state.rect
    }

    pub fn mode(&self) -> DragMode {
        self.state.mode
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    /// Whether a pointer capture is currently held.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// What a pointer-down at this client point would grab. For hover cursors.
    pub fn hover(&self, client_x: f64, client_y: f64) -> Hit {
        classify(
            client_x,
            client_y,
            self.state.rect.as_ref(),
            &self.display,
            &self.dimensions,
            self.config.tolerance_px,
        )
    }

    pub fn pointer_down(&mut self, client_x: f64, client_y: f64) {
        if !self.open {
            return;
        }

        let was_idle = self.state.mode.is_idle();
        self.dispatch(PointerEvent::Down {
            x: client_x,
            y: client_y,
        });

        if was_idle && !self.state.mode.is_idle() {
            debug!(
                "{} gesture started at ({client_x}, {client_y})",
                self.state.mode.name()
            );
            self.capture = Some(self.host.capture_pointer());
        }
    }

    pub fn pointer_move(&mut self, client_x: f64, client_y: f64) {
        if !self.open {
            return;
        }

        self.dispatch(PointerEvent::Move {
            x: client_x,
            y: client_y,
        });
    }

    pub fn pointer_up(&mut self) {
        self.end_gesture(PointerEvent::Up);
    }

    pub fn pointer_cancel(&mut self) {
        self.end_gesture(PointerEvent::Cancel);
    }

    fn end_gesture(&mut self, event: PointerEvent) {
        if !self.state.mode.is_idle() {
            debug!("{} gesture ended", self.state.mode.name());
        }
        self.dispatch(event);
        self.capture = None;
    }

    fn dispatch(&mut self, event: PointerEvent) {
        let next = reduce(self.state, event, &self.viewport(), &self.config.limits());
        let changed = next.rect != self.state.rect;
        self.state = next;

        if changed {
            trace!("selection now {:?}", self.state.rect);
            self.host.selection_changed(self.state.rect.as_ref());
        }
    }

    /// Drop the selection and any active gesture; the session stays open.
    pub fn reset_selection(&mut self) {
        self.capture = None;
        let had_rect = self.state.rect.is_some();
        self.state = CropState::new();
        if had_rect {
            self.host.selection_changed(None);
        }
    }

    /// Confirm is enabled only for an open session with a large enough selection.
    pub fn can_confirm(&self) -> bool {
        self.open && is_confirmable(self.state.rect.as_ref(), self.config.min_size)
    }

    /// Live preview pixels at `preview_output_size`.
    ///
    /// `None` while confirm is disabled; the rasterizer is not called then.
    pub fn preview(&self) -> Option<Result<DecodedImage, RasterError>> {
        if !self.can_confirm() {
            return None;
        }
        let rect = self.state.rect?;
        Some(to_square_crop(
            &self.image,
            &rect,
            self.config.preview_output_size,
            self.config.filter,
        ))
    }

    /// Snapshot the selection into an encode job.
    ///
    /// Returns `None` when confirm is disabled. A new job supersedes any job
    /// still in flight.
    pub fn begin_confirm(&mut self) -> Option<EncodeJob> {
        if !self.can_confirm() {
            return None;
        }
        let rect = self.state.rect?;

        self.generation += 1;
        self.pending = Some(self.generation);
        debug!("encode job {} issued for {:?}", self.generation, rect);

        Some(EncodeJob {
            ticket: EncodeTicket {
                generation: self.generation,
            },
            image: Arc::clone(&self.image),
            rect,
            output_size: self.config.save_output_size,
            quality: self.config.jpeg_quality(),
            filter: self.config.filter,
        })
    }

    /// Hand a finished encode back to the session.
    pub fn finish_confirm(&mut self, result: EncodeResult) -> Delivery {
        let generation = result.ticket.generation;
        if !self.open || self.pending != Some(generation) {
            debug!("discarding stale encode result {generation}");
            return Delivery::Discarded;
        }
        self.pending = None;

        match result.output {
            Ok(output) => {
                info!(
                    "crop confirmed: {}x{} {} ({} bytes)",
                    output.width,
                    output.height,
                    output.mime,
                    output.len()
                );
                self.shutdown();
                self.host.confirmed(output);
                Delivery::Delivered
            }
            Err(err) => {
                warn!("crop rasterization failed: {err}");
                Delivery::Aborted
            }
        }
    }

    /// Run the encode on the calling thread.
    ///
    /// Returns `None` when confirm is disabled.
    pub fn confirm_blocking(&mut self) -> Option<Delivery> {
        let job = self.begin_confirm()?;
        Some(self.finish_confirm(job.run()))
    }

    /// User cancelled: release everything and notify the host.
    pub fn cancel(&mut self) {
        if !self.open {
            return;
        }
        debug!("crop session cancelled");
        self.shutdown();
        self.host.cancelled();
    }

    /// Tear down without notifying the host (the picker was unmounted).
    pub fn close(&mut self) {
        if self.open {
            debug!("crop session closed");
            self.shutdown();
        }
    }

    fn shutdown(&mut self) {
        self.capture = None;
        self.state = CropState::new();
        self.pending = None;
        self.generation += 1;
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts live captures through a shared cell.
    struct TestCapture(Rc<Cell<usize>>);

    impl Drop for TestCapture {
        fn drop(&mut self) {
            self.0.set(self.0.get() - 1);
        }
    }

    #[derive(Default)]
    struct RecordingHost {
        live_captures: Rc<Cell<usize>>,
        captures_taken: usize,
        confirmed: Vec<RasterOutput>,
        cancelled: usize,
        selections: Vec<Option<Rect>>,
    }

    impl CropHost for RecordingHost {
        type Capture = TestCapture;

        fn capture_pointer(&mut self) -> TestCapture {
            self.captures_taken += 1;
            self.live_captures.set(self.live_captures.get() + 1);
            TestCapture(Rc::clone(&self.live_captures))
        }

        fn confirmed(&mut self, output: RasterOutput) {
            self.confirmed.push(output);
        }

        fn cancelled(&mut self) {
            self.cancelled += 1;
        }

        fn selection_changed(&mut self, rect: Option<&Rect>) {
            self.selections.push(rect.copied());
        }
    }

    fn test_image(width: u32, height: u32) -> DecodedImage {
        let pixels = (0..(width * height * 3) as usize)
            .map(|i| (i % 256) as u8)
            .collect();
        DecodedImage::new(width, height, pixels)
    }

    /// 100x80 image shown 1:1 at the client origin.
    fn session() -> CropSession<RecordingHost> {
        let mut s = CropSession::new(
            test_image(100, 80),
            CropConfig::default(),
            RecordingHost::default(),
        )
        .unwrap();
        s.set_display_rect(DisplayRect::new(0.0, 0.0, 100.0, 80.0));
        s
    }

    fn draw(s: &mut CropSession<RecordingHost>, from: (f64, f64), to: (f64, f64)) {
        s.pointer_down(from.0, from.1);
        s.pointer_move(to.0, to.1);
        s.pointer_up();
    }

    fn live_captures(s: &CropSession<RecordingHost>) -> usize {
        s.host().live_captures.get()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut config = CropConfig::default();
        config.save_output_size = 0;
        let result = CropSession::new(test_image(10, 10), config, RecordingHost::default());
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_new_rejects_empty_image() {
        let result = CropSession::new(
            DecodedImage::new(0, 0, vec![]),
            CropConfig::default(),
            RecordingHost::default(),
        );
        assert!(matches!(result, Err(SessionError::EmptyImage { .. })));
    }

    #[test]
    fn test_draw_gesture_sets_rect_and_notifies() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (60.0, 50.0));

        let expected = Rect::new(10.0, 10.0, 50.0, 40.0);
        assert_eq!(s.rect(), Some(expected));
        assert!(s.mode().is_idle());
        assert_eq!(s.host().selections, vec![Some(expected)]);
    }

    #[test]
    fn test_non_finite_input_never_reaches_host() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (60.0, 50.0));

        s.pointer_down(35.0, 30.0);
        s.pointer_move(f64::NAN, 40.0);
        s.pointer_up();
        s.pointer_down(f64::INFINITY, 5.0);
        assert!(!s.is_capturing());

        s.set_display_rect(DisplayRect::new(f64::NAN, 0.0, 100.0, 80.0));
        s.pointer_down(5.0, 5.0);
        s.pointer_move(90.0, 70.0);
        s.pointer_up();

        let expected = Rect::new(10.0, 10.0, 50.0, 40.0);
        assert_eq!(s.rect(), Some(expected));
        assert_eq!(s.host().selections, vec![Some(expected)]);
    }

    #[test]
    fn test_capture_held_only_during_gesture() {
        let mut s = session();
        assert!(!s.is_capturing());

        s.pointer_down(10.0, 10.0);
        assert!(s.is_capturing());
        assert_eq!(live_captures(&s), 1);

        s.pointer_move(40.0, 40.0);
        assert_eq!(live_captures(&s), 1);

        s.pointer_up();
        assert!(!s.is_capturing());
        assert_eq!(live_captures(&s), 0);
    }

    #[test]
    fn test_pointer_cancel_releases_capture_and_keeps_rect() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (60.0, 50.0));
        let rect = s.rect();

        s.pointer_down(35.0, 30.0);
        s.pointer_cancel();

        assert_eq!(live_captures(&s), 0);
        assert_eq!(s.rect(), rect);
    }

    #[test]
    fn test_second_down_does_not_stack_captures() {
        let mut s = session();
        s.pointer_down(10.0, 10.0);
        s.pointer_down(20.0, 20.0);

        assert_eq!(s.host().captures_taken, 1);
        assert_eq!(live_captures(&s), 1);
    }

    #[test]
    fn test_input_ignored_before_layout() {
        let mut s = CropSession::new(
            test_image(100, 80),
            CropConfig::default(),
            RecordingHost::default(),
        )
        .unwrap();

        s.pointer_down(10.0, 10.0);
        s.pointer_move(50.0, 50.0);
        s.pointer_up();

        assert_eq!(s.rect(), None);
        assert_eq!(s.host().captures_taken, 0);
    }

    #[test]
    fn test_hover_reports_handles() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 70.0));

        assert_eq!(s.hover(10.0, 10.0).cursor(), "nw-resize");
        assert_eq!(s.hover(50.0, 40.0), Hit::Interior);
    }

    #[test]
    fn test_confirm_disabled_without_selection() {
        let mut s = session();
        assert!(!s.can_confirm());
        assert!(s.preview().is_none());
        assert!(s.begin_confirm().is_none());
        assert_eq!(s.confirm_blocking(), None);
    }

    #[test]
    fn test_min_size_rejection() {
        let mut s = session();
        // Too small a selection is unreachable through gestures, so plant one
        s.state = CropState::with_rect(Rect::new(10.0, 10.0, 5.0, 50.0));

        assert!(!s.can_confirm());
        assert!(s.preview().is_none());
        assert!(s.begin_confirm().is_none());
        assert!(s.host().confirmed.is_empty());
    }

    #[test]
    fn test_preview_size() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let preview = s.preview().unwrap().unwrap();
        assert_eq!((preview.width, preview.height), (128, 128));
    }

    #[test]
    fn test_confirm_delivers_and_closes() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        assert_eq!(s.confirm_blocking(), Some(Delivery::Delivered));
        assert!(!s.is_open());
        assert_eq!(s.rect(), None);

        let output = &s.host().confirmed[0];
        assert_eq!((output.width, output.height), (512, 512));
        assert_eq!(output.mime, "image/jpeg");
        assert_eq!(&output.bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_job_snapshot_ignores_later_edits() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (50.0, 50.0));

        let job = s.begin_confirm().unwrap();
        draw(&mut s, (70.0, 70.0), (95.0, 78.0));
        assert_eq!(s.rect(), Some(Rect::new(70.0, 70.0, 25.0, 10.0)));

        assert_eq!(job.rect(), Rect::new(10.0, 10.0, 40.0, 40.0));
        assert_eq!(s.finish_confirm(job.run()), Delivery::Delivered);
    }

    #[test]
    fn test_result_after_cancel_is_discarded() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let job = s.begin_confirm().unwrap();
        s.cancel();
        let result = job.run();

        assert_eq!(s.finish_confirm(result), Delivery::Discarded);
        assert!(s.host().confirmed.is_empty());
        assert_eq!(s.host().cancelled, 1);
    }

    #[test]
    fn test_result_after_close_is_discarded() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let job = s.begin_confirm().unwrap();
        s.close();

        assert_eq!(s.finish_confirm(job.run()), Delivery::Discarded);
        assert!(s.host().confirmed.is_empty());
        assert_eq!(s.host().cancelled, 0);
    }

    #[test]
    fn test_newer_confirm_supersedes_older() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let first = s.begin_confirm().unwrap();
        let second = s.begin_confirm().unwrap();
        assert_ne!(first.ticket(), second.ticket());

        assert_eq!(s.finish_confirm(first.run()), Delivery::Discarded);
        assert_eq!(s.finish_confirm(second.run()), Delivery::Delivered);
        assert_eq!(s.host().confirmed.len(), 1);
    }

    #[test]
    fn test_result_delivered_only_once() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let job = s.begin_confirm().unwrap();
        let duplicate = job.clone();

        assert_eq!(s.finish_confirm(job.run()), Delivery::Delivered);
        assert_eq!(s.finish_confirm(duplicate.run()), Delivery::Discarded);
        assert_eq!(s.host().confirmed.len(), 1);
    }

    #[test]
    fn test_failed_encode_aborts_without_side_effects() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let job = s.begin_confirm().unwrap();
        let result = EncodeResult {
            ticket: job.ticket(),
            output: Err(RasterError::InvalidBuffer),
        };

        assert_eq!(s.finish_confirm(result), Delivery::Aborted);
        assert!(s.is_open());
        assert!(s.host().confirmed.is_empty());
        assert!(s.can_confirm());
    }

    #[test]
    fn test_job_runs_on_another_thread() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        let job = s.begin_confirm().unwrap();
        let result = std::thread::spawn(move || job.run()).join().unwrap();

        assert_eq!(s.finish_confirm(result), Delivery::Delivered);
    }

    #[test]
    fn test_cancel_tears_down_active_drag() {
        let mut s = session();
        s.pointer_down(10.0, 10.0);
        s.pointer_move(50.0, 50.0);
        assert_eq!(live_captures(&s), 1);

        s.cancel();

        assert_eq!(live_captures(&s), 0);
        assert_eq!(s.rect(), None);
        assert!(s.mode().is_idle());
        assert!(!s.is_open());
        assert_eq!(s.host().cancelled, 1);

        // Closed sessions ignore further input and a second cancel
        s.pointer_down(10.0, 10.0);
        s.cancel();
        assert_eq!(s.host().captures_taken, 1);
        assert_eq!(s.host().cancelled, 1);
    }

    #[test]
    fn test_drop_releases_capture() {
        let live = Rc::new(Cell::new(0));
        let host = RecordingHost {
            live_captures: Rc::clone(&live),
            ..Default::default()
        };
        let mut s = CropSession::new(test_image(100, 80), CropConfig::default(), host).unwrap();
        s.set_display_rect(DisplayRect::new(0.0, 0.0, 100.0, 80.0));

        s.pointer_down(10.0, 10.0);
        assert_eq!(live.get(), 1);

        drop(s);
        assert_eq!(live.get(), 0);
    }

    #[test]
    fn test_reset_selection() {
        let mut s = session();
        draw(&mut s, (10.0, 10.0), (90.0, 50.0));

        s.reset_selection();

        assert_eq!(s.rect(), None);
        assert!(!s.can_confirm());
        assert_eq!(s.host().selections.last(), Some(&None));
        assert!(s.is_open());
    }
}
