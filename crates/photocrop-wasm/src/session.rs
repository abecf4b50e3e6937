//! Browser binding for an interactive crop session.
//!
//! The page forwards `pointerdown`/`pointermove` from the image element and
//! reports the element's bounding rect whenever layout changes. Once a drag
//! starts, move/up/cancel are received on `window` so the gesture survives the
//! pointer leaving the image. Those window listeners exist only for the length
//! of the drag.
//!
//! # Example
//!
//! ```typescript
//! import { decode_image, JsCropSession } from '@photocrop/wasm';
//!
//! const image = decode_image(bytes);
//! const session = new JsCropSession(
//!   image,
//!   { minSize: 10, saveOutputSize: 512 },
//!   (jpeg: Uint8Array) => upload(jpeg),
//!   () => closeModal(),
//! );
//!
//! const r = img.getBoundingClientRect();
//! session.set_display_rect(r.left, r.top, r.width, r.height);
//! img.onpointerdown = (e) => session.pointer_down(e.clientX, e.clientY);
//! img.onpointermove = (e) => (img.style.cursor = session.cursor(e.clientX, e.clientY));
//! saveButton.onclick = () => session.confirm();
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::debug;
use photocrop_core::geometry::{DisplayRect, Rect};
use photocrop_core::raster::RasterOutput;
use photocrop_core::session::{CropHost, CropSession};
use photocrop_core::CropConfig;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::console;

use crate::types::JsDecodedImage;

type Shared = Rc<RefCell<CropSession<BrowserHost>>>;
type WeakShared = Weak<RefCell<CropSession<BrowserHost>>>;

/// A JS callback queued while the session was borrowed.
struct PendingCall {
    callback: js_sys::Function,
    arg: Option<JsValue>,
}

/// Run queued callbacks. Must be called with no session borrow held, since a
/// callback may call straight back into the session.
fn invoke(calls: Vec<PendingCall>) {
    for call in calls {
        let result = match call.arg {
            Some(arg) => call.callback.call1(&JsValue::NULL, &arg),
            None => call.callback.call0(&JsValue::NULL),
        };
        if let Err(err) = result {
            console::error_1(&err);
        }
    }
}

#[derive(Clone, Copy)]
enum WindowEvent {
    Move,
    Up,
    Cancel,
}

impl WindowEvent {
    fn name(self) -> &'static str {
        match self {
            WindowEvent::Move => "pointermove",
            WindowEvent::Up => "pointerup",
            WindowEvent::Cancel => "pointercancel",
        }
    }
}

/// Window listeners for one drag. Dropping it removes them.
pub struct WindowCapture {
    window: web_sys::Window,
    listeners: Vec<(WindowEvent, Closure<dyn FnMut(web_sys::PointerEvent)>)>,
}

impl WindowCapture {
    fn attach(session: &WeakShared) -> Option<Self> {
        let window = web_sys::window()?;
        let mut listeners = Vec::with_capacity(3);

        for event in [WindowEvent::Move, WindowEvent::Up, WindowEvent::Cancel] {
            let weak = session.clone();
            let closure = Closure::<dyn FnMut(web_sys::PointerEvent)>::new(
                move |e: web_sys::PointerEvent| forward(&weak, event, &e),
            );
            match window.add_event_listener_with_callback(
                event.name(),
                closure.as_ref().unchecked_ref(),
            ) {
                Ok(()) => listeners.push((event, closure)),
                Err(err) => console::error_1(&err),
            }
        }

        Some(Self { window, listeners })
    }
}

impl Drop for WindowCapture {
    fn drop(&mut self) {
        for (event, closure) in &self.listeners {
            if let Err(err) = self
                .window
                .remove_event_listener_with_callback(event.name(), closure.as_ref().unchecked_ref())
            {
                console::error_1(&err);
            }
        }
    }
}

/// Route a window pointer event into the session.
fn forward(weak: &WeakShared, event: WindowEvent, e: &web_sys::PointerEvent) {
    let Some(shared) = weak.upgrade() else {
        return;
    };
    let calls = match shared.try_borrow_mut() {
        Ok(mut session) => {
            match event {
                WindowEvent::Move => {
                    session.pointer_move(f64::from(e.client_x()), f64::from(e.client_y()))
                }
                WindowEvent::Up => session.pointer_up(),
                WindowEvent::Cancel => session.pointer_cancel(),
            }
            session.host_mut().take_calls()
        }
        Err(_) => return,
    };
    invoke(calls);
}

/// Host side of the session: owns the page callbacks.
pub struct BrowserHost {
    session: WeakShared,
    on_confirm: js_sys::Function,
    on_cancel: js_sys::Function,
    on_change: Option<js_sys::Function>,
    outbox: Vec<PendingCall>,
}

impl BrowserHost {
    fn new(on_confirm: js_sys::Function, on_cancel: js_sys::Function) -> Self {
        Self {
            session: Weak::new(),
            on_confirm,
            on_cancel,
            on_change: None,
            outbox: Vec::new(),
        }
    }

    fn take_calls(&mut self) -> Vec<PendingCall> {
        std::mem::take(&mut self.outbox)
    }
}

impl CropHost for BrowserHost {
    type Capture = Option<WindowCapture>;

    fn capture_pointer(&mut self) -> Option<WindowCapture> {
        WindowCapture::attach(&self.session)
    }

    fn confirmed(&mut self, output: RasterOutput) {
        let bytes = js_sys::Uint8Array::from(output.bytes.as_slice());
        self.outbox.push(PendingCall {
            callback: self.on_confirm.clone(),
            arg: Some(bytes.into()),
        });
    }

    fn cancelled(&mut self) {
        self.outbox.push(PendingCall {
            callback: self.on_cancel.clone(),
            arg: None,
        });
    }

    fn selection_changed(&mut self, rect: Option<&Rect>) {
        let Some(callback) = &self.on_change else {
            return;
        };
        let arg = serde_wasm_bindgen::to_value(&rect).unwrap_or(JsValue::UNDEFINED);
        self.outbox.push(PendingCall {
            callback: callback.clone(),
            arg: Some(arg),
        });
    }
}

fn parse_config(config: JsValue) -> Result<CropConfig, JsValue> {
    if config.is_undefined() || config.is_null() {
        return Ok(CropConfig::default());
    }
    serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// An open crop dialog.
///
/// Callbacks are never invoked while the session is mid-update, so they may
/// read it back (e.g. `rect()` from `onChange`).
#[wasm_bindgen]
pub struct JsCropSession {
    inner: Shared,
}

#[wasm_bindgen]
impl JsCropSession {
    /// Open a session on a decoded image.
    ///
    /// `config` is a partial `CropConfig` object (camelCase keys) or
    /// undefined for defaults. `on_confirm` receives the JPEG bytes as a
    /// `Uint8Array`; `on_cancel` takes no arguments.
    #[wasm_bindgen(constructor)]
    pub fn new(
        image: &JsDecodedImage,
        config: JsValue,
        on_confirm: js_sys::Function,
        on_cancel: js_sys::Function,
    ) -> Result<JsCropSession, JsValue> {
        let config = parse_config(config)?;
        let session = CropSession::new(
            image.to_decoded(),
            config,
            BrowserHost::new(on_confirm, on_cancel),
        )
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

        let inner = Rc::new(RefCell::new(session));
        inner.borrow_mut().host_mut().session = Rc::downgrade(&inner);
        Ok(JsCropSession { inner })
    }

    /// Called with the selection (`{x, y, w, h}` in image pixels, or undefined)
    /// whenever it changes.
    pub fn set_on_change(&self, callback: Option<js_sys::Function>) {
        self.inner.borrow_mut().host_mut().on_change = callback;
    }

    /// Report the image element's client rect.
    pub fn set_display_rect(&self, left: f64, top: f64, width: f64, height: f64) {
        self.inner
            .borrow_mut()
            .set_display_rect(DisplayRect::new(left, top, width, height));
    }

    pub fn pointer_down(&self, client_x: f64, client_y: f64) {
        self.update(|s| s.pointer_down(client_x, client_y));
    }

    pub fn pointer_move(&self, client_x: f64, client_y: f64) {
        self.update(|s| s.pointer_move(client_x, client_y));
    }

    pub fn pointer_up(&self) {
        self.update(|s| s.pointer_up());
    }

    pub fn pointer_cancel(&self) {
        self.update(|s| s.pointer_cancel());
    }

    /// CSS cursor for a hover at this client position.
    pub fn cursor(&self, client_x: f64, client_y: f64) -> String {
        self.inner
            .borrow()
            .hover(client_x, client_y)
            .cursor()
            .to_string()
    }

    /// Current selection in image pixels, or undefined.
    pub fn rect(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.inner.borrow().rect()).unwrap_or(JsValue::UNDEFINED)
    }

    /// "idle", "draw", "move" or "resize".
    pub fn mode(&self) -> String {
        self.inner.borrow().mode().name().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn can_confirm(&self) -> bool {
        self.inner.borrow().can_confirm()
    }

    #[wasm_bindgen(getter)]
    pub fn is_open(&self) -> bool {
        self.inner.borrow().is_open()
    }

    /// Preview square, or undefined while the selection is too small.
    pub fn preview(&self) -> Result<Option<JsDecodedImage>, JsValue> {
        match self.inner.borrow().preview() {
            None => Ok(None),
            Some(Ok(img)) => Ok(Some(JsDecodedImage::from_decoded(img))),
            Some(Err(e)) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    /// Start encoding the selection.
    ///
    /// Returns false when confirm is disabled. The encode runs in a later
    /// task; `on_confirm` fires once it completes, unless the session was
    /// cancelled, closed or freed in the meantime.
    pub fn confirm(&self) -> bool {
        let Some(job) = self.inner.borrow_mut().begin_confirm() else {
            return false;
        };

        let weak = Rc::downgrade(&self.inner);
        let task = move || {
            let Some(shared) = weak.upgrade() else {
                debug!("crop session dropped before encode job ran");
                return;
            };
            let result = job.run();
            let calls = {
                let mut session = shared.borrow_mut();
                session.finish_confirm(result);
                session.host_mut().take_calls()
            };
            invoke(calls);
        };

        match web_sys::window() {
            Some(window) => {
                let callback = Closure::once_into_js(task);
                if let Err(err) = window.set_timeout_with_callback(callback.unchecked_ref()) {
                    console::error_1(&err);
                }
            }
            None => task(),
        }
        true
    }

    pub fn cancel(&self) {
        self.update(|s| s.cancel());
    }

    /// Release listeners without notifying `on_cancel`.
    pub fn close(&self) {
        self.update(|s| s.close());
    }

    pub fn reset(&self) {
        self.update(|s| s.reset_selection());
    }
}

impl JsCropSession {
    fn update(&self, f: impl FnOnce(&mut CropSession<BrowserHost>)) {
        let calls = {
            let mut session = self.inner.borrow_mut();
            f(&mut session);
            session.host_mut().take_calls()
        };
        invoke(calls);
    }
}

impl Drop for JsCropSession {
    fn drop(&mut self) {
        if let Ok(mut session) = self.inner.try_borrow_mut() {
            session.close();
        }
    }
}
