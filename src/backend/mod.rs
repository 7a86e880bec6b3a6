/*!

The `Backend` trait is the seam between glctx and the window-system layer (GLX, WGL, EGL,
CGL...). A backend creates, binds and destroys native contexts and resolves function
addresses; glctx decides when to call it.

Drawables (windows, offscreen surfaces) are created by the window-system layer too. glctx
only needs to know whether they can be rendered to and which profile they want, which is
described by the `Drawable` trait.

*/
use std::error::Error;
use std::fmt;
use std::ops::Deref;
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;

use crate::context::{Attempt, GlProfile};

#[cfg(unix)]
pub mod dynlib;

/// Opaque handle of a native context (`GLXContext`, `HGLRC`, `EGLContext`...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub usize);

/// Opaque handle of a native drawable (`GLXDrawable`, `HDC`, `EGLSurface`...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DrawableHandle(pub usize);

/// Error reported by a backend when a native call fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeError(pub String);

impl fmt::Display for NativeError {
    #[inline]
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl Error for NativeError {}

/// A surface that a context renders to or reads from.
pub trait Drawable: Send + Sync {
    /// Returns the native handle of the drawable.
    fn handle(&self) -> DrawableHandle;

    /// Returns true if the native surface exists. A context can't be made current on a
    /// drawable that isn't realized.
    fn is_realized(&self) -> bool;

    /// Returns the profile the drawable was configured for.
    fn profile(&self) -> GlProfile;
}

impl<T> Drawable for Arc<T> where T: Drawable + ?Sized {
    #[inline]
    fn handle(&self) -> DrawableHandle {
        self.deref().handle()
    }

    #[inline]
    fn is_realized(&self) -> bool {
        self.deref().is_realized()
    }

    #[inline]
    fn profile(&self) -> GlProfile {
        self.deref().profile()
    }
}

/// Trait for types that can be used as a backend for a context.
///
/// All the `unsafe` functions must be called with valid handles previously returned by the
/// same backend.
pub trait Backend: Send + Sync {
    /// Returns true if `create_context_arb` can be used. Otherwise only
    /// `create_context_legacy` is called.
    #[inline]
    fn supports_versioned_creation(&self) -> bool {
        true
    }

    /// Creates a context with an explicit version and profile.
    ///
    /// Returns `None` if the driver refuses this combination.
    unsafe fn create_context_arb(&self, draw: &dyn Drawable, share: Option<NativeHandle>,
                                 attempt: &Attempt) -> Option<NativeHandle>;

    /// Creates a context without specifying a version.
    #[inline]
    unsafe fn create_context_legacy(&self, _draw: &dyn Drawable, _share: Option<NativeHandle>)
                                    -> Option<NativeHandle>
    {
        None
    }

    /// Makes the context current in the calling thread, drawing to `draw` and reading from
    /// `read`.
    unsafe fn make_current(&self, context: NativeHandle, draw: &dyn Drawable,
                           read: &dyn Drawable) -> Result<(), NativeError>;

    /// Makes the context no longer current in the calling thread.
    unsafe fn release(&self, context: NativeHandle) -> Result<(), NativeError>;

    /// Destroys the context.
    unsafe fn destroy(&self, context: NativeHandle) -> Result<(), NativeError>;

    /// Called when a context is made current again on the thread where it is already
    /// current, for example to follow a resized surface.
    #[inline]
    unsafe fn update(&self, _context: NativeHandle, _draw: &dyn Drawable) {}

    /// Returns the address of an OpenGL function.
    ///
    /// Must be called in the same thread and after the context has been made current.
    unsafe fn get_proc_address(&self, symbol: &str) -> *const c_void;

    /// Looks a symbol up directly in the OpenGL library, bypassing the driver's
    /// `GetProcAddress`.
    #[inline]
    unsafe fn dynamic_lookup(&self, _symbol: &str) -> *const c_void {
        ptr::null()
    }

    /// Returns the window-system extensions (`GLX_*`, `WGL_*`, `EGL_*`) separated by spaces.
    #[inline]
    fn platform_extensions(&self, _context: NativeHandle) -> String {
        String::new()
    }

    /// Returns the names of the window-system functions to resolve with `get_proc_address`.
    #[inline]
    fn platform_functions(&self) -> &[&'static str] {
        &[]
    }

    /// Sets the swap interval of the current context. Returns false if not supported.
    #[inline]
    unsafe fn set_swap_interval(&self, _context: NativeHandle, _interval: i32) -> bool {
        false
    }

    /// Identifies the device (display connection, adapter...) that contexts are created on.
    /// Negotiation results are cached per device.
    #[inline]
    fn device_id(&self) -> String {
        String::from("default")
    }

    /// Returns true on X11-like systems with several screens, where keeping contexts current
    /// between calls is known to break some drivers.
    #[inline]
    fn has_multiple_screens(&self) -> bool {
        false
    }
}

impl<T> Backend for Arc<T> where T: Backend + ?Sized {
    #[inline]
    fn supports_versioned_creation(&self) -> bool {
        self.deref().supports_versioned_creation()
    }

    #[inline]
    unsafe fn create_context_arb(&self, draw: &dyn Drawable, share: Option<NativeHandle>,
                                 attempt: &Attempt) -> Option<NativeHandle>
    {
        self.deref().create_context_arb(draw, share, attempt)
    }

    #[inline]
    unsafe fn create_context_legacy(&self, draw: &dyn Drawable, share: Option<NativeHandle>)
                                    -> Option<NativeHandle>
    {
        self.deref().create_context_legacy(draw, share)
    }

    #[inline]
    unsafe fn make_current(&self, context: NativeHandle, draw: &dyn Drawable,
                           read: &dyn Drawable) -> Result<(), NativeError>
    {
        self.deref().make_current(context, draw, read)
    }

    #[inline]
    unsafe fn release(&self, context: NativeHandle) -> Result<(), NativeError> {
        self.deref().release(context)
    }

    #[inline]
    unsafe fn destroy(&self, context: NativeHandle) -> Result<(), NativeError> {
        self.deref().destroy(context)
    }

    #[inline]
    unsafe fn update(&self, context: NativeHandle, draw: &dyn Drawable) {
        self.deref().update(context, draw)
    }

    #[inline]
    unsafe fn get_proc_address(&self, symbol: &str) -> *const c_void {
        self.deref().get_proc_address(symbol)
    }

    #[inline]
    unsafe fn dynamic_lookup(&self, symbol: &str) -> *const c_void {
        self.deref().dynamic_lookup(symbol)
    }

    #[inline]
    fn platform_extensions(&self, context: NativeHandle) -> String {
        self.deref().platform_extensions(context)
    }

    #[inline]
    fn platform_functions(&self) -> &[&'static str] {
        self.deref().platform_functions()
    }

    #[inline]
    unsafe fn set_swap_interval(&self, context: NativeHandle, interval: i32) -> bool {
        self.deref().set_swap_interval(context, interval)
    }

    #[inline]
    fn device_id(&self) -> String {
        self.deref().device_id()
    }

    #[inline]
    fn has_multiple_screens(&self) -> bool {
        self.deref().has_multiple_screens()
    }
}
