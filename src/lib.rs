/*!
Thread-affine OpenGL context lifecycle.

An OpenGL context can only be used by the thread it is current on, and drivers leave it to the
application to make sure a context is never current on two threads at once. glctx enforces
this rule, creates native contexts by negotiating a version and profile with the driver, and
caches which extensions and functions a context supports.

The window-system layer (GLX, WGL, EGL...) is abstracted by the `Backend` trait. Surfaces are
described by the `Drawable` trait.

# Lifecycle

```no_run
# use std::sync::Arc;
# fn example<B: glctx::backend::Backend + 'static>(backend: B,
#                                                  window: Arc<dyn glctx::backend::Drawable>)
#                                                  -> Result<(), glctx::GlError> {
use glctx::{Context, CurrentState};

let context = Context::new(backend, window);

// the native context is created the first time the context is made current
match context.make_current()? {
    CurrentState::CurrentNew => println!("created {}", context.version_string()),
    CurrentState::Current => (),
    CurrentState::NotCurrent => println!("the window isn't visible yet"),
}

if context.is_extension_available("GL_ARB_debug_output") {
    // ...
}

context.release()?;
context.destroy()?;
# Ok(())
# }
```

# Threads

A context is current on at most one thread. Making it current on a second thread either
waits for the first thread to release it, or fails immediately with a `LockError` naming the
owner, depending on the policy of its `OwnershipLock`. The policy defaults to waiting and can
be changed with `GLCTX_LOCK_FAIL_FAST=1` or `ContextConfig::with_fail_fast`.

Making a context current on a thread where another context is current releases the other one
first.

*/
#![warn(missing_docs)]

pub use crate::context::{current_context, CommandContext, Context, ContextBuilder, CurrentState};
pub use crate::context::{GlProfile, NoCompatibleContext, VersionRequest};
pub use crate::config::ContextConfig;
pub use crate::lock::{LockError, OwnershipLock};
pub use crate::registry::Registry;
pub use crate::version::{Api, NegotiatedVersion, ProfileFlags, Version};

use std::error::Error;
use std::fmt;

use crate::backend::NativeError;

pub mod backend;
pub mod config;
pub mod context;
pub mod lock;
pub mod registry;
pub mod version;

/// Raw OpenGL bindings.
#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod gl {
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

/// Error that can happen while managing a context.
#[derive(Debug, Clone)]
pub enum GlError {
    /// The ownership lock refused the operation.
    Lock(LockError),

    /// The operation requires the context to be current on the calling thread.
    NotCurrent,

    /// The drawable can't be rendered to yet.
    NotRealized,

    /// The driver refused every version and profile that was tried.
    NoCompatibleContext(NoCompatibleContext),

    /// The context was created, but doesn't provide what the drawable was configured for.
    ProfileMismatch {
        /// Profile of the drawable.
        drawable: GlProfile,
        /// What the context provides.
        context: NegotiatedVersion,
    },

    /// `glGetString` couldn't be resolved, so the version of the context is unknown.
    MissingVersionString,

    /// The context shares objects with a context that hasn't been created yet.
    ShareNotCreated,

    /// A call to the window-system layer failed.
    Native(NativeError),
}

impl fmt::Display for GlError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GlError::Lock(err) => write!(fmt, "{}", err),
            GlError::NotCurrent => write!(fmt, "The context is not current on this thread"),
            GlError::NotRealized => write!(fmt, "The drawable is not realized"),
            GlError::NoCompatibleContext(err) => write!(fmt, "{}", err),
            GlError::ProfileMismatch { drawable, context } => {
                write!(fmt, "The drawable requires {:?} but the context is {}", drawable, context)
            },
            GlError::MissingVersionString => {
                write!(fmt, "glGetString is not available, the version of the context is unknown")
            },
            GlError::ShareNotCreated => {
                write!(fmt, "The context to share objects with has not been created")
            },
            GlError::Native(err) => write!(fmt, "Native call failed: {}", err),
        }
    }
}

impl Error for GlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GlError::Lock(err) => Some(err),
            GlError::NoCompatibleContext(err) => Some(err),
            GlError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LockError> for GlError {
    #[inline]
    fn from(err: LockError) -> GlError {
        GlError::Lock(err)
    }
}

impl From<NoCompatibleContext> for GlError {
    #[inline]
    fn from(err: NoCompatibleContext) -> GlError {
        GlError::NoCompatibleContext(err)
    }
}

impl From<NativeError> for GlError {
    #[inline]
    fn from(err: NativeError) -> GlError {
        GlError::Native(err)
    }
}
