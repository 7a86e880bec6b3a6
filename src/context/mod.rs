use log::{debug, warn};

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::backend::{Backend, Drawable, NativeHandle};
use crate::config::ContextConfig;
use crate::gl;
use crate::lock::OwnershipLock;
use crate::registry::Registry;
use crate::version::NegotiatedVersion;
use crate::GlError;

pub use self::extensions::{ExtensionCache, ExtensionQueries, GlQueries, PLACEHOLDER_TOKEN};
pub use self::extensions::{canonical_name, version_tokens};
pub use self::negotiate::{negotiate, Attempt, ContextFactory, GlProfile, NoCompatibleContext};
pub use self::negotiate::VersionRequest;
pub use self::procs::{ProcAddressTable, ProcResolver};
pub use self::tracker::{BufferSizeTracker, BufferStateTracker, StateTracker};

mod extensions;
mod negotiate;
pub mod procs;
mod tracker;

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_CONTEXT: RefCell<Option<Weak<Context>>> = RefCell::new(None);
}

/// Returns the context that is current on the calling thread, if any.
pub fn current_context() -> Option<Arc<Context>> {
    CURRENT_CONTEXT.with(|c| c.borrow().as_ref().and_then(|w| w.upgrade()))
}

fn set_current_context(context: Option<&Arc<Context>>) {
    CURRENT_CONTEXT.with(|c| *c.borrow_mut() = context.map(Arc::downgrade));
}

fn clear_current_context_if(context: &Context) {
    CURRENT_CONTEXT.with(|c| {
        let mut c = c.borrow_mut();
        let is_this = c.as_ref().map_or(false, |w| Weak::as_ptr(w) == context as *const Context);
        if is_this {
            *c = None;
        }
    });
}

/// Outcome of `Context::make_current`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CurrentState {
    /// The drawable isn't realized yet. The context was not made current.
    NotCurrent,
    /// The context is current.
    Current,
    /// The context has just been created and is current for the first time.
    CurrentNew,
}

/// Loaded OpenGL function pointers.
struct LoadedGl(gl::Gl);

// the function pointers are plain addresses, they are only called by the thread owning the
// context lock
unsafe impl Send for LoadedGl {}
unsafe impl Sync for LoadedGl {}

/// Everything that changes when the native context is created, bound or destroyed.
///
/// Only modified by the thread owning the context lock.
struct ContextState {
    handle: Option<NativeHandle>,
    draw: Arc<dyn Drawable>,
    read: Arc<dyn Drawable>,
    version: Option<NegotiatedVersion>,
    gl: Option<Arc<LoadedGl>>,
    procs: ProcResolver,
    extensions: ExtensionCache,
    swap_interval: Option<i32>,
    refresh_requested: bool,
}

/// An OpenGL context.
///
/// The native context is created the first time `make_current` succeeds, by negotiating a
/// version and profile with the driver. From then on, the context can be current on at most
/// one thread at a time.
pub struct Context {
    id: usize,
    lock: OwnershipLock,
    backend: Box<dyn Backend>,
    config: ContextConfig,
    request: VersionRequest,
    share: Option<Weak<Context>>,
    registry: Option<Arc<Registry>>,
    buffer_sizes: Arc<BufferSizeTracker>,
    buffer_states: BufferStateTracker,
    gl_state: StateTracker,
    state: Mutex<ContextState>,
}

/// Access to the OpenGL functions while the context is current.
pub struct CommandContext<'a> {
    /// The loaded OpenGL functions.
    pub gl: &'a gl::Gl,
    /// The version of the context.
    pub version: &'a NegotiatedVersion,
    /// The context itself.
    pub context: &'a Context,
}

/// Builds a `Context`.
pub struct ContextBuilder {
    config: Option<ContextConfig>,
    request: Option<VersionRequest>,
    share: Option<Arc<Context>>,
    registry: Option<Arc<Registry>>,
    read: Option<Arc<dyn Drawable>>,
}

impl Default for ContextBuilder {
    #[inline]
    fn default() -> ContextBuilder {
        ContextBuilder::new()
    }
}

impl ContextBuilder {
    /// Starts building a context with the default configuration.
    #[inline]
    pub fn new() -> ContextBuilder {
        ContextBuilder {
            config: None,
            request: None,
            share: None,
            registry: None,
            read: None,
        }
    }

    /// Replaces the configuration read from the environment.
    #[inline]
    pub fn with_config(mut self, config: ContextConfig) -> ContextBuilder {
        self.config = Some(config);
        self
    }

    /// Requests specific versions. By default the request of the drawable's profile is used.
    #[inline]
    pub fn with_request(mut self, request: VersionRequest) -> ContextBuilder {
        self.request = Some(request);
        self
    }

    /// Shares objects (textures, buffers...) with another context.
    ///
    /// The other context must have been made current at least once before this one is.
    #[inline]
    pub fn with_shared(mut self, share: &Arc<Context>) -> ContextBuilder {
        self.share = Some(share.clone());
        self
    }

    /// Registers the context and its share relations in `registry`, and reuses the results
    /// of previous negotiations stored there.
    #[inline]
    pub fn with_registry(mut self, registry: &Arc<Registry>) -> ContextBuilder {
        self.registry = Some(registry.clone());
        self
    }

    /// Reads from a different drawable than the one that is drawn to.
    #[inline]
    pub fn with_read_drawable(mut self, read: Arc<dyn Drawable>) -> ContextBuilder {
        self.read = Some(read);
        self
    }

    /// Builds the context. No native call is made until the context is made current.
    pub fn build<B>(self, backend: B, drawable: Arc<dyn Drawable>) -> Arc<Context>
                    where B: Backend + 'static
    {
        let config = self.config.unwrap_or_default();
        let request = self.request.unwrap_or_else(|| drawable.profile().request());

        let lock = OwnershipLock::new(config.fail_fast);
        lock.set_record_backtraces(config.debug);

        // objects of a share group are common to all its contexts
        let buffer_sizes = match self.share {
            Some(ref share) => share.buffer_sizes.clone(),
            None => Arc::new(BufferSizeTracker::new()),
        };

        let read = self.read.unwrap_or_else(|| drawable.clone());

        let context = Arc::new(Context {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            lock: lock,
            backend: Box::new(backend),
            config: config,
            request: request,
            share: self.share.as_ref().map(Arc::downgrade),
            registry: self.registry,
            buffer_sizes: buffer_sizes,
            buffer_states: BufferStateTracker::new(),
            gl_state: StateTracker::new(),
            state: Mutex::new(ContextState {
                handle: None,
                draw: drawable,
                read: read,
                version: None,
                gl: None,
                procs: ProcResolver::default(),
                extensions: ExtensionCache::new(),
                swap_interval: None,
                refresh_requested: false,
            }),
        });

        if context.config.debug {
            debug!("Context {} built, requesting {:?}", context.id, context.request);
        }

        context
    }
}

/// Adapts a backend to the negotiation.
struct BackendFactory<'a> {
    backend: &'a dyn Backend,
    draw: &'a dyn Drawable,
    share: Option<NativeHandle>,
    debug: bool,
}

impl<'a> ContextFactory for BackendFactory<'a> {
    type Handle = NativeHandle;

    #[inline]
    fn supports_versioned_creation(&self) -> bool {
        self.backend.supports_versioned_creation()
    }

    fn create_versioned(&mut self, attempt: &Attempt) -> Option<NativeHandle> {
        let handle = unsafe { self.backend.create_context_arb(self.draw, self.share, attempt) };
        if self.debug {
            debug!("Context creation {}: {}", attempt,
                   if handle.is_some() { "accepted" } else { "refused" });
        }
        handle
    }

    #[inline]
    fn create_legacy(&mut self) -> Option<NativeHandle> {
        unsafe { self.backend.create_context_legacy(self.draw, self.share) }
    }
}

impl Context {
    /// Builds a context drawing to and reading from `drawable`, with the default options.
    #[inline]
    pub fn new<B>(backend: B, drawable: Arc<dyn Drawable>) -> Arc<Context>
                  where B: Backend + 'static
    {
        ContextBuilder::new().build(backend, drawable)
    }

    #[inline]
    fn state(&self) -> MutexGuard<ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the context current on the calling thread.
    ///
    /// If another context is current on this thread, it is released first. If this context
    /// is current on another thread, this either waits or fails depending on the lock policy.
    ///
    /// The first successful call creates the native context and returns
    /// `CurrentState::CurrentNew`.
    pub fn make_current(self: &Arc<Self>) -> Result<CurrentState, GlError> {
        if let Some(current) = current_context() {
            if Arc::ptr_eq(&current, self) {
                if self.lock.is_held() {
                    let st = self.state();
                    if let Some(handle) = st.handle {
                        unsafe { self.backend.update(handle, &*st.draw) };
                    }
                    return Ok(CurrentState::Current);
                }
                set_current_context(None);

            } else if current.lock.is_held() {
                if self.config.debug {
                    debug!("Releasing context {} to make context {} current", current.id, self.id);
                }
                current.release()?;

            } else {
                set_current_context(None);
            }
        }

        self.lock.acquire()?;

        let result = match self.make_current_locked() {
            Ok(result) => result,
            Err(err) => {
                self.lock.release()?;
                return Err(err);
            },
        };

        if result == CurrentState::NotCurrent {
            self.lock.release()?;
            return Ok(result);
        }

        set_current_context(Some(self));

        if result == CurrentState::CurrentNew {
            if let Some(ref registry) = self.registry {
                registry.register(self);
                if let Some(share) = self.share.as_ref().and_then(|s| s.upgrade()) {
                    registry.add_share(self, &share);
                }
            }

            let (profile, version) = {
                let st = self.state();
                (st.draw.profile(), st.version.clone())
            };

            if let Some(version) = version {
                if !profile.is_satisfied_by(&version) {
                    // the next bind negotiates again instead of reusing this context
                    self.destroy()?;
                    return Err(GlError::ProfileMismatch { drawable: profile, context: version });
                }
            }
        }

        Ok(result)
    }

    fn share_handle(&self) -> Result<Option<NativeHandle>, GlError> {
        match self.share {
            None => Ok(None),
            Some(ref share) => {
                share.upgrade().and_then(|s| s.native_handle())
                     .map(Some).ok_or(GlError::ShareNotCreated)
            },
        }
    }

    fn make_current_locked(&self) -> Result<CurrentState, GlError> {
        // the share context must not be locked while our own state is
        let share_handle = if self.state().handle.is_none() {
            self.share_handle()?
        } else {
            None
        };

        let mut st = self.state();

        if !st.draw.is_realized() || !st.read.is_realized() {
            if self.config.debug {
                debug!("Context {}: drawable not realized", self.id);
            }
            return Ok(CurrentState::NotCurrent);
        }

        if let Some(handle) = st.handle {
            unsafe { self.backend.make_current(handle, &*st.draw, &*st.read) }?;

            if st.refresh_requested {
                if let Err(err) = self.load_capabilities(&mut st, handle, None) {
                    self.release_native(handle);
                    return Err(err);
                }
            }

            return Ok(CurrentState::Current);
        }

        let (handle, negotiated) = self.create_native(&st, share_handle)?;

        if let Err(err) = unsafe { self.backend.make_current(handle, &*st.draw, &*st.read) } {
            self.destroy_native(handle);
            return Err(err.into());
        }

        st.handle = Some(handle);

        if let Err(err) = self.load_capabilities(&mut st, handle, Some(negotiated)) {
            st.handle = None;
            self.release_native(handle);
            self.destroy_native(handle);
            return Err(err);
        }

        Ok(CurrentState::CurrentNew)
    }

    fn create_native(&self, st: &ContextState, share: Option<NativeHandle>)
                     -> Result<(NativeHandle, NegotiatedVersion), GlError>
    {
        let device = self.backend.device_id();
        let cache = self.registry.as_ref().map(|r| r.versions());
        let preferred = cache.and_then(|c| c.get(&device, &self.request));

        let mut factory = BackendFactory {
            backend: &*self.backend,
            draw: &*st.draw,
            share: share,
            debug: self.config.debug,
        };

        match negotiate(&mut factory, &self.request, preferred.as_ref()) {
            Ok((handle, negotiated, attempt)) => {
                if let Some(cache) = cache {
                    if negotiated.is_arb_created() && preferred != Some(attempt) {
                        cache.insert(&device, &self.request, attempt);
                    }
                }

                if self.config.debug {
                    debug!("Context {} created with {}", self.id, attempt);
                }

                Ok((handle, negotiated))
            },
            Err(err) => {
                if let Some(cache) = cache {
                    cache.remove(&device, &self.request);
                }
                Err(err.into())
            },
        }
    }

    /// Resolves the function addresses, reads the version of the driver and rebuilds the
    /// extension cache. Everything is replaced, nothing is patched.
    fn load_capabilities(&self, st: &mut ContextState, handle: NativeHandle,
                         created: Option<NegotiatedVersion>) -> Result<(), GlError>
    {
        let backend = &*self.backend;

        let mut gl_table = ProcAddressTable::new();
        let gl = gl::Gl::load_with(|symbol| {
            let address = unsafe { backend.get_proc_address(symbol) };
            gl_table.insert(symbol, address);
            address
        });

        let platform_table = ProcAddressTable::load(backend.platform_functions().iter().cloned(),
                                                    |symbol| unsafe {
                                                        backend.get_proc_address(symbol)
                                                    });

        if !gl.GetString.is_loaded() {
            return Err(GlError::MissingVersionString);
        }

        let driver_string = unsafe { extensions::gl_string(&gl, gl::VERSION) };
        if driver_string.is_none() {
            warn!("glGetString(GL_VERSION) returned nothing");
        }

        let base = match created {
            Some(created) => created,
            None => match st.version {
                Some(ref previous) => NegotiatedVersion::created(previous.version,
                                                                 previous.profile),
                None => return Err(GlError::MissingVersionString),
            },
        };
        let version = base.with_driver_string(driver_string);

        let platform_extensions = backend.platform_extensions(handle);
        st.extensions.reset(&version, &GlQueries(&gl), &platform_extensions);

        if self.config.debug {
            debug!("Context {}: {}, {} GL functions, {} platform functions, {} extension tokens",
                   self.id, version, gl_table.len(), platform_table.len(), st.extensions.len());
        }

        st.procs = ProcResolver { gl: gl_table, platform: platform_table };
        st.gl = Some(Arc::new(LoadedGl(gl)));
        st.version = Some(version);
        st.refresh_requested = false;

        Ok(())
    }

    fn release_native(&self, handle: NativeHandle) {
        if let Err(err) = unsafe { self.backend.release(handle) } {
            warn!("Failed to release context {}: {}", self.id, err);
        }
    }

    fn destroy_native(&self, handle: NativeHandle) {
        if let Err(err) = unsafe { self.backend.destroy(handle) } {
            warn!("Failed to destroy context {}: {}", self.id, err);
        }
    }

    /// Releases the context from the calling thread.
    ///
    /// The lock is released even if the native call fails.
    pub fn release(&self) -> Result<(), GlError> {
        if !self.lock.is_held() {
            return Err(GlError::NotCurrent);
        }

        clear_current_context_if(self);

        let native = {
            let st = self.state();
            match st.handle {
                Some(handle) => unsafe { self.backend.release(handle) },
                None => Ok(()),
            }
        };

        let unlock = self.lock.release();

        if self.config.debug {
            debug!("Context {} released", self.id);
        }

        native?;
        unlock?;
        Ok(())
    }

    /// Destroys the native context.
    ///
    /// If the context is current on the calling thread, it is released first. If it is
    /// current on another thread, this waits or fails depending on the lock policy. The
    /// trackers are cleared, including the buffer sizes shared with other contexts.
    ///
    /// Calling `make_current` afterwards creates a new native context.
    pub fn destroy(&self) -> Result<(), GlError> {
        if self.lock.is_held() {
            self.release()?;
        }

        self.lock.acquire()?;

        let result = self.destroy_locked();
        let unlock = self.lock.release();

        if let Some(ref registry) = self.registry {
            registry.unregister(self.id);
        }

        result?;
        unlock?;
        Ok(())
    }

    fn destroy_locked(&self) -> Result<(), GlError> {
        self.buffer_sizes.clear();
        self.buffer_states.clear();
        self.gl_state.clear();

        let mut st = self.state();
        st.extensions.flush();
        st.procs.clear();
        st.gl = None;
        st.version = None;
        st.swap_interval = None;
        st.refresh_requested = false;

        if let Some(handle) = st.handle.take() {
            if self.config.debug {
                debug!("Destroying context {}", self.id);
            }
            unsafe { self.backend.destroy(handle) }?;
        }

        Ok(())
    }

    /// Makes the context current, runs `f` and releases the context.
    ///
    /// When the make-current optimization is enabled, the context is left current after `f`
    /// returns, so that the next call is cheap. A context that was already current stays
    /// current either way.
    pub fn exec<F, R>(self: &Arc<Self>, f: F) -> Result<R, GlError>
                      where F: FnOnce(CommandContext) -> R
    {
        let was_current = self.is_current();

        if self.make_current()? == CurrentState::NotCurrent {
            return Err(GlError::NotRealized);
        }

        let (gl, version) = {
            let st = self.state();
            (st.gl.clone(), st.version.clone())
        };

        let result = match (gl, version) {
            (Some(gl), Some(version)) => Ok(f(CommandContext {
                gl: &gl.0,
                version: &version,
                context: self,
            })),
            _ => Err(GlError::NotCurrent),
        };

        let optimize = self.config.optimize_make_current(self.backend.has_multiple_screens());
        if !was_current && !optimize {
            self.release()?;
        }

        result
    }

    /// Returns true if the extension, or a `GL_VERSION_x_y` token, is supported.
    ///
    /// If the cache was flushed, it is rebuilt when the context is current on the calling
    /// thread. Otherwise this returns false until the context is made current.
    pub fn is_extension_available(&self, name: &str) -> bool {
        let mut st = self.state();
        self.ensure_extensions(&mut st);
        st.extensions.is_available(name)
    }

    /// Returns the extensions reported by the driver, separated by spaces.
    pub fn gl_extensions(&self) -> String {
        let mut st = self.state();
        self.ensure_extensions(&mut st);
        st.extensions.gl_extensions().to_owned()
    }

    /// Returns the extensions reported by the window-system layer, separated by spaces.
    pub fn platform_extensions(&self) -> String {
        let mut st = self.state();
        self.ensure_extensions(&mut st);
        st.extensions.platform_extensions().to_owned()
    }

    fn ensure_extensions(&self, st: &mut ContextState) {
        if st.extensions.is_initialized() {
            return;
        }

        if !self.lock.is_held() {
            if self.config.debug {
                debug!("Context {}: extension cache flushed and context not current", self.id);
            }
            return;
        }

        let (gl, version, handle) = match (st.gl.clone(), st.version.clone(), st.handle) {
            (Some(gl), Some(version), Some(handle)) => (gl, version, handle),
            _ => return,
        };

        let platform = self.backend.platform_extensions(handle);
        st.extensions.ensure_built(&version, &GlQueries(&gl.0), &platform);
    }

    /// Empties the extension cache. It is rebuilt on the next query.
    #[inline]
    pub fn flush_extensions(&self) {
        self.state().extensions.flush();
    }

    /// Empties and immediately rebuilds the extension cache.
    pub fn reset_extensions(&self) -> Result<(), GlError> {
        if !self.lock.is_held() {
            return Err(GlError::NotCurrent);
        }

        let mut st = self.state();
        st.extensions.flush();
        self.ensure_extensions(&mut st);
        Ok(())
    }

    /// Returns true if the OpenGL or window-system function can be called.
    pub fn is_function_available(&self, name: &str) -> bool {
        let st = self.state();
        let backend = &*self.backend;
        st.procs.is_function_available(name, |candidate| unsafe {
            backend.dynamic_lookup(candidate)
        })
    }

    /// Returns the cached address of a function.
    #[inline]
    pub fn proc_address(&self, name: &str) -> Option<*const std::os::raw::c_void> {
        let st = self.state();
        st.procs.gl.address_of(name).or_else(|| st.procs.platform.address_of(name))
    }

    /// Sets the number of vertical refreshes between two buffer swaps.
    ///
    /// The context must be current on the calling thread. Returns false if the backend
    /// doesn't support it.
    pub fn set_swap_interval(&self, interval: i32) -> Result<bool, GlError> {
        if !self.lock.is_held() {
            return Err(GlError::NotCurrent);
        }

        let mut st = self.state();
        let handle = st.handle.ok_or(GlError::NotCurrent)?;

        let accepted = unsafe { self.backend.set_swap_interval(handle, interval) };
        if accepted {
            st.swap_interval = Some(interval);
        }
        Ok(accepted)
    }

    /// Returns the latest swap interval accepted by the backend.
    #[inline]
    pub fn swap_interval(&self) -> Option<i32> {
        self.state().swap_interval
    }

    /// Replaces the drawables.
    ///
    /// If the context is current on the calling thread, it is rebound to the new drawables
    /// immediately.
    pub fn set_drawables(&self, draw: Arc<dyn Drawable>, read: Option<Arc<dyn Drawable>>)
                         -> Result<(), GlError>
    {
        let read = read.unwrap_or_else(|| draw.clone());

        if self.lock.is_held() {
            let mut st = self.state();
            st.draw = draw;
            st.read = read;
            if let Some(handle) = st.handle {
                unsafe { self.backend.make_current(handle, &*st.draw, &*st.read) }?;
            }
            return Ok(());
        }

        self.lock.acquire()?;
        {
            let mut st = self.state();
            st.draw = draw;
            st.read = read;
        }
        self.lock.release()?;
        Ok(())
    }

    /// Reloads the function addresses, the version and the extensions the next time the
    /// context is bound.
    #[inline]
    pub fn request_refresh(&self) {
        self.state().refresh_requested = true;
    }

    /// Reloads the function addresses, the version and the extensions now. The context must
    /// be current on the calling thread.
    pub fn refresh(&self) -> Result<(), GlError> {
        if !self.lock.is_held() {
            return Err(GlError::NotCurrent);
        }

        let mut st = self.state();
        let handle = st.handle.ok_or(GlError::NotCurrent)?;
        self.load_capabilities(&mut st, handle, None)
    }

    /// Returns a unique identifier of this context within the process.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns true if the context is current on the calling thread.
    #[inline]
    pub fn is_current(&self) -> bool {
        self.lock.is_held()
    }

    /// Returns true if the native context exists.
    #[inline]
    pub fn is_created(&self) -> bool {
        self.state().handle.is_some()
    }

    /// Returns the native handle, if the native context exists.
    #[inline]
    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.state().handle
    }

    /// Returns the negotiated version, if the native context exists.
    #[inline]
    pub fn version(&self) -> Option<NegotiatedVersion> {
        self.state().version.clone()
    }

    /// Returns a human-readable description of the version.
    pub fn version_string(&self) -> String {
        match self.state().version {
            Some(ref version) => version.version_string(),
            None => String::from("not created"),
        }
    }

    /// Returns the versions requested from the driver.
    #[inline]
    pub fn request(&self) -> &VersionRequest {
        &self.request
    }

    /// Returns the options of the context.
    #[inline]
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Returns the ownership lock. Its policy can be changed at any time.
    #[inline]
    pub fn lock(&self) -> &OwnershipLock {
        &self.lock
    }

    /// Returns the context this one shares objects with.
    #[inline]
    pub fn shared_with(&self) -> Option<Arc<Context>> {
        self.share.as_ref().and_then(|s| s.upgrade())
    }

    /// Returns the drawable that is drawn to.
    #[inline]
    pub fn draw_drawable(&self) -> Arc<dyn Drawable> {
        self.state().draw.clone()
    }

    /// Returns the drawable that is read from.
    #[inline]
    pub fn read_drawable(&self) -> Arc<dyn Drawable> {
        self.state().read.clone()
    }

    /// Buffer sizes, common to the share group.
    #[inline]
    pub fn buffer_size_tracker(&self) -> &Arc<BufferSizeTracker> {
        &self.buffer_sizes
    }

    /// Buffer bindings of this context.
    #[inline]
    pub fn buffer_state_tracker(&self) -> &BufferStateTracker {
        &self.buffer_states
    }

    /// Server state of this context.
    #[inline]
    pub fn state_tracker(&self) -> &StateTracker {
        &self.gl_state
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let st = self.state();
        fmt.debug_struct("Context")
           .field("id", &self.id)
           .field("handle", &st.handle)
           .field("version", &st.version)
           .field("lock", &self.lock)
           .finish()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.buffer_sizes.clear();
        self.buffer_states.clear();
        self.gl_state.clear();

        if let Some(ref registry) = self.registry {
            registry.unregister(self.id);
        }

        let held = self.lock.is_held();
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);

        if let Some(handle) = st.handle.take() {
            unsafe {
                if held {
                    if let Err(err) = self.backend.release(handle) {
                        warn!("Failed to release dropped context {}: {}", self.id, err);
                    }
                }
                if let Err(err) = self.backend.destroy(handle) {
                    warn!("Failed to destroy dropped context {}: {}", self.id, err);
                }
            }
        }
    }
}
