/*!
Test supports module.

Provides a fake window-system layer. Each native context created by `MockBackend` gets a
driver state holding its `GL_VERSION` string and its extensions, which are served by real
`glGetString`, `glGetIntegerv` and `glGetStringi` entry points to the calling thread.

*/

#![allow(dead_code)]

use glctx::backend::{Backend, Drawable, DrawableHandle, NativeError, NativeHandle};
use glctx::context::Attempt;
use glctx::gl;
use glctx::GlProfile;

use lazy_static::lazy_static;

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Initializes logging once. Call at the start of tests that want to see the logs.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What a native context reports once bound.
pub struct DriverState {
    version: Option<CString>,
    extensions_string: CString,
    extensions: Vec<CString>,
    /// Number of `glGetString(GL_EXTENSIONS)` calls.
    pub string_queries: AtomicUsize,
    /// Number of `glGetIntegerv(GL_NUM_EXTENSIONS)` calls.
    pub indexed_queries: AtomicUsize,
}

lazy_static! {
    // entries are never removed, so that the strings handed to the library stay valid
    static ref DRIVERS: Mutex<HashMap<usize, Arc<DriverState>>> = Mutex::new(HashMap::new());
}

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_HANDLE: Cell<usize> = Cell::new(0);
}

/// Returns the driver state of a native context.
pub fn driver(handle: NativeHandle) -> Arc<DriverState> {
    DRIVERS.lock().unwrap()[&handle.0].clone()
}

/// Returns the native context bound to the calling thread by the mock.
pub fn bound_handle() -> Option<NativeHandle> {
    match CURRENT_HANDLE.with(|c| c.get()) {
        0 => None,
        h => Some(NativeHandle(h)),
    }
}

fn current_driver() -> Option<Arc<DriverState>> {
    let handle = bound_handle()?;
    DRIVERS.lock().unwrap().get(&handle.0).cloned()
}

extern "system" fn get_string(name: gl::types::GLenum) -> *const gl::types::GLubyte {
    let driver = match current_driver() {
        Some(d) => d,
        None => return ptr::null(),
    };

    match name {
        gl::VERSION => driver.version.as_ref().map_or(ptr::null(), |v| v.as_ptr() as *const _),
        gl::EXTENSIONS => {
            driver.string_queries.fetch_add(1, Ordering::SeqCst);
            driver.extensions_string.as_ptr() as *const _
        },
        _ => ptr::null(),
    }
}

extern "system" fn get_integerv(pname: gl::types::GLenum, data: *mut gl::types::GLint) {
    let driver = match current_driver() {
        Some(d) => d,
        None => return,
    };

    if pname == gl::NUM_EXTENSIONS {
        driver.indexed_queries.fetch_add(1, Ordering::SeqCst);
        unsafe { *data = driver.extensions.len() as gl::types::GLint };
    }
}

extern "system" fn get_stringi(name: gl::types::GLenum, index: gl::types::GLuint)
                               -> *const gl::types::GLubyte
{
    let driver = match current_driver() {
        Some(d) => d,
        None => return ptr::null(),
    };

    if name != gl::EXTENSIONS {
        return ptr::null();
    }

    driver.extensions.get(index as usize).map_or(ptr::null(), |e| e.as_ptr() as *const _)
}

extern "system" fn dummy() {}

/// A native call made by the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { attempt: Option<Attempt>, share: Option<NativeHandle> },
    MakeCurrent(NativeHandle),
    Release(NativeHandle),
    Destroy(NativeHandle),
    Update(NativeHandle),
    SwapInterval(NativeHandle, i32),
}

/// Fake window-system layer.
pub struct MockBackend {
    accept: Box<dyn Fn(&Attempt) -> bool + Send + Sync>,
    versioned: bool,
    legacy: bool,
    version_string: Option<String>,
    missing_version: bool,
    extensions: Vec<String>,
    indexed: bool,
    get_string: bool,
    platform_extensions: String,
    platform_functions: Vec<&'static str>,
    functions: Vec<&'static str>,
    dynamic_symbols: Vec<&'static str>,
    swap_interval: bool,
    multiple_screens: bool,
    device: String,
    fail_make_current: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    /// A driver accepting every attempt, reporting the created version.
    pub fn new() -> MockBackend {
        MockBackend {
            accept: Box::new(|_| true),
            versioned: true,
            legacy: true,
            version_string: None,
            missing_version: false,
            extensions: vec!["GL_ARB_debug_output".to_owned(), "GL_KHR_debug".to_owned()],
            indexed: true,
            get_string: true,
            platform_extensions: String::new(),
            platform_functions: Vec::new(),
            functions: Vec::new(),
            dynamic_symbols: Vec::new(),
            swap_interval: false,
            multiple_screens: false,
            device: "mock".to_owned(),
            fail_make_current: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn accepting<F>(mut self, accept: F) -> MockBackend
                        where F: Fn(&Attempt) -> bool + Send + Sync + 'static
    {
        self.accept = Box::new(accept);
        self
    }

    /// Only the legacy creation entry point exists.
    pub fn legacy_only(mut self) -> MockBackend {
        self.versioned = false;
        self
    }

    /// Neither creation entry point produces a context.
    pub fn refusing_everything(mut self) -> MockBackend {
        self.accept = Box::new(|_| false);
        self.legacy = false;
        self
    }

    pub fn with_version_string(mut self, version: &str) -> MockBackend {
        self.version_string = Some(version.to_owned());
        self
    }

    /// `glGetString(GL_VERSION)` returns null.
    pub fn without_version_string(mut self) -> MockBackend {
        self.missing_version = true;
        self
    }

    /// `glGetString` can't be resolved.
    pub fn without_get_string(mut self) -> MockBackend {
        self.get_string = false;
        self
    }

    /// `glGetStringi` can't be resolved.
    pub fn without_indexed_queries(mut self) -> MockBackend {
        self.indexed = false;
        self
    }

    pub fn with_extensions(mut self, extensions: &[&str]) -> MockBackend {
        self.extensions = extensions.iter().map(|e| (*e).to_owned()).collect();
        self
    }

    pub fn with_platform_extensions(mut self, extensions: &str) -> MockBackend {
        self.platform_extensions = extensions.to_owned();
        self
    }

    pub fn with_platform_functions(mut self, functions: &[&'static str]) -> MockBackend {
        self.platform_functions = functions.to_vec();
        self.functions.extend_from_slice(functions);
        self
    }

    /// Additional names resolved by `get_proc_address`.
    pub fn with_functions(mut self, functions: &[&'static str]) -> MockBackend {
        self.functions.extend_from_slice(functions);
        self
    }

    /// Names resolved by `dynamic_lookup` only.
    pub fn with_dynamic_symbols(mut self, symbols: &[&'static str]) -> MockBackend {
        self.dynamic_symbols = symbols.to_vec();
        self
    }

    pub fn with_swap_interval(mut self) -> MockBackend {
        self.swap_interval = true;
        self
    }

    pub fn with_multiple_screens(mut self) -> MockBackend {
        self.multiple_screens = true;
        self
    }

    pub fn with_device(mut self, device: &str) -> MockBackend {
        self.device = device.to_owned();
        self
    }

    pub fn shared(self) -> Arc<MockBackend> {
        Arc::new(self)
    }

    /// Makes the next calls to `make_current` fail.
    pub fn fail_make_current(&self, fail: bool) {
        self.fail_make_current.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// The attempts passed to the versioned creation entry point, in order.
    pub fn attempts(&self) -> Vec<Attempt> {
        self.calls().into_iter().filter_map(|c| match c {
            Call::Create { attempt, .. } => attempt,
            _ => None,
        }).collect()
    }

    pub fn count<F>(&self, filter: F) -> usize where F: Fn(&Call) -> bool {
        self.calls().iter().filter(|c| filter(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn new_context(&self, default_version: String) -> NativeHandle {
        let handle = NativeHandle(NEXT_HANDLE.fetch_add(1, Ordering::SeqCst));

        let version = if self.missing_version {
            None
        } else {
            let string = self.version_string.clone().unwrap_or(default_version);
            Some(CString::new(string).unwrap())
        };

        let state = DriverState {
            version: version,
            extensions_string: CString::new(self.extensions.join(" ")).unwrap(),
            extensions: self.extensions.iter().map(|e| CString::new(e.as_str()).unwrap())
                                       .collect(),
            string_queries: AtomicUsize::new(0),
            indexed_queries: AtomicUsize::new(0),
        };

        DRIVERS.lock().unwrap().insert(handle.0, Arc::new(state));
        handle
    }
}

impl Backend for MockBackend {
    fn supports_versioned_creation(&self) -> bool {
        self.versioned
    }

    unsafe fn create_context_arb(&self, _: &dyn Drawable, share: Option<NativeHandle>,
                                 attempt: &Attempt) -> Option<NativeHandle>
    {
        self.record(Call::Create { attempt: Some(*attempt), share: share });

        if !(self.accept)(attempt) {
            return None;
        }

        Some(self.new_context(format!("{}.{} Mock", attempt.major, attempt.minor)))
    }

    unsafe fn create_context_legacy(&self, _: &dyn Drawable, share: Option<NativeHandle>)
                                    -> Option<NativeHandle>
    {
        self.record(Call::Create { attempt: None, share: share });

        if !self.legacy {
            return None;
        }

        Some(self.new_context("2.1 Mock".to_owned()))
    }

    unsafe fn make_current(&self, context: NativeHandle, _: &dyn Drawable, _: &dyn Drawable)
                           -> Result<(), NativeError>
    {
        self.record(Call::MakeCurrent(context));

        if self.fail_make_current.load(Ordering::SeqCst) {
            return Err(NativeError("make current refused".to_owned()));
        }

        CURRENT_HANDLE.with(|c| c.set(context.0));
        Ok(())
    }

    unsafe fn release(&self, context: NativeHandle) -> Result<(), NativeError> {
        self.record(Call::Release(context));
        CURRENT_HANDLE.with(|c| if c.get() == context.0 { c.set(0) });
        Ok(())
    }

    unsafe fn destroy(&self, context: NativeHandle) -> Result<(), NativeError> {
        self.record(Call::Destroy(context));
        Ok(())
    }

    unsafe fn update(&self, context: NativeHandle, _: &dyn Drawable) {
        self.record(Call::Update(context));
    }

    unsafe fn get_proc_address(&self, symbol: &str) -> *const c_void {
        match symbol {
            "glGetString" if self.get_string => get_string as *const c_void,
            "glGetIntegerv" => get_integerv as *const c_void,
            "glGetStringi" if self.indexed => get_stringi as *const c_void,
            s if self.functions.iter().any(|f| *f == s) => dummy as *const c_void,
            _ => ptr::null(),
        }
    }

    unsafe fn dynamic_lookup(&self, symbol: &str) -> *const c_void {
        if self.dynamic_symbols.iter().any(|s| *s == symbol) {
            dummy as *const c_void
        } else {
            ptr::null()
        }
    }

    fn platform_extensions(&self, _: NativeHandle) -> String {
        self.platform_extensions.clone()
    }

    fn platform_functions(&self) -> &[&'static str] {
        &self.platform_functions
    }

    unsafe fn set_swap_interval(&self, context: NativeHandle, interval: i32) -> bool {
        self.record(Call::SwapInterval(context, interval));
        self.swap_interval
    }

    fn device_id(&self) -> String {
        self.device.clone()
    }

    fn has_multiple_screens(&self) -> bool {
        self.multiple_screens
    }
}

static NEXT_DRAWABLE: AtomicUsize = AtomicUsize::new(1);

/// Fake window.
pub struct MockDrawable {
    handle: DrawableHandle,
    realized: AtomicBool,
    profile: GlProfile,
}

impl MockDrawable {
    /// A realized drawable.
    pub fn new(profile: GlProfile) -> Arc<MockDrawable> {
        Arc::new(MockDrawable {
            handle: DrawableHandle(NEXT_DRAWABLE.fetch_add(1, Ordering::SeqCst)),
            realized: AtomicBool::new(true),
            profile: profile,
        })
    }

    /// A drawable whose native surface doesn't exist yet.
    pub fn unrealized(profile: GlProfile) -> Arc<MockDrawable> {
        let drawable = MockDrawable::new(profile);
        drawable.set_realized(false);
        drawable
    }

    pub fn set_realized(&self, realized: bool) {
        self.realized.store(realized, Ordering::SeqCst);
    }
}

impl Drawable for MockDrawable {
    fn handle(&self) -> DrawableHandle {
        self.handle
    }

    fn is_realized(&self) -> bool {
        self.realized.load(Ordering::SeqCst)
    }

    fn profile(&self) -> GlProfile {
        self.profile
    }
}
