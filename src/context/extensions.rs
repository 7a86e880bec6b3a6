use fnv::FnvHashSet;
use log::{trace, warn};

use std::ffi::CStr;
use std::os::raw::c_char;

use crate::gl;
use crate::version::{Api, NegotiatedVersion, ProfileFlags, Version};

/// Token inserted in every built cache, so that a built cache is never empty.
pub const PLACEHOLDER_TOKEN: &str = "<GLCTX_EXTENSIONS_INITIALIZED>";

/// Driver queries used to build the list of extensions.
///
/// *Safety*: implementations calling into OpenGL require the context to be current.
pub trait ExtensionQueries {
    /// `glGetString(GL_EXTENSIONS)`. `None` if the entry point or the string is missing.
    fn extensions_string(&self) -> Option<String>;

    /// `glGetIntegerv(GL_NUM_EXTENSIONS)`. `None` if the indexed query isn't available.
    fn num_extensions(&self) -> Option<u32>;

    /// `glGetStringi(GL_EXTENSIONS, index)`.
    fn extension(&self, index: u32) -> Option<String>;
}

/// Extension queries going through loaded OpenGL function pointers.
pub struct GlQueries<'a>(pub &'a gl::Gl);

impl<'a> ExtensionQueries for GlQueries<'a> {
    fn extensions_string(&self) -> Option<String> {
        if !self.0.GetString.is_loaded() {
            return None;
        }

        unsafe { gl_string(self.0, gl::EXTENSIONS) }
    }

    fn num_extensions(&self) -> Option<u32> {
        if !self.0.GetIntegerv.is_loaded() || !self.0.GetStringi.is_loaded() {
            return None;
        }

        let mut num_extensions = 0;
        unsafe { self.0.GetIntegerv(gl::NUM_EXTENSIONS, &mut num_extensions) };
        if num_extensions < 0 { None } else { Some(num_extensions as u32) }
    }

    fn extension(&self, index: u32) -> Option<String> {
        unsafe {
            let ext = self.0.GetStringi(gl::EXTENSIONS, index as gl::types::GLuint);
            c_string(ext as *const c_char)
        }
    }
}

/// Calls `glGetString` and copies the result.
///
/// *Safety*: the OpenGL context corresponding to `gl` must be current in the thread.
pub unsafe fn gl_string(gl: &gl::Gl, name: gl::types::GLenum) -> Option<String> {
    let value = gl.GetString(name);
    c_string(value as *const c_char)
}

unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Maps the historical window-system names of an extension to its OpenGL name.
#[inline]
pub fn canonical_name(name: &str) -> &str {
    match name {
        "WGL_NV_vertex_array_range" | "GLX_NV_vertex_array_range" => "GL_NV_vertex_array_range",
        other => other,
    }
}

/// Lazily built set of extensions supported by a context.
///
/// The set also contains a `GL_VERSION_<major>_<minor>` token for every version the context
/// provides, so that versions and extensions can be checked the same way.
#[derive(Debug, Default)]
pub struct ExtensionCache {
    initialized: bool,
    available: FnvHashSet<String>,
    gl_extensions: String,
    platform_extensions: String,
}

impl ExtensionCache {
    /// Builds an empty, flushed cache.
    #[inline]
    pub fn new() -> ExtensionCache {
        Default::default()
    }

    /// Returns true if the cache has been built since the last flush.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Empties the cache without querying anything.
    pub fn flush(&mut self) {
        self.initialized = false;
        self.available.clear();
        self.gl_extensions.clear();
        self.platform_extensions.clear();
    }

    /// Flushes then immediately rebuilds the cache.
    pub fn reset<Q>(&mut self, version: &NegotiatedVersion, queries: &Q, platform: &str)
                    where Q: ExtensionQueries + ?Sized
    {
        self.flush();
        self.rebuild(version, queries, platform);
    }

    /// Builds the cache if it has been flushed.
    pub fn ensure_built<Q>(&mut self, version: &NegotiatedVersion, queries: &Q, platform: &str)
                           where Q: ExtensionQueries + ?Sized
    {
        if !self.initialized {
            self.rebuild(version, queries, platform);
        }
    }

    fn rebuild<Q>(&mut self, version: &NegotiatedVersion, queries: &Q, platform: &str)
                  where Q: ExtensionQueries + ?Sized
    {
        let indexed = if version.is_core_capable() {
            match queries.num_extensions() {
                Some(num) => Some((0 .. num).filter_map(|i| queries.extension(i))
                                            .collect::<Vec<_>>()),
                None => {
                    warn!("Indexed extension query unavailable on a {} context, \
                           using the legacy extensions string", version.version);
                    None
                },
            }
        } else {
            None
        };

        self.gl_extensions = match indexed {
            Some(list) => list.join(" "),
            None => queries.extensions_string().unwrap_or_default(),
        };
        self.platform_extensions = platform.to_owned();

        let tokens = self.gl_extensions.split_whitespace()
                         .chain(self.platform_extensions.split_whitespace());
        for token in tokens {
            self.available.insert(token.to_owned());
        }

        for token in version_tokens(version) {
            self.available.insert(token);
        }

        self.available.insert(PLACEHOLDER_TOKEN.to_owned());
        self.initialized = true;

        trace!("Extension cache built: {} tokens", self.available.len());
    }

    /// Returns true if the extension or the `GL_VERSION_x_y` token is available.
    ///
    /// Always false for a flushed cache.
    #[inline]
    pub fn is_available(&self, name: &str) -> bool {
        self.initialized && self.available.contains(canonical_name(name))
    }

    /// Returns the extensions reported by the driver, separated by spaces.
    #[inline]
    pub fn gl_extensions(&self) -> &str {
        &self.gl_extensions
    }

    /// Returns the extensions reported by the window-system layer, separated by spaces.
    #[inline]
    pub fn platform_extensions(&self) -> &str {
        &self.platform_extensions
    }

    /// Number of tokens, including version tokens and the placeholder.
    #[inline]
    pub fn len(&self) -> usize {
        self.available.len()
    }

    /// Returns true if the cache is flushed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

/// Returns the `GL_VERSION_x_y` tokens for every version up to the one of the context.
///
/// A desktop 3.1+ context that is neither core nor an explicit compatibility context is
/// advertised as 3.0.
pub fn version_tokens(version: &NegotiatedVersion) -> Vec<String> {
    let explicit_compat = version.profile.contains(ProfileFlags::COMPAT | ProfileFlags::ARB_CREATED);

    let mut current = version.version;
    if current.0 == Api::Gl && current >= Version(Api::Gl, 3, 1) && !version.is_core() &&
       !explicit_compat
    {
        current = Version(Api::Gl, 3, 0);
    }

    let prefix = match current.0 {
        Api::Gl => "GL_VERSION_",
        Api::GlEs => "GL_ES_VERSION_",
    };

    let mut tokens = Vec::new();
    while current.is_valid() {
        tokens.push(format!("{}{}_{}", prefix, current.1, current.2));
        current = match current.decrement() {
            Some(v) => v,
            None => break,
        };
    }
    tokens
}
