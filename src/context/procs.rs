/*!
Resolution of OpenGL function addresses.

Each context keeps two tables, one for the OpenGL entry points and one for the entry points
of the window-system layer (`wglSwapIntervalEXT`, `glXSwapIntervalSGI`, ...). The tables are
filled in one go when the context is bound for the first time, and replaced entirely when the
context is recreated.

A function missing from both tables can still be available under another name: the same
entry point is often exported with an `ARB` or vendor suffix, or without it. The dynamic
lookup tries every spelling.

*/
use fnv::FnvHashMap;
use smallvec::SmallVec;

use std::os::raw::c_void;

/// Suffixes of extensions ratified by the ARB or Khronos, tried first.
pub const ARB_SUFFIXES: &[&str] = &["ARB", "GL2", "OES", "KHR", "OML"];

/// Vendor suffixes.
pub const VENDOR_SUFFIXES: &[&str] = &[
    "3DFX", "AMD", "ANGLE", "ARM", "APPLE", "ATI", "EXT", "HI", "HP", "IBM", "IMG", "INGR",
    "INTEL", "MESA", "MESAX", "NV", "PGI", "QCOM", "SGI", "SGIS", "SGIX", "SUN", "WIN",
];

/// Removes one ARB-class suffix and one vendor suffix from the name of a function.
///
/// `glGenBuffersARB` becomes `glGenBuffers`, `glBindVertexArrayAPPLE` becomes
/// `glBindVertexArray`.
pub fn base_name(name: &str) -> &str {
    let name = strip_suffix(name, ARB_SUFFIXES);
    strip_suffix(name, VENDOR_SUFFIXES)
}

fn strip_suffix<'a>(name: &'a str, suffixes: &[&str]) -> &'a str {
    // the longest matching suffix wins
    let mut best: Option<&'a str> = None;

    for suffix in suffixes {
        if let Some(stripped) = name.strip_suffix(suffix) {
            // the remaining name must still look like a function name
            if stripped.len() > 2 && best.map_or(true, |b| stripped.len() < b.len()) {
                best = Some(stripped);
            }
        }
    }

    best.unwrap_or(name)
}

/// Returns every spelling under which a function can be exported, in the order they are
/// tried: the base name, then the base name with each ARB-class suffix, then with each
/// vendor suffix.
pub fn name_permutations(name: &str) -> SmallVec<[String; 32]> {
    let base = base_name(name);

    let mut result = SmallVec::new();
    result.push(base.to_owned());
    result.extend(ARB_SUFFIXES.iter().map(|s| format!("{}{}", base, s)));
    result.extend(VENDOR_SUFFIXES.iter().map(|s| format!("{}{}", base, s)));
    result
}

/// Table of function names to addresses.
///
/// Only non-null addresses are stored.
#[derive(Debug, Clone, Default)]
pub struct ProcAddressTable {
    addresses: FnvHashMap<String, usize>,
}

impl ProcAddressTable {
    /// Builds an empty table.
    #[inline]
    pub fn new() -> ProcAddressTable {
        Default::default()
    }

    /// Builds a table by resolving each of the names with `loader`.
    pub fn load<'a, I, F>(names: I, mut loader: F) -> ProcAddressTable
                          where I: IntoIterator<Item = &'a str>,
                                F: FnMut(&str) -> *const c_void
    {
        let mut table = ProcAddressTable::new();
        for name in names {
            table.insert(name, loader(name));
        }
        table
    }

    /// Records the address of a function. Null addresses are ignored.
    #[inline]
    pub fn insert(&mut self, name: &str, address: *const c_void) {
        if !address.is_null() {
            self.addresses.insert(name.to_owned(), address as usize);
        }
    }

    /// Returns the address of a function, if it was resolved.
    #[inline]
    pub fn address_of(&self, name: &str) -> Option<*const c_void> {
        self.addresses.get(name).map(|&a| a as *const c_void)
    }

    /// Returns true if the function was resolved.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    /// Number of resolved functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns true if nothing was resolved.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// The two address tables of a context.
#[derive(Debug, Clone, Default)]
pub struct ProcResolver {
    /// OpenGL entry points.
    pub gl: ProcAddressTable,
    /// Window-system entry points.
    pub platform: ProcAddressTable,
}

impl ProcResolver {
    /// Returns true if the function is available.
    ///
    /// Looks into the cached tables first. If both miss, each spelling returned by
    /// `name_permutations` is passed to `dynamic_lookup` until one of them resolves. The
    /// results of the dynamic lookup are not cached.
    pub fn is_function_available<F>(&self, name: &str, mut dynamic_lookup: F) -> bool
                                    where F: FnMut(&str) -> *const c_void
    {
        if self.gl.contains(name) || self.platform.contains(name) {
            return true;
        }

        name_permutations(name).iter().any(|candidate| !dynamic_lookup(candidate).is_null())
    }

    /// Forgets every address.
    #[inline]
    pub fn clear(&mut self) {
        self.gl = ProcAddressTable::new();
        self.platform = ProcAddressTable::new();
    }
}
