/*!
Symbol lookup in a shared library, for backends implementing `Backend::dynamic_lookup`.

# Features

Only available on unix.

*/
use log::trace;

use std::ffi::CString;
use std::os::raw::c_void;
use std::ptr;

/// A shared library opened with `dlopen`.
pub struct DynamicLibrary {
    handle: *mut c_void,
}

// the handle returned by `dlopen` can be used from any thread
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    /// Opens the first library of the list that can be loaded.
    ///
    /// For example `&["libGL.so.1", "libGL.so"]`.
    pub fn open(names: &[&str]) -> Option<DynamicLibrary> {
        for name in names {
            let c_name = match CString::new(*name) {
                Ok(n) => n,
                Err(_) => continue,
            };

            let handle = unsafe { libc::dlopen(c_name.as_ptr(), libc::RTLD_LAZY | libc::RTLD_GLOBAL) };
            if !handle.is_null() {
                trace!("Opened {}", name);
                return Some(DynamicLibrary { handle: handle });
            }
        }

        None
    }

    /// Gives access to the symbols of the running program and of the libraries it has
    /// already loaded.
    pub fn open_self() -> Option<DynamicLibrary> {
        let handle = unsafe { libc::dlopen(ptr::null(), libc::RTLD_LAZY) };
        if handle.is_null() {
            None
        } else {
            Some(DynamicLibrary { handle: handle })
        }
    }

    /// Returns the address of a symbol, or null if it doesn't exist.
    pub fn symbol(&self, name: &str) -> *const c_void {
        let c_name = match CString::new(name) {
            Ok(n) => n,
            Err(_) => return ptr::null(),
        };

        unsafe { libc::dlsym(self.handle, c_name.as_ptr()) as *const c_void }
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        unsafe { libc::dlclose(self.handle); }
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::DynamicLibrary;

    #[test]
    fn finds_libc_symbol() {
        let lib = DynamicLibrary::open_self().unwrap();
        assert!(!lib.symbol("malloc").is_null());
        assert!(lib.symbol("glctxDoesNotExist").is_null());
        assert!(lib.symbol("nul\0byte").is_null());
    }

    #[test]
    fn missing_library() {
        assert!(DynamicLibrary::open(&["libglctx-missing.so.42"]).is_none());
    }
}
