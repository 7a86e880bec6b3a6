/*!
Client-side caches of OpenGL state.

Querying the driver is slow, so the values written by the application are remembered here.
Every tracker is cleared when its context is destroyed: the objects it describes no longer
exist.

*/
use fnv::FnvHashMap;
use smallvec::SmallVec;

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::gl;

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sizes of the buffer objects, by buffer name.
///
/// Buffer objects are shared between contexts of the same share group, so this tracker is
/// shared too. Destroying any context of the group invalidates it.
#[derive(Debug, Default)]
pub struct BufferSizeTracker {
    sizes: Mutex<FnvHashMap<gl::types::GLuint, usize>>,
}

impl BufferSizeTracker {
    /// Builds an empty tracker.
    #[inline]
    pub fn new() -> BufferSizeTracker {
        Default::default()
    }

    /// Records the size passed to `glBufferData` or `glBufferStorage`.
    #[inline]
    pub fn set_size(&self, buffer: gl::types::GLuint, size: usize) {
        lock(&self.sizes).insert(buffer, size);
    }

    /// Returns the recorded size of a buffer.
    #[inline]
    pub fn size_of(&self, buffer: gl::types::GLuint) -> Option<usize> {
        lock(&self.sizes).get(&buffer).cloned()
    }

    /// Forgets a deleted buffer.
    #[inline]
    pub fn remove(&self, buffer: gl::types::GLuint) {
        lock(&self.sizes).remove(&buffer);
    }

    /// Forgets every buffer.
    #[inline]
    pub fn clear(&self) {
        lock(&self.sizes).clear();
    }

    /// Number of tracked buffers.
    #[inline]
    pub fn len(&self) -> usize {
        lock(&self.sizes).len()
    }

    /// Returns true if no buffer is tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        lock(&self.sizes).is_empty()
    }
}

/// The buffer bound to each binding point (`GL_ARRAY_BUFFER`, `GL_ELEMENT_ARRAY_BUFFER`, ...)
/// of a context.
#[derive(Debug, Default)]
pub struct BufferStateTracker {
    bindings: Mutex<FnvHashMap<gl::types::GLenum, gl::types::GLuint>>,
}

impl BufferStateTracker {
    /// Builds an empty tracker.
    #[inline]
    pub fn new() -> BufferStateTracker {
        Default::default()
    }

    /// Records a call to `glBindBuffer`. Binding 0 removes the entry.
    #[inline]
    pub fn set_binding(&self, target: gl::types::GLenum, buffer: gl::types::GLuint) {
        let mut bindings = lock(&self.bindings);
        if buffer == 0 {
            bindings.remove(&target);
        } else {
            bindings.insert(target, buffer);
        }
    }

    /// Returns the buffer bound to `target`, or `None` if unknown or unbound.
    #[inline]
    pub fn binding(&self, target: gl::types::GLenum) -> Option<gl::types::GLuint> {
        lock(&self.bindings).get(&target).cloned()
    }

    /// Forgets every binding.
    #[inline]
    pub fn clear(&self) {
        lock(&self.bindings).clear();
    }
}

/// Integer server state (`glPixelStorei`, enabled capabilities, ...) with a push/pop stack
/// mirroring `glPushAttrib`.
#[derive(Debug, Default)]
pub struct StateTracker {
    inner: Mutex<StateTrackerInner>,
}

#[derive(Debug, Default)]
struct StateTrackerInner {
    values: FnvHashMap<gl::types::GLenum, gl::types::GLint>,
    stack: SmallVec<[FnvHashMap<gl::types::GLenum, gl::types::GLint>; 4]>,
}

impl StateTracker {
    /// Builds an empty tracker.
    #[inline]
    pub fn new() -> StateTracker {
        Default::default()
    }

    /// Records the latest value of `pname`.
    #[inline]
    pub fn set(&self, pname: gl::types::GLenum, value: gl::types::GLint) {
        lock(&self.inner).values.insert(pname, value);
    }

    /// Returns the latest recorded value of `pname`.
    #[inline]
    pub fn get(&self, pname: gl::types::GLenum) -> Option<gl::types::GLint> {
        lock(&self.inner).values.get(&pname).cloned()
    }

    /// Saves the current values.
    pub fn push(&self) {
        let mut inner = lock(&self.inner);
        let saved = inner.values.clone();
        inner.stack.push(saved);
    }

    /// Restores the values saved by the latest `push`. Returns false if the stack is empty.
    pub fn pop(&self) -> bool {
        let mut inner = lock(&self.inner);
        match inner.stack.pop() {
            Some(saved) => {
                inner.values = saved;
                true
            },
            None => false,
        }
    }

    /// Forgets every value and the whole stack.
    #[inline]
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        inner.values.clear();
        inner.stack.clear();
    }

    /// Depth of the push/pop stack.
    #[inline]
    pub fn depth(&self) -> usize {
        lock(&self.inner).stack.len()
    }
}
