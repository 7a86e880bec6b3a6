/*!
Ownership lock deciding which thread may have a context current.

OpenGL drivers allow a context to be current on one thread at a time. The `OwnershipLock`
enforces this in-process: it is a non-recursive lock remembering the thread that owns it.

Two policies are available:

 - **blocking** (the default): a thread trying to acquire a lock owned by another thread waits
   until the owner releases it.
 - **fail-fast**: the acquisition immediately returns `LockError::Contention`.

Waiters are woken one at a time and in no particular order. Under sustained contention a
waiter can starve.

*/
use backtrace::Backtrace;

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Thread, ThreadId};

/// Identity of a thread, as reported in lock diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadIdentity {
    /// The id of the thread.
    pub id: ThreadId,
    /// The name of the thread, if it has one.
    pub name: Option<String>,
}

impl ThreadIdentity {
    /// Returns the identity of the calling thread.
    #[inline]
    pub fn current() -> ThreadIdentity {
        ThreadIdentity::from(&thread::current())
    }
}

impl<'a> From<&'a Thread> for ThreadIdentity {
    #[inline]
    fn from(thread: &'a Thread) -> ThreadIdentity {
        ThreadIdentity {
            id: thread.id(),
            name: thread.name().map(|n| n.to_owned()),
        }
    }
}

impl fmt::Display for ThreadIdentity {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.name {
            Some(ref name) => write!(fmt, "'{}' ({:?})", name, self.id),
            None => write!(fmt, "{:?}", self.id),
        }
    }
}

/// Error that can happen when acquiring or releasing an `OwnershipLock`.
#[derive(Debug, Clone)]
pub enum LockError {
    /// The calling thread already owns the lock.
    Reentrancy {
        /// The thread that tried to lock twice.
        thread: ThreadIdentity,
    },

    /// The lock is in fail-fast mode and is owned by another thread.
    Contention {
        /// The current owner.
        owner: ThreadIdentity,
        /// The thread that tried to acquire the lock.
        requester: ThreadIdentity,
        /// Where the owner acquired the lock. Only recorded when debugging is enabled.
        owner_backtrace: Option<String>,
    },

    /// The lock was released while nobody owned it.
    NotOwned {
        /// The thread that tried to release.
        thread: ThreadIdentity,
    },

    /// The lock was released by a thread that doesn't own it.
    WrongOwner {
        /// The current owner.
        owner: ThreadIdentity,
        /// The thread that tried to release.
        thread: ThreadIdentity,
    },
}

impl fmt::Display for LockError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            LockError::Reentrancy { ref thread } => {
                write!(fmt, "Thread {} tried to acquire a context lock it already owns", thread)
            },
            LockError::Contention { ref owner, ref requester, ref owner_backtrace } => {
                write!(fmt, "Thread {} can't acquire the context lock: it is owned by thread {}",
                       requester, owner)?;
                if let Some(bt) = owner_backtrace {
                    write!(fmt, "\nLock acquired at:\n{}", bt)?;
                }
                Ok(())
            },
            LockError::NotOwned { ref thread } => {
                write!(fmt, "Thread {} tried to release a context lock that isn't owned", thread)
            },
            LockError::WrongOwner { ref owner, ref thread } => {
                write!(fmt, "Thread {} tried to release a context lock owned by thread {}",
                       thread, owner)
            },
        }
    }
}

impl Error for LockError {}

struct SyncData {
    owner: Option<ThreadIdentity>,
    owner_backtrace: Option<Backtrace>,
    waiters: usize,
}

/// Non-recursive lock binding a context to at most one thread.
pub struct OwnershipLock {
    data: Mutex<SyncData>,
    condvar: Condvar,
    fail_fast: AtomicBool,
    record_backtraces: AtomicBool,
}

impl OwnershipLock {
    /// Builds a new unowned lock.
    pub fn new(fail_fast: bool) -> OwnershipLock {
        OwnershipLock {
            data: Mutex::new(SyncData {
                owner: None,
                owner_backtrace: None,
                waiters: 0,
            }),
            condvar: Condvar::new(),
            fail_fast: AtomicBool::new(fail_fast),
            record_backtraces: AtomicBool::new(false),
        }
    }

    #[inline]
    fn data(&self) -> MutexGuard<SyncData> {
        // the data is only ever mutated atomically, a poisoned mutex still holds a valid state
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the calling thread the owner of the lock.
    ///
    /// In blocking mode this waits as long as another thread owns the lock. There is no
    /// timeout.
    pub fn acquire(&self) -> Result<(), LockError> {
        let me = ThreadIdentity::current();
        let mut data = self.data();

        if let Some(owner) = data.owner.clone() {
            if owner.id == me.id {
                return Err(LockError::Reentrancy { thread: me });
            }

            // the policy is sampled once, a waiter keeps waiting even if it is toggled
            if self.fail_fast.load(Ordering::Acquire) {
                let owner_backtrace = data.owner_backtrace.as_mut().map(|bt| {
                    bt.resolve();
                    format!("{:?}", bt)
                });

                return Err(LockError::Contention {
                    owner: owner,
                    requester: me,
                    owner_backtrace: owner_backtrace,
                });
            }

            data.waiters += 1;
            while data.owner.is_some() {
                data = self.condvar.wait(data).unwrap_or_else(PoisonError::into_inner);
            }
            data.waiters -= 1;
        }

        data.owner = Some(me);
        if self.record_backtraces.load(Ordering::Relaxed) {
            data.owner_backtrace = Some(Backtrace::new_unresolved());
        }

        Ok(())
    }

    /// Releases the lock owned by the calling thread and wakes up one waiter.
    pub fn release(&self) -> Result<(), LockError> {
        let me = ThreadIdentity::current();
        let mut data = self.data();

        match data.owner {
            None => return Err(LockError::NotOwned { thread: me }),
            Some(ref owner) if owner.id != me.id => {
                return Err(LockError::WrongOwner { owner: owner.clone(), thread: me });
            },
            Some(_) => (),
        }

        data.owner = None;
        data.owner_backtrace = None;

        if data.waiters > 0 {
            self.condvar.notify_one();
        }

        Ok(())
    }

    /// Returns true if the calling thread owns the lock.
    #[inline]
    pub fn is_held(&self) -> bool {
        let me = thread::current().id();
        self.data().owner.as_ref().map_or(false, |o| o.id == me)
    }

    /// Returns true if any thread owns the lock.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.data().owner.is_some()
    }

    /// Returns the current owner of the lock.
    ///
    /// The value is a snapshot and can be outdated as soon as it is returned.
    #[inline]
    pub fn owner(&self) -> Option<ThreadIdentity> {
        self.data().owner.clone()
    }

    /// Returns the number of threads blocked in `acquire`.
    #[inline]
    pub fn waiters(&self) -> usize {
        self.data().waiters
    }

    /// Returns true if the lock fails instead of blocking when owned by another thread.
    #[inline]
    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast.load(Ordering::Acquire)
    }

    /// Switches between the fail-fast and the blocking policy.
    #[inline]
    pub fn set_fail_fast(&self, fail_fast: bool) {
        self.fail_fast.store(fail_fast, Ordering::Release);
    }

    /// If true, the lock remembers where its owner acquired it and reports it on contention.
    #[inline]
    pub fn set_record_backtraces(&self, record: bool) {
        self.record_backtraces.store(record, Ordering::Relaxed);
    }
}

impl Default for OwnershipLock {
    #[inline]
    fn default() -> OwnershipLock {
        OwnershipLock::new(false)
    }
}

impl fmt::Debug for OwnershipLock {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let data = self.data();
        fmt.debug_struct("OwnershipLock")
           .field("owner", &data.owner)
           .field("waiters", &data.waiters)
           .field("fail_fast", &self.is_fail_fast())
           .finish()
    }
}
