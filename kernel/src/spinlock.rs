use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

// Bare-metal hosts implement this with cli/sti; the reference host used by
// this crate's own tests is a no-op.
pub trait InterruptControl {
    fn disable() -> bool;
    fn restore(was_enabled: bool);
}

pub struct NullInterrupts;

impl InterruptControl for NullInterrupts {
    fn disable() -> bool {
        false
    }
    fn restore(_was_enabled: bool) {}
}

#[derive(Debug)]
pub struct Spinlock {
    locked: AtomicBool,
    name: &'static str,
}

unsafe impl Send for Spinlock {}
unsafe impl Sync for Spinlock {}

impl Spinlock {
    pub const fn new(name: &'static str) -> Self {
        Spinlock {
            locked: AtomicBool::new(false),
            name,
        }
    }

    pub fn acquire(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
    }

    pub fn release(&self) {
        assert!(self.holding(), "unlocking unheld lock {}", self.name);
        self.locked.store(false, Ordering::Release);
    }

    pub fn holding(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct SpinMutex<T: ?Sized, I: InterruptControl = NullInterrupts> {
    lock: Spinlock,
    _control: core::marker::PhantomData<I>,
    data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send, I: InterruptControl> Send for SpinMutex<T, I> {}
unsafe impl<T: ?Sized + Send, I: InterruptControl> Sync for SpinMutex<T, I> {}

impl<T, I: InterruptControl> SpinMutex<T, I> {
    pub const fn new(name: &'static str, data: T) -> Self {
        SpinMutex {
            lock: Spinlock::new(name),
            _control: core::marker::PhantomData,
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T, I> {
        let was_enabled = I::disable();
        self.lock.acquire();
        MutexGuard {
            lock: self,
            was_enabled,
        }
    }

    pub fn holding(&self) -> bool {
        self.lock.holding()
    }

    // Raw release/acquire pair, bypassing the guard: lets a Scheduler put the
    // caller to sleep with the lock held and hand it back on wakeup, the way
    // sleep() releases and reacquires a process lock around a blocking wait.
    // Caller must not hold a MutexGuard across a raw release, and must
    // reacquire before touching the protected data again.
    pub unsafe fn release(&self) {
        self.lock.release();
    }

    pub fn acquire(&self) {
        self.lock.acquire();
    }

    // Caller must hold the lock.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn assume_locked(&self) -> &mut T {
        unsafe { &mut *self.data.get() }
    }
}

pub struct MutexGuard<'a, T: ?Sized, I: InterruptControl> {
    lock: &'a SpinMutex<T, I>,
    was_enabled: bool,
}

impl<'a, T: ?Sized, I: InterruptControl> Deref for MutexGuard<'a, T, I> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<'a, T: ?Sized, I: InterruptControl> DerefMut for MutexGuard<'a, T, I> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<'a, T: ?Sized, I: InterruptControl> Drop for MutexGuard<'a, T, I> {
    fn drop(&mut self) {
        self.lock.lock.release();
        I::restore(self.was_enabled);
    }
}
