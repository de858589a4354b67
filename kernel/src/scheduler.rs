// The process scheduler itself is out of scope: this is the seam a hosting
// kernel's sleep/wakeup primitive plugs into, not the scheduler.
use crate::spinlock::{InterruptControl, SpinMutex};

// Conventionally the address of the state a sleeper waits to observe change
// (e.g. a LineBuffer's write index). Shared channel, shared wakeup.
pub type Chan = usize;

pub trait Scheduler {
    // Must be called with lock held: atomically releases it and blocks until
    // some other process calls wakeup(chan), then reacquires before returning.
    fn sleep<T, I: InterruptControl>(&self, chan: Chan, lock: &SpinMutex<T, I>);
    fn wakeup(&self, chan: Chan);
    fn current_is_killed(&self) -> bool;
}

pub fn read_chan<T>(buffer: &T) -> Chan {
    buffer as *const T as usize
}

#[cfg(any(test, feature = "std"))]
pub use self::condvar::CondvarScheduler;

#[cfg(any(test, feature = "std"))]
mod condvar {
    use super::Chan;
    use crate::spinlock::{InterruptControl, SpinMutex};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Condvar, Mutex};

    // woken records channels with a pending, not-yet-observed wakeup; sleep
    // locks it before releasing the caller's spinlock, so a wakeup landing
    // between the release and the condvar wait isn't lost.
    pub struct CondvarScheduler {
        woken: Mutex<HashSet<Chan>>,
        cv: Condvar,
        killed: AtomicBool,
    }

    impl CondvarScheduler {
        pub fn new() -> Self {
            CondvarScheduler {
                woken: Mutex::new(HashSet::new()),
                cv: Condvar::new(),
                killed: AtomicBool::new(false),
            }
        }

        pub fn kill(&self) {
            self.killed.store(true, Ordering::SeqCst);
            self.cv.notify_all();
        }
    }

    impl Default for CondvarScheduler {
        fn default() -> Self {
            Self::new()
        }
    }

    impl super::Scheduler for CondvarScheduler {
        fn sleep<T, I: InterruptControl>(&self, chan: Chan, lock: &SpinMutex<T, I>) {
            let mut woken = self.woken.lock().unwrap();
            // caller holds lock; handed back before returning.
            unsafe { lock.release() };
            while !woken.remove(&chan) {
                if self.killed.load(Ordering::SeqCst) {
                    break;
                }
                woken = self.cv.wait(woken).unwrap();
            }
            drop(woken);
            lock.acquire();
        }

        fn wakeup(&self, chan: Chan) {
            let mut woken = self.woken.lock().unwrap();
            woken.insert(chan);
            self.cv.notify_all();
        }

        fn current_is_killed(&self) -> bool {
            self.killed.load(Ordering::SeqCst)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::scheduler::Scheduler;
        use crate::spinlock::SpinMutex;
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        #[test]
        fn wakeup_before_sleep_is_not_lost() {
            let sched = CondvarScheduler::new();
            let lock: SpinMutex<u32> = SpinMutex::new("t", 0);
            let chan = 42;

            // Deliver the wakeup before anyone sleeps; a correct sleep()
            // still returns instead of blocking forever.
            sched.wakeup(chan);

            lock.acquire();
            sched.sleep(chan, &lock);
            unsafe { lock.release() };
        }

        #[test]
        fn sleep_wakes_on_signal_from_another_thread() {
            let sched = Arc::new(CondvarScheduler::new());
            let lock: Arc<SpinMutex<u32>> = Arc::new(SpinMutex::new("t", 0));
            let chan = 7;

            lock.acquire();
            let sched2 = Arc::clone(&sched);
            let handle = thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                sched2.wakeup(chan);
            });
            sched.sleep(chan, &lock);
            unsafe { lock.release() };
            handle.join().unwrap();
        }

        #[test]
        fn kill_unblocks_a_sleeper() {
            let sched = Arc::new(CondvarScheduler::new());
            let lock: Arc<SpinMutex<u32>> = Arc::new(SpinMutex::new("t", 0));
            let chan = 99;

            lock.acquire();
            let sched2 = Arc::clone(&sched);
            let handle = thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                sched2.kill();
            });
            sched.sleep(chan, &lock);
            unsafe { lock.release() };
            handle.join().unwrap();
            assert!(sched.current_is_killed());
        }
    }
}
