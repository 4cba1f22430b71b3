use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Lock a std mutex, recovering the guard if a previous holder panicked.
///
/// The in-memory backend keeps plain data behind the lock; a poisoned guard
/// still holds a usable map, so the poison is logged and cleared.
pub(crate) fn mutex_lock<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "mutex.lock",
                result = "poisoned_recovered",
                hint = "entries written by the panicking holder may be partial",
                "Recovered from poisoned cache backend lock"
            );
            lock.clear_poison();
            poisoned.into_inner()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_mutex_is_recovered() {
        let shared = Arc::new(Mutex::new(vec![1_u8]));
        let clone = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = clone.lock().expect("lock");
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        let guard = mutex_lock(&shared, "cache::lock::tests", "recover");
        assert_eq!(*guard, vec![1]);
        drop(guard);
        assert!(!shared.is_poisoned());
    }
}
