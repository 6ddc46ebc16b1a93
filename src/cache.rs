//! Lazily computed, shared, replaceable values.

use once_cell::sync::OnceCell;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A value computed at most once and then served read-only as `Arc<T>` until
/// it is explicitly replaced or invalidated.
///
/// Concurrent callers of [`Memo::get_or_try_init`] block on the running
/// initializer instead of starting their own. A failed initializer leaves
/// the memo empty.
#[derive(Debug)]
pub struct Memo<T> {
    cell: RwLock<OnceCell<Arc<T>>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            cell: RwLock::new(OnceCell::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, OnceCell<Arc<T>>> {
        self.cell.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, OnceCell<Arc<T>>> {
        self.cell.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.read().get().cloned()
    }

    pub fn is_populated(&self) -> bool {
        self.read().get().is_some()
    }

    /// Returns the cached value, running `init` first if there is none.
    ///
    /// `init` must not call back into this memo's `replace` or `invalidate`.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        let guard = self.read();
        guard.get_or_try_init(|| init().map(Arc::new)).cloned()
    }

    /// Stores `value`, discarding whatever was cached.
    pub fn replace(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.write() = OnceCell::with_value(Arc::clone(&value));
        value
    }

    /// Empties the memo. Handles already given out stay valid.
    pub fn invalidate(&self) -> Option<Arc<T>> {
        self.write().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_initializer_runs_once() {
        let memo = Memo::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = memo
                .get_or_try_init(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_initializer_leaves_memo_empty() {
        let memo: Memo<u32> = Memo::new();
        assert_eq!(memo.get_or_try_init(|| Err("boom")), Err("boom"));
        assert!(!memo.is_populated());
        assert_eq!(*memo.get_or_try_init(|| Ok::<_, &str>(7)).unwrap(), 7);
    }

    #[test]
    fn test_replace_and_invalidate() {
        let memo = Memo::new();
        let first = memo.replace(String::from("one"));
        memo.replace(String::from("two"));
        assert_eq!(memo.get().as_deref().map(String::as_str), Some("two"));
        // Handles given out earlier are unaffected.
        assert_eq!(first.as_str(), "one");

        assert!(memo.invalidate().is_some());
        assert!(memo.get().is_none());
        assert!(memo.invalidate().is_none());
    }

    #[test]
    fn test_concurrent_callers_share_one_value() {
        let memo = Memo::new();
        let calls = AtomicUsize::new(0);
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    let v = memo
                        .get_or_try_init(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, ()>(vec![1, 2, 3])
                        })
                        .unwrap();
                    assert_eq!(v.len(), 3);
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
