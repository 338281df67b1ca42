//! Running work on a thread with a chosen stack size
//!
//! Deeply nested sources recurse deeply in the parser. Callers that expect
//! such input can parse on a worker with a larger stack than the one they run on.

use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("cannot spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("worker thread panicked")]
    Panicked,
}

/// Run `f` on a new thread and wait for it. A `stack_size` of 0 keeps the
/// platform default.
pub fn execute_on_thread<F, T>(stack_size: usize, f: F) -> Result<T, ThreadError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let mut builder = thread::Builder::new().name("cindex-worker".to_string());
    if stack_size > 0 {
        builder = builder.stack_size(stack_size);
    }
    let handle = builder.spawn(f)?;
    handle.join().map_err(|_| {
        tracing::warn!("worker thread panicked");
        ThreadError::Panicked
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{Index, ParseOptions, UnsavedFile};

    #[test]
    fn test_parse_on_worker() {
        let names = execute_on_thread(8 << 20, || {
            let unit = Index::new(false, false)
                .parse_translation_unit(
                    Some("t.c"),
                    &[] as &[&str],
                    &[UnsavedFile::new("t.c", "int a;\nint b;\n")],
                    ParseOptions::default(),
                )
                .unwrap();
            unit.cursor()
                .children()
                .iter()
                .map(|c| c.spelling())
                .collect::<Vec<_>>()
        })
        .unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_panic_is_reported() {
        let result = execute_on_thread(0, || -> u32 { panic!("boom") });
        assert!(matches!(result, Err(ThreadError::Panicked)));
    }
}
