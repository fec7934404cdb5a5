//! Parallel processing strategies

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use krigeo_core::{Error, Result};

use crate::cancel::CancelToken;

/// Processing mode for estimation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel processing on a dedicated pool with a fixed number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    pub fn validate(&self) -> Result<()> {
        if let ProcessingMode::ParallelWith(0) = self {
            return Err(Error::invalid_parameter(
                "processing_mode",
                0,
                "thread count must be at least 1",
            ));
        }
        Ok(())
    }

    /// Whether work is spread over several threads.
    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && !matches!(self, ProcessingMode::Sequential)
    }

    /// Run `op` inside the pool selected by this mode.
    pub fn install<R, OP>(&self, op: OP) -> Result<R>
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self {
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("failed to build thread pool: {e}")))?;
                Ok(pool.install(op))
            }
            _ => Ok(op()),
        }
    }
}

/// Results of a chunked map, in input order.
#[derive(Debug, Clone)]
pub struct ChunkedOutput<R> {
    /// One result per processed item; a prefix of the input when cancelled
    pub results: Vec<R>,
    /// Whether dispatch stopped early
    pub cancelled: bool,
}

/// Map `f` over `items` in chunks, preserving input order.
///
/// Each worker gets its own state from `init`, so per-item scratch buffers
/// are never shared. Before every chunk the cancel token is checked; once it
/// is set no further chunk starts and the results so far are returned.
pub fn map_chunks<T, S, R, INIT, F>(
    mode: ProcessingMode,
    items: &[T],
    chunk_size: usize,
    cancel: Option<&CancelToken>,
    init: INIT,
    f: F,
) -> Result<ChunkedOutput<R>>
where
    T: Sync,
    R: Send,
    INIT: Fn() -> S + Sync + Send,
    F: Fn(&mut S, &T) -> R + Sync + Send,
{
    mode.validate()?;
    let chunk_size = chunk_size.max(1);
    let parallel = mode.is_parallel();

    mode.install(|| {
        let mut results = Vec::with_capacity(items.len());
        let mut cancelled = false;
        let mut local: Option<S> = None;

        for chunk in items.chunks(chunk_size) {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                cancelled = true;
                break;
            }
            if parallel {
                map_parallel(chunk, &init, &f, &mut results);
            } else {
                let state = local.get_or_insert_with(&init);
                results.extend(chunk.iter().map(|item| f(state, item)));
            }
        }

        ChunkedOutput { results, cancelled }
    })
}

#[cfg(feature = "parallel")]
fn map_parallel<T, S, R, INIT, F>(chunk: &[T], init: &INIT, f: &F, out: &mut Vec<R>)
where
    T: Sync,
    R: Send,
    INIT: Fn() -> S + Sync + Send,
    F: Fn(&mut S, &T) -> R + Sync + Send,
{
    let part: Vec<R> = chunk
        .par_iter()
        .map_init(init, |state, item| f(state, item))
        .collect();
    out.extend(part);
}

#[cfg(not(feature = "parallel"))]
fn map_parallel<T, S, R, INIT, F>(chunk: &[T], init: &INIT, f: &F, out: &mut Vec<R>)
where
    INIT: Fn() -> S,
    F: Fn(&mut S, &T) -> R,
{
    let mut state = init();
    out.extend(chunk.iter().map(|item| f(&mut state, item)));
}

/// Number of threads in the current pool
pub fn available_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_preserves_order() {
        let items: Vec<usize> = (0..100).collect();
        let out = map_chunks(ProcessingMode::Sequential, &items, 7, None, || 0usize, |calls, x| {
            *calls += 1;
            x * 2
        })
        .unwrap();
        assert!(!out.cancelled);
        assert_eq!(out.results, items.iter().map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_available_threads() {
        let n = available_threads();
        if cfg!(feature = "parallel") {
            assert!(n >= 1);
        } else {
            assert_eq!(n, 1);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let items: Vec<f64> = (0..1000).map(|i| i as f64 * 0.5).collect();
        let seq = map_chunks(ProcessingMode::Sequential, &items, 64, None, || (), |_, x| x.sqrt())
            .unwrap();
        let par = map_chunks(ProcessingMode::ParallelWith(3), &items, 64, None, || (), |_, x| {
            x.sqrt()
        })
        .unwrap();
        assert_eq!(seq.results, par.results);
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let items = vec![1, 2, 3];
        let out = map_chunks(ProcessingMode::Parallel, &items, 1, Some(&token), || (), |_, x| *x)
            .unwrap();
        assert!(out.cancelled);
        assert!(out.results.is_empty());
    }

    #[test]
    fn test_cancel_mid_run_returns_prefix() {
        let token = CancelToken::new();
        let items: Vec<usize> = (0..50).collect();
        let out = map_chunks(ProcessingMode::Sequential, &items, 10, Some(&token), || (), |_, x| {
            if *x == 15 {
                token.cancel();
            }
            *x
        })
        .unwrap();
        assert!(out.cancelled);
        assert_eq!(out.results, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(ProcessingMode::ParallelWith(0).validate().is_err());
    }
}
