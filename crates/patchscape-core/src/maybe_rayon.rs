//! Rayon or sequential iteration behind one import.
//!
//! With the `threading` feature this re-exports rayon's prelude. Without it
//! `into_par_iter()` falls back to `into_iter()`, so callers keep a single
//! code path.
#[cfg(feature = "threading")]
pub use rayon::prelude::*;

#[cfg(not(feature = "threading"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "threading"))]
pub use sequential::*;
