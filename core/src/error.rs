//! Unified failure type threaded through every loader and the parsing
//! pipeline, plus the per-thread last-error string exposed by the public
//! surface.

use std::cell::RefCell;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds shared by all loaders and pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File not found, read failure, short read.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structurally invalid artifact: bad image, inconsistent lengths,
    /// empty user dictionary, broken feature template.
    #[error("{0}")]
    Corruption(String),

    /// Operation invoked in an illegal state.
    #[error("{0}")]
    Runtime(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn corruption(message: impl Into<String>) -> Self {
        Error::Corruption(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    /// Records this error as the calling thread's last error and passes it
    /// through, so public entry points can `.map_err(Error::recorded)`.
    pub(crate) fn recorded(self) -> Self {
        LAST_ERROR.with(|slot| {
            *slot.borrow_mut() = Some(self.to_string());
        });
        self
    }
}

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Returns the message of the most recent failure on the current thread, if
/// any public operation has failed.
pub fn last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}
