// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console reporting for sample preparation.
//!
//! Failed samples are always reported on stderr with [`warn!`](crate::warn). Per-sample
//! augmentation parameters and batch summaries go through [`verbose!`](crate::verbose) and
//! are silent unless [`set_verbose`] turned them on.

use std::sync::atomic::{AtomicBool, Ordering};

/// Per-sample and batch reporting switch, off at startup.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Turn per-sample and batch reporting on or off for the whole process.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Whether per-sample and batch reporting is on.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Report a sample that could not be prepared.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }}
}

/// Report augmentation details when verbose output is on.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_toggle() {
        set_verbose(true);
        assert!(is_verbose());

        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_macros_expand() {
        crate::warn!("skipping {}", "a.jpg");
        crate::verbose!("prepared {}/{}", 1, 2);
    }
}
