//! Logging helpers.

/// Per-token resolver tracing. Only present in debug builds, since it fires for every speculative parse attempt.
#[macro_export]
macro_rules! trace {
	($($arg:tt)+) => {
		#[cfg(debug_assertions)]
		::log::trace!($($arg)+);
	};
}
