/*!
# Fatal error reporting
*/

/**
# Receiver of fatal errors

The scanner calls [`ErrorReporter::report_fatal`] exactly once per fatal
error, before the error is returned to the caller. Closures taking the same
arguments implement this trait.
*/
pub trait ErrorReporter {
	/// `key` and `args` are those of [`Error::key`](crate::Error::key) and
	/// [`Error::args`](crate::Error::args).
	fn report_fatal(&mut self, domain: &'static str, key: &'static str, args: &[String]);
}

impl<F: FnMut(&'static str, &'static str, &[String])> ErrorReporter for F {
	fn report_fatal(&mut self, domain: &'static str, key: &'static str, args: &[String]) {
		self(domain, key, args)
	}
}

/// Reporter which emits fatal errors through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
	fn report_fatal(&mut self, domain: &'static str, key: &'static str, args: &[String]) {
		log::error!("[{}] {}: {}", domain, key, args.join(", "));
	}
}
