/// Forward to the `log` crate when the `log` feature is enabled, otherwise expand to nothing.
macro_rules! log {
	($level:ident, $($arg:tt)*) => {
		#[cfg(feature = "log")]
		log::$level!($($arg)*);
	}
}

pub(crate) use log;
