//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system with a default filter such as `"info"` or
/// `"scene_engine=debug"`. `RUST_LOG` still takes precedence when set.
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized; ignoring level '{}'", level);
    }
}

/// Thread-local log capture for assertions in unit tests.
#[cfg(test)]
pub(crate) mod capture {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::cell::RefCell;

    thread_local! {
        static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    struct CaptureLogger;

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            RECORDS.with(|records| {
                records.borrow_mut().push((record.level(), record.args().to_string()));
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;

    /// Install the capture logger (once per process) and clear this thread's buffer.
    pub fn install() {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
        RECORDS.with(|records| records.borrow_mut().clear());
    }

    /// Drain the records logged on this thread since the last call.
    pub fn take() -> Vec<(Level, String)> {
        RECORDS.with(|records| std::mem::take(&mut *records.borrow_mut()))
    }

    /// Count this thread's records at `level`, draining the buffer.
    pub fn count(level: Level) -> usize {
        take().into_iter().filter(|(l, _)| *l == level).count()
    }
}
