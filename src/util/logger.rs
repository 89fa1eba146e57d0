use log::SetLoggerError;

/// Attempt to init an env_logger for the collector. Pause summaries are logged at `info`, the
/// phases of each pause at `debug`, and per-object events at `trace`.
/// Does nothing if the "builtin_env_logger" feature is disabled.
pub fn try_init() -> Result<(), SetLoggerError> {
    cfg_if::cfg_if! {
        if #[cfg(feature = "builtin_env_logger")] {
            env_logger::Builder::from_env(
                // By default, use info level logging.
                env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
            )
            .format_timestamp_millis()
            .try_init()
        } else {
            Ok(())
        }
    }
}
