use env_logger::{Builder, Env};

pub const LOG_ENV: &str = "FILEDIGEST_LOG";

/// Install the process-wide logger. Level comes from `FILEDIGEST_LOG`
/// (default `info`). Calling it again is a no-op.
pub fn init_logger() {
    let env = Env::default().filter_or(LOG_ENV, "info");
    let _ = Builder::from_env(env)
        .format_timestamp_millis()
        .format_module_path(false)
        .try_init();
}
