use env_logger::Env;

/// Environment variable holding the log filter, e.g. `DCRPS_LOG=debug`
pub const LOG_ENV: &str = "DCRPS_LOG";

/// Logs go to stderr so stdout only carries command output.
pub fn init_logger() {
    env_logger::Builder::from_env(Env::new().filter_or(LOG_ENV, "warn"))
        .format_timestamp(None)
        .init();
}
