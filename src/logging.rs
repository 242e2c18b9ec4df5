//! Logger setup for embedding programs and tests

/// Map a verbosity count (`-v` repetitions) to a level filter
pub fn level_for(verbosity: u8, quiet: bool) -> log::LevelFilter {
    if quiet {
        return log::LevelFilter::Error;
    }
    match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

/// Install `env_logger` at the level for `verbosity`
///
/// `RUST_LOG` still refines the filter per module. Calling this more than
/// once keeps the first logger.
pub fn init(verbosity: u8, quiet: bool) {
    let installed = env_logger::Builder::new()
        .filter_level(level_for(verbosity, quiet))
        .parse_default_env()
        .format_timestamp(None)
        .try_init();
    if installed.is_err() {
        log::debug!("Logger already initialized");
    }
}
