use log::{ LevelFilter, SetLoggerError };

/// Maps a count of `-v` flags onto a level: warnings by default, then info,
/// debug and trace.
pub fn level_for_verbosity(verbosity: u64) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn builder(level: LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr);

    // RUST_LOG, when set, refines the level given on the command line.
    builder.parse_default_env();
    builder
}

/// Installs a stderr logger at `level`. Fails if another logger is already
/// set.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    builder(level).try_init()
}

#[test]
fn verbosity_levels() {
    assert_eq!(level_for_verbosity(0), LevelFilter::Warn);
    assert_eq!(level_for_verbosity(2), LevelFilter::Debug);
    assert_eq!(level_for_verbosity(7), LevelFilter::Trace);
}

#[test]
fn second_init_is_rejected() {
    // Only one logger may be installed per process; the first call may
    // already have been made by another test.
    let _ = init(LevelFilter::Warn);

    let err = anyhow::Error::new(init(LevelFilter::Debug).unwrap_err())
        .context("failed to install logger");
    assert_eq!(err.to_string(), "failed to install logger");
}
