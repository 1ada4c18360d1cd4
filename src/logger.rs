use log::LevelFilter;

/// Installs the fern dispatcher. Debug builds default to `Debug`, release
/// to `Info`; `TAPEFLOW_LOG` overrides either (any `log::LevelFilter`
/// spelling, e.g. `trace`).
pub fn setup(is_debug: bool) -> Result<(), fern::InitError> {
    let default_level = if is_debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let level = std::env::var("TAPEFLOW_LOG")
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(default_level);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("rustls", LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}
