//! Tracing subscriber setup.

use crate::{error::Error, extension::TomlTableExt, state::Config};
use std::{fs, io, path::Path, sync::OnceLock};
use tracing::Level;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::writer::{BoxMakeWriter, MakeWriterExt},
    layer::SubscriberExt,
};

/// Initializes the global tracing subscriber from the `[tracing]` table of the config.
///
/// The dev environment uses a pretty formatter and the others emit JSON lines.
/// When `log-dir` is set, events are also written to a rolling file appender.
/// Calling it more than once only emits a warning.
pub fn init_tracing(config: &Config) -> Result<(), Error> {
    if TRACING_APPENDER_GUARD.get().is_some() {
        tracing::warn!("the tracing subscriber has already been initialized");
        return Ok(());
    }

    let app_env = config.env();
    let in_dev_mode = app_env.is_dev();
    let mut env_filter = if in_dev_mode {
        "info,toolsmith=debug,toolsmith_core=debug"
    } else {
        "info"
    };

    let mut log_dir = None;
    let mut log_rotation = "daily";
    let mut max_log_files = 30;
    let mut display_target = true;
    let mut display_filename = in_dev_mode;
    let mut display_line_number = in_dev_mode;
    let mut display_thread_names = false;
    let mut display_span_list = false;
    if let Some(config) = config.get_table("tracing") {
        if let Some(filter) = config.get_str("filter") {
            env_filter = filter;
        }
        if let Some(rotation) = config.get_str("log-rotation") {
            log_rotation = rotation;
        }
        if let Some(max_files) = config.get_usize("max-log-files") {
            max_log_files = max_files.max(1);
        }
        log_dir = config.get_path("log-dir");
        display_target = config.get_bool("display-target").unwrap_or(true);
        display_filename = config.get_bool("display-filename").unwrap_or(in_dev_mode);
        display_line_number = config
            .get_bool("display-line-number")
            .unwrap_or(in_dev_mode);
        display_thread_names = config.get_bool("display-thread-names").unwrap_or(false);
        display_span_list = config.get_bool("display-span-list").unwrap_or(false);
    }

    let stdout = if in_dev_mode {
        io::stdout.with_max_level(Level::DEBUG)
    } else {
        io::stdout.with_max_level(Level::WARN)
    };
    let (writer, worker_guard) = match log_dir {
        Some(log_dir) => {
            let file_appender = rolling_file_appender(
                log_dir,
                &format!("toolsmith.{app_env}"),
                log_rotation,
                max_log_files,
            )?;
            let (non_blocking_appender, worker_guard) =
                tracing_appender::non_blocking(file_appender);
            (
                BoxMakeWriter::new(stdout.and(non_blocking_appender)),
                Some(worker_guard),
            )
        }
        None => (BoxMakeWriter::new(stdout), None),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(display_target)
        .with_file(display_filename)
        .with_line_number(display_line_number)
        .with_thread_names(display_thread_names)
        .with_writer(writer);
    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(env_filter);
    if in_dev_mode {
        let subscriber = tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer.pretty());
        tracing::subscriber::set_global_default(subscriber).map_err(|err| {
            Error::from(err).wrap("fail to set the default subscriber with a `Pretty` formatter")
        })?;
    } else {
        let json_fmt_layer = fmt_layer
            .json()
            .with_current_span(true)
            .with_span_list(display_span_list);
        let subscriber = tracing_subscriber::registry()
            .with(filter_layer)
            .with(json_fmt_layer);
        tracing::subscriber::set_global_default(subscriber).map_err(|err| {
            Error::from(err).wrap("fail to set the default subscriber with a `Json` formatter")
        })?;
    }
    if TRACING_APPENDER_GUARD.set(worker_guard).is_err() {
        tracing::warn!("the worker guard for the tracing appender has already been set");
    }
    Ok(())
}

/// Builds a rolling file appender, creating the log directory if necessary.
fn rolling_file_appender(
    log_dir: &Path,
    prefix: &str,
    rotation: &str,
    max_log_files: usize,
) -> Result<RollingFileAppender, Error> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir).map_err(|err| {
            let log_dir = log_dir.display();
            Error::from(err).wrap(format!("fail to create the log directory `{log_dir}`"))
        })?;
    }

    let rotation = match rotation {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    };
    RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_log_files)
        .build(log_dir)
        .map_err(|err| Error::from(err).wrap("fail to initialize the rolling file appender"))
}

/// Tracing appender guard.
static TRACING_APPENDER_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();
