//! The `console` object scripts log through.
//!
//! `console.log/warn/error` accept up to [`MAX_CONSOLE_ARGS`] arguments of
//! any type, the most a native rhai function can take beside the receiver. Each
//! argument is rendered as compact JSON text, functions as `function`, and
//! anything else that cannot be marshaled as `error`. The rendered arguments
//! are joined with single spaces and handed to a [`ConsoleSink`].

use rhai::{Dynamic, Engine, FnPtr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::marshal::to_structured;

/// Most arguments one `console` call accepts.
pub const MAX_CONSOLE_ARGS: usize = 19;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
        }
    }
}

/// Receives one formatted console line per script call.
///
/// Failures are logged and swallowed; a broken sink never aborts the script.
pub trait ConsoleSink: Send + Sync {
    fn write(&self, level: ConsoleLevel, message: &str) -> std::io::Result<()>;
}

/// Forwards console output to `tracing` under the `trellis::console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ConsoleSink for TracingSink {
    fn write(&self, level: ConsoleLevel, message: &str) -> std::io::Result<()> {
        match level {
            ConsoleLevel::Log => tracing::info!(target: "trellis::console", "{}", message),
            ConsoleLevel::Warn => tracing::warn!(target: "trellis::console", "{}", message),
            ConsoleLevel::Error => tracing::error!(target: "trellis::console", "{}", message),
        }
        Ok(())
    }
}

/// Script-visible handle type; resolved for the `console` variable.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Console;

/// Renders one console argument.
pub(crate) fn stringify(value: &Dynamic) -> String {
    if value.is::<FnPtr>() {
        return "function".to_string();
    }
    match to_structured(value) {
        Ok(v) => v.to_string(),
        Err(_) => "error".to_string(),
    }
}

pub(crate) fn format_line(args: &[&Dynamic]) -> String {
    args.iter()
        .map(|arg| stringify(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn emit(sink: &dyn ConsoleSink, level: ConsoleLevel, args: &[&Dynamic]) {
    let line = format_line(args);
    match std::panic::catch_unwind(AssertUnwindSafe(|| sink.write(level, &line))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(level = level.as_str(), "console sink failed: {}", e);
        }
        Err(_) => {
            tracing::error!(level = level.as_str(), "console sink panicked");
        }
    }
}

macro_rules! register_arities {
    ($engine:expr, $sink:expr, $name:expr, $level:expr; $( ($($arg:ident),*) ),+ $(,)?) => {
        $(
            {
                let sink = Arc::clone(&$sink);
                $engine.register_fn($name, move |_console: &mut Console $(, $arg: Dynamic)*| {
                    emit(sink.as_ref(), $level, &[$(&$arg),*]);
                });
            }
        )+
    };
}

/// Installs the console type, its methods, and the `console` variable.
/// Rhai's own `print` is routed to the same sink at `log` level.
pub(crate) fn install(engine: &mut Engine, sink: Arc<dyn ConsoleSink>) {
    engine.register_type_with_name::<Console>("Console");

    for (name, level) in [
        ("log", ConsoleLevel::Log),
        ("warn", ConsoleLevel::Warn),
        ("error", ConsoleLevel::Error),
    ] {
        register_arities!(engine, sink, name, level;
            (),
            (a),
            (a, b),
            (a, b, c),
            (a, b, c, d),
            (a, b, c, d, e),
            (a, b, c, d, e, f),
            (a, b, c, d, e, f, g),
            (a, b, c, d, e, f, g, h),
            (a, b, c, d, e, f, g, h, i),
            (a, b, c, d, e, f, g, h, i, j),
            (a, b, c, d, e, f, g, h, i, j, k),
            (a, b, c, d, e, f, g, h, i, j, k, l),
            (a, b, c, d, e, f, g, h, i, j, k, l, m),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p, q),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p, q, r),
            (a, b, c, d, e, f, g, h, i, j, k, l, m, n, o, p, q, r, s),
        );
    }

    engine.on_var(|name, _index, _context| {
        if name == "console" {
            Ok(Some(Dynamic::from(Console)))
        } else {
            Ok(None)
        }
    });

    let print_sink = Arc::clone(&sink);
    engine.on_print(move |text| {
        if let Err(e) = print_sink.write(ConsoleLevel::Log, text) {
            tracing::error!("console sink failed: {}", e);
        }
    });
    engine.on_debug(|text, source, pos| {
        tracing::debug!(
            target: "trellis::console",
            source = source.unwrap_or(""),
            %pos,
            "{}",
            text
        );
    });
}
