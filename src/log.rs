// Copyright 2024 Trustoken Contributors
// See LICENSE.txt file for terms

//! Trace output for the token core.
//!
//! The host environment owns the console, so tracing is opt-in through
//! the environment: TRUSTOKEN_TRACE selects the sink ("stdout" or a
//! file path; unset leaves tracing disabled) and TRUSTOKEN_TRACE_LEVEL
//! selects the threshold (off/error/warn/info/debug/trace, default
//! error, anything unrecognized traces everything). Setup failures are
//! swallowed: a token without tracing still serves requests.

use std::fs::File;
use std::sync::Once;

use data_encoding::HEXLOWER;
use simplelog::{Config, LevelFilter, SimpleLogger, WriteLogger};

use crate::attribute::Attrs;

static INIT: Once = Once::new();

fn trace_level() -> LevelFilter {
    match std::env::var("TRUSTOKEN_TRACE_LEVEL").as_deref() {
        Err(_) => LevelFilter::Error,
        Ok("off") => LevelFilter::Off,
        Ok("error") => LevelFilter::Error,
        Ok("warn") => LevelFilter::Warn,
        Ok("info") => LevelFilter::Info,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        Ok(_) => LevelFilter::Trace,
    }
}

/// Installs the global tracer once, according to the environment
pub fn trustoken_log_init() {
    INIT.call_once(|| {
        let sink = match std::env::var("TRUSTOKEN_TRACE") {
            Ok(s) => s,
            Err(_) => return,
        };
        let level = trace_level();
        let _ = if sink == "stdout" {
            SimpleLogger::init(level, Config::default())
        } else {
            match File::create(&sink) {
                Ok(file) => WriteLogger::init(level, Config::default(), file),
                Err(_) => return,
            }
        };
    });
}

/// Dumps an attribute list to the trace log, one line per attribute
pub fn trace_attributes(prefix: &str, attrs: &Attrs) {
    log::debug!(
        "{},--- attributes list: {} item(s) - {} bytes",
        prefix,
        attrs.count(),
        attrs.byte_size()
    );
    for a in attrs.iter() {
        log::debug!(
            "{}| {} ({}-byte) {}",
            prefix,
            a.name(),
            a.get_value().len(),
            HEXLOWER.encode(a.get_value())
        );
        if let Ok(nested) = a.to_template() {
            trace_attributes(&format!("{}    ", prefix), &nested);
        }
    }
    log::debug!("{}`---", prefix);
}
