use std::{any::Any, panic};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Plain,
    Json,
}

/// Installs the global subscriber and routes panics through it, so a worker
/// that dies mid-job leaves a log line in the selected format.
pub fn setup(format: Format) {
    match format {
        Format::Plain => tracing_subscriber::fmt().init(),
        Format::Json => tracing_subscriber::fmt().json().init(),
    }
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();
        error!(target: "panic", location = %location, "{}", panic_message(info.payload()));
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let literal: Box<dyn Any + Send> = Box::new("stack overflow");
        assert_eq!(panic_message(literal.as_ref()), "stack overflow");

        let formatted: Box<dyn Any + Send> = Box::new(format!("index {}", 93));
        assert_eq!(panic_message(formatted.as_ref()), "index 93");

        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }
}
