use once_cell::sync::OnceCell;
use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;

static LOGGER_HANDLE: OnceCell<Handle<EnvFilter, Registry>> = OnceCell::new();

pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();

    let log_filter = match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,tankobon=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,tankobon=warn",
        // Show our own info logs
        Verbosity::Verbose(1) => "off,tankobon=info",
        // Also show debug from our libraries
        Verbosity::Verbose(2) => {
            "off,tankobon=debug,tankobon_catalog=debug,tankobon_core=debug"
        },
        // Also show trace from our libraries
        Verbosity::Verbose(3) => {
            "off,tankobon=trace,tankobon_catalog=trace,tankobon_core=trace"
        },
        // Also show debug from everything else
        Verbosity::Verbose(4) => {
            "debug,tankobon=trace,tankobon_catalog=trace,tankobon_core=trace"
        },
        Verbosity::Verbose(_) => "trace",
    };

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (subscriber, reload_handle) = create_registry_and_filter_reload_handle();
        subscriber.init();
        reload_handle
    });

    update_filters(filter_handle, log_filter);
}

fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

fn create_registry_and_filter_reload_handle() -> (
    impl tracing_subscriber::layer::SubscriberExt + SubscriberInitExt,
    Handle<EnvFilter, Registry>,
) {
    // The filter starts wide open and is narrowed to the actual level by
    // `update_filters` immediately after registration.
    let filter = EnvFilter::new("trace");
    let (filter, filter_reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(tracing_subscriber::fmt::format())
        .with_filter(filter);

    let registry = tracing_subscriber::registry().with(log_layer);

    (registry, filter_reload_handle)
}
