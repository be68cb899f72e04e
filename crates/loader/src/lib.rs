//! hookshim loader - FFI layer
//!
//! This crate provides the boundary between the host game process and the
//! compatibility core. It compiles to a cdylib (.so/.dll) the host loads
//! at startup.

pub mod ffi;

use tracing::info;

/// Load configuration, initialize logging, then arm the global engine.
pub fn startup() {
    // Config decides the default log level, so it is resolved before the
    // subscriber exists; a load failure is reported right after.
    let (config, load_error) = match hookshim_core::CoreConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (hookshim_core::CoreConfig::default(), Some(e)),
    };

    let default_filter = if config.debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .try_init();

    info!("hookshim loading...");
    if let Some(e) = load_error {
        tracing::warn!("failed to load config, using defaults: {}", e);
    }

    hookshim_core::global().set_fatal_violations(config.fatal_violations());
    if config.strict {
        info!("strict mode enabled: compat violations are fatal");
    }
}

/// Shutdown the compatibility layer.
///
/// Called from the FFI layer when the host unloads the shim. Hooks owned
/// by plugins free themselves on drop; nothing engine-wide to tear down.
pub fn shutdown() {
    info!("hookshim shutting down...");
}
