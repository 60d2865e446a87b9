//! Shelf application library
//!
//! Wires the book catalog module into the kernel registry and drives the
//! module lifecycle around the HTTP server.

pub mod modules;

use anyhow::Context;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Build a registry holding every application module
pub fn registry(settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings);
    registry
}

/// Initialize and start every module, serve HTTP until shutdown, then stop modules
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let registry = registry(settings);
    let ctx = InitCtx { settings };

    registry
        .init_modules(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_modules(&ctx)
        .await
        .context("module startup failed")?;

    let served = shelf_http::start_server(&registry, settings).await;

    registry
        .stop_modules()
        .await
        .context("module shutdown failed")?;

    served
}
