use crate::cli::RoutingArgs;
use serde_json::Value;
use std::future::Future;
use std::process;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use xrefbridge_kernel::{
    DataSource, DataSourceRegistry, DriverRegistry, IdMapperStack, Organism, Xref,
    register_bio_defaults,
};
use xrefbridge_provider::OrganismRouter;
use xrefbridge_store::{TEXT_SCHEME, TextDriver};

/// Log to stderr so JSON on stdout stays clean. `RUST_LOG` overrides `warn`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    process::exit(1);
}

pub fn block_on<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(format!("failed to create tokio runtime: {e}")));
    runtime.block_on(future)
}

pub fn print_json(payload: &Value) {
    let text = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|e| fail(format!("json serialization failed: {e}")));
    println!("{text}");
}

/// Built-in namespaces plus `--catalog`.
pub fn load_namespaces_or_exit(args: &RoutingArgs) -> &'static DataSourceRegistry {
    register_bio_defaults().unwrap_or_else(|e| fail(format!("built-in catalog: {e}")));
    let registry = DataSourceRegistry::global();
    if let Some(path) = &args.catalog {
        registry
            .load_catalog_file(path)
            .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", path.display())));
    }
    registry
}

pub fn drivers() -> DriverRegistry {
    let drivers = DriverRegistry::new();
    drivers.register(TEXT_SCHEME, Arc::new(TextDriver::new()));
    drivers
}

/// Router built from `--config`. Skipped lines are logged by the loader.
pub async fn load_router_or_exit(args: &RoutingArgs) -> OrganismRouter {
    let Some(path) = &args.config else {
        fail("--config is required for this command");
    };
    let router = OrganismRouter::new()
        .with_transitive(args.transitive)
        .with_policy(args.on_member_failure.into());
    let report = router
        .load_config_file(path, &drivers())
        .await
        .unwrap_or_else(|e| fail(e));
    tracing::debug!(
        config = %path.display(),
        routed = report.routed,
        skipped = report.skipped.len(),
        organisms = router.organisms().len(),
        "routing ready"
    );
    router
}

/// Close every routed backend. A failed close is an error exit.
pub async fn close_or_exit(router: &OrganismRouter) {
    if let Err(e) = router.close().await {
        fail(format!("closing backends failed: {e}"));
    }
}

pub async fn route_or_exit(args: &RoutingArgs, organism: &str) -> (OrganismRouter, IdMapperStack) {
    load_namespaces_or_exit(args);
    let organism = parse_organism_or_exit(organism);
    let router = load_router_or_exit(args).await;
    let stack = router.route_for(organism);
    (router, stack)
}

pub fn parse_organism_or_exit(token: &str) -> Organism {
    Organism::lookup(token).unwrap_or_else(|| fail(format!("unknown organism: {token}")))
}

/// Namespace by full name or system code. Never registers a new one.
pub fn data_source_or_exit(key: &str) -> DataSource {
    DataSourceRegistry::global()
        .find(key)
        .unwrap_or_else(|| fail(format!("unknown data source: {key}")))
}

pub fn xref_or_exit(source: &str, id: &str) -> Xref {
    Xref::new(id, data_source_or_exit(source))
}

