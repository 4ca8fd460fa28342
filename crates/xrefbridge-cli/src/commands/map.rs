use crate::cli::RoutingArgs;
use crate::support::{
    block_on, close_or_exit, data_source_or_exit, fail, print_json, route_or_exit, xref_or_exit,
};
use serde_json::json;
use xrefbridge_kernel::{CancellationToken, DataSource, IdMapper};

pub fn run(
    routing: RoutingArgs,
    source: String,
    id: String,
    targets: Vec<String>,
    organism: String,
    json_output: bool,
) {
    block_on(async move {
        let (router, stack) = route_or_exit(&routing, &organism).await;
        let xref = xref_or_exit(&source, &id);
        let targets: Vec<DataSource> = targets.iter().map(|t| data_source_or_exit(t)).collect();

        let cancel = CancellationToken::new();
        let outcome = stack
            .map_id_with(&xref, &targets, &cancel)
            .await
            .unwrap_or_else(|e| fail(format!("mapping {xref} failed: {e}")));
        let skipped: Vec<String> = outcome.skipped.iter().map(ToString::to_string).collect();

        if json_output {
            print_json(&json!({
                "action": "map",
                "organism": stack.name(),
                "transitive": stack.is_transitive(),
                "source": xref,
                "mapped": outcome.value,
                "skipped": skipped,
            }));
        } else {
            println!("xrefbridge map {xref}");
            println!("  Organism: {}", stack.name());
            println!("  Backends: {}", stack.len());
            println!("  Mapped: {}", outcome.value.len());
            for mapped in &outcome.value {
                println!("    {mapped}");
            }
            for failure in &skipped {
                println!("  Skipped: {failure}");
            }
        }
        close_or_exit(&router).await;
    });
}
