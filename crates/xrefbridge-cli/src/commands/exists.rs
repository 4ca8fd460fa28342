use crate::cli::RoutingArgs;
use crate::support::{
    block_on, close_or_exit, fail, print_json, route_or_exit, xref_or_exit,
};
use serde_json::json;
use xrefbridge_kernel::CancellationToken;

pub fn run(routing: RoutingArgs, source: String, id: String, organism: String, json_output: bool) {
    block_on(async move {
        let (router, stack) = route_or_exit(&routing, &organism).await;
        let xref = xref_or_exit(&source, &id);
        let cancel = CancellationToken::new();
        let outcome = stack
            .xref_exists_with(&xref, &cancel)
            .await
            .unwrap_or_else(|e| fail(format!("lookup of {xref} failed: {e}")));

        if json_output {
            print_json(&json!({
                "action": "exists",
                "xref": xref,
                "exists": outcome.value,
            }));
        } else {
            let verdict = if outcome.value { "known" } else { "unknown" };
            println!("{xref}: {verdict}");
        }
        close_or_exit(&router).await;
    });
}
