use crate::cli::RoutingArgs;
use crate::support::{block_on, close_or_exit, fail, print_json, route_or_exit};
use serde_json::json;
use xrefbridge_kernel::CancellationToken;

pub fn run(routing: RoutingArgs, text: String, limit: usize, organism: String, json_output: bool) {
    block_on(async move {
        let (router, stack) = route_or_exit(&routing, &organism).await;
        let cancel = CancellationToken::new();
        let outcome = stack
            .free_search_with(&text, limit, &cancel)
            .await
            .unwrap_or_else(|e| fail(format!("search failed: {e}")));

        if json_output {
            print_json(&json!({
                "action": "search",
                "query": text,
                "limit": limit,
                "results": outcome.value,
                "skipped": outcome.skipped.iter().map(ToString::to_string).collect::<Vec<_>>(),
            }));
        } else {
            println!("xrefbridge search {text:?}");
            println!("  Results: {}", outcome.value.len());
            for xref in &outcome.value {
                println!("    {xref}");
            }
        }
        close_or_exit(&router).await;
    });
}
