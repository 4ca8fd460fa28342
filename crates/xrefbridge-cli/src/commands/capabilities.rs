use crate::cli::RoutingArgs;
use crate::support::{block_on, close_or_exit, print_json, route_or_exit};
use serde_json::json;
use std::collections::BTreeSet;
use xrefbridge_kernel::{DataSource, IdMapper};

pub fn run(routing: RoutingArgs, organism: String, json_output: bool) {
    block_on(async move {
        let (router, stack) = route_or_exit(&routing, &organism).await;
        let caps = stack.capabilities();

        if json_output {
            print_json(&json!({
                "action": "capabilities",
                "organism": stack.name(),
                "capabilities": caps,
            }));
        } else {
            let names = |set: &BTreeSet<DataSource>| {
                set.iter().map(ToString::to_string).collect::<Vec<String>>().join(", ")
            };
            println!("xrefbridge capabilities {}", stack.name());
            println!("  Sources: {}", names(caps.supported_sources()));
            println!("  Targets: {}", names(caps.supported_targets()));
            println!("  Free search: {}", caps.is_free_search_supported());
            println!("  Attributes: {}", caps.is_attributes_supported());
            for member in caps.members() {
                println!("  Backend: {}", member.member);
                for (key, value) in member.capabilities.properties() {
                    println!("    {key} = {value}");
                }
            }
        }
        close_or_exit(&router).await;
    });
}
