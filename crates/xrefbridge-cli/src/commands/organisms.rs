use crate::cli::RoutingArgs;
use crate::support::{
    block_on, close_or_exit, load_namespaces_or_exit, load_router_or_exit, print_json,
};
use serde_json::json;
use std::collections::BTreeSet;
use xrefbridge_kernel::Organism;

pub fn run(routing: RoutingArgs, json_output: bool) {
    block_on(async move {
        let routed: BTreeSet<Organism> = if routing.config.is_some() {
            load_namespaces_or_exit(&routing);
            let router = load_router_or_exit(&routing).await;
            let routed = router.organisms();
            close_or_exit(&router).await;
            routed
        } else {
            BTreeSet::new()
        };

        if json_output {
            let organisms: Vec<_> = Organism::ALL
                .iter()
                .map(|o| {
                    json!({
                        "code": o.code(),
                        "latinName": o.latin_name(),
                        "englishName": o.english_name(),
                        "routed": routed.contains(o),
                    })
                })
                .collect();
            print_json(&json!({ "action": "organisms", "organisms": organisms }));
        } else {
            for o in Organism::ALL {
                let marker = if routed.contains(&o) { "*" } else { " " };
                println!("{marker} {:<3} {:<28} {}", o.code(), o.latin_name(), o.english_name());
            }
        }
    });
}
