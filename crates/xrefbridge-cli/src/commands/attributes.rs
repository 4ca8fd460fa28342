use crate::cli::RoutingArgs;
use crate::support::{
    block_on, close_or_exit, fail, print_json, route_or_exit, xref_or_exit,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use xrefbridge_kernel::{AttributeMapper, IdMapper};

pub fn run(
    routing: RoutingArgs,
    source: String,
    id: String,
    attr_type: Option<String>,
    organism: String,
    json_output: bool,
) {
    block_on(async move {
        let (router, stack) = route_or_exit(&routing, &organism).await;
        let xref = xref_or_exit(&source, &id);
        let Some(attrs) = stack.attribute_mapper() else {
            fail(format!("no backend for {} supports attributes", stack.name()));
        };

        let found: BTreeMap<String, BTreeSet<String>> = match &attr_type {
            Some(key) => {
                let values = attrs
                    .attributes(&xref, key)
                    .await
                    .unwrap_or_else(|e| fail(format!("attributes of {xref} failed: {e}")));
                BTreeMap::from([(key.clone(), values)])
            }
            None => attrs
                .all_attributes(&xref)
                .await
                .unwrap_or_else(|e| fail(format!("attributes of {xref} failed: {e}"))),
        };

        if json_output {
            print_json(&json!({
                "action": "attributes",
                "xref": xref,
                "attributes": found,
            }));
        } else {
            println!("xrefbridge attributes {xref}");
            for (key, values) in &found {
                let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
                println!("  {key}: {joined}");
            }
        }
        close_or_exit(&router).await;
    });
}
