use crate::cli::RoutingArgs;
use crate::support::{load_namespaces_or_exit, parse_organism_or_exit, print_json};
use serde_json::json;

pub fn run(
    routing: RoutingArgs,
    primary: Option<bool>,
    metabolite: Option<bool>,
    organism: Option<String>,
    json_output: bool,
) {
    let registry = load_namespaces_or_exit(&routing);
    let organism = organism.as_deref().map(parse_organism_or_exit);
    let selected = registry.filtered(primary, metabolite, organism);

    if json_output {
        let infos: Vec<_> = selected.iter().map(|ds| ds.info()).collect();
        print_json(&json!({
            "action": "datasources",
            "count": infos.len(),
            "dataSources": infos,
        }));
    } else {
        for ds in &selected {
            let organism = ds.organism().map(|o| o.latin_name()).unwrap_or("-");
            println!(
                "{:<4} {:<24} {:<12} {}",
                ds.system_code().unwrap_or_default(),
                ds.to_string(),
                ds.kind(),
                organism
            );
        }
    }
}
