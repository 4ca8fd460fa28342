//! xrefbridge CLI: the `xrefbridge` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();
    let routing = cli.routing;

    match cli.command {
        Commands::Map {
            source,
            id,
            targets,
            organism,
            json,
        } => commands::map::run(routing, source, id, targets, organism, json),

        Commands::Search {
            text,
            limit,
            organism,
            json,
        } => commands::search::run(routing, text, limit, organism, json),

        Commands::Exists {
            source,
            id,
            organism,
            json,
        } => commands::exists::run(routing, source, id, organism, json),

        Commands::Capabilities { organism, json } => {
            commands::capabilities::run(routing, organism, json)
        }

        Commands::Attributes {
            source,
            id,
            attr_type,
            organism,
            json,
        } => commands::attributes::run(routing, source, id, attr_type, organism, json),

        Commands::Organisms { json } => commands::organisms::run(routing, json),

        Commands::Datasources {
            primary,
            metabolite,
            organism,
            json,
        } => commands::datasources::run(routing, primary, metabolite, organism, json),
    }
}
