use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use xrefbridge_kernel::FailurePolicy;

#[derive(Parser)]
#[command(
    name = "xrefbridge",
    about = "xrefbridge: map identifiers across federated, per-organism backends",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub routing: RoutingArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct RoutingArgs {
    /// Routing configuration: one `<organism>\t<connection>` pair per line.
    /// Only `idmapper-text:<path>` connections are served; bare paths
    /// default to `idmapper-pgdb`, which needs an external SQL driver, and
    /// are skipped with a warning
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra TOML namespace catalog, loaded after the built-in one
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Follow mappings through intermediate namespaces
    #[arg(long, global = true)]
    pub transitive: bool,

    /// What to do when one backend fails
    #[arg(long, global = true, value_enum, default_value = "fail-fast")]
    pub on_member_failure: FailureArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FailureArg {
    #[value(name = "fail-fast")]
    FailFast,
    #[value(name = "skip")]
    Skip,
}

impl From<FailureArg> for FailurePolicy {
    fn from(arg: FailureArg) -> Self {
        match arg {
            FailureArg::FailFast => FailurePolicy::FailFast,
            FailureArg::Skip => FailurePolicy::Skip,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Map one identifier to other namespaces
    Map {
        /// Source namespace (system code or full name)
        source: String,

        /// Identifier within the source namespace
        id: String,

        /// Target namespace (repeatable; default: every namespace)
        #[arg(long = "target")]
        targets: Vec<String>,

        /// Organism whose backends answer the request
        #[arg(long, default_value = "Homo sapiens")]
        organism: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Free-text search over identifiers
    Search {
        text: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value = "Homo sapiens")]
        organism: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether any backend knows an identifier
    Exists {
        source: String,
        id: String,

        #[arg(long, default_value = "Homo sapiens")]
        organism: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the merged capability report of an organism's backends
    Capabilities {
        #[arg(long, default_value = "Homo sapiens")]
        organism: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show attributes of an identifier
    Attributes {
        source: String,
        id: String,

        /// Only this attribute type
        #[arg(long = "type")]
        attr_type: Option<String>,

        #[arg(long, default_value = "Homo sapiens")]
        organism: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List known organisms and whether backends are routed for them
    Organisms {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered namespaces
    Datasources {
        /// Only primary (or, with `false`, only non-primary) namespaces
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        primary: Option<bool>,

        /// Only metabolite (or, with `false`, only non-metabolite) namespaces
        #[arg(long, num_args = 0..=1, default_missing_value = "true")]
        metabolite: Option<bool>,

        /// Only namespaces scoped to this organism (or unscoped)
        #[arg(long)]
        organism: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
