use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mdxref",
    version,
    about = "Metadata cross-reference and call-graph query service",
    after_help = r#"Examples:
  mdxref ingest --root . --export export/graph.json
  mdxref request --root . --method resolve_symbol --params '{"fqn":"Catalog.Items"}'
  mdxref request --root . --method find_references --params '{"fqn":"CommonModule.Utils","limit":100}'
  mdxref request --root . --method find_callers --params '{"module":"CommonModules/Utils/Module.bsl","method":"CalcTotal"}'
  mdxref serve --root .
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a JSON graph export into the sqlite snapshot.
    Ingest {
        /// Corpus root (also anchors the default db location).
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Path to the JSON graph export.
        #[arg(long)]
        export: PathBuf,
    },
    /// Run a single JSONL request and exit.
    Request {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
        #[arg(long, value_name = "PATH")]
        params_file: Option<PathBuf>,
        #[arg(long, default_value = "1")]
        id: String,
    },
    /// Run JSONL RPC server over stdin/stdout.
    Serve {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}
