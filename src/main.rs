use anyhow::Result;
use clap::Parser;
use mdxref::{cli, ingest, rpc, store};
use std::path::PathBuf;

fn default_db_path(root: &PathBuf) -> PathBuf {
    root.join(".mdxref").join("graph.sqlite")
}

fn main() -> Result<()> {
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Ingest { root, db, export } => {
            let db_path = db.unwrap_or_else(|| default_db_path(&root));
            let store = store::Store::new(&db_path)?;
            let stats = ingest::ingest(&store, &export)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        cli::Command::Request {
            root,
            db,
            method,
            params,
            params_file,
            id,
        } => {
            let db_path = db.unwrap_or_else(|| default_db_path(&root));
            let params_raw = if let Some(path) = params_file {
                std::fs::read_to_string(&path)?
            } else {
                params
            };
            let response = rpc::call(root, db_path, method, &params_raw, &id)?;
            println!("{response}");
            Ok(())
        }
        cli::Command::Serve { root, db } => {
            let db_path = db.unwrap_or_else(|| default_db_path(&root));
            rpc::serve(root, db_path)
        }
    }
}
