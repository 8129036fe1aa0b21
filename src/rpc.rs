//! Line-delimited JSON-RPC over stdio, plus the one-shot `call` entry
//! used by the CLI and integration tests.

use crate::corpus::FsCorpus;
use crate::error::QueryError;
use crate::ingest;
use crate::model::Symbol;
use crate::refs;
use crate::store::Store;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{self, BufRead, Write as _};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct RpcResponse {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

#[derive(Serialize)]
struct RpcError {
    code: String,
    message: String,
}

#[derive(Deserialize)]
struct ResolveSymbolParams {
    fqn: String,
}

#[derive(Deserialize)]
struct FindReferencesParams {
    fqn: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct FindCallersParams {
    module: String,
    method: String,
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct IngestParams {
    export: String,
}

const METHOD_LIST: &[&str] = &[
    "help",
    "resolve_symbol",
    "find_references",
    "find_callers",
    "ingest",
];

fn method_help() -> Value {
    json!({
        "summary": "mdxref answers cross-reference and call-graph queries over a metadata symbol graph snapshot plus a BSL module corpus.",
        "methods": METHOD_LIST,
        "examples": [
            { "method": "resolve_symbol", "params": { "fqn": "Catalog.Items" } },
            { "method": "find_references", "params": { "fqn": "CommonModule.Utils", "limit": 100 } },
            { "method": "find_callers", "params": { "module": "CommonModules/Utils/Module.bsl", "method": "CalcTotal" } },
            { "method": "ingest", "params": { "export": "export/graph.json" } }
        ],
        "cli_examples": [
            "mdxref ingest --root . --export export/graph.json",
            r#"mdxref request --root . --method find_references --params '{"fqn":"Catalog.Items"}'"#,
            "mdxref serve --root ."
        ]
    })
}

pub struct App {
    store: Store,
    corpus: FsCorpus,
}

impl App {
    pub fn new(corpus_root: PathBuf, db_path: PathBuf) -> Result<Self> {
        let store = Store::new(&db_path)?;
        let corpus = FsCorpus::new(corpus_root);
        Ok(Self { store, corpus })
    }

    fn handle_request(&self, req: RpcRequest) -> RpcResponse {
        let id = req.id.clone();
        match handle_method(self, &req.method, req.params) {
            Ok(value) => RpcResponse {
                id,
                result: Some(value),
                error: None,
            },
            Err(err) => error_response(id, &err),
        }
    }
}

fn handle_method(app: &App, method: &str, params: Value) -> Result<Value, QueryError> {
    let start = Instant::now();
    let value = match method {
        "help" => method_help(),
        "resolve_symbol" => {
            let params: ResolveSymbolParams = parse_params(params)?;
            let symbol: Symbol = app
                .store
                .with_snapshot(|graph| graph.resolve(&params.fqn))?;
            json_value(&symbol)?
        }
        "find_references" => {
            let params: FindReferencesParams = parse_params(params)?;
            let report =
                refs::find_references(&app.store, &app.corpus, &params.fqn, params.limit)?;
            json_value(&report)?
        }
        "find_callers" => {
            let params: FindCallersParams = parse_params(params)?;
            let report =
                refs::callgraph::find_callers(&app.corpus, &params.module, &params.method, params.limit)?;
            json_value(&report)?
        }
        "ingest" => {
            let params: IngestParams = parse_params(params)?;
            let stats = ingest::ingest(&app.store, Path::new(&params.export))
                .map_err(|err| QueryError::InvalidRequest(format!("ingest: {err:#}")))?;
            json_value(&stats)?
        }
        other => {
            return Err(QueryError::InvalidRequest(format!(
                "unknown method: {other}; known methods: {}",
                METHOD_LIST.join(", ")
            )));
        }
    };

    let elapsed = start.elapsed();
    if elapsed.as_millis() > 100 {
        eprintln!("mdxref: Slow query: {method} took {elapsed:?}");
    }
    Ok(value)
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, QueryError> {
    serde_json::from_value(params).map_err(|err| QueryError::InvalidRequest(err.to_string()))
}

fn json_value<T: Serialize>(value: &T) -> Result<Value, QueryError> {
    serde_json::to_value(value).map_err(|err| QueryError::InvalidRequest(err.to_string()))
}

pub fn serve(corpus_root: PathBuf, db_path: PathBuf) -> Result<()> {
    let app = App::new(corpus_root, db_path)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(value) => value,
            Err(err) => {
                eprintln!("mdxref: stdin error: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) => app.handle_request(request),
            Err(err) => error_response(
                Value::Null,
                &QueryError::InvalidRequest(format!("parse request: {err}")),
            ),
        };

        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }

    Ok(())
}

pub fn call(
    corpus_root: PathBuf,
    db_path: PathBuf,
    method: String,
    params_raw: &str,
    id_raw: &str,
) -> Result<String> {
    let params: Value = serde_json::from_str(params_raw).with_context(|| "parse params JSON")?;
    let id = parse_value(id_raw);
    let app = App::new(corpus_root, db_path)?;
    let request = RpcRequest { id, method, params };
    let response = app.handle_request(request);
    Ok(serde_json::to_string(&response)?)
}

fn error_response(id: Value, err: &QueryError) -> RpcResponse {
    RpcResponse {
        id,
        result: None,
        error: Some(RpcError {
            code: err.code().to_string(),
            message: err.to_string(),
        }),
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
