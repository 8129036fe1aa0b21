//! Incoming call lookup for a method of one BSL module.
//!
//! Callers are textual occurrences of the method name anywhere in the
//! corpus, minus the declaration itself. BSL methods are not namespaced
//! at the call site, so same-named methods in unrelated modules are
//! indistinguishable here and are reported together.

use crate::config::Config;
use crate::corpus::{CorpusIndex, display_module_path};
use crate::error::QueryError;
use crate::model::{CallGraphReport, CallGroup, CallSite, MethodDecl, ModulePathInfo, ModuleRole};
use crate::position::PositionResolver;
use std::collections::BTreeMap;

pub fn find_callers(
    corpus: &dyn CorpusIndex,
    module_path: &str,
    method: &str,
    limit: Option<usize>,
) -> Result<CallGraphReport, QueryError> {
    let config = Config::get();
    let limit = config.clamp_caller_limit(limit);
    let cap = limit.saturating_mul(config.headroom_factor);

    let methods = corpus.module_methods(module_path)?;
    let decl = methods
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(method))
        .cloned()
        .ok_or_else(|| QueryError::MethodNotFound {
            module: module_path.to_string(),
            name: method.to_string(),
            available: methods.iter().map(|m| m.name.clone()).collect(),
        })?;

    let resolver = PositionResolver::new(corpus);
    let mut sites: Vec<CallSite> = Vec::new();
    for occurrence in corpus.find_occurrences(&[decl.name.clone()])? {
        if sites.len() >= cap {
            break;
        }
        let line = resolver.resolve(&occurrence);
        if occurrence.module_path == module_path && line == decl.line {
            continue;
        }
        sites.push(CallSite {
            module_path: display_module_path(&occurrence.module_path),
            line,
        });
    }

    Ok(build_call_report(&decl, module_path, sites, limit))
}

fn build_call_report(
    decl: &MethodDecl,
    module_path: &str,
    sites: Vec<CallSite>,
    limit: usize,
) -> CallGraphReport {
    let mut grouped: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for site in sites {
        grouped.entry(site.module_path).or_default().push(site.line);
    }
    // Count distinct call lines (pre-truncation) so the count matches
    // what the groups report.
    let mut caller_count = 0;
    let groups = grouped
        .into_iter()
        .map(|(module_path, mut lines)| {
            lines.sort_unstable();
            lines.dedup();
            caller_count += lines.len();
            lines.truncate(limit);
            CallGroup { module_path, lines }
        })
        .collect();
    CallGraphReport {
        method_signature: method_signature(module_path, &decl.name),
        caller_count,
        groups,
    }
}

/// Owner-qualified display name for the method, derived from the module
/// path layout. Unknown layouts fall back to the raw path.
fn method_signature(module_path: &str, name: &str) -> String {
    let info = ModulePathInfo::parse(module_path);
    match (info.owner_fqn, info.role, info.form_name) {
        (Some(owner), Some(ModuleRole::FormModule), Some(form)) => {
            format!("{owner}.Form.{form}.{name}()")
        }
        (Some(owner), _, _) => format!("{owner}.{name}()"),
        (None, _, _) => format!("{module_path}: {name}()"),
    }
}
