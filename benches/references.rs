use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mdxref::corpus::FsCorpus;
use mdxref::ingest::ingest;
use mdxref::refs;
use mdxref::store::Store;
use std::path::PathBuf;

fn temp_root(label: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!(
        "mdxref-bench-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&root).unwrap();
    root
}

/// Synthetic snapshot: one common module referenced by `documents` documents
/// and `catalogs` catalogs, plus a corpus module per document.
fn setup(documents: usize, catalogs: usize) -> (PathBuf, Store, FsCorpus) {
    let root = temp_root("refs");
    let mut symbols = vec![
        r#"{"fqn": "CommonModule.Utils", "kind": "CommonModule", "collection": "CommonModules"}"#
            .to_string(),
    ];
    let mut edges = Vec::new();
    for i in 0..documents {
        symbols.push(format!(
            r#"{{"fqn": "Document.Doc{i}", "kind": "Document", "collection": "Documents"}}"#
        ));
        edges.push(format!(
            r#"{{"source": "Document.Doc{i}", "target": "CommonModule.Utils", "feature": "Posting"}}"#
        ));
        let module_dir = root.join("Documents").join(format!("Doc{i}"));
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(
            module_dir.join("ObjectModule.bsl"),
            "Procedure Posting(Cancel)\n\tUtils.CalcTotal();\nEndProcedure\n",
        )
        .unwrap();
    }
    for i in 0..catalogs {
        symbols.push(format!(
            r#"{{"fqn": "Catalog.Cat{i}", "kind": "Catalog", "collection": "Catalogs"}}"#
        ));
        edges.push(format!(
            r#"{{"source": "Catalog.Cat{i}", "target": "CommonModule.Utils", "feature": "BeforeWrite"}}"#
        ));
    }
    let export = format!(
        r#"{{"symbols": [{}], "edges": [{}]}}"#,
        symbols.join(","),
        edges.join(",")
    );
    let export_path = root.join("export.json");
    std::fs::write(&export_path, export).unwrap();

    let db_path = root.join(".mdxref").join("graph.sqlite");
    let store = Store::new(&db_path).unwrap();
    ingest(&store, &export_path).unwrap();
    let corpus = FsCorpus::new(root.clone());
    (root, store, corpus)
}

fn bench_find_references(c: &mut Criterion) {
    let (root, store, corpus) = setup(200, 50);

    c.bench_function("find_references_250_edges", |b| {
        b.iter(|| {
            let report = refs::find_references(
                black_box(&store),
                black_box(&corpus),
                black_box("CommonModule.Utils"),
                black_box(Some(100)),
            );
            black_box(report)
        })
    });

    let _ = std::fs::remove_dir_all(&root);
}

fn bench_find_callers(c: &mut Criterion) {
    let root = temp_root("callers");
    let utils_dir = root.join("CommonModules").join("Utils");
    std::fs::create_dir_all(&utils_dir).unwrap();
    std::fs::write(
        utils_dir.join("Module.bsl"),
        "Function CalcTotal(Rows) Export\n\tReturn 0;\nEndFunction\n",
    )
    .unwrap();
    for i in 0..100 {
        let module_dir = root.join("Documents").join(format!("Doc{i}"));
        std::fs::create_dir_all(&module_dir).unwrap();
        std::fs::write(
            module_dir.join("ObjectModule.bsl"),
            "Procedure Posting(Cancel)\n\tTotal = CalcTotal(Rows);\nEndProcedure\n",
        )
        .unwrap();
    }
    let corpus = FsCorpus::new(root.clone());

    c.bench_function("find_callers_100_modules", |b| {
        b.iter(|| {
            let report = refs::callgraph::find_callers(
                black_box(&corpus),
                black_box("CommonModules/Utils/Module.bsl"),
                black_box("CalcTotal"),
                black_box(None),
            );
            black_box(report)
        })
    });

    let _ = std::fs::remove_dir_all(&root);
}

criterion_group!(benches, bench_find_references, bench_find_callers);
criterion_main!(benches);
