use mdxref::rpc;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn write_module(root: &Path, rel: &str, content: &str) {
    let abs = root.join(rel);
    std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
    std::fs::write(abs, content).unwrap();
}

fn setup() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join(".mdxref").join("graph.sqlite");
    write_module(
        dir.path(),
        "CommonModules/Utils/Module.bsl",
        "Function CalcTotal(Rows) Export\n\tReturn 0;\nEndFunction\n\nProcedure Init() Export\nEndProcedure\n",
    );
    write_module(
        dir.path(),
        "Documents/Order/ObjectModule.bsl",
        "Procedure Posting(Cancel)\n\tTotal = CalcTotal(Rows);\nEndProcedure\n",
    );
    write_module(
        dir.path(),
        "Catalogs/Items/Forms/ItemForm/Module.bsl",
        "Procedure OnOpen(Cancel)\n\tTotal = CalcTotal(Rows);\n\tMore = CalcTotal(Other);\nEndProcedure\n",
    );
    (dir, db_path)
}

fn request(root: &Path, db_path: &Path, params: &str) -> Value {
    let raw = rpc::call(
        root.to_path_buf(),
        db_path.to_path_buf(),
        "find_callers".to_string(),
        params,
        "1",
    )
    .unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn callers_are_grouped_by_module_with_sorted_lines() {
    let (dir, db_path) = setup();
    let response = request(
        dir.path(),
        &db_path,
        r#"{"module": "CommonModules/Utils/Module.bsl", "method": "CalcTotal"}"#,
    );
    assert!(response.get("error").is_none(), "unexpected: {response}");
    let result = &response["result"];
    assert_eq!(result["methodSignature"], "CommonModule.Utils.CalcTotal()");
    assert_eq!(result["callerCount"], 3);
    let groups = result["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    let form_group = groups
        .iter()
        .find(|g| g["modulePath"] == "Catalogs/Items/Forms/ItemForm/Module.bsl")
        .expect("form group");
    assert_eq!(form_group["lines"], serde_json::json!([2, 3]));
}

#[test]
fn unknown_method_lists_available_methods() {
    let (dir, db_path) = setup();
    let response = request(
        dir.path(),
        &db_path,
        r#"{"module": "CommonModules/Utils/Module.bsl", "method": "Nope"}"#,
    );
    assert!(response.get("result").is_none());
    assert_eq!(response["error"]["code"], "method_not_found");
    let message = response["error"]["message"].as_str().unwrap();
    assert!(message.contains("CalcTotal"));
    assert!(message.contains("Init"));
}

#[test]
fn unknown_module_is_a_module_not_found_error() {
    let (dir, db_path) = setup();
    let response = request(
        dir.path(),
        &db_path,
        r#"{"module": "CommonModules/Missing/Module.bsl", "method": "CalcTotal"}"#,
    );
    assert_eq!(response["error"]["code"], "module_not_found");
}

#[test]
fn method_lookup_ignores_case() {
    let (dir, db_path) = setup();
    let response = request(
        dir.path(),
        &db_path,
        r#"{"module": "CommonModules/Utils/Module.bsl", "method": "calctotal"}"#,
    );
    assert_eq!(
        response["result"]["methodSignature"],
        "CommonModule.Utils.CalcTotal()"
    );
}
