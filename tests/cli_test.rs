//! CLI integration tests for the oas3-model binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("oas3-model"))
}

// Helper to create a temp manifest file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

mod compile_command {
    use super::*;

    #[test]
    fn primitive() {
        cmd()
            .args(["compile", "int"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"type":"integer","format":"int64"}"#));
    }

    #[test]
    fn bool_is_boolean() {
        cmd()
            .args(["compile", "bool"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#"{"type":"boolean"}"#));
    }

    #[test]
    fn container_with_overrides() {
        let output = cmd()
            .args([
                "compile",
                "dict[str, list[float]]",
                "--title",
                "Scores",
                "--description",
                "Scores by player",
            ])
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(
            stdout_json(&output),
            json!({
                "title": "Scores",
                "description": "Scores by player",
                "type": "object",
                "additionalProperties": {
                    "type": "array",
                    "items": { "type": "number", "format": "double" }
                }
            })
        );
    }

    #[test]
    fn string_formats() {
        cmd()
            .args(["compile", "{id: uuid, at: date-time}"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""id":{"type":"string","format":"uuid"}"#))
            .stdout(predicate::str::contains(
                r#""at":{"type":"string","format":"date-time"}"#,
            ));
    }

    #[test]
    fn compile_with_pretty() {
        cmd()
            .args(["compile", "str", "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("{\n  \"type\": \"string\"\n}"));
    }

    #[test]
    fn compile_to_output_file() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("schema.json");

        cmd()
            .args(["compile", "list[]", "--output", out.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, json!({ "type": "array" }));
    }

    #[test]
    fn unknown_type_fails() {
        cmd()
            .args(["compile", "list[Widget]"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("failed to compile items"))
            .stderr(predicate::str::contains("Widget"));
    }

    #[test]
    fn deeply_nested_expression_fails() {
        let expr = format!("{}int{}", "list[".repeat(10_000), "]".repeat(10_000));
        cmd()
            .args(["compile", expr.as_str()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("nests too deeply"));
    }

    #[test]
    fn malformed_expression_fails() {
        cmd()
            .args(["compile", "dict[str"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid type expression"));
    }
}

mod document_command {
    use super::*;

    #[test]
    fn petstore_fixture() {
        let output = cmd()
            .args(["document", "tests/fixtures/petstore.json"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let doc = stdout_json(&output);

        assert_eq!(doc["openapi"], "3.0.0");
        assert_eq!(doc["info"]["version"], "1.0.0");
        assert_eq!(
            doc["paths"]["/pets"]["get"]["responses"]["200"]["content"]["application/json"]
                ["schema"],
            json!({ "type": "array", "items": { "$ref": "#/components/schemas/Pet" } })
        );
        assert_eq!(
            doc["paths"]["/pets"]["post"]["requestBody"]["content"]["application/json"]["schema"],
            json!({ "$ref": "#/components/schemas/NewPet" })
        );
        assert_eq!(
            doc["paths"]["/pets/{petId}"]["get"]["parameters"][0]["required"],
            json!(true)
        );
        assert_eq!(
            doc["components"]["schemas"]["Pet"]["properties"]["born"],
            json!({ "type": "string", "format": "date" })
        );

        let keys: Vec<&str> = doc.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["openapi", "info", "paths", "components"]);
    }

    #[test]
    fn no_refs_inlines_definitions() {
        let output = cmd()
            .args(["document", "tests/fixtures/petstore.json", "--no-refs"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let doc = stdout_json(&output);

        let schema = &doc["paths"]["/pets/{petId}"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$ref").is_none());
        assert!(!String::from_utf8_lossy(&output.stdout).contains("$ref"));
    }

    #[test]
    fn depth_limit_fails() {
        cmd()
            .args([
                "document",
                "tests/fixtures/petstore.json",
                "--max-depth",
                "2",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("nesting exceeds 2 levels"));
    }

    #[test]
    fn unknown_method() {
        let dir = TempDir::new().unwrap();
        let manifest = write_temp_file(
            &dir,
            "routes.json",
            r#"{"title": "x", "routes": [{"path": "/", "method": "fetch"}]}"#,
        );

        cmd()
            .args(["document", manifest.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown HTTP method \"fetch\""));
    }

    #[test]
    fn deeply_nested_type_fails() {
        let dir = TempDir::new().unwrap();
        let deep = format!("{}int{}", "list[".repeat(100_000), "]".repeat(100_000));
        let manifest = json!({ "title": "x", "types": { "Deep": deep } });
        let manifest = write_temp_file(&dir, "deep.json", &manifest.to_string());

        cmd()
            .args(["document", manifest.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("type 'Deep'"))
            .stderr(predicate::str::contains("nests too deeply"));
    }

    #[test]
    fn missing_title_is_invalid_json() {
        let dir = TempDir::new().unwrap();
        let manifest = write_temp_file(&dir, "routes.json", r#"{"routes": []}"#);

        cmd()
            .args(["document", manifest.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn missing_file() {
        cmd()
            .args(["document", "/nonexistent/routes.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }
}

mod required_args {
    use super::*;

    #[test]
    fn missing_expression() {
        cmd()
            .arg("compile")
            .assert()
            .failure()
            .stderr(predicate::str::contains("EXPR"));
    }

    #[test]
    fn missing_manifest() {
        cmd()
            .arg("document")
            .assert()
            .failure()
            .stderr(predicate::str::contains("MANIFEST"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Build OpenAPI 3 schemas and documents"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("oas3-model"));
    }

    #[test]
    fn document_help() {
        cmd()
            .args(["document", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--no-refs"))
            .stdout(predicate::str::contains("--max-depth"));
    }
}
