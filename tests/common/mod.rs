//! Shared fixtures: a labeled store, a query export, a source file, and a
//! config pointing at them, all inside one temp directory.

#![allow(dead_code)]

use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn labeled(&self) -> PathBuf {
        self.root().join("labeled.jsonl")
    }

    pub fn paths(&self) -> PathBuf {
        self.root().join("paths.jsonl")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root().join("src")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root().join("reports")
    }

    pub fn config(&self) -> PathBuf {
        self.root().join("pathsentry.toml")
    }
}

fn flat_path(types: &[f64]) -> serde_json::Value {
    json!(types
        .iter()
        .map(|t| json!({"node_type": t}))
        .collect::<Vec<_>>())
}

fn write_lines(path: &Path, records: &[serde_json::Value]) {
    let body: String = records.iter().map(|r| format!("{}\n", r)).collect();
    std::fs::write(path, body).unwrap();
}

/// Unsafe CWE-121 paths are short (`1 2 3..4.75`), safe ones long
/// (`5 6 7 8 9..11`). No two unsafe samples coincide, so held-out unsafe
/// distances are spread rather than all zero. CWE-78 has a single sample and
/// is skipped when clustering.
fn write_labeled(path: &Path) {
    let mut records = Vec::new();
    for i in 0..8u32 {
        let tail = 3.0 + 0.25 * f64::from(i);
        let last = 9.0 + f64::from(i % 3);
        records.push(json!({"cwe": 121, "safe": false, "path": flat_path(&[1.0, 2.0, tail])}));
        records.push(json!({"cwe": "CWE-121", "safe": true, "path": flat_path(&[5.0, 6.0, 7.0, 8.0, last])}));
    }
    // The store may carry the path as an encoded string
    records.push(json!({"cwe": 78, "safe": false, "path": flat_path(&[1.0, 2.0, 3.0]).to_string()}));
    write_lines(path, &records);
}

/// Two short paths in `f.c` sharing endpoints, one far path, one path with
/// an unmatched return.
fn write_query(path: &Path) {
    let records = vec![
        json!({
            "f": {"id": 1, "properties": {"name": "main"}},
            "path": {"nodes": [
                {"id": 10, "properties": {"node_type": 1, "n_hash": "h1", "src_loc": "{ ln: 10  cl: 3  fl: f.c }"}},
                {"id": 11, "properties": {"node_type": 2, "n_hash": "hx", "src_loc": "{ ln: 12  cl: 3  fl: f.c }"}},
                {"id": 12, "properties": {"node_type": 3, "n_hash": "h2", "src_loc": "{ ln: 12  cl: 9  fl: f.c }"}}
            ]}
        }),
        json!({
            "f": "main",
            "path": [
                {"id": 20, "node_type": 1, "n_hash": "h1", "src_loc": "{ ln: 15  cl: 1  fl: f.c }"},
                {"id": 21, "node_type": 2, "n_hash": "hy"},
                {"id": 22, "node_type": 3, "n_hash": "h2"}
            ]
        }),
        json!({
            "f": "main",
            "path": [
                {"id": 30, "node_type": 5, "n_hash": "h3", "src_loc": "{ ln: 2  cl: 1  fl: f.c }"},
                {"id": 31, "node_type": 6},
                {"id": 32, "node_type": 7},
                {"id": 33, "node_type": 8},
                {"id": 34, "node_type": 11, "n_hash": "h4"}
            ]
        }),
        json!({
            "f": "main",
            "path": [
                {"id": 40, "node_type": 1, "node_name": "RetICFGNode", "cs_name": "cs9"},
                {"id": 41, "node_type": 2}
            ]
        }),
    ];
    write_lines(path, &records);
}

fn write_source(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    let content: String = (1..=30).map(|i| format!("stmt_{};\n", i)).collect();
    std::fs::write(dir.join("f.c"), content).unwrap();
}

pub fn config_toml(labeled: &Path) -> String {
    format!(
        r#"[distance]
model_path = "{}"
node_property = "node_type"
source_code_delta = 1
include_models = "all"
centroids = "bad"
expected_clusters = 2
clustering_type = "kmeans"
threshold_scaling = 2.0
"#,
        labeled.display().to_string().replace('\\', "\\\\")
    )
}

pub fn setup() -> Fixture {
    let fixture = Fixture {
        dir: tempfile::tempdir().unwrap(),
    };
    write_labeled(&fixture.labeled());
    write_query(&fixture.paths());
    write_source(&fixture.source_dir());
    std::fs::write(fixture.config(), config_toml(&fixture.labeled())).unwrap();
    fixture
}
