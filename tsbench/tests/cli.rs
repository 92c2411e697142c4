use std::{fs::File, io::BufReader, path::Path, process::Output};

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use tsbench_query::stream::QueryReader;

fn tsbench(args: &[&str]) -> Output {
    Command::cargo_bin("tsbench")
        .unwrap()
        .env_remove("LOG_FILTER")
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn generate(path: &Path, format: &str, query_type: &str, queries: &str) -> Output {
    tsbench(&[
        "generate-queries",
        "--format",
        format,
        "--query-type",
        query_type,
        "--scale",
        "10",
        "--seed",
        "123",
        "--queries",
        queries,
        "--file",
        path.to_str().unwrap(),
    ])
}

#[test]
fn generate_then_run() {
    let dir = tempfile::tempdir().unwrap();
    let queries = dir.path().join("queries.bin");
    let results = dir.path().join("results.json");

    let output = generate(&queries, "timescaledb", "single-groupby-1-1-1", "20");
    assert!(output.status.success(), "{}", stderr(&output));

    let reader = QueryReader::new(BufReader::new(File::open(&queries).unwrap())).unwrap();
    let decoded: Vec<_> = reader.map(Result::unwrap).collect();
    assert_eq!(decoded.len(), 20);
    assert!(
        decoded
            .iter()
            .all(|q| q.human_label().starts_with("TimescaleDB 1 cpu metric(s)")),
        "{:?}",
        decoded[0].human_label()
    );

    let output = tsbench(&[
        "run-queries",
        "--file",
        queries.to_str().unwrap(),
        "--workers",
        "2",
        "--results-file",
        results.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(
        out.starts_with("Run complete after 20 queries with 2 workers"),
        "{out}"
    );
    assert!(out.contains("all-queries"), "{out}");
    assert!(out.contains("Wall clock time:"), "{out}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&results).unwrap()).unwrap();
    assert_eq!(json["summary"]["queries"], 20);
}

#[test]
fn same_seed_same_queries() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");

    assert!(generate(&a, "siridb", "high-cpu-1", "10").status.success());
    assert!(generate(&b, "siridb", "high-cpu-1", "10").status.success());

    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn unsupported_query_type_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.bin");

    let output = generate(&path, "siridb", "groupby-orderby-limit", "10");
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains(
            "Generate queries command failed: failed to generate query: \
             backend siridb does not implement GroupbyOrderbyLimitFiller"
        ),
        "{err}"
    );
}

#[test]
fn more_hosts_than_scale_fails() {
    let output = tsbench(&[
        "generate-queries",
        "--query-type",
        "single-groupby-1-8-1",
        "--scale",
        "5",
        "--seed",
        "1",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(
        err.contains(
            "Generate queries command failed: failed to generate query: \
             number of hosts (8) larger than total hosts. See --scale (5)"
        ),
        "{err}"
    );
}

#[test]
fn run_rejects_invalid_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.bin");
    let output = generate(&path, "timescaledb", "lastpoint", "5");
    assert!(output.status.success(), "{}", stderr(&output));

    let output = tsbench(&[
        "run-queries",
        "--file",
        path.to_str().unwrap(),
        "--workers",
        "0",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains(
            "Run queries command failed: invalid runner configuration: \
             number of workers must be greater than 0"
        ),
        "{}",
        stderr(&output)
    );
}

#[test]
fn query_types_lists_the_registry() {
    let output = tsbench(&["query-types"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    for tag in [
        "single-groupby-1-1-1",
        "double-groupby-all",
        "lastpoint",
        "high-cpu-all",
    ] {
        assert!(out.contains(tag), "{tag} missing from:\n{out}");
    }
    let formats_of = |out: &str, tag: &str| {
        out.lines()
            .find(|line| line.split_whitespace().next() == Some(tag))
            .and_then(|line| line.rsplit_once('['))
            .map(|(_, formats)| formats.trim_end_matches(']').to_string())
    };
    assert_eq!(
        formats_of(&out, "lastpoint").as_deref(),
        Some("timescaledb, siridb")
    );
    assert_eq!(
        formats_of(&out, "groupby-orderby-limit").as_deref(),
        Some("timescaledb")
    );

    let output = tsbench(&["query-types", "--format", "siridb"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    assert!(!out.contains("groupby-orderby-limit"), "{out}");
    assert_eq!(formats_of(&out, "lastpoint").as_deref(), Some("siridb"));
}
