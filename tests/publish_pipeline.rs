//! End-to-end publish pipeline tests against a fake converter CLI.

#![cfg(unix)]

use std::{fs, os::unix::fs::PermissionsExt, path::Path, sync::Arc, time::Duration};

use tempfile::TempDir;
use time::macros::datetime;
use vivadoc::{
    application::{
        publish::{PublishContext, PublishService},
        render::{AsciidoctorCli, PassOrder, RenderCoordinator, RenderRequest, WaitBudgets},
    },
    domain::build::{BuildOutcome, DocsFormat},
    infra::store::BuildStore,
};

const FEATURES_JSON: &str = r#"[
  {
    "id": "checkout",
    "name": "Checkout",
    "keyword": "Feature",
    "elements": [
      {
        "type": "scenario",
        "keyword": "Scenario",
        "name": "paying with a card",
        "steps": [
          {
            "keyword": "Given ",
            "name": "a full basket",
            "result": { "status": "passed", "duration": 1200000 }
          }
        ]
      }
    ]
  }
]"#;

/// Converter double: records each backend pass in a log file and writes
/// the expected output file.
fn write_fake_converter(dir: &Path, log: &Path, extra: &str) -> std::path::PathBuf {
    let path = dir.join("fake-asciidoctor.sh");
    let script = format!(
        r#"#!/bin/sh
{extra}
backend=""
out=""
prev=""
for arg in "$@"; do
  case "$prev" in
    --backend) backend="$arg" ;;
    --out-file) out="$arg" ;;
  esac
  prev="$arg"
done
echo "$backend" >> "{log}"
printf '<html><head><style>a {{}}</style></head><body>%s output</body></html>' "$backend" > "$out"
"#,
        log = log.display(),
    );
    fs::write(&path, script).expect("write fake converter");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

struct Harness {
    _script_dir: TempDir,
    store_dir: TempDir,
    workspace: TempDir,
    service: PublishService,
    pass_log: std::path::PathBuf,
}

fn harness(extra_script: &str, budgets: WaitBudgets) -> Harness {
    let script_dir = TempDir::new().expect("script dir");
    let pass_log = script_dir.path().join("passes.log");
    let cli = write_fake_converter(script_dir.path(), &pass_log, extra_script);

    let store_dir = TempDir::new().expect("store dir");
    let store = BuildStore::new(store_dir.path().to_path_buf()).expect("store");
    let coordinator = RenderCoordinator::new(
        Arc::new(AsciidoctorCli::new(cli)),
        4,
        PassOrder::HtmlFirst,
        budgets,
    );

    let workspace = TempDir::new().expect("workspace");
    Harness {
        _script_dir: script_dir,
        store_dir,
        workspace,
        service: PublishService::new(coordinator, store),
        pass_log,
    }
}

fn context(harness: &Harness, build_number: u32) -> PublishContext {
    PublishContext {
        workspace: harness.workspace.path().to_path_buf(),
        features_dir: None,
        build_number,
        build_time: datetime!(2026-08-30 09:30 UTC),
        display_name: format!("build #{build_number}"),
    }
}

fn seed_features(harness: &Harness) {
    fs::write(harness.workspace.path().join("checkout.json"), FEATURES_JSON)
        .expect("write features");
}

fn docs_dir(harness: &Harness, build_number: u32) -> std::path::PathBuf {
    harness
        .store_dir
        .path()
        .join(build_number.to_string())
        .join("living-documentation")
}

#[tokio::test]
async fn html_publish_writes_artifacts_and_the_record() {
    let harness = harness("", WaitBudgets::default());
    seed_features(&harness);

    let outcome = harness
        .service
        .publish(&context(&harness, 7), RenderRequest::new(DocsFormat::Html))
        .await;
    assert!(matches!(outcome, BuildOutcome::Success));

    let docs = docs_dir(&harness, 7);
    assert!(docs.join("documentation.adoc").is_file());
    assert!(docs.join("documentation.html").is_file());
    assert!(!docs.join("documentation.pdf").exists());
    assert!(docs.join("build.json").is_file());
    // Staged alongside the artifacts: source results and the default theme.
    assert!(docs.join("checkout.json").is_file());
    assert!(docs.join("themes").join("default.css").is_file());

    let record = fs::read_to_string(docs.join("build.json")).expect("record");
    assert!(record.contains("\"html\""));
    assert!(record.contains("\"build_number\": 7"));
}

#[tokio::test]
async fn pdf_publish_writes_only_the_pdf_artifact() {
    let harness = harness("", WaitBudgets::default());
    seed_features(&harness);

    let outcome = harness
        .service
        .publish(&context(&harness, 8), RenderRequest::new(DocsFormat::Pdf))
        .await;
    assert!(matches!(outcome, BuildOutcome::Success));

    let docs = docs_dir(&harness, 8);
    assert!(docs.join("documentation.pdf").is_file());
    assert!(!docs.join("documentation.html").exists());

    let record = fs::read_to_string(docs.join("build.json")).expect("record");
    assert!(record.contains("\"pdf\""));

    let passes = fs::read_to_string(&harness.pass_log).expect("pass log");
    assert_eq!(passes.lines().collect::<Vec<_>>(), vec!["pdf"]);
}

#[tokio::test]
async fn combined_format_runs_html_before_pdf() {
    let harness = harness("", WaitBudgets::default());
    seed_features(&harness);

    let outcome = harness
        .service
        .publish(&context(&harness, 3), RenderRequest::new(DocsFormat::All))
        .await;
    assert!(matches!(outcome, BuildOutcome::Success));

    let docs = docs_dir(&harness, 3);
    assert!(docs.join("documentation.html").is_file());
    assert!(docs.join("documentation.pdf").is_file());

    let passes = fs::read_to_string(&harness.pass_log).expect("pass log");
    let order: Vec<&str> = passes.lines().collect();
    assert_eq!(order, vec!["html5", "pdf"]);
}

#[tokio::test]
async fn workspace_without_features_publishes_nothing_and_succeeds() {
    let harness = harness("", WaitBudgets::default());

    let outcome = harness
        .service
        .publish(&context(&harness, 5), RenderRequest::new(DocsFormat::Html))
        .await;
    assert!(matches!(outcome, BuildOutcome::Success));

    let docs = docs_dir(&harness, 5);
    assert!(docs.is_dir());
    assert!(!docs.join("documentation.html").exists());
    assert!(!docs.join("build.json").exists());
}

#[tokio::test]
async fn converter_failure_fails_the_build() {
    let harness = harness("exit 3", WaitBudgets::default());
    seed_features(&harness);

    let outcome = harness
        .service
        .publish(&context(&harness, 9), RenderRequest::new(DocsFormat::Html))
        .await;
    assert!(matches!(outcome, BuildOutcome::Failure));
    assert!(!docs_dir(&harness, 9).join("build.json").exists());
}

#[tokio::test]
async fn converter_exceeding_the_wait_budget_fails_the_build() {
    let budgets = WaitBudgets {
        html_only: Duration::from_millis(50),
        with_pdf: Duration::from_millis(50),
    };
    let harness = harness("sleep 2", budgets);
    seed_features(&harness);

    let outcome = harness
        .service
        .publish(&context(&harness, 11), RenderRequest::new(DocsFormat::Html))
        .await;
    assert!(matches!(outcome, BuildOutcome::Failure));
}

#[tokio::test]
async fn features_dir_override_is_honoured() {
    let harness = harness("", WaitBudgets::default());
    let nested = harness.workspace.path().join("target").join("cucumber");
    fs::create_dir_all(&nested).expect("mkdir");
    fs::write(nested.join("checkout.json"), FEATURES_JSON).expect("write features");

    let mut context = context(&harness, 2);
    context.features_dir = Some("target/cucumber".to_string());

    let outcome = harness
        .service
        .publish(&context, RenderRequest::new(DocsFormat::Html))
        .await;
    assert!(matches!(outcome, BuildOutcome::Success));
    assert!(docs_dir(&harness, 2).join("documentation.html").is_file());
}
