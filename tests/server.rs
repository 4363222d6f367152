use sheet_translator::server::router;
use sheet_translator::state::AppState;
use sheet_translator::translation::MockTranslator;
use sheet_translator::utils::{AppConfig, SheetTranslatorError};
use std::sync::Arc;
use tempfile::TempDir;

struct TestServer {
    base_url: String,
    uploads: TempDir,
    _outputs: TempDir,
}

async fn spawn_server() -> TestServer {
    let uploads = tempfile::tempdir().unwrap();
    let outputs = tempfile::tempdir().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let mut config = AppConfig::default();
    config.storage.upload_dir = uploads.path().to_path_buf();
    config.storage.output_dir = outputs.path().to_path_buf();
    config.server.public_base_url = base_url.clone();

    let mut translator = MockTranslator::new();
    translator
        .expect_translate()
        .returning(|text, _, target| match (text, target) {
            ("Hello", "de") => Ok("Hallo".to_string()),
            _ => Err(SheetTranslatorError::RowTranslation("unsupported".into())),
        });

    let state = AppState::assemble(config, Arc::new(translator), None).unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    TestServer {
        base_url,
        uploads,
        _outputs: outputs,
    }
}

fn data_lines(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn health_reports_ok() {
    let server = spawn_server().await;
    let body: serde_json::Value = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn job_streams_progress_and_artifact_is_downloadable() {
    let server = spawn_server().await;
    std::fs::write(
        server.uploads.path().join("book.csv"),
        "id,source\n1,Hello\n2,\n3,42\n",
    )
    .unwrap();

    let client = reqwest::Client::new();
    let body = client
        .post(format!("{}/jobs", server.base_url))
        .json(&serde_json::json!({
            "input_file": "book.csv",
            "target_lang": "de",
            "source_col": "source",
            "target_col": "target"
        }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let lines = data_lines(&body);
    assert_eq!(&lines[..3], &["33", "67", "100"]);
    assert_eq!(lines.len(), 4);
    let url = lines[3].strip_prefix("complete|").expect("completion event");
    assert!(url.starts_with(&format!("{}/download/translated_", server.base_url)));

    let response = client.get(url).send().await.unwrap();
    assert!(response.status().is_success());
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"translated_"));
    assert_eq!(
        response.text().await.unwrap(),
        "id,source,target\n1,Hello,Hallo\n2,,\n3,42,42\n"
    );
}

#[tokio::test]
async fn unreadable_upload_streams_a_single_error() {
    let server = spawn_server().await;

    let body = reqwest::Client::new()
        .post(format!("{}/jobs", server.base_url))
        .json(&serde_json::json!({ "input_file": "missing.csv" }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let lines = data_lines(&body);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("error|"));
}

#[tokio::test]
async fn path_traversal_is_refused() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let body = client
        .post(format!("{}/jobs", server.base_url))
        .json(&serde_json::json!({ "input_file": "../etc/passwd" }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(data_lines(&body)[0].starts_with("error|Ingestion error: Invalid file name"));

    let response = client
        .get(format!("{}/download/secrets.csv", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
