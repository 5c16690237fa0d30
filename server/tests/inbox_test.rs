mod common;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use inbx_server::entries::EntryId;

use common::{body_files, client, sidecar_files, start_test_server, stored_bodies};

#[tokio::test]
async fn test_health_check() {
    let server = start_test_server(10, Some("")).await;

    let resp = client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_usage_hint_follows_token_state() {
    let open = start_test_server(10, Some("")).await;
    let resp = client().get(open.url("/inbx")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains("curl --data-binary"));
    assert!(!text.contains("TOKEN"));

    let gated = start_test_server(10, Some("s3cret")).await;
    let text = client()
        .get(gated.url("/inbx"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("X-Inbx-Token: TOKEN"));
    assert!(!text.contains("s3cret"));
}

#[tokio::test]
async fn test_ingest_without_token_stores_pairs() {
    let server = start_test_server(10, Some("")).await;
    let client = client();

    for i in 0..5 {
        let resp = client
            .post(server.url("/inbx"))
            .body(format!("message {}", i))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        assert_eq!(resp.text().await.unwrap(), "Stored\n");
    }

    let bodies = body_files(server.path());
    let sidecars = sidecar_files(server.path());
    assert_eq!(bodies.len(), 5);
    assert_eq!(sidecars.len(), 5);

    // Every body has its sidecar under the same id
    for body in &bodies {
        let name = body.file_name().unwrap().to_string_lossy().to_string();
        let stem = name.trim_end_matches(".txt");
        assert!(server.path().join(format!("{}.meta.json", stem)).exists());
    }

    assert_eq!(
        stored_bodies(server.path()),
        vec!["message 0", "message 1", "message 2", "message 3", "message 4"]
    );
}

#[tokio::test]
async fn test_ingest_rejects_bad_token() {
    let server = start_test_server(10, Some("s3cret")).await;
    let client = client();

    // No credentials at all
    let resp = client
        .post(server.url("/inbx"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    // Ingestion failures never prompt a browser login
    assert!(resp.headers().get("www-authenticate").is_none());

    // Wrong header token
    let resp = client
        .post(server.url("/inbx"))
        .header("X-Inbx-Token", "wrong")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Wrong token in both Basic slots
    let resp = client
        .post(server.url("/inbx"))
        .basic_auth("wrong", Some("also-wrong"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    assert!(body_files(server.path()).is_empty());
    assert!(sidecar_files(server.path()).is_empty());
}

#[tokio::test]
async fn test_ingest_accepts_token_in_any_slot() {
    let server = start_test_server(10, Some("s3cret")).await;
    let client = client();

    let resp = client
        .post(server.url("/inbx"))
        .header("X-Inbx-Token", "s3cret")
        .body("via header")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(server.url("/inbx"))
        .basic_auth("s3cret", None::<&str>)
        .body("via username")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(server.url("/inbx"))
        .basic_auth("anyone", Some("s3cret"))
        .body("via password")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    assert_eq!(
        stored_bodies(server.path()),
        vec!["via header", "via username", "via password"]
    );
}

#[tokio::test]
async fn test_empty_body_rejected() {
    let server = start_test_server(10, Some("")).await;

    let resp = client()
        .post(server.url("/inbx"))
        .body("")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(body_files(server.path()).is_empty());
}

#[tokio::test]
async fn test_body_size_cap() {
    let server = start_test_server(10, Some("")).await;
    let client = client();
    let cap = inbx_server::inbox::MAX_BODY_BYTES;

    let resp = client
        .post(server.url("/inbx"))
        .body(vec![b'a'; cap])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let resp = client
        .post(server.url("/inbx"))
        .body(vec![b'a'; cap + 1])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);

    assert_eq!(body_files(server.path()).len(), 1);
}

#[tokio::test]
async fn test_retention_drops_oldest() {
    let server = start_test_server(3, Some("")).await;
    let client = client();

    for body in ["a", "b", "c"] {
        let resp = client
            .post(server.url("/inbx"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }
    assert_eq!(stored_bodies(server.path()), vec!["a", "b", "c"]);

    let resp = client
        .post(server.url("/inbx"))
        .body("d")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    assert_eq!(stored_bodies(server.path()), vec!["b", "c", "d"]);
    assert_eq!(sidecar_files(server.path()).len(), 3);
}

#[tokio::test]
async fn test_concurrent_ingest_respects_retention() {
    let server = start_test_server(4, Some("")).await;
    let client = client();

    let mut handles = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        let url = server.url("/inbx");
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .body(format!("burst {}", i))
                .send()
                .await
                .unwrap()
                .status()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 201);
    }

    assert_eq!(body_files(server.path()).len(), 4);
    assert_eq!(sidecar_files(server.path()).len(), 4);
}

#[tokio::test]
async fn test_metadata_sidecar_describes_entry() {
    let server = start_test_server(10, Some("")).await;

    let resp = client()
        .post(server.url("/inbx"))
        .header("X-Forwarded-For", "198.51.100.7, 10.0.0.1")
        .header("X-Tag", "build-42")
        .body("payload with a digest")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body_path = &body_files(server.path())[0];
    let sidecar_path = &sidecar_files(server.path())[0];

    let body = std::fs::read(body_path).unwrap();
    assert_eq!(body, b"payload with a digest");

    let metadata: serde_json::Value =
        serde_json::from_slice(&std::fs::read(sidecar_path).unwrap()).unwrap();
    assert_eq!(metadata["sha256"], hex::encode(Sha256::digest(&body)));
    assert_eq!(metadata["size"], body.len() as u64);
    assert_eq!(metadata["ip"], "198.51.100.7");
    assert_eq!(metadata["headers"]["x-tag"][0], "build-42");

    // The sidecar carries the id's own timestamp
    let name = sidecar_path.file_name().unwrap().to_string_lossy().to_string();
    let id: EntryId = name.trim_end_matches(".meta.json").parse().unwrap();
    let timestamp: DateTime<Utc> = serde_json::from_value(metadata["timestamp"].clone()).unwrap();
    assert_eq!(timestamp, id.timestamp());

    // Temp files from the atomic sidecar write never linger
    let leftovers: Vec<_> = std::fs::read_dir(server.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_storage_failure_returns_500_and_stores_nothing() {
    let server = start_test_server(10, Some("")).await;
    let client = client();
    let root = server.path().to_path_buf();

    // Pull the storage root out from under the running server
    std::fs::remove_dir_all(&root).unwrap();

    let resp = client
        .post(server.url("/inbx"))
        .body("lost")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    assert_eq!(resp.text().await.unwrap(), "Storage error\n");
    assert!(!root.exists());

    // Once the directory is back, ingestion resumes with complete pairs only
    std::fs::create_dir(&root).unwrap();
    let resp = client
        .post(server.url("/inbx"))
        .body("kept")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    assert_eq!(stored_bodies(&root), vec!["kept"]);
    assert_eq!(sidecar_files(&root).len(), 1);
}
