use super::*;
use httpmock::prelude::*;
use reqwest::Client;
use reqwest_middleware::ClientBuilder;
use serde_json::json;

const DOCUMENTS_PATH: &str = "/v1/projects/p/databases/(default)/documents";

fn create_gate(server: &MockServer) -> RoomGate {
    let client = ClientBuilder::new(Client::new()).build();
    RoomGate::new(FirebaseFirestore::new_with_client(
        client,
        server.url(DOCUMENTS_PATH),
    ))
}

fn room_document(code: &str) -> serde_json::Value {
    json!({
        "name": format!("projects/p/databases/(default)/documents/rooms/{}", code),
        "fields": { "createdAt": { "integerValue": "1700000000000" } },
        "createTime": "2024-01-01T00:00:00Z",
        "updateTime": "2024-01-01T00:00:00Z"
    })
}

fn not_found() -> serde_json::Value {
    json!({ "error": { "code": 404, "message": "Document not found", "status": "NOT_FOUND" } })
}

fn codes(list: &[&str]) -> impl FnMut() -> RoomCode {
    let mut codes: Vec<RoomCode> = list.iter().map(|c| RoomCode::parse(c).unwrap()).collect();
    codes.reverse();
    move || codes.pop().expect("ran out of test codes")
}

#[tokio::test]
async fn test_join_existing_room() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/482913", DOCUMENTS_PATH));
        then.status(200).json_body(room_document("482913"));
    });

    let code = gate.join(" 482913 ").await.unwrap();
    assert_eq!(code.as_str(), "482913");

    mock.assert();
}

#[tokio::test]
async fn test_join_missing_room() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/111111", DOCUMENTS_PATH));
        then.status(404).json_body(not_found());
    });

    let err = gate.join("111111").await.unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
    assert_eq!(err.to_string(), "Room not found");
}

#[tokio::test]
async fn test_join_invalid_code_skips_lookup() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    let mock = server.mock(|when, then| {
        when.method(GET);
        then.status(200);
    });

    let err = gate.join("12ab").await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter a 6-digit room code");
    mock.assert_calls(0);
}

#[tokio::test]
async fn test_join_backend_failure() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/222222", DOCUMENTS_PATH));
        then.status(403).json_body(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
        }));
    });

    let err = gate.join("222222").await.unwrap_err();
    assert!(matches!(err, RoomError::JoinFailed(_)));
    assert!(err.to_string().starts_with("Failed to join room"));
}

#[tokio::test]
async fn test_create_room() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    let lookup = server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/654321", DOCUMENTS_PATH));
        then.status(404).json_body(not_found());
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/rooms", DOCUMENTS_PATH))
            .query_param("documentId", "654321")
            .body_includes("createdAt")
            .body_includes("integerValue");
        then.status(200).json_body(room_document("654321"));
    });

    let code = gate.create_with(codes(&["654321"])).await.unwrap();
    assert_eq!(code.as_str(), "654321");

    lookup.assert();
    create.assert();
}

#[tokio::test]
async fn test_create_skips_taken_codes() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/100000", DOCUMENTS_PATH));
        then.status(200).json_body(room_document("100000"));
    });
    server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/200000", DOCUMENTS_PATH));
        then.status(404).json_body(not_found());
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/rooms", DOCUMENTS_PATH))
            .query_param("documentId", "200000");
        then.status(200).json_body(room_document("200000"));
    });

    let code = gate
        .create_with(codes(&["100000", "200000"]))
        .await
        .unwrap();
    assert_eq!(code.as_str(), "200000");

    create.assert();
}

#[tokio::test]
async fn test_create_retries_when_code_taken_concurrently() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    server.mock(|when, then| {
        when.method(GET);
        then.status(404).json_body(not_found());
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/rooms", DOCUMENTS_PATH))
            .query_param("documentId", "300000");
        then.status(409).json_body(json!({
            "error": { "code": 409, "message": "Document already exists", "status": "ALREADY_EXISTS" }
        }));
    });
    let create = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}/rooms", DOCUMENTS_PATH))
            .query_param("documentId", "400000");
        then.status(200).json_body(room_document("400000"));
    });

    let code = gate
        .create_with(codes(&["300000", "400000"]))
        .await
        .unwrap();
    assert_eq!(code.as_str(), "400000");

    create.assert();
}

#[tokio::test]
async fn test_create_gives_up() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    let lookup = server.mock(|when, then| {
        when.method(GET).path(format!("{}/rooms/999999", DOCUMENTS_PATH));
        then.status(200).json_body(room_document("999999"));
    });

    let err = gate
        .create_with(|| RoomCode::parse("999999").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Exhausted(20)));
    lookup.assert_calls(20);
}

#[tokio::test]
async fn test_create_uses_random_codes() {
    let server = MockServer::start();
    let gate = create_gate(&server);

    server.mock(|when, then| {
        when.method(GET);
        then.status(404).json_body(not_found());
    });
    let create = server.mock(|when, then| {
        when.method(POST).path(format!("{}/rooms", DOCUMENTS_PATH));
        then.status(200).json_body(room_document("123456"));
    });

    let code = gate.create().await.unwrap();
    assert_eq!(code.as_str().len(), 6);
    assert!(RoomCode::parse(code.as_str()).is_ok());

    create.assert();
}
