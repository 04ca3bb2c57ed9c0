use super::*;
use httpmock::prelude::*;
use serde_json::json;

fn create_client(server: &MockServer) -> CloudinaryClient {
    let client = ClientBuilder::new(Client::new()).build();
    CloudinaryClient::new_with_client(client, server.url("/v1_1/demo"), "unsigned_photos".to_string())
}

fn sample_file() -> PhotoFile {
    PhotoFile::new("beach.jpg", "image/jpeg", b"fake-jpeg-bytes".to_vec())
}

#[tokio::test]
async fn test_upload() {
    let server = MockServer::start();
    let cloudinary = create_client(&server);

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1_1/demo/upload")
            .header_exists("content-type")
            .body_includes("name=\"upload_preset\"")
            .body_includes("unsigned_photos")
            .body_includes("name=\"file\"; filename=\"beach.jpg\"");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "asset_id": "3515c6000a548515f1134043f9785c2f",
                "public_id": "gotjephlnz2jgiu20zni",
                "width": 640,
                "height": 480,
                "format": "jpg",
                "resource_type": "image",
                "bytes": 120253,
                "url": "http://res.cloudinary.com/demo/image/upload/v1570979139/gotjephlnz2jgiu20zni.jpg",
                "secure_url": "https://res.cloudinary.com/demo/image/upload/v1570979139/gotjephlnz2jgiu20zni.jpg"
            }));
    });

    let image = cloudinary.upload(sample_file()).await.unwrap();
    assert_eq!(
        image.secure_url,
        "https://res.cloudinary.com/demo/image/upload/v1570979139/gotjephlnz2jgiu20zni.jpg"
    );
    assert_eq!(image.width, Some(640));
    assert_eq!(image.format.as_deref(), Some("jpg"));

    mock.assert();
}

#[tokio::test]
async fn test_upload_rejected_preset() {
    let server = MockServer::start();
    let cloudinary = create_client(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1_1/demo/upload");
        then.status(400)
            .header("content-type", "application/json")
            .json_body(json!({ "error": { "message": "Upload preset not found" } }));
    });

    match cloudinary.upload(sample_file()).await {
        Err(CloudinaryError::ApiError(msg)) => assert_eq!(msg, "Upload preset not found"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_non_json_error() {
    let server = MockServer::start();
    let cloudinary = create_client(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1_1/demo/upload");
        then.status(502).body("Bad Gateway");
    });

    match cloudinary.upload(sample_file()).await {
        Err(CloudinaryError::ApiError(msg)) => {
            assert!(msg.contains("502"));
            assert!(msg.contains("Bad Gateway"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_response_without_secure_url() {
    let server = MockServer::start();
    let cloudinary = create_client(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1_1/demo/upload");
        then.status(200).json_body(json!({ "public_id": "abc" }));
    });

    assert!(matches!(
        cloudinary.upload(sample_file()).await,
        Err(CloudinaryError::SerializationError(_))
    ));
}

#[test]
fn test_new_uses_cloud_name() {
    let cloudinary = CloudinaryClient::new(&CloudinaryOptions {
        cloud_name: "demo".to_string(),
        upload_preset: "unsigned_photos".to_string(),
    });
    assert_eq!(cloudinary.base_url, "https://api.cloudinary.com/v1_1/demo");
}
