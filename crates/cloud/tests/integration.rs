//! OpenTopography client against a mock provider.

use httpmock::prelude::*;
use sheed_cloud::{DemError, DemRequest, DemSource, OpenTopography};
use sheed_core::BoundingBox;

fn request() -> DemRequest {
    DemRequest::new("USGS10m", BoundingBox::around(-120.0, 45.0, 0.05))
}

#[tokio::test]
async fn fetch_sends_bbox_and_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/API/usgsdem")
            .query_param("datasetName", "USGS10m")
            .query_param("west", "-120.05")
            .query_param("south", "44.95")
            .query_param("east", "-119.95")
            .query_param("north", "45.05")
            .query_param("outputFormat", "GTiff")
            .query_param("API_Key", "secret-key");
        then.status(200)
            .header("Content-Type", "image/tiff")
            .body(b"II*\0fake");
    });

    let source = OpenTopography::with_base_url("secret-key", server.url("/API/usgsdem")).unwrap();
    let bytes = source.fetch(&request()).await.unwrap();

    mock.assert();
    assert_eq!(bytes, b"II*\0fake");
}

#[tokio::test]
async fn provider_error_keeps_body_and_hides_key() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/API/usgsdem");
        then.status(401).body("Invalid API key");
    });

    let source = OpenTopography::with_base_url("secret-key", server.url("/API/usgsdem")).unwrap();
    let err = source.fetch(&request()).await.unwrap_err();

    mock.assert();
    match err {
        DemError::Status { status, request, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid API key");
            assert!(request.contains("datasetName=USGS10m"));
            assert!(!request.contains("secret-key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_body_is_an_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/API/usgsdem");
        then.status(200);
    });

    let source = OpenTopography::with_base_url("k", server.url("/API/usgsdem")).unwrap();
    assert!(matches!(
        source.fetch(&request()).await,
        Err(DemError::EmptyBody { .. })
    ));
}

#[tokio::test]
async fn unreachable_provider_fails_without_leaking_key() {
    // Nothing listens on port 9 locally
    let source = OpenTopography::with_base_url("secret-key", "http://127.0.0.1:9/API/usgsdem").unwrap();
    let err = source.fetch(&request()).await.unwrap_err();
    assert!(matches!(err, DemError::Http(_)));
    assert!(!err.to_string().contains("secret-key"));
}
