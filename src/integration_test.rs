#[cfg(test)]
mod tests {
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use blob_store::{S3Config, StorageKind};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{payload::encode_payload, service::Service, testing::TestService};

    async fn post_json(test_srv: &TestService, body: Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/blobs")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?;
        let response = test_srv.router().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
    }

    async fn get_json(test_srv: &TestService, id: &str) -> Result<(StatusCode, Value)> {
        let request = Request::get(format!("/api/v1/blobs/{id}")).body(Body::empty())?;
        let response = test_srv.router().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
    }

    #[tokio::test]
    async fn test_round_trip_local_and_db() -> Result<()> {
        let payload: Vec<u8> = (0..=255u8).collect();
        let encoded = encode_payload(&payload);

        for backend in ["local", "db"] {
            let test_srv = TestService::with_backend(backend).await?;

            let (status, body) = post_json(&test_srv, json!({"id": "a/b/c.bin", "data": encoded})).await?;
            assert_eq!(status, StatusCode::OK, "{backend}");
            assert_eq!(body["id"], "a/b/c.bin");

            let (status, body) = get_json(&test_srv, "a/b/c.bin").await?;
            assert_eq!(status, StatusCode::OK, "{backend}");
            assert_eq!(body["data"], encoded.as_str());
            assert_eq!(body["size"], 256);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_local_backend_writes_under_root() -> Result<()> {
        let test_srv = TestService::with_backend("local").await?;
        post_json(&test_srv, json!({"id": "nested/dir/file", "data": encode_payload(b"hi")})).await?;

        let on_disk = std::fs::read(test_srv.temp_dir.path().join("blobs/nested/dir/file"))?;
        assert_eq!(on_disk, b"hi");
        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip_s3() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let endpoint = server.url();
        let test_srv = TestService::with_config(|cfg| {
            cfg.blob_storage.backend = "s3".to_string();
            cfg.blob_storage.s3 = S3Config {
                endpoint: Some(endpoint),
                bucket: Some("media".to_string()),
                access_key: Some("AKIDEXAMPLE".to_string()),
                secret_key: Some("secret".to_string()),
                region: Some("eu-central-1".to_string()),
                virtual_host: false,
            };
        })
        .await?;
        assert_eq!(
            test_srv.service.blob_service.backend_kind(),
            StorageKind::S3
        );

        let auth = mockito::Matcher::Regex(
            r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{8}/eu-central-1/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date, Signature=[0-9a-f]{64}$"
                .to_string(),
        );
        let put = server
            .mock("PUT", "/media/photos/cat.png")
            .match_header("authorization", auth.clone())
            .match_body("iam image bytes")
            .with_status(200)
            .create_async()
            .await;
        let get = server
            .mock("GET", "/media/photos/cat.png")
            .match_header("authorization", auth)
            .with_status(200)
            .with_body("iam image bytes")
            .create_async()
            .await;

        let encoded = encode_payload(b"iam image bytes");
        let (status, _) = post_json(
            &test_srv,
            json!({"id": "photos/cat.png", "data": format!("data:image/png;base64,{encoded}")}),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = get_json(&test_srv, "photos/cat.png").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], encoded.as_str());

        put.assert_async().await;
        get.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_s3_failure_is_server_error() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let endpoint = server.url();
        let test_srv = TestService::with_config(|cfg| {
            cfg.blob_storage.backend = "s3".to_string();
            cfg.blob_storage.s3.endpoint = Some(endpoint);
            cfg.blob_storage.s3.bucket = Some("media".to_string());
        })
        .await?;
        let _put = server
            .mock("PUT", "/media/x")
            .with_status(503)
            .create_async()
            .await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/blobs")
            .header("content-type", "application/json")
            .body(Body::from(json!({"id": "x", "data": "eA=="}).to_string()))?;
        let response = test_srv.router().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = get_json(&test_srv, "x").await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_blobs_survive_restart() -> Result<()> {
        let test_srv = TestService::with_backend("db").await?;
        post_json(&test_srv, json!({"id": "durable", "data": encode_payload(b"persisted")})).await?;

        let config = test_srv.service.config.clone();
        let restarted = Service::new(config).await?;
        let blob = restarted.blob_service.retrieve("durable").await?;
        assert_eq!(blob.data, encode_payload(b"persisted"));
        assert_eq!(blob.size, 9);
        Ok(())
    }

    #[tokio::test]
    async fn test_overwrite_returns_latest_bytes() -> Result<()> {
        let test_srv = TestService::new().await?;
        post_json(&test_srv, json!({"id": "obj", "data": encode_payload(b"first")})).await?;
        let (_, first) = get_json(&test_srv, "obj").await?;

        post_json(&test_srv, json!({"id": "obj", "data": encode_payload(b"second!")})).await?;
        let (status, second) = get_json(&test_srv, "obj").await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["data"], encode_payload(b"second!").as_str());
        assert_eq!(second["size"], 7);
        assert_eq!(second["created_at"], first["created_at"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_unnormalized_local_ids_are_bad_requests() -> Result<()> {
        let test_srv = TestService::with_backend("local").await?;
        post_json(&test_srv, json!({"id": "a/b", "data": encode_payload(b"first")})).await?;

        for id in ["a/./b", "a//b", "dir/"] {
            let (status, _) = post_json(&test_srv, json!({"id": id, "data": encode_payload(b"x")})).await?;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{id:?}");
        }

        let (status, body) = get_json(&test_srv, "a/b").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], encode_payload(b"first").as_str());
        Ok(())
    }

    #[tokio::test]
    async fn test_percent_encoded_id() -> Result<()> {
        let test_srv = TestService::new().await?;
        post_json(&test_srv, json!({"id": "with space", "data": encode_payload(b"s")})).await?;

        let (status, body) = get_json(&test_srv, "with%20space").await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "with space");
        Ok(())
    }
}
