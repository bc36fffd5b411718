//! Integration tests for the control-plane client using wiremock
//!
//! These tests drive the HTTP client, the remote finders and the tag
//! reconciler against mocked endpoints, checking status handling,
//! pagination and the order of tag calls.

use provkit::cloud::auth::{CredentialSource, Credentials};
use provkit::cloud::client::CloudClient;
use provkit::cloud::http::format_api_error;
use provkit::context::OperationContext;
use provkit::error::{is_not_found, ApiError, RouteNotFoundError};
use provkit::resource::{reconcile, Manifest, Mode, Outcome, ReconcileSettings, Registry};
use provkit::tags::{sync_tags, KeyValueTags, ReservedKeys};
use serde_json::json;
use wiremock::matchers::{
    bearer_token, body_json, header, header_exists, method, path, query_param,
    query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> CloudClient {
    CloudClient::new(
        &server.uri(),
        "us-east-1",
        Credentials::from_token("test-token", CredentialSource::Config),
    )
    .expect("client should build")
}

fn ctx(operation: &str) -> OperationContext {
    OperationContext::new(operation)
}

/// Test module for HTTP client behavior
mod http_client_tests {
    use super::*;

    /// Test successful GET sends auth, region and request id headers
    #[tokio::test]
    async fn test_get_success_returns_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sqs/queues"))
            .and(bearer_token("test-token"))
            .and(header("x-region", "us-east-1"))
            .and(header_exists("x-request-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "queues": [{"queueUrl": "q1", "queueName": "orders"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.service_url("sqs", "queues");
        let response = client.get(&ctx("get"), &url).await.unwrap();

        assert_eq!(response["queues"][0]["queueName"], "orders");
    }

    /// Test 404 with a namespaced error code is classified as not found
    #[tokio::test]
    async fn test_404_is_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/backup/backup-vaults/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "__type": "com.amazonaws.backup#ResourceNotFoundException",
                "message": "Vault missing does not exist"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.service_url("backup", "backup-vaults/missing");
        let err = client.get(&ctx("get"), &url).await.unwrap_err();

        assert!(is_not_found(&err));
        let api = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api.code.as_deref(), Some("ResourceNotFoundException"));
        assert_eq!(format_api_error(&err), "Resource not found.");
    }

    /// Test 403 is an ordinary failure with a readable message
    #[tokio::test]
    async fn test_403_returns_permission_denied() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ssm/parameters"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "code": "AccessDeniedException",
                "message": "not allowed"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.service_url("ssm", "parameters");
        let err = client.get(&ctx("get"), &url).await.unwrap_err();

        assert!(!is_not_found(&err));
        assert!(format_api_error(&err).starts_with("Permission denied"));
    }

    /// Test throttling errors are reported as rate limiting
    #[tokio::test]
    async fn test_throttling() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/route53/hostedzones"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "__type": "Throttling",
                "message": "Rate exceeded"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.service_url("route53", "hostedzones");
        let err = client.get(&ctx("get"), &url).await.unwrap_err();

        assert!(format_api_error(&err).starts_with("Rate limit exceeded"));
    }

    /// Test empty response bodies become null
    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.tags_url("sqs", "tags", "q1");
        let response = client
            .post(&ctx("tag"), &url, Some(&json!({"tags": {}})))
            .await
            .unwrap();

        assert!(response.is_null());
    }

    /// Test malformed JSON is an error, not an empty result
    #[tokio::test]
    async fn test_malformed_json_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sqs/queues"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let url = client.service_url("sqs", "queues");
        let err = client.get(&ctx("get"), &url).await.unwrap_err();

        assert!(err.to_string().contains("Failed to parse response JSON"));
    }
}

/// Test module for paginated lookups
mod pagination_tests {
    use super::*;

    async fn mount_pages(server: &MockServer, third_page_calls: u64) {
        Mock::given(method("GET"))
            .and(path("/elbv2/load-balancers"))
            .and(query_param_is_missing("nextToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadBalancers": [{"loadBalancerArn": "lb-1", "loadBalancerName": "web"}, null],
                "nextToken": "p2"
            })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/elbv2/load-balancers"))
            .and(query_param("nextToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadBalancers": [{"loadBalancerArn": "lb-2", "loadBalancerName": "api"}],
                "nextToken": "p3"
            })))
            .expect(1)
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/elbv2/load-balancers"))
            .and(query_param("nextToken", "p3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "loadBalancers": null,
                "nextToken": ""
            })))
            .expect(third_page_calls)
            .mount(server)
            .await;
    }

    /// Test lookup stops fetching once a match is found
    #[tokio::test]
    async fn test_find_stops_at_first_match() {
        let server = MockServer::start().await;
        mount_pages(&server, 0).await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let bound = registry.bind("aws_lb", &client).unwrap();

        let found = bound.find(&ctx("find"), "lb-2").await.unwrap();
        assert_eq!(found["loadBalancerName"], "api");
    }

    /// Test a lookup with no match visits every page, then reports not found
    #[tokio::test]
    async fn test_find_missing_visits_all_pages() {
        let server = MockServer::start().await;
        mount_pages(&server, 1).await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let bound = registry.bind("aws_lb", &client).unwrap();

        let err = bound.find(&ctx("find"), "lb-9").await.unwrap_err();
        assert!(is_not_found(&err));
    }

    /// Test listing skips null elements and stops on the empty cursor
    #[tokio::test]
    async fn test_list_collects_all_pages() {
        let server = MockServer::start().await;
        mount_pages(&server, 1).await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let items = registry
            .bind("aws_lb", &client)
            .unwrap()
            .list(&ctx("list"))
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["loadBalancerArn"], "lb-1");
        assert_eq!(items[1]["loadBalancerArn"], "lb-2");
    }

    /// Test a page error aborts the lookup
    #[tokio::test]
    async fn test_page_error_propagates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/elbv2/load-balancers"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "__type": "InternalFailure",
                "message": "boom"
            })))
            .mount(&server)
            .await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let err = registry
            .bind("aws_lb", &client)
            .unwrap()
            .find(&ctx("find"), "lb-1")
            .await
            .unwrap_err();

        assert!(!is_not_found(&err));
        assert_eq!(err.downcast_ref::<ApiError>().unwrap().status, 500);
    }

    /// Test a missing listing route fails instead of reading as "resource gone"
    #[tokio::test]
    async fn test_unrouted_list_is_fatal() {
        // No mocks mounted: every request gets a bare 404
        let server = MockServer::start().await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let bound = registry.bind("aws_lb", &client).unwrap();

        let err = bound.read(&ctx("read"), "web").await.unwrap_err();
        assert!(!is_not_found(&err));
        assert!(err.root_cause().downcast_ref::<RouteNotFoundError>().is_some());

        let manifest = Manifest::parse(
            "resources:\n  - type: aws_lb\n    id: web\n    tags: { team: edge }\n",
            &registry,
        )
        .unwrap();
        let reports = reconcile(
            &registry,
            &client,
            &ctx("apply"),
            &manifest,
            &ReconcileSettings::default(),
            Mode::Apply,
        )
        .await;

        assert!(reports[0].is_failure());
        match &reports[0].outcome {
            Outcome::Failed { error } => assert!(error.contains("listing route not found")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// Test describe maps the API's not-found and read turns it into None
    #[tokio::test]
    async fn test_describe_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/backup/backup-vaults/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "ResourceNotFoundException",
                "message": "gone"
            })))
            .mount(&server)
            .await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let bound = registry.bind("aws_backup_vault", &client).unwrap();

        let err = bound.describe(&ctx("describe"), "gone").await.unwrap_err();
        assert!(is_not_found(&err));
        assert!(bound.read(&ctx("read"), "gone").await.unwrap().is_none());
    }
}

/// Test module for tag reconciliation against the remote tag API
mod tagging_tests {
    use super::*;

    fn desired(pairs: &[(&str, &str)]) -> KeyValueTags {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// Test sync untags before tagging and never touches system tags
    #[tokio::test]
    async fn test_sync_untags_then_tags() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tags": {"env": "dev", "old": "1", "aws:cloudformation:stack-name": "s"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/sqs/tags/q1"))
            .and(query_param("tagKeys", "old"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/sqs/tags/q1"))
            .and(body_json(json!({"tags": {"env": "prod"}})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let bound = registry.bind("aws_sqs_queue", &client).unwrap();
        let tagger = bound.tagger().unwrap();

        let diff = sync_tags(
            &tagger,
            &ctx("sync"),
            "q1",
            &desired(&[("env", "prod")]),
            &ReservedKeys::system(),
        )
        .await
        .unwrap();
        assert_eq!(diff.change_count(), 2);

        let methods: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.method.to_string())
            .collect();
        assert_eq!(methods, vec!["GET", "DELETE", "POST"]);
    }

    /// Test a failed tag call after a successful untag is surfaced without rollback
    #[tokio::test]
    async fn test_partial_failure_keeps_untag() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tags": {"old": "1"}
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "__type": "InternalFailure",
                "message": "boom"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let tagger = registry
            .bind("aws_sqs_queue", &client)
            .unwrap()
            .tagger()
            .unwrap();

        let err = sync_tags(
            &tagger,
            &ctx("sync"),
            "q1",
            &desired(&[("env", "prod")]),
            &ReservedKeys::system(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "tagging resource (q1)");
        assert_eq!(err.root_cause().downcast_ref::<ApiError>().unwrap().status, 500);
    }

    /// Test apply over a manifest reports changed and missing entries in order
    #[tokio::test]
    async fn test_apply_manifest() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sqs/queues/q1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "queueUrl": "q1",
                "queueName": "orders"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sqs/queues/q2"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "__type": "AWS.SimpleQueueService.NonExistentQueue",
                "message": "no queue"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/sqs/tags/q1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tags": null})))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/sqs/tags/q1"))
            .and(body_json(json!({"tags": {"managed-by": "provkit", "team": "payments"}})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let registry = Registry::load().unwrap();
        let client = client_for(&server);
        let manifest = Manifest::parse(
            r#"
resources:
  - type: aws_sqs_queue
    id: q1
    tags: { team: payments }
  - type: aws_sqs_queue
    id: q2
    tags: { team: payments }
"#,
            &registry,
        )
        .unwrap();

        let mut settings = ReconcileSettings::default();
        settings
            .default_tags
            .insert("managed-by".to_string(), "provkit".to_string());

        let reports = reconcile(
            &registry,
            &client,
            &ctx("apply"),
            &manifest,
            &settings,
            Mode::Apply,
        )
        .await;

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, "q1");
        assert!(matches!(&reports[0].outcome, Outcome::Changed(diff) if diff.to_upsert.len() == 2));
        assert_eq!(reports[1].id, "q2");
        assert_eq!(reports[1].outcome, Outcome::Missing);
    }
}
