//! Wire-level tests for the OpenAI-compatible scheduling backend.
//!
//! A local mock server stands in for the provider, so every branch of the
//! response handling is exercised without network access: the function-call
//! success path, non-2xx statuses, replies with no function call, and
//! schema-mismatched arguments.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chrono::NaiveDate;
use tempora_ai::{OpenAiBackend, OpenAiConfig, OptimizeRequest, SchedulePreferences, SchedulingBackend, TaskInput};
use tempora_core::{Error, TaskPriority};
use uuid::Uuid;

fn backend_for(server: &MockServer) -> OpenAiBackend {
    OpenAiBackend::new(OpenAiConfig {
        base_url: server.uri(),
        api_key: Some("test-key".to_string()),
        timeout_seconds: 5,
        ..OpenAiConfig::default()
    })
    .unwrap()
}

fn request() -> OptimizeRequest {
    OptimizeRequest {
        target_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        tasks: vec![TaskInput {
            id: Uuid::new_v4(),
            title: "Prepare slides".to_string(),
            description: None,
            duration_minutes: 60,
            priority: TaskPriority::High,
            preferred_time: None,
            deadline: None,
            category: None,
            location: None,
            keywords: vec![],
        }],
        preferences: SchedulePreferences::default(),
    }
}

fn function_call_reply(arguments: serde_json::Value) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": null,
                "function_call": {
                    "name": "propose_schedule",
                    "arguments": arguments.to_string()
                }
            },
            "finish_reason": "function_call"
        }],
        "usage": { "prompt_tokens": 321, "completion_tokens": 123, "total_tokens": 444 }
    })
}

#[tokio::test]
async fn success_path_reads_function_call_arguments() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "function_call": { "name": "propose_schedule" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(function_call_reply(json!({
            "date": "2024-06-01",
            "schedule_slots": [{
                "title": "Prepare slides",
                "start_time": "09:00",
                "end_time": "10:00",
                "duration_minutes": 60,
                "priority": "high",
                "reminder_minutes_before": 10
            }],
            "optimization_summary": "Morning focus block",
            "conflicts": []
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let outcome = backend.optimize_schedule(&request()).await.unwrap();

    assert_eq!(outcome.schedule.schedule_slots.len(), 1);
    assert_eq!(outcome.schedule.schedule_slots[0].title, "Prepare slides");
    assert_eq!(outcome.prompt_tokens, 321);
    assert_eq!(outcome.completion_tokens, 123);
    assert_eq!(outcome.model, "gpt-4o-mini");
}

#[tokio::test]
async fn non_2xx_status_is_an_external_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": { "message": "model overloaded", "type": "server_error" }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.optimize_schedule(&request()).await.unwrap_err();

    match err {
        Error::ExternalService(message) => {
            assert!(message.contains("503"));
            assert!(message.contains("model overloaded"));
        }
        other => panic!("expected ExternalService, got {other:?}"),
    }
}

#[tokio::test]
async fn reply_without_function_call_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Here is your schedule..." },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 20 }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.optimize_schedule(&request()).await.unwrap_err();

    assert!(matches!(err, Error::ExternalService(_)));
}

#[tokio::test]
async fn schema_mismatched_arguments_are_rejected() {
    let server = MockServer::start().await;

    // arguments decode as JSON but lack the required schedule_slots array
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(function_call_reply(json!({
            "date": "2024-06-01",
            "summary": "wrong shape"
        }))))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.optimize_schedule(&request()).await.unwrap_err();

    match err {
        Error::ExternalService(message) => {
            assert!(message.contains("schema"), "unexpected message: {message}")
        }
        other => panic!("expected ExternalService, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_usage_defaults_to_zero_tokens() {
    let server = MockServer::start().await;

    let mut reply = function_call_reply(json!({
        "date": "2024-06-01",
        "schedule_slots": []
    }));
    reply.as_object_mut().unwrap().remove("usage");

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let outcome = backend.optimize_schedule(&request()).await.unwrap();

    assert_eq!(outcome.prompt_tokens, 0);
    assert_eq!(outcome.completion_tokens, 0);
}
