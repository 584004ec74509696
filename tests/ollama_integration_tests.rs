//! Ollama Integration Tests with Mocked Network Responses
//!
//! These tests use wiremock to mock the Ollama API server and validate:
//! - Request shape (history, tools, temperature)
//! - Tool call parsing
//! - Error handling
//! - A full research run driven over HTTP

use mosaic::llm::{ConversationMessage, LLMClient, Provider};
use mosaic::research::ResearchOrchestrator;
use mosaic::types::{AppError, ToolCall, ToolDefinition};
use mosaic::{MosaicConfig, ToolCatalog, ToolSourceConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

/// Create a mock Ollama chat completion response
fn mock_chat_response(content: &str) -> Value {
    json!({
        "model": "qwen3:30b-a3b",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {
            "role": "assistant",
            "content": content
        },
        "done": true,
        "done_reason": "stop"
    })
}

/// Create a mock Ollama response with tool calls
fn mock_chat_response_with_tools(tool_calls: Vec<(&str, Value)>) -> Value {
    let formatted_tools: Vec<Value> = tool_calls
        .into_iter()
        .map(|(name, args)| {
            json!({
                "function": {
                    "name": name,
                    "arguments": args
                }
            })
        })
        .collect();

    json!({
        "model": "qwen3:30b-a3b",
        "created_at": "2024-01-01T00:00:00Z",
        "message": {
            "role": "assistant",
            "content": "",
            "tool_calls": formatted_tools
        },
        "done": true
    })
}

fn client_for(server: &MockServer, temperature: f32) -> Box<dyn LLMClient> {
    Provider::Ollama {
        base_url: server.uri(),
        model: "qwen3:30b-a3b".to_string(),
        temperature,
        timeout: Duration::from_secs(5),
    }
    .create_client()
    .unwrap()
}

fn search_tool() -> ToolDefinition {
    ToolDefinition {
        name: "search_jira_issues".to_string(),
        description: "Search JIRA issues".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        }),
    }
}

// ============= Decision Tests =============

#[tokio::test]
async fn test_text_decision() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "qwen3:30b-a3b",
            "stream": false,
            "options": {"temperature": 0.5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response("Hello")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0.5);
    let response = client
        .generate_with_tools_and_history(&[ConversationMessage::user("Hi")], &[])
        .await
        .unwrap();

    assert_eq!(response.content, "Hello");
    assert!(response.tool_calls.is_empty());
    assert_eq!(response.finish_reason, "stop");
}

#[tokio::test]
async fn test_tool_call_decision() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "tools": [{"type": "function", "function": {"name": "search_jira_issues"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response_with_tools(
            vec![
                ("search_jira_issues", json!({"query": "VIT-60872"})),
                ("search_jira_issues", json!("{\"query\": \"MTV2005\"}")),
            ],
        )))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0.2);
    let response = client
        .generate_with_tools_and_history(
            &[ConversationMessage::user("Summarize VIT-60872")],
            &[search_tool()],
        )
        .await
        .unwrap();

    assert_eq!(response.finish_reason, "tool_calls");
    assert_eq!(response.tool_calls.len(), 2);
    assert_eq!(response.tool_calls[0].arguments, json!({"query": "VIT-60872"}));
    assert_eq!(response.tool_calls[1].arguments, json!({"query": "MTV2005"}));
    assert_ne!(response.tool_calls[0].id, response.tool_calls[1].id);
}

#[tokio::test]
async fn test_history_with_tool_results_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "You research."},
                {"role": "user", "content": "Summarize VIT-60872"},
                {"role": "assistant", "tool_calls": [{"function": {"name": "search_jira_issues"}}]},
                {"role": "tool", "tool_name": "search_jira_issues", "content": "{\"total\":0}"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response("No hits")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let call = ToolCall::new("search_jira_issues", json!({"query": "VIT-60872"}));
    let history = vec![
        ConversationMessage::system("You research."),
        ConversationMessage::user("Summarize VIT-60872"),
        ConversationMessage::assistant("", vec![call.clone()]),
        ConversationMessage::tool_result(&call.id, &call.name, &json!({"total": 0})),
    ];

    let client = client_for(&mock_server, 0.2);
    let response = client
        .generate_with_tools_and_history(&history, &[search_tool()])
        .await
        .unwrap();

    assert_eq!(response.content, "No hits");
}

// ============= Error Handling Tests =============

#[tokio::test]
async fn test_server_error_is_llm_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0.1);
    let result = client
        .generate_with_tools_and_history(&[ConversationMessage::user("Hi")], &[])
        .await;

    match result {
        Err(AppError::LLM(message)) => assert!(message.contains("model not loaded")),
        other => panic!("expected LLM error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn test_malformed_body_is_llm_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 0.1);
    let result = client
        .generate_with_tools_and_history(&[ConversationMessage::user("Hi")], &[])
        .await;

    assert!(matches!(result, Err(AppError::LLM(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_llm_error() {
    let client = Provider::Ollama {
        base_url: "http://127.0.0.1:1".to_string(),
        model: "qwen3:30b-a3b".to_string(),
        temperature: 0.1,
        timeout: Duration::from_secs(2),
    }
    .create_client()
    .unwrap();

    let result = client
        .generate_with_tools_and_history(&[ConversationMessage::user("Hi")], &[])
        .await;

    assert!(matches!(result, Err(AppError::LLM(_))));
}

// ============= Orchestrator over HTTP =============

#[tokio::test]
async fn test_run_from_config_against_mock_server() {
    let mock_server = MockServer::start().await;

    // The supervisor answers without tools, which ends the run.
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "qwen3:30b-a3b", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(mock_chat_response(
            "I cannot research this.",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = MosaicConfig::default();
    config.ollama.base_url = mock_server.uri();

    let orchestrator =
        ResearchOrchestrator::from_config(&config, Arc::new(ToolCatalog::empty())).unwrap();
    let outcome = orchestrator
        .run("Summarize VIT-60872", &ToolSourceConfig::default(), false)
        .await
        .unwrap();

    assert!(outcome.final_report.is_empty());
    assert!(!outcome.report_complete);
    assert_eq!(outcome.supervisor_iterations, 1);
    assert_eq!(outcome.delegation_rounds, 0);
}
