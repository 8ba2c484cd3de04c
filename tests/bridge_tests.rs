//! HTTP-level tests for the tool bridge, against a mock backend server.

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voicebridge::{Error, ToolBridge, ToolCallRequest};

fn catalog_body() -> serde_json::Value {
    json!([
        {
            "name": "store.search",
            "description": "Search the store inventory",
            "input_schema": {"type": "object", "properties": {"q": {"type": "string"}}}
        },
        {
            "name": "cart.add",
            "description": "Add an item to the cart",
            "input_schema": {"type": "object"}
        }
    ])
}

#[tokio::test]
async fn load_catalog_sanitizes_dotted_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri()).unwrap();
    let tools = bridge.load_catalog().await.unwrap();

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "store_search");
    assert_eq!(tools[1].name, "cart_add");
    assert_eq!(bridge.resolve("store_search"), "store.search");
}

#[tokio::test]
async fn invoke_dispatches_under_original_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/mcp/tools"))
        .and(body_json(json!({
            "tool": "store.search",
            "params": {"q": "milk"},
            "request_id": "call_1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": ["milk"]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri()).unwrap();
    bridge.load_catalog().await.unwrap();

    let result = bridge
        .invoke(ToolCallRequest {
            name: "store_search".to_string(),
            args: Some(json!({"q": "milk"})),
            call_id: "call_1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.call_id, "call_1");
    assert_eq!(result.data, json!({"items": ["milk"]}));
}

#[tokio::test]
async fn invoke_defaults_missing_args_to_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp/tools"))
        .and(body_json(json!({
            "tool": "ping",
            "params": {},
            "request_id": "call_2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": true})))
        .expect(1)
        .mount(&server)
        .await;

    let bridge = ToolBridge::new(&server.uri()).unwrap();
    let result = bridge
        .invoke(ToolCallRequest {
            name: "ping".to_string(),
            args: None,
            call_id: "call_2".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(result.data, json!({"pong": true}));
}

#[tokio::test]
async fn invoke_error_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such tool"))
        .mount(&server)
        .await;

    let bridge = ToolBridge::new(&server.uri()).unwrap();
    let err = bridge
        .invoke(ToolCallRequest {
            name: "missing_tool".to_string(),
            args: None,
            call_id: "call_3".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        Error::ToolInvocation { status, ref body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such tool");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("404"), "{message}");
    assert!(message.contains("no such tool"), "{message}");
}

#[tokio::test]
async fn invoke_tolerates_non_json_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let bridge = ToolBridge::new(&server.uri()).unwrap();
    let result = bridge
        .invoke(ToolCallRequest {
            name: "noop".to_string(),
            args: None,
            call_id: "call_4".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(result.data, json!({}));
}

#[tokio::test]
async fn load_catalog_rejects_non_array_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri()).unwrap();
    let err = bridge.load_catalog().await.unwrap_err();
    assert!(matches!(err, Error::CatalogLoad(_)));
}

#[tokio::test]
async fn load_catalog_surfaces_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri()).unwrap();
    let err = bridge.load_catalog().await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("503"), "{message}");
    assert!(message.contains("backend down"), "{message}");
}

#[tokio::test]
async fn load_catalog_skips_incomplete_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mcp/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "broken.tool", "description": "missing schema"},
            {"name": "good.tool", "description": "ok", "input_schema": {}}
        ])))
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri()).unwrap();
    let tools = bridge.load_catalog().await.unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "good_tool");
}

#[tokio::test]
async fn custom_paths_are_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut bridge = ToolBridge::new(&server.uri())
        .unwrap()
        .with_paths("api/list", "api/exec");
    let tools = bridge.load_catalog().await.unwrap();
    assert!(tools.is_empty());
}
