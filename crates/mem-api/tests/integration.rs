//! Integration tests: tool dispatch and the MCP stdio server over an in-memory store.

use mem_api::protocol::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use mem_api::server;
use mem_api::tools::{self, dispatch};
use mem_graph::{GraphError, KnowledgeGraphManager};
use mem_store::InMemoryFileStore;
use serde_json::{json, Value};
use std::path::Path;

const PATH: &str = "/srv/memory.json";

fn test_manager() -> KnowledgeGraphManager<InMemoryFileStore> {
    KnowledgeGraphManager::new(PATH, InMemoryFileStore::new())
}

async fn seed(m: &KnowledgeGraphManager<InMemoryFileStore>) {
    dispatch(
        m,
        tools::CREATE_ENTITIES,
        json!({ "entities": [
            { "name": "Alice", "entityType": "person", "observations": ["Writes Rust"] },
            { "name": "Bob", "entityType": "person", "observations": [] },
            { "name": "Paris", "entityType": "city", "observations": ["capital of France"] }
        ]}),
    )
    .await
    .unwrap();
    dispatch(
        m,
        tools::CREATE_RELATIONS,
        json!({ "relations": [
            { "from": "Alice", "to": "Bob", "relationType": "knows" },
            { "from": "Bob", "to": "Paris", "relationType": "lives_in" }
        ]}),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn create_then_read_graph() {
    let m = test_manager();
    seed(&m).await;

    let graph = dispatch(&m, tools::READ_GRAPH, json!({})).await.unwrap();
    assert_eq!(graph["entities"].as_array().unwrap().len(), 3);
    assert_eq!(graph["relations"][1]["relationType"], "lives_in");
    assert_eq!(graph["entities"][0]["entityType"], "person");
}

#[tokio::test]
async fn create_entities_returns_only_new_ones() {
    let m = test_manager();
    seed(&m).await;
    let created = dispatch(
        &m,
        tools::CREATE_ENTITIES,
        json!({ "entities": [
            { "name": "Alice", "entityType": "person", "observations": [] },
            { "name": "Carol", "entityType": "person", "observations": [] }
        ]}),
    )
    .await
    .unwrap();
    assert_eq!(
        created,
        json!([{ "name": "Carol", "entityType": "person", "observations": [] }])
    );
}

#[tokio::test]
async fn add_observations_reports_what_was_added() {
    let m = test_manager();
    seed(&m).await;
    let result = dispatch(
        &m,
        tools::ADD_OBSERVATIONS,
        json!({ "observations": [
            { "entityName": "Alice", "contents": ["Writes Rust", "Drinks tea", ""] }
        ]}),
    )
    .await
    .unwrap();
    assert_eq!(
        result,
        json!([{ "entityName": "Alice", "addedObservations": ["Drinks tea"] }])
    );
}

#[tokio::test]
async fn delete_tools_answer_with_confirmation() {
    let m = test_manager();
    seed(&m).await;

    let msg = dispatch(
        &m,
        tools::DELETE_OBSERVATIONS,
        json!({ "deletions": [{ "entityName": "Paris", "observations": ["capital of France"] }] }),
    )
    .await
    .unwrap();
    assert_eq!(msg, json!("Observations deleted successfully"));

    let msg = dispatch(
        &m,
        tools::DELETE_RELATIONS,
        json!({ "relations": [{ "from": "Alice", "to": "Bob", "relationType": "knows" }] }),
    )
    .await
    .unwrap();
    assert_eq!(msg, json!("Relations deleted successfully"));

    let msg = dispatch(&m, tools::DELETE_ENTITIES, json!({ "entityNames": ["Paris"] }))
        .await
        .unwrap();
    assert_eq!(msg, json!("Entities deleted successfully"));

    let graph = m.read_graph().await.unwrap();
    assert_eq!(graph.entities.len(), 2);
    assert!(graph.relations.is_empty());
}

#[tokio::test]
async fn search_and_open_apply_endpoint_closure() {
    let m = test_manager();
    seed(&m).await;

    let found = dispatch(&m, tools::SEARCH_NODES, json!({ "query": "PERSON" }))
        .await
        .unwrap();
    assert_eq!(found["entities"].as_array().unwrap().len(), 2);
    assert_eq!(
        found["relations"],
        json!([{ "from": "Alice", "to": "Bob", "relationType": "knows" }])
    );

    let opened = dispatch(&m, tools::OPEN_NODES, json!({ "names": ["Paris", "Bob"] }))
        .await
        .unwrap();
    assert_eq!(opened["entities"][0]["name"], "Bob");
    assert_eq!(opened["relations"][0]["relationType"], "lives_in");
}

#[tokio::test]
async fn shape_errors_are_validation_errors_without_io() {
    let m = test_manager();
    let cases = [
        (tools::SEARCH_NODES, json!({ "query": 42 })),
        (tools::OPEN_NODES, json!({ "names": "Alice" })),
        (tools::DELETE_ENTITIES, json!({})),
        (
            tools::ADD_OBSERVATIONS,
            json!({ "observations": [{ "entityName": "A", "contents": "x" }] }),
        ),
        (tools::CREATE_ENTITIES, Value::Null),
    ];
    for (tool, args) in cases {
        let err = dispatch(&m, tool, args).await.unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)), "{tool}: {err}");
    }
    assert_eq!(m.store().read_count(), 0);
}

#[tokio::test]
async fn missing_relation_endpoint_leaves_store_unchanged() {
    let m = test_manager();
    seed(&m).await;
    let before = m.store().get(Path::new(PATH)).await;

    let err = dispatch(
        &m,
        tools::CREATE_RELATIONS,
        json!({ "relations": [{ "from": "Alice", "to": "Zed", "relationType": "knows" }] }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "ENTITY_NOT_FOUND");
    assert_eq!(err.to_string(), "Entity Zed not found");
    assert_eq!(m.store().get(Path::new(PATH)).await, before);
}

#[tokio::test]
async fn unknown_tool_is_rejected() {
    let m = test_manager();
    let err = dispatch(&m, "drop_everything", json!({})).await.unwrap_err();
    assert!(err.to_string().contains("Unknown tool: drop_everything"));
}

#[test]
fn catalogue_lists_every_tool_with_schema() {
    let defs = tools::tool_definitions();
    let names: Vec<&str> = defs
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "create_entities",
            "create_relations",
            "add_observations",
            "delete_entities",
            "delete_observations",
            "delete_relations",
            "read_graph",
            "search_nodes",
            "open_nodes"
        ]
    );
    for def in defs.as_array().unwrap() {
        assert_eq!(def["inputSchema"]["type"], "object");
    }
}

async fn run(m: &KnowledgeGraphManager<InMemoryFileStore>, messages: &[String]) -> Vec<Value> {
    let input = messages.join("\n");
    let mut output: Vec<u8> = Vec::new();
    server::serve(m, input.as_bytes(), &mut output).await.unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn call(id: i64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
    .to_string()
}

#[tokio::test]
async fn handshake_and_tool_listing() {
    let m = test_manager();
    let responses = run(
        &m,
        &[
            json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {
                "protocolVersion": "2024-11-05", "capabilities": {},
                "clientInfo": { "name": "client", "version": "1" }
            }})
            .to_string(),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string(),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "ping" }).to_string(),
        ],
    )
    .await;

    // The notification is not answered.
    assert_eq!(responses.len(), 3);
    let init = &responses[0]["result"];
    assert_eq!(responses[0]["id"], 0);
    assert_eq!(init["protocolVersion"], "2024-11-05");
    assert_eq!(init["serverInfo"]["name"], "memory-server");
    assert!(init["capabilities"]["tools"].is_object());

    assert_eq!(responses[1]["jsonrpc"], "2.0");
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 9);
    assert_eq!(responses[2]["result"], json!({}));
    assert_eq!(m.store().read_count(), 0);
}

#[tokio::test]
async fn tool_calls_answer_with_text_content() {
    let m = test_manager();
    let responses = run(
        &m,
        &[
            call(1, "create_entities", json!({ "entities": [
                { "name": "A", "entityType": "t", "observations": [] }
            ]})),
            String::new(),
            call(2, "open_nodes", json!({ "names": ["Nope"] })),
            call(3, "delete_entities", json!({ "entityNames": ["A"] })),
            json!({ "jsonrpc": "2.0", "id": 4, "method": "tools/call",
                    "params": { "name": "read_graph" } })
            .to_string(),
        ],
    )
    .await;
    assert_eq!(responses.len(), 4);

    let content = &responses[0]["result"]["content"][0];
    assert_eq!(content["type"], "text");
    let created: Value = serde_json::from_str(content["text"].as_str().unwrap()).unwrap();
    assert_eq!(created[0]["name"], "A");
    assert!(responses[0]["result"].get("isError").is_none());

    let failed = &responses[1]["result"];
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(failed["isError"], true);
    assert_eq!(
        failed["content"][0]["text"],
        "ENTITY_NOT_FOUND: Entity Nope not found"
    );

    let text = responses[2]["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(
        serde_json::from_str::<Value>(text).unwrap(),
        json!("Entities deleted successfully")
    );

    let text = responses[3]["result"]["content"][0]["text"].as_str().unwrap();
    let graph: Value = serde_json::from_str(text).unwrap();
    assert_eq!(graph, json!({ "entities": [], "relations": [] }));
}

#[tokio::test]
async fn protocol_errors_keep_the_loop_running() {
    let m = test_manager();
    let responses = run(
        &m,
        &[
            "{ this is not json".to_string(),
            json!({ "id": 7, "params": {} }).to_string(),
            json!({ "jsonrpc": "2.0", "id": 8, "method": "resources/list" }).to_string(),
            json!({ "jsonrpc": "2.0", "id": 9, "method": "tools/call" }).to_string(),
            json!({ "jsonrpc": "2.0", "id": 10, "method": "tools/call", "params": { "arguments": {} } })
                .to_string(),
            call(11, "drop_everything", json!({})),
        ],
    )
    .await;
    assert_eq!(responses.len(), 6);

    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
    assert_eq!(responses[1]["id"], 7);
    assert_eq!(responses[1]["error"]["code"], INVALID_REQUEST);
    assert_eq!(responses[2]["error"]["code"], METHOD_NOT_FOUND);
    assert_eq!(responses[3]["error"]["code"], INVALID_PARAMS);
    assert_eq!(responses[4]["error"]["code"], INVALID_PARAMS);

    let unknown = &responses[5]["result"];
    assert_eq!(unknown["isError"], true);
    assert!(unknown["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("VALIDATION_ERROR"));
}
