//! Tool catalogue and dispatch from tool name + JSON arguments to manager operations.

use mem_graph::KnowledgeGraphManager;
use mem_types::{
    Entity, FileStore, GraphError, ObservationDeletion, ObservationUpdate, Relation,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub const CREATE_ENTITIES: &str = "create_entities";
pub const CREATE_RELATIONS: &str = "create_relations";
pub const ADD_OBSERVATIONS: &str = "add_observations";
pub const DELETE_ENTITIES: &str = "delete_entities";
pub const DELETE_OBSERVATIONS: &str = "delete_observations";
pub const DELETE_RELATIONS: &str = "delete_relations";
pub const READ_GRAPH: &str = "read_graph";
pub const SEARCH_NODES: &str = "search_nodes";
pub const OPEN_NODES: &str = "open_nodes";

#[derive(Debug, Deserialize)]
struct CreateEntitiesArgs {
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct RelationsArgs {
    relations: Vec<Relation>,
}

#[derive(Debug, Deserialize)]
struct AddObservationsArgs {
    observations: Vec<ObservationUpdate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteEntitiesArgs {
    entity_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteObservationsArgs {
    deletions: Vec<ObservationDeletion>,
}

#[derive(Debug, Deserialize)]
struct SearchNodesArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct OpenNodesArgs {
    names: Vec<String>,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, GraphError> {
    serde_json::from_value(arguments)
        .map_err(|e| GraphError::validation(format!("invalid arguments for {tool}: {e}")))
}

/// Run tool `name` against `manager`. Argument shape errors surface as
/// `GraphError::Validation` before the store is touched.
pub async fn dispatch<S: FileStore>(
    manager: &KnowledgeGraphManager<S>,
    name: &str,
    arguments: Value,
) -> Result<Value, GraphError> {
    tracing::debug!(tool = name, "dispatching tool call");
    match name {
        CREATE_ENTITIES => {
            let args: CreateEntitiesArgs = parse_args(name, arguments)?;
            Ok(serde_json::to_value(manager.create_entities(args.entities).await?)?)
        }
        CREATE_RELATIONS => {
            let args: RelationsArgs = parse_args(name, arguments)?;
            Ok(serde_json::to_value(manager.create_relations(args.relations).await?)?)
        }
        ADD_OBSERVATIONS => {
            let args: AddObservationsArgs = parse_args(name, arguments)?;
            Ok(serde_json::to_value(manager.add_observations(args.observations).await?)?)
        }
        DELETE_ENTITIES => {
            let args: DeleteEntitiesArgs = parse_args(name, arguments)?;
            manager.delete_entities(&args.entity_names).await?;
            Ok(Value::String("Entities deleted successfully".to_string()))
        }
        DELETE_OBSERVATIONS => {
            let args: DeleteObservationsArgs = parse_args(name, arguments)?;
            manager.delete_observations(&args.deletions).await?;
            Ok(Value::String("Observations deleted successfully".to_string()))
        }
        DELETE_RELATIONS => {
            let args: RelationsArgs = parse_args(name, arguments)?;
            manager.delete_relations(&args.relations).await?;
            Ok(Value::String("Relations deleted successfully".to_string()))
        }
        READ_GRAPH => Ok(serde_json::to_value(manager.read_graph().await?)?),
        SEARCH_NODES => {
            let args: SearchNodesArgs = parse_args(name, arguments)?;
            Ok(serde_json::to_value(manager.search_nodes(&args.query).await?)?)
        }
        OPEN_NODES => {
            let args: OpenNodesArgs = parse_args(name, arguments)?;
            Ok(serde_json::to_value(manager.open_nodes(&args.names).await?)?)
        }
        other => Err(GraphError::validation(format!("Unknown tool: {other}"))),
    }
}

fn entity_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string", "description": "Unique name of the entity" },
            "entityType": { "type": "string", "description": "Type tag of the entity" },
            "observations": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Facts about the entity"
            }
        },
        "required": ["name", "entityType", "observations"]
    })
}

fn relation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "from": { "type": "string", "description": "Name of the source entity" },
            "to": { "type": "string", "description": "Name of the target entity" },
            "relationType": { "type": "string", "description": "Type of the relation, in active voice" }
        },
        "required": ["from", "to", "relationType"]
    })
}

fn string_array(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": { "type": "object", "properties": properties, "required": required }
    })
}

fn observation_batch_schema(list_field: &str, entity_hint: &str, list_hint: &str) -> Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "entityName".to_string(),
        json!({ "type": "string", "description": entity_hint }),
    );
    properties.insert(list_field.to_string(), string_array(list_hint));
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": properties,
            "required": ["entityName", list_field]
        }
    })
}

/// Name, description, and JSON input schema of every tool.
pub fn tool_definitions() -> Value {
    Value::Array(vec![
        tool(
            CREATE_ENTITIES,
            "Create entities in the knowledge graph. Names that already exist are skipped.",
            json!({ "entities": { "type": "array", "items": entity_schema() } }),
            &["entities"],
        ),
        tool(
            CREATE_RELATIONS,
            "Create relations between existing entities. Fails if any endpoint is missing.",
            json!({ "relations": { "type": "array", "items": relation_schema() } }),
            &["relations"],
        ),
        tool(
            ADD_OBSERVATIONS,
            "Append observations to existing entities, skipping blanks and duplicates.",
            json!({
                "observations": observation_batch_schema("contents", "Entity to add to", "Observations to add")
            }),
            &["observations"],
        ),
        tool(
            DELETE_ENTITIES,
            "Delete entities and every relation touching them. All names must exist.",
            json!({ "entityNames": string_array("Names of entities to delete") }),
            &["entityNames"],
        ),
        tool(
            DELETE_OBSERVATIONS,
            "Remove specific observations from entities.",
            json!({
                "deletions": observation_batch_schema("observations", "Entity to remove from", "Observations to remove")
            }),
            &["deletions"],
        ),
        tool(
            DELETE_RELATIONS,
            "Delete relations by exact (from, to, relationType) match.",
            json!({ "relations": { "type": "array", "items": relation_schema() } }),
            &["relations"],
        ),
        tool(READ_GRAPH, "Read the entire knowledge graph.", json!({}), &[]),
        tool(
            SEARCH_NODES,
            "Case-insensitive substring search over entity names, types, and observations.",
            json!({ "query": { "type": "string", "description": "Text to search for" } }),
            &["query"],
        ),
        tool(
            OPEN_NODES,
            "Fetch entities by name together with the relations between them.",
            json!({ "names": string_array("Names of entities to open") }),
            &["names"],
        ),
    ])
}
