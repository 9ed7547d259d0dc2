//! Integration tests for the reasoning-graph recorder
//!
//! Covers the relational reference arm (round-trip through storage) and
//! the HTTP service arm (request shapes via wiremock).

use std::sync::Arc;

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use chatgraph::graph::{GraphRecorder, HttpRecorder, RelationalRecorder};
use chatgraph::storage::{EdgeRelation, NodeKind, SqliteStorage, Storage};

async fn relational_recorder() -> (SqliteStorage, RelationalRecorder) {
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    let shared: Arc<dyn Storage> = Arc::new(storage.clone());
    (storage, RelationalRecorder::new(shared))
}

#[cfg(test)]
mod relational_tests {
    use super::*;

    #[tokio::test]
    async fn test_recorded_turn_is_retrievable_verbatim() {
        let (storage, recorder) = relational_recorder().await;
        let conversation_id = storage.create_conversation(1, "turn").await.unwrap();

        let user = recorder
            .record_node(
                conversation_id,
                NodeKind::User,
                "the question",
                Some(json!({ "user_id": 1 })),
            )
            .await
            .unwrap();
        let retrieval = recorder
            .record_node(
                conversation_id,
                NodeKind::Retrieval,
                "a passage",
                Some(json!({ "source": "/uploads/a.txt" })),
            )
            .await
            .unwrap();
        let generation = recorder
            .record_node(conversation_id, NodeKind::Generation, "the answer", None)
            .await
            .unwrap();

        recorder
            .record_edge(conversation_id, user, generation, EdgeRelation::AskedFor, None)
            .await
            .unwrap();
        recorder
            .record_edge(conversation_id, user, retrieval, EdgeRelation::Retrieved, None)
            .await
            .unwrap();
        recorder
            .record_edge(
                conversation_id,
                retrieval,
                generation,
                EdgeRelation::Informed,
                None,
            )
            .await
            .unwrap();

        let graph = recorder.get_graph(conversation_id).await.unwrap();

        let contents: Vec<_> = graph.nodes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["the question", "a passage", "the answer"]);

        let relations: Vec<_> = graph.edges.iter().map(|e| e.relation).collect();
        assert_eq!(
            relations,
            vec![
                EdgeRelation::AskedFor,
                EdgeRelation::Retrieved,
                EdgeRelation::Informed
            ]
        );
        assert!(graph.edges.iter().all(|e| e.conversation_id == conversation_id));
    }

    #[tokio::test]
    async fn test_unknown_conversation_yields_empty_graph() {
        let (_storage, recorder) = relational_recorder().await;
        let graph = recorder.get_graph(404).await.unwrap();
        assert!(graph.is_empty());
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;

    #[tokio::test]
    async fn test_record_node_posts_to_service() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/graphs/5/nodes"))
            .and(body_partial_json(json!({
                "kind": "retrieval",
                "content": "a passage"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 31 })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let recorder = HttpRecorder::new(&mock_server.uri()).unwrap();
        let id = recorder
            .record_node(5, NodeKind::Retrieval, "a passage", None)
            .await
            .unwrap();
        assert_eq!(id, 31);
    }

    #[tokio::test]
    async fn test_record_edge_posts_to_service() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/graphs/5/edges"))
            .and(body_partial_json(json!({
                "from_node": 31,
                "to_node": 32,
                "relation": "informed"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let recorder = HttpRecorder::new(&mock_server.uri()).unwrap();
        let id = recorder
            .record_edge(5, 31, 32, EdgeRelation::Informed, None)
            .await
            .unwrap();
        assert_eq!(id, 7);
    }

    #[tokio::test]
    async fn test_get_graph_parses_service_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/graphs/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "nodes": [
                    {
                        "id": 1,
                        "conversation_id": 5,
                        "kind": "user",
                        "content": "the question",
                        "metadata": null,
                        "created_at": "2026-01-01T00:00:00Z"
                    }
                ],
                "edges": []
            })))
            .mount(&mock_server)
            .await;

        let recorder = HttpRecorder::new(&mock_server.uri()).unwrap();
        let graph = recorder.get_graph(5).await.unwrap();

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].kind, NodeKind::User);
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_get_graph_missing_is_empty() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/graphs/99"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let recorder = HttpRecorder::new(&mock_server.uri()).unwrap();
        let graph = recorder.get_graph(99).await.unwrap();
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_service_error_propagates() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/graphs/5/nodes"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        let recorder = HttpRecorder::new(&mock_server.uri()).unwrap();
        let result = recorder.record_node(5, NodeKind::User, "x", None).await;
        assert!(result.is_err());
    }
}
