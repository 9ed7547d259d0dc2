//! Integration tests for the chat orchestrator
//!
//! Exercises the full query flow against in-memory storage, the relational
//! graph recorder, and mocked model/retrieval services. The central
//! contract under test: the orchestrator always returns a well-formed
//! reply, and each side-effecting step degrades independently.

use std::sync::Arc;

use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use chatgraph::chat::ChatOrchestrator;
use chatgraph::config::{ModelBackendKind, ModelConfig, RetrievalConfig};
use chatgraph::graph::RelationalRecorder;
use chatgraph::model::{GenerationBackend, GenerationStatus, LocalBackend, FALLBACK_ANSWER};
use chatgraph::retrieval::Retriever;
use chatgraph::storage::{EdgeRelation, NodeKind, Sender, SqliteStorage, Storage};

fn local_model() -> GenerationBackend {
    GenerationBackend::Local(LocalBackend::new())
}

fn remote_model(base_url: &str) -> GenerationBackend {
    let config = ModelConfig {
        backend: ModelBackendKind::Remote,
        base_url: base_url.to_string(),
        model: "llama2".to_string(),
        timeout_ms: 2000,
    };
    GenerationBackend::from_config(&config).unwrap()
}

fn retriever_for(base_url: &str) -> Retriever {
    Retriever::new(&RetrievalConfig {
        vector_url: base_url.to_string(),
        embeddings_url: base_url.to_string(),
        ..RetrievalConfig::default()
    })
    .unwrap()
}

/// Build an orchestrator over fresh in-memory storage.
async fn orchestrator_with(
    model: GenerationBackend,
    retriever: Option<Retriever>,
) -> (SqliteStorage, ChatOrchestrator) {
    let storage = SqliteStorage::new_in_memory().await.unwrap();
    let shared: Arc<dyn Storage> = Arc::new(storage.clone());
    let recorder = Arc::new(RelationalRecorder::new(shared.clone()));
    let orchestrator = ChatOrchestrator::new(shared, model, retriever, recorder);
    (storage, orchestrator)
}

/// Mount embeddings + vector search mocks returning the given passages.
async fn mount_retrieval(server: &MockServer, passages: &[(&str, &str)]) {
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": [1.0, 0.0] })))
        .mount(server)
        .await;

    let result: Vec<_> = passages
        .iter()
        .enumerate()
        .map(|(i, (text, source))| {
            json!({
                "id": format!("p{}", i),
                "score": 0.9 - 0.1 * i as f32,
                "payload": { "text": text, "source": source },
                "vector": [1.0, 0.001 * i as f32]
            })
        })
        .collect();

    Mock::given(method("POST"))
        .and(path("/collections/docs/points/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": result })))
        .mount(server)
        .await;
}

#[cfg(test)]
mod reply_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_text_rejected_before_any_backend() {
        let (_storage, orchestrator) = orchestrator_with(local_model(), None).await;

        assert!(orchestrator.handle_query(1, "", None).await.is_err());
        assert!(orchestrator.handle_query(1, "   ", None).await.is_err());
    }

    #[tokio::test]
    async fn test_reply_without_retrieval() {
        let (_storage, orchestrator) = orchestrator_with(local_model(), None).await;

        let reply = orchestrator
            .handle_query(1, "what is chunking?", None)
            .await
            .unwrap();

        assert_eq!(reply.answer, "[echo] what is chunking?");
        assert_eq!(reply.status, GenerationStatus::Ok);
        assert!(reply.sources.is_empty());
        assert!(reply.conversation_id.is_some());
    }

    #[tokio::test]
    async fn test_answer_present_when_every_dependency_is_down() {
        // Model and retriever point at a closed port; storage pool closed.
        let (storage, orchestrator) = orchestrator_with(
            remote_model("http://127.0.0.1:1"),
            Some(retriever_for("http://127.0.0.1:1")),
        )
        .await;
        storage.pool().close().await;

        let reply = orchestrator
            .handle_query(1, "still answer me", None)
            .await
            .unwrap();

        assert_eq!(reply.answer, FALLBACK_ANSWER);
        assert_eq!(reply.status, GenerationStatus::Degraded);
        assert!(reply.reason.is_some());
        assert!(reply.sources.is_empty());
        assert!(reply.conversation_id.is_none());
    }

    #[tokio::test]
    async fn test_retrieval_failure_treated_as_no_retrieval() {
        let (storage, orchestrator) = orchestrator_with(
            local_model(),
            Some(retriever_for("http://127.0.0.1:1")),
        )
        .await;

        let reply = orchestrator
            .handle_query(1, "question", None)
            .await
            .unwrap();

        assert_eq!(reply.status, GenerationStatus::Ok);
        assert!(reply.sources.is_empty());

        // No retrieval nodes, but the user/generation pair still links up.
        let graph = storage
            .get_graph(reply.conversation_id.unwrap())
            .await
            .unwrap();
        assert!(graph.nodes.iter().all(|n| n.kind != NodeKind::Retrieval));
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].relation, EdgeRelation::AskedFor);
    }

    #[tokio::test]
    async fn test_reply_carries_citations_in_retrieval_order() {
        let mock_server = MockServer::start().await;
        mount_retrieval(
            &mock_server,
            &[("first passage", "/uploads/a.txt"), ("second passage", "/uploads/b.txt")],
        )
        .await;

        let (_storage, orchestrator) =
            orchestrator_with(local_model(), Some(retriever_for(&mock_server.uri()))).await;

        let reply = orchestrator
            .handle_query(1, "question", None)
            .await
            .unwrap();

        let sources: Vec<_> = reply.sources.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["/uploads/a.txt", "/uploads/b.txt"]);
    }
}

#[cfg(test)]
mod graph_shape_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_turn_graph_shape() {
        let mock_server = MockServer::start().await;
        mount_retrieval(
            &mock_server,
            &[("alpha", "/uploads/a.txt"), ("beta", "/uploads/b.txt")],
        )
        .await;

        let (storage, orchestrator) =
            orchestrator_with(local_model(), Some(retriever_for(&mock_server.uri()))).await;

        let reply = orchestrator
            .handle_query(7, "how do edges work?", None)
            .await
            .unwrap();
        let graph = storage
            .get_graph(reply.conversation_id.unwrap())
            .await
            .unwrap();

        let user_nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::User)
            .collect();
        let retrieval_nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Retrieval)
            .collect();
        let generation_nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Generation)
            .collect();

        assert_eq!(user_nodes.len(), 1);
        assert_eq!(retrieval_nodes.len(), 2);
        assert_eq!(generation_nodes.len(), 1);

        let user_id = user_nodes[0].id;
        let generation_id = generation_nodes[0].id;

        // Exactly one asked_for edge per turn.
        let asked_for: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.relation == EdgeRelation::AskedFor)
            .collect();
        assert_eq!(asked_for.len(), 1);
        assert_eq!(asked_for[0].from_node, user_id);
        assert_eq!(asked_for[0].to_node, generation_id);

        // Per retrieval node: one retrieved edge in, one informed edge out.
        for node in &retrieval_nodes {
            let retrieved: Vec<_> = graph
                .edges
                .iter()
                .filter(|e| e.relation == EdgeRelation::Retrieved && e.to_node == node.id)
                .collect();
            assert_eq!(retrieved.len(), 1);
            assert_eq!(retrieved[0].from_node, user_id);

            let informed: Vec<_> = graph
                .edges
                .iter()
                .filter(|e| e.relation == EdgeRelation::Informed && e.from_node == node.id)
                .collect();
            assert_eq!(informed.len(), 1);
            assert_eq!(informed[0].to_node, generation_id);
        }

        // Every edge references nodes of the same conversation.
        for edge in &graph.edges {
            assert!(graph.nodes.iter().any(|n| n.id == edge.from_node));
            assert!(graph.nodes.iter().any(|n| n.id == edge.to_node));
        }
    }

    #[tokio::test]
    async fn test_degraded_generation_skips_generation_node_and_edges() {
        let model_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model down"))
            .mount(&model_server)
            .await;

        let retrieval_server = MockServer::start().await;
        mount_retrieval(&retrieval_server, &[("alpha", "/uploads/a.txt")]).await;

        let (storage, orchestrator) = orchestrator_with(
            remote_model(&model_server.uri()),
            Some(retriever_for(&retrieval_server.uri())),
        )
        .await;

        let reply = orchestrator
            .handle_query(1, "question", None)
            .await
            .unwrap();

        assert_eq!(reply.status, GenerationStatus::Degraded);
        assert_eq!(reply.answer, FALLBACK_ANSWER);
        // Citations still flow even when generation failed.
        assert_eq!(reply.sources.len(), 1);

        let graph = storage
            .get_graph(reply.conversation_id.unwrap())
            .await
            .unwrap();

        assert!(graph.nodes.iter().all(|n| n.kind != NodeKind::Generation));
        assert!(graph
            .edges
            .iter()
            .all(|e| e.relation == EdgeRelation::Retrieved));
        assert_eq!(graph.edges.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieval_node_content_truncated_to_preview() {
        let mock_server = MockServer::start().await;
        let long_passage = "p".repeat(1000);
        mount_retrieval(&mock_server, &[(long_passage.as_str(), "/uploads/long.txt")]).await;

        let (storage, orchestrator) =
            orchestrator_with(local_model(), Some(retriever_for(&mock_server.uri()))).await;

        let reply = orchestrator
            .handle_query(1, "question", None)
            .await
            .unwrap();
        let graph = storage
            .get_graph(reply.conversation_id.unwrap())
            .await
            .unwrap();

        let retrieval_node = graph
            .nodes
            .iter()
            .find(|n| n.kind == NodeKind::Retrieval)
            .unwrap();
        assert_eq!(retrieval_node.content.chars().count(), 400);
    }
}

#[cfg(test)]
mod prompt_tests {
    use super::*;

    #[tokio::test]
    async fn test_generation_prompt_is_raw_query_without_retrieved_context() {
        let retrieval_server = MockServer::start().await;
        mount_retrieval(
            &retrieval_server,
            &[("RETRIEVED-CONTEXT-MARKER", "/uploads/a.txt")],
        )
        .await;

        let model_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({ "prompt": "what is the dose?" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "answer" })),
            )
            .expect(1)
            .mount(&model_server)
            .await;

        let (_storage, orchestrator) = orchestrator_with(
            remote_model(&model_server.uri()),
            Some(retriever_for(&retrieval_server.uri())),
        )
        .await;

        let reply = orchestrator
            .handle_query(1, "what is the dose?", None)
            .await
            .unwrap();
        assert_eq!(reply.answer, "answer");

        // The retrieved passage never reaches the generation prompt.
        let requests = model_server.received_requests().await.unwrap();
        for request in &requests {
            let body = String::from_utf8_lossy(&request.body);
            assert!(!body.contains("RETRIEVED-CONTEXT-MARKER"));
        }
    }
}

#[cfg(test)]
mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_turn_persists_user_and_bot_messages() {
        let mock_server = MockServer::start().await;
        mount_retrieval(&mock_server, &[("alpha", "/uploads/a.txt")]).await;

        let (storage, orchestrator) =
            orchestrator_with(local_model(), Some(retriever_for(&mock_server.uri()))).await;

        let reply = orchestrator
            .handle_query(9, "persist me", Some(json!({ "audio": false })))
            .await
            .unwrap();

        let messages = storage
            .get_conversation_messages(reply.conversation_id.unwrap())
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);

        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[0].content, "persist me");
        assert_eq!(messages[0].metadata.as_ref().unwrap()["user_id"], 9);

        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].content, reply.answer);
        let bot_metadata = messages[1].metadata.as_ref().unwrap();
        assert_eq!(bot_metadata["sources"][0]["source"], "/uploads/a.txt");
        assert_eq!(bot_metadata["status"], "ok");
    }

    #[tokio::test]
    async fn test_conversation_title_is_truncated_first_query() {
        let (storage, orchestrator) = orchestrator_with(local_model(), None).await;

        let text = "t".repeat(300);
        let reply = orchestrator.handle_query(1, &text, None).await.unwrap();

        let conversation = storage
            .get_conversation(reply.conversation_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.title.chars().count(), 80);
        assert!(text.starts_with(&conversation.title));
    }
}
