//! Storage layer for conversation and reasoning-graph persistence.
//!
//! This module provides SQLite-based storage for users, conversations,
//! messages, and the per-conversation reasoning graph (nodes and edges).
//! All tables are append-only from the orchestrator's point of view;
//! conversations are never mutated after creation.

mod sqlite;

pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// A registered user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique user identifier.
    pub id: i64,
    /// Login name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Hashed password (hashing happens upstream).
    pub password_hash: String,
    /// Role name (e.g., "user", "admin").
    pub role: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A conversation grouping the messages and graph of one chat thread.
///
/// Created lazily on the first query of a thread; the title is the first
/// query truncated. Never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Truncated first query.
    pub title: String,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
}

/// A single chat message, from the user or the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier.
    pub id: i64,
    /// Parent conversation; `None` when conversation creation failed for
    /// the turn that produced this message.
    pub conversation_id: Option<i64>,
    /// Who sent the message.
    pub sender: Sender,
    /// Message text.
    pub content: String,
    /// Free-form metadata (user id, source citations, generation status).
    pub metadata: Option<serde_json::Value>,
    /// When the message was recorded.
    pub created_at: DateTime<Utc>,
}

/// Message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human side of the conversation.
    User,
    /// The assistant side.
    Bot,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Bot => write!(f, "bot"),
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "bot" => Ok(Sender::Bot),
            _ => Err(format!("Unknown sender: {}", s)),
        }
    }
}

/// A node in a conversation's reasoning graph: one reasoning step of one
/// turn (the user message, a retrieved passage, or the generated answer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique node identifier.
    pub id: i64,
    /// Parent conversation.
    pub conversation_id: i64,
    /// What kind of reasoning step this node records.
    pub kind: NodeKind,
    /// Content snippet for the step.
    pub content: String,
    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
    /// When the node was recorded.
    pub created_at: DateTime<Utc>,
}

/// Kind of reasoning-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The user's message.
    User,
    /// A retrieved passage.
    Retrieval,
    /// The generated answer.
    Generation,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::User => write!(f, "user"),
            NodeKind::Retrieval => write!(f, "retrieval"),
            NodeKind::Generation => write!(f, "generation"),
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(NodeKind::User),
            "retrieval" => Ok(NodeKind::Retrieval),
            "generation" => Ok(NodeKind::Generation),
            _ => Err(format!("Unknown node kind: {}", s)),
        }
    }
}

/// A directed, typed edge between two reasoning-graph nodes.
///
/// Invariant: both endpoints belong to the same conversation as the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Unique edge identifier.
    pub id: i64,
    /// Parent conversation.
    pub conversation_id: i64,
    /// Source node.
    pub from_node: i64,
    /// Target node.
    pub to_node: i64,
    /// Relation label.
    pub relation: EdgeRelation,
    /// Free-form metadata.
    pub metadata: Option<serde_json::Value>,
    /// When the edge was recorded.
    pub created_at: DateTime<Utc>,
}

/// Relation label on a reasoning-graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelation {
    /// user → generation: the question that produced the answer.
    AskedFor,
    /// user → retrieval: the question that fetched the passage.
    Retrieved,
    /// retrieval → generation: the passage available to the answer.
    Informed,
}

impl std::fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeRelation::AskedFor => write!(f, "asked_for"),
            EdgeRelation::Retrieved => write!(f, "retrieved"),
            EdgeRelation::Informed => write!(f, "informed"),
        }
    }
}

impl std::str::FromStr for EdgeRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asked_for" => Ok(EdgeRelation::AskedFor),
            "retrieved" => Ok(EdgeRelation::Retrieved),
            "informed" => Ok(EdgeRelation::Informed),
            _ => Err(format!("Unknown edge relation: {}", s)),
        }
    }
}

/// The full reasoning graph of one conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationGraph {
    /// All nodes, in creation order.
    pub nodes: Vec<GraphNode>,
    /// All edges, in creation order.
    pub edges: Vec<GraphEdge>,
}

impl ConversationGraph {
    /// True when the graph holds neither nodes nor edges.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Persistence operations over the relational store.
///
/// All ids are SQLite rowids; create operations return the assigned id.
#[async_trait]
pub trait Storage: Send + Sync {
    // User operations

    /// Create a user account and return its id.
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StorageResult<i64>;
    /// Get a user by id.
    async fn get_user(&self, id: i64) -> StorageResult<Option<UserAccount>>;

    // Conversation operations

    /// Create a conversation and return its id.
    async fn create_conversation(&self, user_id: i64, title: &str) -> StorageResult<i64>;
    /// Get a conversation by id.
    async fn get_conversation(&self, id: i64) -> StorageResult<Option<Conversation>>;

    // Message operations

    /// Append a chat message and return its id.
    async fn create_message(
        &self,
        conversation_id: Option<i64>,
        sender: Sender,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64>;
    /// Get all messages of a conversation, oldest first.
    async fn get_conversation_messages(
        &self,
        conversation_id: i64,
    ) -> StorageResult<Vec<ChatMessage>>;

    // Graph operations

    /// Append a reasoning-graph node and return its id.
    async fn create_graph_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64>;
    /// Append a reasoning-graph edge and return its id.
    async fn create_graph_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64>;
    /// Get the full graph of a conversation.
    async fn get_graph(&self, conversation_id: i64) -> StorageResult<ConversationGraph>;
}
