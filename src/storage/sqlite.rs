use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::{
    ChatMessage, Conversation, ConversationGraph, EdgeRelation, GraphEdge, GraphNode, NodeKind,
    Sender, Storage, UserAccount,
};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create an in-memory storage instance (used by tests)
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // A single pinned connection: an in-memory database lives and dies
        // with its connection, so the pool must never recycle it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn metadata_to_column(metadata: &Option<serde_json::Value>) -> Option<String> {
    metadata
        .as_ref()
        .map(|m| serde_json::to_string(m).unwrap_or_default())
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<UserAccount>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, email, password_hash, role, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_conversation(&self, user_id: i64, title: &str) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO conversations (user_id, title, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_conversation(&self, id: i64) -> StorageResult<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, created_at
            FROM conversations
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_message(
        &self,
        conversation_id: Option<i64>,
        sender: Sender,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (conversation_id, sender, content, metadata, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(conversation_id)
        .bind(sender.to_string())
        .bind(content)
        .bind(metadata_to_column(&metadata))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: i64,
    ) -> StorageResult<Vec<ChatMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, sender, content, metadata, created_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn create_graph_node(
        &self,
        conversation_id: i64,
        kind: NodeKind,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO graph_nodes (conversation_id, kind, content, metadata, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(conversation_id)
        .bind(kind.to_string())
        .bind(content)
        .bind(metadata_to_column(&metadata))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn create_graph_edge(
        &self,
        conversation_id: i64,
        from_node: i64,
        to_node: i64,
        relation: EdgeRelation,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO graph_edges (conversation_id, from_node, to_node, relation, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(conversation_id)
        .bind(from_node)
        .bind(to_node)
        .bind(relation.to_string())
        .bind(metadata_to_column(&metadata))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn get_graph(&self, conversation_id: i64) -> StorageResult<ConversationGraph> {
        let node_rows: Vec<NodeRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, kind, content, metadata, created_at
            FROM graph_nodes
            WHERE conversation_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        let edge_rows: Vec<EdgeRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, from_node, to_node, relation, metadata, created_at
            FROM graph_edges
            WHERE conversation_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ConversationGraph {
            nodes: node_rows.into_iter().map(|r| r.into()).collect(),
            edges: edge_rows.into_iter().map(|r| r.into()).collect(),
        })
    }
}

// Internal row types for SQLx mapping

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_metadata(s: Option<String>) -> Option<serde_json::Value> {
    s.and_then(|s| serde_json::from_str(&s).ok())
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: String,
}

impl From<UserRow> for UserAccount {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: i64,
    user_id: i64,
    title: String,
    created_at: String,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    conversation_id: Option<i64>,
    sender: String,
    content: String,
    metadata: Option<String>,
    created_at: String,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            sender: row.sender.parse().unwrap_or(Sender::User),
            content: row.content,
            metadata: parse_metadata(row.metadata),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct NodeRow {
    id: i64,
    conversation_id: i64,
    kind: String,
    content: String,
    metadata: Option<String>,
    created_at: String,
}

impl From<NodeRow> for GraphNode {
    fn from(row: NodeRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            kind: row.kind.parse().unwrap_or(NodeKind::User),
            content: row.content,
            metadata: parse_metadata(row.metadata),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct EdgeRow {
    id: i64,
    conversation_id: i64,
    from_node: i64,
    to_node: i64,
    relation: String,
    metadata: Option<String>,
    created_at: String,
}

impl From<EdgeRow> for GraphEdge {
    fn from(row: EdgeRow) -> Self {
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            from_node: row.from_node,
            to_node: row.to_node,
            relation: row.relation.parse().unwrap_or(EdgeRelation::AskedFor),
            metadata: parse_metadata(row.metadata),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
