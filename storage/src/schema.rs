//! Table and index definitions. Applied idempotently on startup.

use crate::sqlite_pool::SqlitePoolManager;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS citizens (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        avatar_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS doctors (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        avatar_url TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id TEXT PRIMARY KEY,
        verification_id TEXT,
        doctor_id TEXT NOT NULL,
        citizen_id TEXT NOT NULL,
        consult_date TEXT NOT NULL,
        consult_time TEXT NOT NULL,
        complaint TEXT NOT NULL,
        session_count INTEGER NOT NULL DEFAULT 1,
        status TEXT NOT NULL DEFAULT 'waiting',
        auto_message_sent INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_appointments_pending ON appointments(status, auto_message_sent)",
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id TEXT PRIMARY KEY,
        sender_id TEXT NOT NULL,
        receiver_id TEXT NOT NULL,
        text TEXT,
        media_url TEXT,
        message_type TEXT NOT NULL,
        role TEXT NOT NULL,
        appointment_id TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_created_at ON chat_messages(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_pair ON chat_messages(sender_id, receiver_id)",
    r#"
    CREATE TABLE IF NOT EXISTS chat_lists (
        id TEXT PRIMARY KEY,
        participant_a TEXT NOT NULL,
        role_a TEXT NOT NULL,
        participant_b TEXT NOT NULL,
        role_b TEXT NOT NULL,
        last_message TEXT NOT NULL DEFAULT '',
        last_message_date TEXT NOT NULL,
        appointment_id TEXT UNIQUE,
        status TEXT NOT NULL DEFAULT 'ongoing',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_chat_lists_a ON chat_lists(participant_a)",
    "CREATE INDEX IF NOT EXISTS idx_chat_lists_b ON chat_lists(participant_b)",
    r#"
    CREATE TABLE IF NOT EXISTS chat_list_unread (
        chat_list_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        unread INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (chat_list_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        body TEXT NOT NULL,
        image_url TEXT,
        created_at TEXT NOT NULL,
        UNIQUE (name, category)
    )
    "#,
];

/// Creates every table and index that does not exist yet.
pub async fn migrate(pool_manager: &SqlitePoolManager) -> Result<(), sqlx::Error> {
    info!("Creating database tables if not exist");
    let pool = pool_manager.pool();
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database tables created successfully");
    Ok(())
}
