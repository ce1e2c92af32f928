#![allow(dead_code)]

use rusqlite::{Connection, params};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Two channels: `A` ("alice", three messages, one from an unknown sender,
/// one edited) and `B` ("bob", one message).
pub fn seed_database(dir: &Path) -> PathBuf {
    let path = dir.join("chat.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE messages (message_id TEXT, sender_id TEXT, channel_id TEXT, text TEXT, timestamp TEXT);
         CREATE TABLE edit_timestamps (message_id TEXT, edit_timestamp TEXT);
         CREATE TABLE channels (id TEXT, name TEXT);
         CREATE TABLE users (id TEXT, name TEXT, avatar_url TEXT, discriminator TEXT);
         INSERT INTO channels VALUES ('A', 'alice'), ('B', 'bob');
         INSERT INTO users VALUES ('u1', 'Alice', 'https://cdn.example/u1.png', '0001');
         INSERT INTO users VALUES ('u2', 'Bob', NULL, '0002');",
    )
    .unwrap();

    let rows = [
        ("a1", "u1", "A", "hey bob", "1609459200000"),
        ("a2", "u2", "A", "hey alice", "1609459201000"),
        ("a3", "ghost", "A", "who am i", "1609459202000"),
        ("b1", "u2", "B", "note to self", "1609459300000"),
    ];
    for (id, sender, channel, text, ts) in rows {
        conn.execute(
            "INSERT INTO messages VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, sender, channel, text, ts],
        )
        .unwrap();
    }
    conn.execute("INSERT INTO edit_timestamps VALUES ('a2', '1609459205000')", [])
        .unwrap();
    path
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

pub fn message_ids(doc: &Value) -> Vec<String> {
    let mut ids: Vec<String> = doc["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}
