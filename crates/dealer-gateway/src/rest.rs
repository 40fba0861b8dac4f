//! `GET /api/cars` and `POST /api/chat` (spec §6).
//!
//! Both external collaborators are out of scope for the core (spec §1);
//! these handlers exist only to keep the REST surface's shape exact —
//! a static inventory fixture, and a thread-bookkeeping echo that never
//! calls out to a real LLM provider.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Car {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: u32,
    pub price: u32,
}

/// `GET /api/cars` — a fixed in-memory fixture; the real inventory
/// service is out of scope (spec §1).
pub async fn list_cars() -> Json<Vec<Car>> {
    Json(vec![
        Car {
            id: "car-1".to_string(),
            make: "Rivian".to_string(),
            model: "R1S".to_string(),
            year: 2025,
            price: 78_000,
        },
        Car {
            id: "car-2".to_string(),
            make: "Honda".to_string(),
            model: "CR-V".to_string(),
            year: 2024,
            price: 34_000,
        },
        Car {
            id: "car-3".to_string(),
            make: "Ford".to_string(),
            model: "Mustang Mach-E".to_string(),
            year: 2025,
            price: 52_000,
        },
    ])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub current_filters: Option<Value>,
    #[serde(default)]
    pub guided_mode: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_filters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guided_mode: Option<bool>,
}

/// Durable-for-the-process-lifetime thread bookkeeping (spec §6): each
/// `conversationId` accumulates the turns sent to it. No turn is ever
/// sent anywhere; there is no LLM provider behind this handler.
pub struct ChatThreads {
    threads: Mutex<HashMap<String, Vec<String>>>,
}

impl ChatThreads {
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.threads.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append `message` to the named thread, creating it if new, and
    /// return the turn count so far (including this one).
    fn record_turn(&self, conversation_id: &str, message: String) -> usize {
        let mut threads = self.lock();
        let turns = threads.entry(conversation_id.to_string()).or_default();
        turns.push(message);
        turns.len()
    }
}

impl Default for ChatThreads {
    fn default() -> Self {
        Self::new()
    }
}

/// `POST /api/chat` — records the turn under its thread and echoes a
/// deterministic acknowledgment carrying the bookkeeping fields the wire
/// contract promises (spec §6). `updatedFilters` passes `currentFilters`
/// through unchanged: there is no filter-editing model behind this
/// handler to produce a different value.
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    let conversation_id = req.conversation_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let turn_count = state.chat.record_turn(&conversation_id, req.message);

    Json(ChatResponse {
        response: format!("acknowledged turn {turn_count} on thread {conversation_id}"),
        conversation_id,
        updated_filters: req.current_filters,
        guided_mode: req.guided_mode,
    })
}
