//! Traveler ↔ agency conversations, and the reviews travelers leave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Conversations ───────────────────────────────────────────────────────────

/// A thread between a traveler and an agency, optionally about one quote
/// request. `updated_at` moves forward every time a message is posted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
  pub id:               i64,
  pub traveler_id:      i64,
  pub agency_id:        i64,
  pub quote_request_id: Option<i64>,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
  pub traveler_id:      i64,
  pub agency_id:        i64,
  pub quote_request_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub id:              i64,
  pub conversation_id: i64,
  pub sender_id:       i64,
  pub content:         String,
  pub is_read:         bool,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
  pub conversation_id: i64,
  pub sender_id:       i64,
  pub content:         String,
  pub is_read:         bool,
}

/// One row of the messages inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
  pub conversation: Conversation,
  pub agency_name:  Option<String>,
  pub last_message: Option<Message>,
  pub unread_count: usize,
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
  pub id:          i64,
  pub user_id:     i64,
  pub agency_id:   i64,
  pub booking_id:  Option<i64>,
  pub rating:      i64,
  pub title:       Option<String>,
  pub content:     Option<String>,
  /// Set when the review is tied to a booking the reviewer actually made.
  pub is_verified: bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewReview {
  pub user_id:     i64,
  pub agency_id:   i64,
  pub booking_id:  Option<i64>,
  pub rating:      i64,
  pub title:       Option<String>,
  pub content:     Option<String>,
  pub is_verified: bool,
}
