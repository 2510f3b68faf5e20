//! Traveler ↔ agency messaging.

use std::collections::HashMap;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use escale_core::{
  messaging::{Conversation, ConversationSummary, Message, NewConversation, NewMessage},
  store::MarketplaceStore,
  user::User,
};
use serde::Deserialize;

use super::{non_blank, quotes::owned_request};
use crate::{
  AppState,
  auth::Authenticated,
  error::{Error, Result, store},
};

const MSG_EMPTY_MESSAGE: &str = "Le message ne peut pas être vide";

#[derive(Debug, Deserialize)]
pub struct ConversationForm {
  pub agency_id:        i64,
  pub quote_request_id: Option<i64>,
  /// Optional opening message.
  pub message:          Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageForm {
  pub content: String,
}

/// The conversation `id`, provided `user` is its traveler or speaks for its
/// agency.
async fn joined_conversation<S>(state: &AppState<S>, user: &User, id: i64) -> Result<Conversation>
where
  S: MarketplaceStore,
{
  let conversation = state
    .store
    .get_conversation(id)
    .await
    .map_err(store)?
    .ok_or_else(|| Error::NotFound(format!("Conversation introuvable : {id}")))?;
  if conversation.traveler_id == user.id {
    return Ok(conversation);
  }
  let agency = state.store.get_agency(conversation.agency_id).await.map_err(store)?;
  if agency.is_some_and(|a| a.user_id == user.id) {
    return Ok(conversation);
  }
  Err(Error::Forbidden("Vous ne participez pas à cette conversation".into()))
}

/// `GET /account/conversations`. The inbox, most recently active first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
) -> Result<Json<Vec<ConversationSummary>>>
where
  S: MarketplaceStore,
{
  let conversations = state.store.conversations_for_user(user.id).await.map_err(store)?;
  let mut agency_names: HashMap<i64, Option<String>> = HashMap::new();
  let mut inbox = Vec::with_capacity(conversations.len());

  for conversation in conversations {
    let agency_name = match agency_names.get(&conversation.agency_id) {
      Some(name) => name.clone(),
      None => {
        let name = state
          .store
          .get_agency(conversation.agency_id)
          .await
          .map_err(store)?
          .map(|a| a.name);
        agency_names.insert(conversation.agency_id, name.clone());
        name
      }
    };
    let last_message = state
      .store
      .messages_for_conversation(conversation.id)
      .await
      .map_err(store)?
      .pop();
    let unread_count = state.store.unread_count(conversation.id, user.id).await.map_err(store)?;
    inbox.push(ConversationSummary { conversation, agency_name, last_message, unread_count });
  }

  Ok(Json(inbox))
}

/// `POST /account/conversations`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Json(form): Json<ConversationForm>,
) -> Result<(StatusCode, Json<Conversation>)>
where
  S: MarketplaceStore,
{
  let agency_id = form.agency_id;
  if state.store.get_agency(agency_id).await.map_err(store)?.is_none() {
    return Err(Error::NotFound(format!("Agence introuvable : {agency_id}")));
  }
  if let Some(request_id) = form.quote_request_id {
    owned_request(&state, &user, request_id).await?;
  }

  let conversation = state
    .store
    .create_conversation(NewConversation {
      traveler_id: user.id,
      agency_id,
      quote_request_id: form.quote_request_id,
    })
    .await
    .map_err(store)?;

  if let Some(content) = non_blank(form.message) {
    state
      .store
      .create_message(NewMessage {
        conversation_id: conversation.id,
        sender_id: user.id,
        content,
        is_read: false,
      })
      .await
      .map_err(store)?;
  }
  tracing::debug!(conversation_id = conversation.id, agency_id, "conversation opened");

  Ok((StatusCode::CREATED, Json(conversation)))
}

/// `GET /account/conversations/{id}/messages`
///
/// Reading the thread marks the other party's messages as read.
pub async fn messages<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<Vec<Message>>>
where
  S: MarketplaceStore,
{
  let conversation = joined_conversation(&state, &user, id).await?;
  state.store.mark_conversation_read(conversation.id, user.id).await.map_err(store)?;
  let messages = state.store.messages_for_conversation(conversation.id).await.map_err(store)?;
  Ok(Json(messages))
}

/// `POST /account/conversations/{id}/messages`
pub async fn send<S>(
  State(state): State<AppState<S>>,
  Authenticated(user): Authenticated,
  Path(id): Path<i64>,
  Json(form): Json<MessageForm>,
) -> Result<(StatusCode, Json<Message>)>
where
  S: MarketplaceStore,
{
  let content = non_blank(Some(form.content))
    .ok_or_else(|| Error::BadRequest(MSG_EMPTY_MESSAGE.into()))?;
  let conversation = joined_conversation(&state, &user, id).await?;
  let message = state
    .store
    .create_message(NewMessage {
      conversation_id: conversation.id,
      sender_id: user.id,
      content,
      is_read: false,
    })
    .await
    .map_err(store)?;
  Ok((StatusCode::CREATED, Json(message)))
}
