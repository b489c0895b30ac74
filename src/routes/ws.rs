//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "hsk_mock", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "hsk_mock", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "hsk_mock", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e), kind: "bad_request".into() },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e), "kind": "internal" }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "hsk_mock", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "hsk_mock", "WebSocket disconnected");
}

fn ws_error(e: ApiError) -> ServerWsMessage {
  ServerWsMessage::Error { message: e.to_string(), kind: e.kind().into() }
}

#[instrument(level = "info", skip(state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  let reply = match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::StartSession { request } => start_session(state, request).await.map(|session| {
      info!(target: "exam", session_id = %session.session_id, level = session.level, "WS session started");
      ServerWsMessage::SessionStarted { session }
    }),

    ClientWsMessage::NextQuestion { session_id } => {
      next_question(state, &session_id).await.map(|next| ServerWsMessage::Question { next })
    }

    ClientWsMessage::SubmitAnswer { session_id, question_id, answer } => {
      submit_answer(state, &session_id, &question_id, &answer)
        .await
        .map(|answer| ServerWsMessage::AnswerResult { answer })
    }

    ClientWsMessage::Hint { session_id, question_id } => {
      get_hint(state, &session_id, &question_id).await.map(|h| ServerWsMessage::Hint { text: h.text })
    }

    ClientWsMessage::Result { session_id } => {
      get_result(state, &session_id).await.map(|result| ServerWsMessage::Result { result })
    }

    ClientWsMessage::EndSession { session_id } => {
      end_session(state, &session_id).await.map(|_| ServerWsMessage::SessionEnded { session_id })
    }
  };
  reply.unwrap_or_else(ws_error)
}
