//! WebSocket push channel for viewers.

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket, rejection::WebSocketUpgradeRejection},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use share_hub_session::Viewer;
use tracing::{debug, error, info};

use crate::{
    error::{ApiError, ApiResult},
    http::{HubState, required_id},
    protocol::PollQuery,
};

/// `GET /share_poll?id=<short id>` upgrade handler.
///
/// The viewer is subscribed before the upgrade response goes out, so the
/// snapshot it receives is the state at connect time and every later
/// publish follows it.
pub async fn share_poll(
    State(state): State<HubState>,
    Query(query): Query<PollQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> ApiResult<Response> {
    let ws = ws.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let id = required_id(query)?;

    let handle = state.registry.resolve(&id).await?;
    let viewer = handle.subscribe().await?;
    let address = handle.address().to_string();

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, viewer, address)))
}

async fn handle_socket(socket: WebSocket, viewer: Viewer, address: String) {
    let viewer_id = viewer.id();
    let (mut sender, mut receiver) = socket.split();
    let mut frames = viewer.into_stream();

    // Forward frames until the actor lets go of the viewer or the socket breaks.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = frames.next().await {
            let json = match serde_json::to_string(&frame) {
                Ok(j) => j,
                Err(e) => {
                    error!("Failed to serialize frame: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // Viewers have nothing to say; reading only detects the disconnect.
    loop {
        tokio::select! {
            _ = &mut send_task => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("WebSocket error: {e}");
                    break;
                }
            },
        }
    }

    send_task.abort();
    info!(address = %address, viewer = viewer_id, "viewer disconnected");
}
