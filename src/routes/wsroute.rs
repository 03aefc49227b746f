use crate::error::AppError;
use crate::middleware::auth::{bearer_token, user_id_from_claims, verify_jwt};
use crate::services::chat_service::ChatService;
use crate::state::AppState;
use crate::websocket::message_types::{ConfirmationFrame, ErrorFrame, InboundFrame};
use crate::websocket::ConnectionId;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Frame destined for this session's own channel.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub(crate) struct OutboundText(pub String);

/// Per-connection session bound to one identity for its lifetime.
///
/// The registry entry is created by the route handler before the actor
/// starts, so a message sent while the upgrade is still in flight is
/// already deliverable.
struct WsSession {
    user_id: i64,
    connection_id: ConnectionId,
    state: AppState,
    hb: Instant,
}

impl WsSession {
    fn new(user_id: i64, connection_id: ConnectionId, state: AppState) -> Self {
        Self {
            user_id,
            connection_id,
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = act.user_id, "websocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Handle one inbound text frame. Logical failures are reported on
    /// this session's own channel and never terminate the loop.
    fn handle_frame(&self, text: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let frame = match serde_json::from_str::<InboundFrame>(text) {
            Ok(frame) => frame,
            Err(_) => {
                send_error_frame(ctx, "malformed frame: expected {receiver_id, message}");
                return;
            }
        };

        let state = self.state.clone();
        let sender_id = self.user_id;
        let addr = ctx.address();

        actix::spawn(async move {
            let result = ChatService::send(
                &state.db,
                &state.registry,
                sender_id,
                frame.receiver_id,
                &frame.message,
            )
            .await;

            let outbound = match result {
                Ok(receipt) => serde_json::to_string(&ConfirmationFrame::sent(
                    receipt.message_id,
                    receipt.timestamp.to_rfc3339(),
                )),
                Err(e) => {
                    if e.status() >= 500 {
                        tracing::error!(error = %e, sender_id, "websocket send failed");
                    }
                    serde_json::to_string(&ErrorFrame::new(e.public_message()))
                }
            };

            if let Ok(payload) = outbound {
                // Fails silently when the session already stopped.
                addr.do_send(OutboundText(payload));
            }
        });
    }
}

fn send_error_frame(ctx: &mut ws::WebsocketContext<WsSession>, reason: &str) {
    if let Ok(payload) = serde_json::to_string(&ErrorFrame::new(reason)) {
        ctx.text(payload);
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = self.user_id, "websocket session started");
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = self.user_id, "websocket session stopped");
        self.state.registry.unregister(self.user_id, self.connection_id);
    }
}

impl Handler<OutboundText> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: OutboundText, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.handle_frame(&text, ctx);
            }
            Ok(ws::Message::Binary(_)) => {
                send_error_frame(ctx, "binary frames are not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(user_id = self.user_id, ?reason, "websocket close received");
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Token from query string or Authorization header; the authenticated
/// subject must match the path identity.
fn authenticate(
    state: &AppState,
    req: &HttpRequest,
    params: &WsParams,
) -> Result<i64, AppError> {
    let token = params
        .token
        .clone()
        .or_else(|| bearer_token(req))
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_jwt(&state.config.jwt_secret, &token)?;
    user_id_from_claims(&claims)
}

/// Persistent duplex channel for one identity.
/// GET /chat/ws/{identity}
#[get("/ws/{identity}")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let identity = path.into_inner();

    let user_id = match authenticate(&state, &req, &query) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(identity, error = %e, "websocket connection rejected");
            return Ok(HttpResponse::Unauthorized().finish());
        }
    };
    if user_id != identity {
        tracing::warn!(identity, user_id, "websocket identity mismatch");
        return Ok(HttpResponse::Forbidden().finish());
    }

    let (connection_id, mut rx) = state.registry.register(identity);

    let session = WsSession::new(identity, connection_id, state.as_ref().clone());
    let (addr, resp) = match ws::WsResponseBuilder::new(session, &req, stream).start_with_addr() {
        Ok(started) => started,
        Err(e) => {
            // Failed upgrade: the actor never started, so its stop hook
            // will not run. Drop the entry here or it leaks until this
            // identity reconnects.
            state.registry.unregister(identity, connection_id);
            return Err(e);
        }
    };

    // Bridge the registry channel into the actor mailbox. The task
    // exits when the entry is replaced or unregistered (sender drops).
    actix_web::rt::spawn(async move {
        while let Some(frame) = rx.recv().await {
            addr.do_send(OutboundText(frame));
        }
    });

    Ok(resp)
}
