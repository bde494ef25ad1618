use actix::{
    Actor, ActorContext, ActorFutureExt, AsyncContext, Handler, Message, Running, StreamHandler,
    WrapFuture,
};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use actix_web_actors::ws::{CloseCode, CloseReason};
use std::time::{Duration, Instant};

use system::{serde_json, uuid::Uuid, PollCommand, PollError, PollEvent};

use crate::gateway::{ConnectionContext, Gateway};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionActorMessage(PollEvent);

struct ConnectionActor {
    context: ConnectionContext,
    gateway: web::Data<Gateway>,
    last_heartbeat: Instant,
}

impl ConnectionActor {
    fn new(gateway: web::Data<Gateway>) -> Self {
        Self {
            context: ConnectionContext::new(Uuid::new_v4()),
            gateway,
            last_heartbeat: Instant::now(),
        }
    }

    fn heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > CLIENT_TIMEOUT {
                log::info!("Connection {} timed out", act.context.connection_id);
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    /// Commands of one connection run one at a time, in arrival order.
    fn dispatch(&mut self, command: PollCommand, ctx: &mut ws::WebsocketContext<Self>) {
        let gateway = self.gateway.clone();
        let mut context = self.context.clone();
        let fut = async move {
            gateway.handle_command(&mut context, command).await;
            context
        };
        ctx.wait(fut.into_actor(self).map(|context, act, _| {
            act.context = context;
        }));
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PollEvent>();
        self.gateway.connect(self.context.connection_id, tx);
        self.heartbeat(ctx);

        let addr = ctx.address();
        let connection_id = self.context.connection_id;
        actix_web::rt::spawn(async move {
            log::info!("Connection {} - started", connection_id);
            while let Some(event) = rx.recv().await {
                addr.do_send(ConnectionActorMessage(event));
            }
            log::info!("Connection {} - terminated", connection_id);
        });
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        let gateway = self.gateway.clone();
        let context = self.context.clone();
        actix_web::rt::spawn(async move {
            gateway.handle_disconnect(&context).await;
        });

        Running::Stop
    }
}

/// Ingress
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<PollCommand>(&text) {
                    Ok(command) => self.dispatch(command, ctx),
                    Err(err) => {
                        log::debug!("Malformed frame from {}: {}", self.context.connection_id, err);
                        self.gateway.reject(
                            &self.context,
                            &PollError::validation(format!("Invalid message: {}", err)),
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                ctx.close(Some(CloseReason {
                    code: CloseCode::Unsupported,
                    description: Some("text frames only".into()),
                }));
                ctx.stop();
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(err) => {
                log::warn!("Protocol error on {}: {}", self.context.connection_id, err);
                ctx.stop();
            }
            _ => (),
        }
    }
}

/// Egress
impl Handler<ConnectionActorMessage> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectionActorMessage, ctx: &mut Self::Context) -> Self::Result {
        match serde_json::to_string(&msg.0) {
            Ok(text) => ctx.text(text),
            Err(err) => log::error!("Failed to encode {}: {}", msg.0.name(), err),
        }
    }
}

pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    gateway: web::Data<Gateway>,
) -> Result<HttpResponse, Error> {
    ws::start(ConnectionActor::new(gateway), &req, stream)
}
