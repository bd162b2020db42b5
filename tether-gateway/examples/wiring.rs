//! Minimal wiring example: an in-memory loopback transport, a printing
//! applier and error sink, and a few simulated pushes.
//!
//! Run with `cargo run -p tether-gateway --example wiring`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use tether_gateway::{
    Config, ErrorEnvelope, ErrorSink, Gateway, InvocationError, NormalizedUpdate, Transport,
    TransportEvent, UpdateApplier,
};
use tether_types::{
    ConnectionState, Container, Peer, Push, Request, Response, ShardId, Update, User, UserId,
};

struct LoopbackTransport;

#[async_trait]
impl Transport for LoopbackTransport {
    async fn invoke(
        &self,
        request: &Request,
        _shard:  Option<ShardId>,
    ) -> Result<Response, InvocationError> {
        match request {
            Request::GetSelf => Ok(Response::Users(vec![User {
                id:         UserId(1),
                min:        false,
                first_name: Some("Demo".into()),
                last_name:  None,
                username:   Some("demo".into()),
                is_bot:     false,
                is_premium: false,
                photo:      None,
            }])),
            Request::GetState => Ok(Response::State { seq: 0 }),
            _ => Ok(Response::Bool(true)),
        }
    }
}

struct PrintingApplier;

#[async_trait]
impl UpdateApplier for PrintingApplier {
    async fn apply_batch(&self, batch: Vec<NormalizedUpdate>) {
        println!("applying batch of {}:", batch.len());
        for update in &batch {
            println!("  {update:?}");
        }
    }
}

struct PrintingSink;

impl ErrorSink for PrintingSink {
    fn report(&self, error: ErrorEnvelope) {
        eprintln!("request failed: {error}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let (events, rx) = mpsc::unbounded_channel();
    let gateway = Gateway::new(
        Arc::new(LoopbackTransport),
        rx,
        Arc::new(PrintingApplier),
        Arc::new(PrintingSink),
        Config::default(),
    );

    // The transport comes up...
    events.send(TransportEvent::Connection(ConnectionState::Connected)).unwrap();

    // ...we learn who we are...
    let me = gateway.fetch_self().await.expect("loopback always answers");
    println!("signed in as {}", me.display_name());

    // ...and a burst of pushes arrives, coalesced into one batch.
    events.send(TransportEvent::Push(Push::Container(Container::unsequenced(vec![
        Update::UserTyping { peer: Peer::User(UserId(1)), user_id: UserId(1) },
        Update::UserStatus { user_id: UserId(1), online: true },
    ])))).unwrap();
    events.send(TransportEvent::Push(Push::Single(
        Update::UserStatus { user_id: UserId(1), online: false },
    ))).unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    gateway.destroy(false).await;
}
