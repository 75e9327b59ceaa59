//! Test servers.
//!
//! `start_server` runs a small in-memory Redis stand-in (strings, hashes and
//! pub/sub). `scripted_server` accepts a single connection and hands the raw
//! socket to the test, for replies a well-behaved server would never send.

#![allow(dead_code)]

use bytes::Bytes;
use session_lib::{Config, Connection, Frame, Session, SessionState};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

pub async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let db = Db::new();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let db = db.clone();
            tokio::spawn(async move { process(Connection::new(socket), db).await });
        }
    });

    addr
}

pub async fn scripted_server<F, Fut>(script: F) -> SocketAddr
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        script(socket).await;
    });

    addr
}

pub fn config(addr: SocketAddr) -> Config {
    Config::new(addr.ip().to_string(), addr.port())
}

pub async fn connect(addr: SocketAddr) -> Session {
    Session::connect_with(config(addr)).await.unwrap()
}

pub fn bulk(s: &str) -> Frame {
    Frame::Bulk(Bytes::from(s.to_string()))
}

pub fn push(kind: &str, channel: &str, payload: &str) -> Frame {
    Frame::Array(vec![bulk(kind), bulk(channel), bulk(payload)])
}

pub fn confirmation(kind: &str, channel: &str, count: i64) -> Frame {
    Frame::Array(vec![bulk(kind), bulk(channel), Frame::Integer(count)])
}

/// Read one request and return its arguments.
pub async fn read_request(conn: &mut Connection) -> Vec<String> {
    match conn.read_frame().await.unwrap() {
        Some(Frame::Array(parts)) => parts.iter().map(ToString::to_string).collect(),
        other => panic!("expected a request, got {other:?}"),
    }
}

/// Keep the socket open until the client goes away.
pub async fn drain(conn: &mut Connection) {
    while let Ok(Some(_)) = conn.read_frame().await {}
}

pub async fn wait_for_disconnect(session: &Session) {
    let mut state = session.watch();
    tokio::time::timeout(
        Duration::from_secs(1),
        state.wait_for(|state| matches!(state, SessionState::Disconnected)),
    )
    .await
    .expect("session did not disconnect")
    .unwrap();
}

#[derive(Clone)]
struct Db {
    state: Arc<Mutex<State>>,

    /// Every published message; connections keep the ones they subscribed to.
    events: broadcast::Sender<(String, Bytes)>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Bytes>,
    hashes: HashMap<String, HashMap<String, Bytes>>,
    subscribers: HashMap<String, i64>,
}

impl Db {
    fn new() -> Db {
        let (events, _) = broadcast::channel(1024);

        Db {
            state: Arc::new(Mutex::new(State::default())),
            events,
        }
    }

    fn apply(&self, frame: Frame, channels: &mut HashSet<String>) -> Vec<Frame> {
        let args: Vec<Bytes> = match frame {
            Frame::Array(parts) => parts
                .into_iter()
                .filter_map(|part| match part {
                    Frame::Bulk(data) => Some(data),
                    Frame::Simple(s) => Some(Bytes::from(s)),
                    _ => None,
                })
                .collect(),
            other => return vec![Frame::Error(format!("ERR expected array, got {other}"))],
        };
        let text = |i: usize| String::from_utf8_lossy(&args[i]).to_string();

        let name = text(0).to_lowercase();
        let mut state = self.state.lock().unwrap();

        match (name.as_str(), args.len()) {
            ("set", 3) => {
                state.entries.insert(text(1), args[2].clone());
                vec![Frame::Simple("OK".to_string())]
            }
            ("get", 2) => vec![state.entries.get(&text(1)).cloned().map_or(Frame::Null, Frame::Bulk)],
            ("hset", 4) => {
                let hash = state.hashes.entry(text(1)).or_default();
                let added = hash.insert(text(2), args[3].clone()).is_none();
                vec![Frame::Integer(i64::from(added))]
            }
            ("hget", 3) => {
                let value = state.hashes.get(&text(1)).and_then(|hash| hash.get(&text(2)));
                vec![value.cloned().map_or(Frame::Null, Frame::Bulk)]
            }
            ("hgetall", 2) => {
                let mut entries = vec![];
                for (field, value) in state.hashes.get(&text(1)).into_iter().flatten() {
                    entries.push(bulk(field));
                    entries.push(Frame::Bulk(value.clone()));
                }
                vec![Frame::Array(entries)]
            }
            ("publish", 3) => {
                let channel = text(1);
                let receivers = state.subscribers.get(&channel).copied().unwrap_or(0);
                let _ = self.events.send((channel, args[2].clone()));
                vec![Frame::Integer(receivers)]
            }
            ("subscribe", n) if n > 1 => (1..n)
                .map(|i| {
                    let channel = text(i);
                    if channels.insert(channel.clone()) {
                        *state.subscribers.entry(channel.clone()).or_default() += 1;
                    }
                    confirmation("subscribe", &channel, channels.len() as i64)
                })
                .collect(),
            ("unsubscribe", n) => {
                let targets: Vec<String> = if n == 1 {
                    channels.iter().cloned().collect()
                } else {
                    (1..n).map(text).collect()
                };

                targets
                    .into_iter()
                    .map(|channel| {
                        if channels.remove(&channel) {
                            if let Some(count) = state.subscribers.get_mut(&channel) {
                                *count -= 1;
                            }
                        }
                        confirmation("unsubscribe", &channel, channels.len() as i64)
                    })
                    .collect()
            }
            _ => vec![Frame::Error(format!("ERR unknown command '{name}'"))],
        }
    }

    fn forget(&self, channels: &HashSet<String>) {
        let mut state = self.state.lock().unwrap();
        for channel in channels {
            if let Some(count) = state.subscribers.get_mut(channel) {
                *count -= 1;
            }
        }
    }
}

async fn process(mut conn: Connection, db: Db) {
    let mut channels = HashSet::new();
    let _ = serve(&mut conn, &db, &mut channels).await;
    db.forget(&channels);
}

async fn serve(
    conn: &mut Connection,
    db: &Db,
    channels: &mut HashSet<String>,
) -> session_lib::Result<()> {
    let mut events = db.events.subscribe();

    loop {
        tokio::select! {
            frame = conn.read_frame() => {
                let Some(frame) = frame? else {
                    return Ok(());
                };

                for reply in db.apply(frame, channels) {
                    conn.write_frame(&reply).await?;
                }
            }
            Ok((channel, payload)) = events.recv() => {
                if channels.contains(&channel) {
                    let message = Frame::Array(vec![bulk("message"), bulk(&channel), Frame::Bulk(payload)]);
                    conn.write_frame(&message).await?;
                }
            }
        }
    }
}
