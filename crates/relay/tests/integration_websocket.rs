//! End-to-End-Tests ueber einen echten WebSocket (tokio-tungstenite)

use chatly_relay::{RelayConfig, RelayResult, RelayServer, RelayState};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WARTEZEIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<RelayResult<()>>,
}

async fn server_starten() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Listener konnte nicht gebunden werden");
    let addr = listener.local_addr().unwrap();
    let state = RelayState::neu(RelayConfig::default());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = RelayServer::neu(state, addr);
    let handle = tokio::spawn(server.auf_listener_starten(listener, shutdown_rx));

    TestServer {
        addr,
        shutdown_tx,
        handle,
    }
}

async fn verbinden(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{addr}/socket"))
        .await
        .expect("WebSocket-Verbindung fehlgeschlagen");
    client
}

async fn senden(client: &mut Client, rahmen: Value) {
    client
        .send(Message::Text(rahmen.to_string()))
        .await
        .expect("Senden fehlgeschlagen");
}

/// Liest Rahmen bis einer das Praedikat erfuellt
async fn warten_auf(client: &mut Client, praedikat: impl Fn(&Value) -> bool) -> Value {
    tokio::time::timeout(WARTEZEIT, async {
        loop {
            let nachricht = client
                .next()
                .await
                .expect("Verbindung unerwartet beendet")
                .expect("Lesefehler");
            if let Message::Text(text) = nachricht {
                let rahmen: Value = serde_json::from_str(&text).expect("Rahmen ist kein JSON");
                if praedikat(&rahmen) {
                    return rahmen;
                }
            }
        }
    })
    .await
    .expect("Erwarteter Rahmen kam nicht an")
}

/// Liest die naechsten `anzahl` Text-Rahmen in Empfangsreihenfolge
async fn naechste_rahmen(client: &mut Client, anzahl: usize) -> Vec<Value> {
    tokio::time::timeout(WARTEZEIT, async {
        let mut rahmen = Vec::with_capacity(anzahl);
        while rahmen.len() < anzahl {
            let nachricht = client
                .next()
                .await
                .expect("Verbindung unerwartet beendet")
                .expect("Lesefehler");
            if let Message::Text(text) = nachricht {
                rahmen.push(serde_json::from_str(&text).expect("Rahmen ist kein JSON"));
            }
        }
        rahmen
    })
    .await
    .expect("Zu wenige Rahmen empfangen")
}

async fn online_liste_abwarten(client: &mut Client, erwartet: Value) {
    warten_auf(client, |r| r["event"] == "onlineUsers" && r["data"] == erwartet).await;
}

#[tokio::test]
async fn privatnachricht_und_logout_ueber_websocket() {
    let server = server_starten().await;
    let mut a = verbinden(server.addr).await;
    let mut b = verbinden(server.addr).await;

    senden(&mut a, json!({ "event": "userOnline", "data": 1 })).await;
    online_liste_abwarten(&mut a, json!([1])).await;

    senden(&mut b, json!({ "event": "userOnline", "data": "2" })).await;
    online_liste_abwarten(&mut b, json!([1, 2])).await;
    online_liste_abwarten(&mut a, json!([1, 2])).await;

    senden(
        &mut a,
        json!({
            "event": "privateMessage",
            "data": { "senderId": 1, "receiverId": 2, "message": "Hallo B", "messageId": 11 }
        }),
    )
    .await;

    let bei_b = warten_auf(&mut b, |r| r["event"] == "privateMessage").await;
    assert_eq!(bei_b["data"]["message"], "Hallo B");
    assert_eq!(bei_b["data"]["senderId"], 1);
    assert!(bei_b["data"]["timestamp"].is_string());

    let echo = warten_auf(&mut a, |r| r["event"] == "privateMessage").await;
    assert_eq!(echo["data"]["messageId"], 11);

    senden(&mut a, json!({ "event": "userLogout", "data": 1, "ack": 9 })).await;
    let ack = warten_auf(&mut a, |r| r.get("ack").is_some()).await;
    assert_eq!(ack, json!({ "ack": 9, "data": "ok" }));
    online_liste_abwarten(&mut b, json!([2])).await;

    // Trennen von B raeumt auf, A sieht die leere Liste
    b.close(None).await.unwrap();
    online_liste_abwarten(&mut a, json!([])).await;

    server.shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn logout_bestaetigung_kommt_nach_online_liste() {
    let server = server_starten().await;
    let mut a = verbinden(server.addr).await;

    senden(&mut a, json!({ "event": "userOnline", "data": 42 })).await;
    online_liste_abwarten(&mut a, json!([42])).await;

    senden(&mut a, json!({ "event": "userLogout", "data": 42, "ack": 1 })).await;
    let rahmen = naechste_rahmen(&mut a, 2).await;
    assert_eq!(rahmen[0], json!({ "event": "onlineUsers", "data": [] }));
    assert_eq!(rahmen[1], json!({ "ack": 1, "data": "ok" }));

    server.shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn kaputter_rahmen_schliesst_verbindung_nicht() {
    let server = server_starten().await;
    let mut a = verbinden(server.addr).await;

    a.send(Message::Text("kein json".into())).await.unwrap();
    senden(&mut a, json!({ "event": "joinRoom", "data": {} })).await;
    senden(&mut a, json!({ "event": "userOnline", "data": 3 })).await;

    online_liste_abwarten(&mut a, json!([3])).await;
    server.shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn fremder_origin_wird_abgelehnt() {
    let server = server_starten().await;

    let mut anfrage = format!("ws://{}/socket", server.addr)
        .into_client_request()
        .unwrap();
    anfrage
        .headers_mut()
        .insert("Origin", "https://boese.example".parse().unwrap());

    match connect_async(anfrage).await {
        Err(tungstenite::Error::Http(antwort)) => assert_eq!(antwort.status(), 403),
        Err(e) => panic!("unerwarteter Fehler: {e}"),
        Ok(_) => panic!("Upgrade haette abgelehnt werden muessen"),
    }

    let mut erlaubt = format!("ws://{}/socket", server.addr)
        .into_client_request()
        .unwrap();
    erlaubt
        .headers_mut()
        .insert("Origin", "http://localhost:5173".parse().unwrap());
    assert!(connect_async(erlaubt).await.is_ok());

    server.shutdown_tx.send(true).unwrap();
}

#[tokio::test]
async fn shutdown_schliesst_verbindungen() {
    let server = server_starten().await;
    let mut a = verbinden(server.addr).await;
    senden(&mut a, json!({ "event": "userOnline", "data": 1 })).await;
    online_liste_abwarten(&mut a, json!([1])).await;

    server.shutdown_tx.send(true).unwrap();

    let ende = tokio::time::timeout(WARTEZEIT, async {
        loop {
            match a.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(ende.is_ok(), "Verbindung wurde nicht geschlossen");

    let ergebnis = tokio::time::timeout(WARTEZEIT, server.handle)
        .await
        .expect("Server hat nicht beendet")
        .expect("Server-Task ist abgestuerzt");
    assert!(ergebnis.is_ok());
}
