//! WebSocket session tests against an in-process venue
//!
//! Covers the session lifecycle end to end:
//! - URL-embedded and command-frame subscriptions
//! - frame dispatch to the listener, including raw-deflate binaries
//! - reconnect after a dropped connection and the reconnect budget
//! - heartbeats and the final close

mod common;

use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde_json::json;
use std::io::Write;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

use adapter_service::input::Heartbeat;
use adapter_service::{venues, AdapterError, ConnectionState, SessionConfig, WsSession};
use common::{next_callback, wait_for_state, Callback, MockVenue, Recorder};
use types::{Direction, Endpoint, ParamMap, VenueId};

fn settings(venue: &MockVenue) -> SessionConfig {
    SessionConfig {
        url: Some(venue.url.clone()),
        reconnect_delay_ms: 20,
        reconnect_budget: 2,
        connect_timeout_ms: 2_000,
        ..SessionConfig::default()
    }
}

fn symbols(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|s| s.to_string()).collect())
}

#[tokio::test]
async fn test_url_subscription_dispatches_trades() {
    common::init_tracing();
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();

    let added = session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].channel, "trade:XBTUSD");
    assert_eq!(session.state(), ConnectionState::Connected);

    let connection = venue.next_connection().await;
    assert!(connection.target.contains("subscribe=trade%3AXBTUSD"), "{}", connection.target);
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    connection.push(Message::Text(
        json!({"table": "trade", "action": "insert", "data": [
            {"timestamp": "2018-10-16T17:46:28.104Z", "symbol": "XBTUSD", "side": "Buy",
             "size": 10, "price": 6760.5, "trdMatchID": "a"},
            {"timestamp": "2018-10-16T17:46:28.105Z", "symbol": "XBTUSD", "side": "Sell",
             "size": 5, "price": 6760, "trdMatchID": "b"}]})
        .to_string(),
    ));

    let Callback::Item(first) = next_callback(&mut callbacks).await else {
        panic!("expected an item");
    };
    let trade = first.as_trade().unwrap();
    assert_eq!(trade.direction, Some(Direction::Buy));
    assert_eq!(trade.identity.timestamp, Some(1_539_711_988_104));
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Item(_)));
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Batch(2)));

    // Processed in order, so the frame is fully accounted for once this returns
    let sets = session.subscriptions().await.unwrap();
    assert_eq!(sets.successful, sets.current);
    let metrics = session.metrics();
    assert_eq!(metrics.frames_received, 1);
    assert_eq!(metrics.items_dispatched, 2);
    assert_eq!(metrics.connects, 1);
}

#[tokio::test]
async fn test_live_subscribe_and_unsubscribe_send_commands() {
    let mut venue = MockVenue::start().await;
    let (recorder, _callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();

    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let mut connection = venue.next_connection().await;

    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["ETHUSD"]), ParamMap::new())
        .await
        .unwrap();
    assert_eq!(
        connection.next_json().await,
        json!({"op": "subscribe", "args": ["trade:ETHUSD"]})
    );

    // Already current: nothing goes out
    let added = session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    assert!(added.is_empty());

    let removed = session
        .unsubscribe(None, symbols(&["ETHUSD"]))
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(
        connection.next_json().await,
        json!({"op": "unsubscribe", "args": ["trade:ETHUSD"]})
    );

    let sets = session.subscriptions().await.unwrap();
    let channels: Vec<&str> = sets.current.iter().map(|key| key.channel.as_str()).collect();
    assert_eq!(channels, vec!["trade:XBTUSD"]);
    assert_eq!(sets.successful, sets.current);
}

#[tokio::test]
async fn test_command_venue_subscribes_after_open_and_inflates_frames() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Okex, settings(&venue), recorder).unwrap();

    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["ETH_BTC"]), ParamMap::new())
        .await
        .unwrap();
    let mut connection = venue.next_connection().await;
    assert_eq!(
        connection.next_json().await,
        json!({"event": "addChannel", "channel": "ok_sub_spot_eth_btc_deals"})
    );
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    let frame = json!([{"channel": "ok_sub_spot_eth_btc_deals",
        "data": [["232247914", "0.03225", "0.5", "15:49:21", "ask"]]}]);
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(frame.to_string().as_bytes()).unwrap();
    connection.push(Message::Binary(encoder.finish().unwrap()));

    let Callback::Item(item) = next_callback(&mut callbacks).await else {
        panic!("expected an item");
    };
    let trade = item.as_trade().unwrap();
    assert_eq!(trade.identity.symbol.as_deref(), Some("ETH_BTC"));
    assert_eq!(trade.identity.item_id.as_deref(), Some("232247914"));
    assert_eq!(trade.direction, Some(Direction::Sell));
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Batch(1)));
}

#[tokio::test]
async fn test_malformed_and_error_frames_are_dropped() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let connection = venue.next_connection().await;
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    connection.push(Message::Text("{not json".to_string()));
    connection.push(Message::Text(json!({"status": 400, "error": "Unknown symbol"}).to_string()));
    connection.push(Message::Text(json!({"success": true, "subscribe": "trade:XBTUSD"}).to_string()));

    // Give the reader a moment to queue the three frames before the snapshot request
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.subscriptions().await.unwrap();

    let metrics = session.metrics();
    assert_eq!(metrics.frames_received, 3);
    assert_eq!(metrics.frames_dropped, 1);
    assert_eq!(metrics.items_dispatched, 0);
    assert!(callbacks.try_recv().is_err());
}

#[tokio::test]
async fn test_reconnects_after_venue_drops_connection() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let first = venue.next_connection().await;
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    drop(first);
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Disconnected));

    let second = venue.next_connection().await;
    assert!(second.target.contains("subscribe=trade%3AXBTUSD"));
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    let mut states = session.state_changes();
    wait_for_state(&mut states, ConnectionState::Connected).await;
    session.subscriptions().await.unwrap();
    let metrics = session.metrics();
    assert_eq!(metrics.connects, 2);
    assert_eq!(metrics.reconnects, 1);
}

#[tokio::test]
async fn test_exhausted_reconnect_budget_closes_session() {
    let mut venue = MockVenue::start().await;
    let (recorder, _callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let connection = venue.next_connection().await;

    venue.refuse();
    drop(connection);

    let mut states = session.state_changes();
    wait_for_state(&mut states, ConnectionState::Closed).await;
    assert_eq!(session.metrics().reconnects, 2);

    // A caller connect starts over with a fresh budget
    assert!(session.connect().await.unwrap_err().is_recoverable());
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_passes_through_connecting() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let connection = venue.next_connection().await;
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    // The retry hangs in the handshake, so the session stays visibly in Connecting
    venue.stall();
    drop(connection);
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Disconnected));

    let mut states = session.state_changes();
    wait_for_state(&mut states, ConnectionState::Connecting).await;
}

#[tokio::test]
async fn test_no_items_from_a_dropped_connection() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Binance, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["ETHBTC"]), ParamMap::new())
        .await
        .unwrap();
    let connection = venue.next_connection().await;
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    // The venue streams trades until the client goes away
    let outgoing = connection.outgoing.clone();
    let streamer = tokio::spawn(async move {
        for id in 1u64.. {
            let frame = json!({"e": "trade", "E": 1_499_865_549_590i64, "s": "ETHBTC", "t": id,
                "p": "0.00100000", "q": "1.00000000", "T": 1_499_865_549_590i64, "m": true});
            if outgoing.send(Message::Text(frame.to_string())).is_err() {
                break;
            }
            tokio::task::yield_now().await;
        }
    });
    while !matches!(next_callback(&mut callbacks).await, Callback::Item(_)) {}

    session.unsubscribe(None, None).await.unwrap();
    while !matches!(next_callback(&mut callbacks).await, Callback::Disconnected) {}

    let late = tokio::time::timeout(Duration::from_millis(300), callbacks.recv()).await;
    assert!(late.is_err(), "callback after disconnect: {:?}", late);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    streamer.abort();
}

#[tokio::test]
async fn test_connect_without_subscriptions_is_refused() {
    let venue = MockVenue::start().await;
    let (recorder, _callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Binance, settings(&venue), recorder).unwrap();

    let error = session.connect().await.unwrap_err();
    assert!(matches!(error, AdapterError::NothingToSubscribe { venue: VenueId::Binance }));
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_url_only_venue_reopens_with_new_stream_set() {
    let mut venue = MockVenue::start().await;
    let (recorder, _callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Binance, settings(&venue), recorder).unwrap();

    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["ETHBTC"]), ParamMap::new())
        .await
        .unwrap();
    let first = venue.next_connection().await;
    assert_eq!(first.target, "/ws/ethbtc@trade");

    session
        .subscribe(None, symbols(&["LTCBTC"]), ParamMap::new())
        .await
        .unwrap();
    let second = venue.next_connection().await;
    assert_eq!(second.target, "/stream?streams=ethbtc@trade/ltcbtc@trade");

    session.unsubscribe(None, None).await.unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    let sets = session.subscriptions().await.unwrap();
    assert!(sets.current.is_empty() && sets.endpoints.is_empty() && sets.symbols.is_empty());
}

#[tokio::test]
async fn test_heartbeat_frames_are_sent() {
    let mut venue = MockVenue::start().await;
    let (recorder, _callbacks) = Recorder::new();
    let mut profile = venues::ws_profile(VenueId::Okex).unwrap();
    profile.schema.heartbeat = Some(Heartbeat {
        interval: Duration::from_millis(50),
        frame: r#"{"event":"ping"}"#.to_string(),
    });
    let session = WsSession::new(profile, settings(&venue), recorder).unwrap();

    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["eth_btc"]), ParamMap::new())
        .await
        .unwrap();
    let mut connection = venue.next_connection().await;
    assert_eq!(connection.next_json().await["event"], "addChannel");
    assert_eq!(connection.next_json().await, json!({"event": "ping"}));
    assert_eq!(connection.next_json().await, json!({"event": "ping"}));
}

#[tokio::test]
async fn test_close_is_final() {
    let mut venue = MockVenue::start().await;
    let (recorder, mut callbacks) = Recorder::new();
    let session = WsSession::for_venue(VenueId::Bitmex, settings(&venue), recorder).unwrap();
    session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["XBTUSD"]), ParamMap::new())
        .await
        .unwrap();
    let _connection = venue.next_connection().await;
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Connected));

    session.close().await.unwrap();
    assert_eq!(session.state(), ConnectionState::Closed);
    assert!(matches!(next_callback(&mut callbacks).await, Callback::Disconnected));

    let error = session
        .subscribe(Some(vec![Endpoint::Trade]), symbols(&["ETHUSD"]), ParamMap::new())
        .await
        .unwrap_err();
    assert!(matches!(error, AdapterError::SessionClosed { .. }));
}

#[test]
fn test_bitfinex_has_no_stream() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let _guard = runtime.enter();
    let (recorder, _callbacks) = Recorder::new();
    let error = WsSession::for_venue(VenueId::Bitfinex, SessionConfig::default(), recorder)
        .err()
        .unwrap();
    assert!(error.is_configuration());
}
