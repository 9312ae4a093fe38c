//! End-to-end tests over a real WebSocket connection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use banana_clicker::{
    AchievementTracker, Dispatcher, GameServer, MemoryStore, Reply, ServerConfig,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (Arc<GameServer<MemoryStore>>, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dispatcher = Arc::new(Dispatcher::new(MemoryStore::new(), Arc::new(AchievementTracker::new())));
    let config = ServerConfig { bind_addr: addr, ..Default::default() };
    let server = Arc::new(GameServer::new(config, dispatcher));

    let running = server.clone();
    tokio::spawn(async move { running.run_on(listener).await });

    (server, format!("ws://{}", addr))
}

async fn request(ws: &mut Ws, frame: &str) -> Reply {
    ws.send(Message::Text(frame.to_string())).await.unwrap();
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("reply timed out")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return Reply::from_json(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_click_and_upgrade_over_websocket() {
    let (server, url) = start_server().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let reply = request(&mut ws, "GetUserData|==|player-1|==|x|==|true").await;
    assert_eq!(reply.function, "GetUserDataReply");
    assert_eq!(reply.data.len(), 4);
    assert_eq!(reply.data[1], 0);

    for _ in 0..10 {
        let reply = request(&mut ws, "BananaClicked|==|player-1").await;
        assert_eq!(reply, Reply::success("BananaClicked"));
    }

    let reply = request(&mut ws, "Upgrade|==|player-1|==|x|==|0|-+-|client-payload").await;
    assert_eq!(reply, Reply::success("Upgrade"));

    let reply = request(&mut ws, "GetUserData|==|player-1|==|x|==|true").await;
    assert_eq!(reply.data[0], r#"{"upgradeList":[{"code":0,"number":1},{"code":1,"number":0}]}"#);
    assert_eq!(reply.data[1], 0);
    assert_eq!(reply.data[3], r#"{"achievementList":[{"code":0,"number":10},{"code":1,"number":1}]}"#);

    server.shutdown();
}

#[tokio::test]
async fn test_bad_frames_get_error_replies() {
    let (server, url) = start_server().await;
    let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

    let reply = request(&mut ws, "Jump|==|player-2").await;
    assert_eq!(reply, Reply::unknown("Jump"));

    let reply = request(&mut ws, "ChangeLanguage|==|player-2|==|x|==|english").await;
    assert_eq!(
        reply,
        Reply::failure("ChangeLanguage", "Expected parameter 3 to be of type number, but got \"english\".")
    );

    let reply = request(&mut ws, "BananaClicked|==|player-2").await;
    assert_eq!(reply, Reply::failure("BananaClicked", "Result length is 0"));

    assert_eq!(server.connection_count().await, 1);
    server.shutdown();
}
