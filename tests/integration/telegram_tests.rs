use promo_watcher::AppError;
use promo_watcher::bot::process_update;
use promo_watcher::commands::CommandHandler;
use promo_watcher::config::TelegramConfig;
use promo_watcher::plugins::notifiers::TelegramNotifier;
use promo_watcher::plugins::{Notification, NotifierPlugin};
use promo_watcher::product_manager::ProductManager;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::create_test_context;

const TOKEN: &str = "123456:TEST";

fn notifier(server: &MockServer) -> TelegramNotifier {
    TelegramNotifier::new(&TelegramConfig {
        bot_token: TOKEN.to_string(),
        chat_id: Some(99),
        api_base_url: server.uri(),
        poll_timeout_secs: 1,
    })
    .unwrap()
}

fn api_path(method_name: &str) -> String {
    format!("/bot{}/{}", TOKEN, method_name)
}

#[tokio::test]
async fn test_send_message() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .and(body_partial_json(json!({ "chat_id": 99, "text": "Price dropped" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 77 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let message_id = notifier(&server).send_message(99, "Price dropped").await?;
    assert_eq!(message_id, 77);
    Ok(())
}

#[tokio::test]
async fn test_rejected_message_is_unsuccessful_notification() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let telegram = notifier(&server);
    let err = telegram.send_message(5, "hi").await.unwrap_err();
    assert!(matches!(err, AppError::Plugin { .. }));

    let result = telegram
        .notify(&Notification {
            channel_id: 5,
            message: "hi".to_string(),
        })
        .await?;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Bad Request: chat not found"));
    Ok(())
}

#[tokio::test]
async fn test_get_updates() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .and(body_partial_json(json!({ "offset": 11 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {
                    "update_id": 11,
                    "message": { "message_id": 1, "chat": { "id": 99 }, "text": "/list" }
                },
                { "update_id": 12 }
            ]
        })))
        .mount(&server)
        .await;

    let updates = notifier(&server).get_updates(Some(11), 1).await?;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].update_id, 11);
    let message = updates[0].message.as_ref().unwrap();
    assert_eq!(message.chat.id, 99);
    assert_eq!(message.text.as_deref(), Some("/list"));
    assert!(updates[1].message.is_none());
    Ok(())
}

#[tokio::test]
async fn test_command_reply_round_trip() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getUpdates")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 30,
                "message": { "message_id": 3, "chat": { "id": 99 }, "text": "/list" }
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api_path("sendMessage")))
        .and(body_partial_json(json!({ "chat_id": 99 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 4 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = create_test_context().await?;
    let handler = CommandHandler::new(ProductManager::new(ctx.tracker.clone()), Some(99));
    let telegram = notifier(&server);

    let mut updates = telegram.get_updates(None, 1).await?;
    let update = updates.remove(0);
    assert!(process_update(&telegram, &handler, update).await?);
    Ok(())
}

#[tokio::test]
async fn test_bot_username_checks_token() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("getMe")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "id": 123456, "is_bot": true, "username": "promo_watch_bot" }
        })))
        .mount(&server)
        .await;

    let telegram = notifier(&server);
    assert_eq!(telegram.bot_username().await?.as_deref(), Some("promo_watch_bot"));
    assert!(telegram.test_connection().await?);
    Ok(())
}
