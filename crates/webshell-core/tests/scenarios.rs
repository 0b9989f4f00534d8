//! End-to-end flows through `Shell` with a recording host.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_shell, test_config, FakePushPlatform, RecordingHost};
use webshell_core::{
    Database, EnqueueOutcome, HostAction, LoadPhase, MessageSource, NotificationEvent,
    NotificationPayload, Orientation, PermissionStatus, PushConfig, PushPlatform, RequestOrigin,
    RoutingDecision, Shell,
};
use webshell_core::scripts;

fn shell(host: &Arc<RecordingHost>) -> Shell {
    build_shell(test_config(), host, Database::open_in_memory().unwrap())
}

fn push_shell(host: &Arc<RecordingHost>, db: Database, platform: Arc<dyn PushPlatform>) -> Shell {
    let mut config = test_config();
    config.push = Some(PushConfig {
        project_id: "shop-app".to_string(),
        app_id: "1:123:android:abc".to_string(),
        sender_id: None,
    });
    Shell::with_database(config, db, common::shell_host(host), Some(platform))
}

#[tokio::test]
async fn test_start_loads_base_url() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    let loaded = shell.start().await.unwrap();
    assert_eq!(loaded, "https://shop.example");
    assert_eq!(host.loads(), vec!["https://shop.example".to_string()]);
    assert_eq!(shell.router().phase(), LoadPhase::Loading);
}

#[tokio::test]
async fn test_stored_base_url_wins_over_config() {
    let host = RecordingHost::with_installed(&[]);
    let db = Database::open_in_memory().unwrap();
    db.set("base_url", "https://staging.shop.example").unwrap();
    let shell = build_shell(test_config(), &host, db);

    assert_eq!(shell.start().await.unwrap(), "https://staging.shop.example");
    assert_eq!(shell.base_url(), "https://staging.shop.example");
}

#[test]
fn test_store_host_is_handed_off() {
    let host = RecordingHost::with_installed(&["https://market.example"]);
    let shell = shell(&host);

    assert!(!shell.should_start_load("https://market.example/app/shop", RequestOrigin::Primary));
    assert_eq!(host.calls(), vec!["open https://market.example/app/shop".to_string()]);
    assert!(host.loads().is_empty());
}

#[test]
fn test_intent_falls_back_to_embedded_url() {
    let host = RecordingHost::with_installed(&["https://fallback.example"]);
    let shell = shell(&host);

    let intent = "intent://pay#Intent;scheme=toss;package=viva.republica.toss;\
                  S.browser_fallback_url=https%3A%2F%2Ffallback.example;end";
    assert!(!shell.should_start_load(intent, RequestOrigin::Primary));
    assert_eq!(host.calls(), vec!["open https://fallback.example".to_string()]);
    assert_eq!(host.count("prompt."), 0);
}

#[test]
fn test_missing_payment_app_offers_install() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    assert!(!shell.should_start_load("supertoss://pay?id=1", RequestOrigin::Primary));
    assert_eq!(
        host.calls(),
        vec!["prompt.app_not_installed Toss market://details?id=viva.republica.toss".to_string()]
    );
}

#[test]
fn test_accepted_install_offer_opens_store() {
    let host = RecordingHost::with_installed(&["market://"]);
    let shell = shell(&host);

    assert!(!shell.should_start_load("supertoss://pay?id=1", RequestOrigin::Primary));
    assert_eq!(
        host.count("prompt.app_not_installed Toss market://details?id=viva.republica.toss"),
        1
    );

    assert!(shell.accept_install("market://details?id=viva.republica.toss"));
    assert_eq!(host.count("open market://details?id=viva.republica.toss"), 1);
}

#[test]
fn test_accepted_install_offer_without_store_fails() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    assert!(!shell.accept_install("market://details?id=viva.republica.toss"));
    assert_eq!(host.count("open "), 0);
}

#[test]
fn test_pre_content_scripts_reach_both_surfaces() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    assert_eq!(
        host.pre_content.lock().clone(),
        vec![("primary", scripts::PRIMARY_PRE_CONTENT_SCRIPT.to_string())]
    );

    shell.on_open_window("https://pg.example/pay");
    assert_eq!(
        host.calls(),
        vec![
            "overlay.pre_content".to_string(),
            "overlay.present https://pg.example/pay".to_string(),
        ]
    );
    assert_eq!(
        host.pre_content.lock()[1],
        ("overlay", scripts::OVERLAY_PRE_CONTENT_SCRIPT.to_string())
    );
}

#[test]
fn test_ordinary_link_loads_in_place() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    assert!(shell.should_start_load("https://shop.example/item/1", RequestOrigin::Primary));
    assert!(host.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_payment_success_closes_overlay_and_reloads() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();

    assert_eq!(shell.on_open_window("https://pg.example/pay"), RoutingDecision::LoadInOverlay);
    assert_eq!(host.count("overlay.present https://pg.example/pay"), 1);

    shell.on_overlay_navigation_state_changed("https://pg.example/pay/success", true, Some("Done"));
    assert!(shell.router().has_pending_overlay_close());

    tokio::time::sleep(Duration::from_millis(900)).await;
    assert_eq!(host.count("overlay.dismiss"), 0);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(host.count("overlay.dismiss"), 1);
    assert_eq!(host.count("primary.reload"), 1);
    assert!(shell.snapshot().overlay.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_payment_complete_message_closes_once() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();
    shell.on_open_window("https://pg.example/pay");

    let raw = r#"{"type":"PAYMENT_COMPLETE"}"#;
    assert_eq!(shell.on_bridge_message(raw, MessageSource::Overlay), HostAction::ScheduleOverlayClose);
    shell.on_bridge_message(raw, MessageSource::Overlay);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.count("overlay.dismiss"), 1);
    assert_eq!(host.count("primary.reload"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_navigation_cancels_pending_close() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();
    shell.on_open_window("https://pg.example/pay");
    shell.on_overlay_navigation_state_changed("https://pg.example/complete", false, None);

    shell.on_load_start("https://shop.example/orders");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.count("primary.reload"), 0);
    assert!(shell.snapshot().overlay.is_some());
}

#[test]
fn test_close_window_dismisses_without_reload() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.on_open_window("https://pg.example/pay");

    shell.on_bridge_message(r#"{"type":"CLOSE_WINDOW"}"#, MessageSource::Overlay);
    assert_eq!(host.count("overlay.dismiss"), 1);
    assert_eq!(host.count("primary.reload"), 0);
}

#[test]
fn test_back_goes_to_overlay_first() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.on_navigation_state_changed("https://shop.example/cart", true);
    shell.on_open_window("https://pg.example/pay");
    shell.on_overlay_navigation_state_changed("https://pg.example/pay/step2", true, None);

    assert!(shell.handle_back());
    assert_eq!(host.count("overlay.back"), 1);
    assert_eq!(host.count("primary.back"), 0);
}

#[tokio::test]
async fn test_deep_link_before_start_is_delivered_once() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    let outcome = shell.on_incoming_link("app://product/42?ref=push").unwrap();
    assert_eq!(outcome, EnqueueOutcome::Queued);
    assert!(host.loads().is_empty());

    shell.start().await.unwrap();
    assert_eq!(
        host.loads(),
        vec![
            "https://shop.example".to_string(),
            "https://shop.example/?ref=push&deeplink_path=product%2F42&source=deeplink".to_string(),
        ]
    );
    assert!(shell.deep_links().pending().unwrap().is_none());

    // Already consumed: a second start-up finds nothing
    assert_eq!(shell.deep_links().try_deliver().unwrap(), None);
    assert_eq!(shell.last_deep_link().unwrap().url.as_deref(), Some("app://product/42?ref=push"));
}

#[tokio::test]
async fn test_deep_link_after_start_loads_and_notifies_page() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();

    let outcome = shell.on_incoming_link("https://shop.example/event/7").unwrap();
    assert_eq!(outcome, EnqueueOutcome::Delivered);
    assert_eq!(host.loads().last().map(String::as_str), Some("https://shop.example/event/7"));
    assert!(host
        .primary_scripts()
        .iter()
        .any(|s| s.contains("DEEP_LINK_RECEIVED")));

    assert_eq!(
        shell.on_incoming_link("https://shop.example/event/7").unwrap(),
        EnqueueOutcome::Duplicate
    );
    assert_eq!(host.loads().len(), 2);
}

#[test]
fn test_invalid_link_is_rejected() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    assert!(shell.on_incoming_link("not a url").is_err());
    assert!(shell.deep_links().pending().unwrap().is_none());
}

#[tokio::test]
async fn test_token_request_answers_are_identical() {
    let host = RecordingHost::with_installed(&[]);
    let platform = FakePushPlatform::new(PermissionStatus::Granted, Some("tok-1"));
    let shell = push_shell(&host, Database::open_in_memory().unwrap(), platform);
    shell.start().await.unwrap();

    let raw = r#"{"type":"FCM_TOKEN_REQUEST"}"#;
    for _ in 0..3 {
        shell.on_bridge_message(raw, MessageSource::Primary);
    }

    let scripts = host.primary_scripts();
    assert_eq!(scripts.len(), 3);
    assert!(scripts.windows(2).all(|pair| pair[0] == pair[1]));
    assert!(scripts[0].contains(r#"window.fcmToken = "tok-1";"#));
}

#[tokio::test]
async fn test_push_token_is_appended_and_refreshed() {
    let host = RecordingHost::with_installed(&[]);
    let db = Database::open_in_memory().unwrap();
    let platform = FakePushPlatform::new(PermissionStatus::Granted, Some("tok-1"));
    let shell = push_shell(&host, db.clone(), platform);

    assert_eq!(shell.start().await.unwrap(), "https://shop.example/?token=tok-1");
    assert_eq!(shell.token().as_deref(), Some("tok-1"));

    shell.on_token_refresh("tok-2");
    assert_eq!(shell.token().as_deref(), Some("tok-2"));
    // Nothing reloads on refresh; the page is told instead
    assert_eq!(host.loads().len(), 1);
    assert!(host
        .primary_scripts()
        .last()
        .is_some_and(|s| s.contains("FCM_TOKEN_RESPONSE") && s.contains("tok-2")));

    shell.on_incoming_link("https://shop.example/sale").unwrap();
    assert_eq!(
        host.loads().last().map(String::as_str),
        Some("https://shop.example/sale?token=tok-2")
    );
}

#[tokio::test]
async fn test_push_denied_runs_without_token() {
    let host = RecordingHost::with_installed(&[]);
    let platform = FakePushPlatform::new(PermissionStatus::Denied, Some("never"));
    let shell = push_shell(&host, Database::open_in_memory().unwrap(), platform);

    assert_eq!(shell.start().await.unwrap(), "https://shop.example");
    assert_eq!(shell.token(), None);

    shell.on_bridge_message(r#"{"type":"FCM_TOKEN_REQUEST"}"#, MessageSource::Primary);
    assert!(host.primary_scripts()[0].contains(r#"window.fcmToken = "";"#));
}

#[tokio::test(start_paused = true)]
async fn test_loading_timeout_clears_spinner() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();
    assert!(shell.snapshot().is_loading);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(!shell.snapshot().is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_page_loaded_message_clears_spinner_early() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();

    shell.on_load_progress(0.5);
    assert!(shell.snapshot().is_loading);
    shell.on_bridge_message(r#"{"type":"PAGE_LOADED"}"#, MessageSource::Primary);
    assert!(!shell.snapshot().is_loading);

    // The old timer must not disturb a later navigation
    tokio::time::sleep(Duration::from_secs(6)).await;
    shell.on_load_start("https://shop.example/cart");
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(shell.snapshot().is_loading);
}

#[test]
fn test_last_url_is_persisted() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    shell.on_navigation_state_changed("https://shop.example/cart", true);
    assert_eq!(shell.last_url().unwrap().as_deref(), Some("https://shop.example/cart"));
}

#[test]
fn test_load_error_prompts_and_retries() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.on_load_start("https://shop.example/offline");

    shell.on_load_error("net::ERR_INTERNET_DISCONNECTED");
    assert_eq!(host.count("prompt.load_failed https://shop.example/offline"), 1);
    assert!(!shell.snapshot().is_loading);

    shell.router().retry_load().unwrap();
    assert_eq!(host.loads(), vec!["https://shop.example/offline".to_string()]);
}

#[tokio::test]
async fn test_opened_notification_navigates() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();

    let payload = NotificationPayload {
        title: Some("Sale".to_string()),
        body: Some("Spring sale".to_string()),
        data: [("url".to_string(), "https://shop.example/spring".to_string())]
            .into_iter()
            .collect(),
    };
    let outcome = shell.on_notification(NotificationEvent::Opened, &payload);

    assert!(outcome.alert.is_none());
    assert_eq!(host.loads().last().map(String::as_str), Some("https://shop.example/spring"));
    assert!(host
        .primary_scripts()
        .iter()
        .any(|s| s.contains("NOTIFICATION_RECEIVED")));
}

#[tokio::test]
async fn test_foreground_notification_waits_for_confirmation() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);
    shell.start().await.unwrap();

    let payload = NotificationPayload {
        title: Some("Order shipped".to_string()),
        body: None,
        data: [("url".to_string(), "https://shop.example/orders/9".to_string())]
            .into_iter()
            .collect(),
    };
    let outcome = shell.on_notification(NotificationEvent::Foreground, &payload);
    assert_eq!(host.count("alert Order shipped"), 1);
    assert_eq!(host.loads().len(), 1);

    let alert = outcome.alert.unwrap();
    shell.accept_notification(&alert).unwrap();
    assert_eq!(host.loads().last().map(String::as_str), Some("https://shop.example/orders/9"));
}

#[test]
fn test_orientation_and_malformed_messages() {
    let host = RecordingHost::with_installed(&[]);
    let shell = shell(&host);

    let action = shell.on_bridge_message(
        r#"{"type":"ORIENTATION_CHANGE","orientation":"landscape"}"#,
        MessageSource::Primary,
    );
    assert_eq!(action, HostAction::LockOrientation(Orientation::Landscape));
    assert_eq!(host.calls(), vec!["display.lock landscape".to_string()]);

    assert_eq!(shell.on_bridge_message("{broken", MessageSource::Primary), HostAction::Ignore);
    assert_eq!(host.calls().len(), 1);
}
