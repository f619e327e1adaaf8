pub mod agent;
pub mod metrics;
pub mod monitors;
pub mod probe;

pub use metrics::{get_metrics, get_status};
pub use monitors::{
    add_monitor, delete_monitor, get_config, get_monitor, list_monitors, save_config,
    update_monitor,
};
pub use probe::{test_agent, test_notification};

use actix_web::{web, HttpResponse, Responder};

use crate::error::ApiError;

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Malformed or mistyped JSON bodies get the same `{"success": false}` envelope
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Non-numeric or negative `{index}` segments get the error envelope too
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

/// Status and config surface of the watchdog
pub fn watchdog_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .route("/health", web::get().to(health))
        .route("/metrics", web::get().to(get_metrics))
        .route("/api/status", web::get().to(get_status))
        .route("/api/config", web::get().to(get_config))
        .route("/api/config", web::post().to(save_config))
        .route("/api/monitors", web::get().to(list_monitors))
        .route("/api/monitors", web::post().to(add_monitor))
        .route("/api/monitors/{index}", web::get().to(get_monitor))
        .route("/api/monitors/{index}", web::put().to(update_monitor))
        .route("/api/monitors/{index}", web::delete().to(delete_monitor))
        .route("/api/test-agent", web::post().to(test_agent))
        .route("/api/test-notification", web::post().to(test_notification));
}

/// Process listing surface served in agent mode
pub fn agent_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/health", web::get().to(agent::health))
        .route("/api/processes", web::get().to(agent::list_processes))
        .route("/api/process/{name}", web::get().to(agent::check_process));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::WatchdogMetrics;
    use crate::services::{AgentClient, ConfigStore, Notifier, StateEngine, StatusReporter};
    use crate::state::{AppContext, AppState};
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const SAMPLE: &str = r#"{
        "check_interval_seconds": 30,
        "notification": { "webhook_url": "https://example.com/hook", "secret": "s3cret" },
        "monitors": [
            { "name": "web-1", "host": "10.0.0.2", "port": 8888, "processes": ["nginx"] },
            { "name": "db-1", "host": "10.0.0.3", "port": 8888, "processes": ["mysqld"], "enabled": false }
        ]
    }"#;

    struct SwitchNotifier(AtomicBool);

    #[async_trait]
    impl Notifier for SwitchNotifier {
        async fn notify(&self, _message: &str) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn context(dir: &tempfile::TempDir, notify_ok: bool) -> AppState {
        let path = dir.path().join("config.json");
        std::fs::write(&path, SAMPLE).unwrap();
        let store = ConfigStore::new(path);
        let config = store.load().unwrap();

        let metrics = Arc::new(WatchdogMetrics::new().unwrap());
        let engine = Arc::new(StateEngine::new(Duration::from_secs(300), "test", metrics.clone()));
        let agent = AgentClient::new();
        // Only the disabled target, so status never probes a real network address
        let targets: Vec<_> = config.targets().into_iter().filter(|t| !t.enabled).collect();

        Arc::new(AppContext {
            config_store: store,
            status: StatusReporter::new(engine, agent.clone(), targets, false, 30, 300),
            notifier: Arc::new(SwitchNotifier(AtomicBool::new(notify_ok))),
            agent,
            metrics,
            reporter: "test-host".into(),
        })
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(watchdog_routes),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn add_monitor_appends_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let new = json!({"name": "cache", "host": "10.0.0.9", "port": 8888, "processes": ["redis-server"]});
        let req = test::TestRequest::post().uri("/api/monitors").set_json(&new).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::post().uri("/api/monitors").set_json(&new).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("already exists"));

        let config = state.config_store.load().unwrap();
        assert_eq!(config.monitors.len(), 3);
        assert_eq!(config.monitors[2].name, "cache");
    }

    #[actix_rt::test]
    async fn add_monitor_requires_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        // Missing host on a remote target
        let req = test::TestRequest::post()
            .uri("/api/monitors")
            .set_json(json!({"name": "x", "port": 8888, "processes": ["a"]}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Missing processes fails at deserialization, same envelope
        let req = test::TestRequest::post()
            .uri("/api/monitors")
            .set_json(json!({"name": "x", "host": "h", "port": 8888}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_rt::test]
    async fn update_and_delete_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::put()
            .uri("/api/monitors/0")
            .set_json(json!({"name": "web-1", "host": "10.0.0.20", "port": 9000, "processes": ["nginx", "php-fpm"]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        // Renaming onto another monitor's name is rejected
        let req = test::TestRequest::put()
            .uri("/api/monitors/0")
            .set_json(json!({"name": "db-1", "host": "10.0.0.20", "port": 9000, "processes": ["nginx"]}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete().uri("/api/monitors/5").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::delete().uri("/api/monitors/1").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let config = state.config_store.load().unwrap();
        assert_eq!(config.monitors.len(), 1);
        assert_eq!(config.monitors[0].port, Some(9000));
        assert_eq!(config.monitors[0].processes, vec!["nginx", "php-fpm"]);
    }

    #[actix_rt::test]
    async fn get_monitor_out_of_range_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/monitors/1").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["monitor"]["name"], "db-1");

        let req = test::TestRequest::get().uri("/api/monitors/7").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn malformed_index_gets_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        for uri in ["/api/monitors/abc", "/api/monitors/-1"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert!(body["error"].is_string());
        }
    }

    #[actix_rt::test]
    async fn config_read_masks_secret_and_write_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/config").to_request();
        let mut shown: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(shown["notification"]["secret"], "***");

        shown["alert_cooldown_seconds"] = json!(60);
        let req = test::TestRequest::post().uri("/api/config").set_json(&shown).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let stored = state.config_store.load().unwrap();
        assert_eq!(stored.alert_cooldown_seconds, 60);
        assert_eq!(stored.notification.secret.as_deref(), Some("s3cret"));
    }

    #[actix_rt::test]
    async fn config_write_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/config")
            .set_json(json!({"notification": {"webhook_url": ""}, "monitors": [], "bogus": 1}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_notification_reports_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let ok = app!(context(&dir, true));
        let req = test::TestRequest::post().uri("/api/test-notification").to_request();
        assert_eq!(test::call_service(&ok, req).await.status(), StatusCode::OK);

        let dir = tempfile::tempdir().unwrap();
        let failing = app!(context(&dir, false));
        let req = test::TestRequest::post().uri("/api/test-notification").to_request();
        let resp = test::call_service(&failing, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_rt::test]
    async fn test_agent_requires_host() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/test-agent")
            .set_json(json!({"host": "  "}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn status_and_metrics_render() {
        let dir = tempfile::tempdir().unwrap();
        let state = context(&dir, true);
        let app = app!(state);

        let req = test::TestRequest::get().uri("/api/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["monitors"][0]["name"], "db-1");
        assert_eq!(body["monitors"][0]["processes"][0]["running"], Value::Null);
        assert_eq!(body["monitors"][0]["processes"][0]["last_alert"], "never");

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn agent_routes_follow_contract() {
        let app = test::init_service(App::new().configure(agent_routes)).await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let req = test::TestRequest::get().uri("/api/processes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        let names: Vec<String> = serde_json::from_value(body["processes"].clone()).unwrap();
        assert_eq!(body["count"], names.len());
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);

        let req = test::TestRequest::get()
            .uri("/api/process/definitely-not-running-here")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["running"], false);
        assert_eq!(body["count"], 0);
    }
}
