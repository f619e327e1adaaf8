use actix_web::{web, HttpResponse};

use crate::error::{ApiError, ConfigError};
use crate::models::{AppConfig, TargetConfig};
use crate::state::AppState;

const RESTART_HINT: &str = "restart the service to apply";

fn duplicate_name(name: &str) -> ConfigError {
    ConfigError::Invalid(format!("monitor name '{}' already exists", name))
}

pub async fn list_monitors(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let store = data.config_store.clone();
    let config = web::block(move || store.load()).await??;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "monitors": config.monitors
    })))
}

pub async fn get_monitor(
    data: web::Data<AppState>,
    path: web::Path<usize>,
) -> Result<HttpResponse, ApiError> {
    let index = path.into_inner();
    let store = data.config_store.clone();
    let config = web::block(move || store.load()).await??;

    let monitor = config
        .monitors
        .get(index)
        .ok_or_else(|| ApiError::NotFound(format!("monitor #{} does not exist", index)))?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "monitor": monitor
    })))
}

pub async fn add_monitor(
    data: web::Data<AppState>,
    req: web::Json<TargetConfig>,
) -> Result<HttpResponse, ApiError> {
    let monitor = req.into_inner();
    monitor.validate()?;
    let name = monitor.name.clone();

    let store = data.config_store.clone();
    web::block(move || {
        store.update(move |cfg| {
            if cfg.monitors.iter().any(|m| m.name == monitor.name) {
                return Err(duplicate_name(&monitor.name));
            }
            cfg.monitors.push(monitor);
            Ok(())
        })
    })
    .await??;

    log::info!("Monitor '{}' added via API", name);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Monitor '{}' added, {}", name, RESTART_HINT)
    })))
}

pub async fn update_monitor(
    data: web::Data<AppState>,
    path: web::Path<usize>,
    req: web::Json<TargetConfig>,
) -> Result<HttpResponse, ApiError> {
    let index = path.into_inner();
    let monitor = req.into_inner();
    monitor.validate()?;
    let name = monitor.name.clone();

    let store = data.config_store.clone();
    web::block(move || {
        store.update(move |cfg| {
            if index >= cfg.monitors.len() {
                return Err(ConfigError::NoSuchMonitor(index));
            }
            let clash = cfg
                .monitors
                .iter()
                .enumerate()
                .any(|(i, m)| i != index && m.name == monitor.name);
            if clash {
                return Err(duplicate_name(&monitor.name));
            }
            cfg.monitors[index] = monitor;
            Ok(())
        })
    })
    .await??;

    log::info!("Monitor #{} ('{}') updated via API", index, name);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Monitor '{}' updated, {}", name, RESTART_HINT)
    })))
}

pub async fn delete_monitor(
    data: web::Data<AppState>,
    path: web::Path<usize>,
) -> Result<HttpResponse, ApiError> {
    let index = path.into_inner();
    let store = data.config_store.clone();
    let removed = web::block(move || {
        store.update(move |cfg| {
            if index >= cfg.monitors.len() {
                return Err(ConfigError::NoSuchMonitor(index));
            }
            Ok(cfg.monitors.remove(index))
        })
    })
    .await??;

    log::info!("Monitor '{}' deleted via API", removed.name);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Monitor '{}' deleted, {}", removed.name, RESTART_HINT)
    })))
}

/// Full config document with secrets masked
pub async fn get_config(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let store = data.config_store.clone();
    let config = web::block(move || store.load()).await??;
    Ok(HttpResponse::Ok().json(config.redacted()))
}

pub async fn save_config(
    data: web::Data<AppState>,
    req: web::Json<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let mut new_config = req.into_inner();
    new_config.validate()?;

    let store = data.config_store.clone();
    web::block(move || {
        store.update(move |cfg| {
            new_config.restore_secret_from(cfg);
            *cfg = new_config;
            Ok(())
        })
    })
    .await??;

    log::info!("Configuration replaced via API");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": format!("Configuration saved, {}", RESTART_HINT)
    })))
}
