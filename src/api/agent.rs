//! Handlers served in `agent` mode: the process listing contract the
//! watchdog's remote lister consumes.

use actix_web::{web, HttpResponse, Responder};

use crate::models::{AgentHealth, ProcessCheckResponse, ProcessListResponse};
use crate::services::process_checker::{count_processes, hostname, running_process_names};

fn scan_failed(e: impl std::fmt::Display) -> HttpResponse {
    log::error!("Process table scan failed: {}", e);
    HttpResponse::InternalServerError().json(ProcessListResponse {
        status: "error".into(),
        hostname: None,
        processes: Vec::new(),
        count: 0,
        error: Some(e.to_string()),
    })
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(AgentHealth {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        hostname: hostname(),
    })
}

pub async fn list_processes() -> impl Responder {
    match web::block(running_process_names).await {
        Ok(names) => {
            let processes: Vec<String> = names.into_iter().collect();
            HttpResponse::Ok().json(ProcessListResponse {
                status: "ok".into(),
                hostname: Some(hostname()),
                count: processes.len(),
                processes,
                error: None,
            })
        }
        Err(e) => scan_failed(e),
    }
}

pub async fn check_process(path: web::Path<String>) -> impl Responder {
    let name = path.into_inner();
    let lookup = name.clone();
    match web::block(move || count_processes(&lookup)).await {
        Ok(count) => HttpResponse::Ok().json(ProcessCheckResponse {
            status: "ok".into(),
            process: name,
            running: count > 0,
            count,
        }),
        Err(e) => scan_failed(e),
    }
}
