use actix_web::{web, HttpResponse, Responder};

use crate::state::AppState;

pub async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    match data.metrics.render() {
        Ok(metrics_text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(metrics_text),
        Err(e) => {
            log::error!("Failed to render metrics: {}", e);
            HttpResponse::InternalServerError().body("Failed to render metrics")
        }
    }
}

pub async fn get_status(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(data.status.report().await)
}
