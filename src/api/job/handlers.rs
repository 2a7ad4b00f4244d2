use actix_multipart::form::MultipartForm;
use actix_web::{
    delete, get, post, put,
    web::{Bytes, Data, Path, Query, ServiceConfig, scope},
    HttpResponse,
};
use actix_web_validator::Json;

use super::dto::{CompletionListResponse, JobListResponse, PayoutListResponse};
use super::models::{CompleteRequest, CompletionQuery, JobImportForm, JobRequest, SettingsRequest};
use super::service::{JobService, ServiceError};

#[get("")]
async fn list_jobs(service: Data<JobService>) -> HttpResponse {
    HttpResponse::Ok().json(JobListResponse {
        jobs: service.list_jobs().await,
    })
}

#[post("")]
async fn create_job(service: Data<JobService>, job: Json<JobRequest>) -> Result<HttpResponse, ServiceError> {
    let response = service.create_job(job.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

#[post("/import")]
async fn import_jobs(
    service: Data<JobService>,
    MultipartForm(form): MultipartForm<JobImportForm>,
) -> Result<HttpResponse, ServiceError> {
    let jobs: Vec<JobRequest> = serde_json::from_slice(&form.file.data).map_err(|e| {
        ServiceError::ValidationError(format!("Upload must be a JSON array of jobs: {}", e))
    })?;

    let response = service.bulk_create_jobs(jobs).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[get("/{id}")]
async fn get_job(service: Data<JobService>, path: Path<String>) -> Result<HttpResponse, ServiceError> {
    let job = service.get_job(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(job))
}

#[put("/{id}")]
async fn update_job(
    service: Data<JobService>,
    path: Path<String>,
    job: Json<JobRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.update_job(&path.into_inner(), job.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[delete("/{id}")]
async fn delete_job(service: Data<JobService>, path: Path<String>) -> Result<HttpResponse, ServiceError> {
    service.delete_job(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/{id}/start")]
async fn start_job(service: Data<JobService>, path: Path<String>) -> Result<HttpResponse, ServiceError> {
    let snapshot = service.start(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

#[post("/{id}/pause")]
async fn pause_job(service: Data<JobService>, path: Path<String>) -> Result<HttpResponse, ServiceError> {
    let snapshot = service.pause(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// The body is optional; an empty one pays into cash on hand
#[post("/{id}/complete")]
async fn complete_job(
    service: Data<JobService>,
    path: Path<String>,
    body: Bytes,
) -> Result<HttpResponse, ServiceError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CompleteRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::ValidationError(format!("Invalid completion request: {}", e)))?
    };

    let outcome = service.complete(&path.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/{id}/display")]
async fn job_display(service: Data<JobService>, path: Path<String>) -> Result<HttpResponse, ServiceError> {
    let frame = service.display_frame(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(frame))
}

#[get("/display")]
async fn all_displays(service: Data<JobService>) -> HttpResponse {
    HttpResponse::Ok().json(service.display_frames().await)
}

#[get("/completions")]
async fn list_completions(
    service: Data<JobService>,
    query: Query<CompletionQuery>,
) -> Result<HttpResponse, ServiceError> {
    let query = query.into_inner();
    let completions = service.completions(query.job_id.as_deref(), query.limit).await?;
    Ok(HttpResponse::Ok().json(CompletionListResponse { completions }))
}

#[get("/payouts")]
async fn list_payouts(service: Data<JobService>) -> HttpResponse {
    HttpResponse::Ok().json(PayoutListResponse {
        options: service.payout_options(),
    })
}

#[get("/settings")]
async fn get_settings(service: Data<JobService>) -> HttpResponse {
    HttpResponse::Ok().json(service.settings().await)
}

#[put("/settings")]
async fn update_settings(
    service: Data<JobService>,
    settings: Json<SettingsRequest>,
) -> Result<HttpResponse, ServiceError> {
    let response = service.update_settings(settings.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn job_config(config: &mut ServiceConfig) {
    config
        .service(
            scope("/jobs")
                .service(list_jobs)
                .service(create_job)
                .service(import_jobs)
                .service(get_job)
                .service(update_job)
                .service(delete_job)
                .service(start_job)
                .service(pause_job)
                .service(complete_job)
                .service(job_display),
        )
        .service(all_displays)
        .service(list_completions)
        .service(list_payouts)
        .service(get_settings)
        .service(update_settings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::validation;
    use crate::display::DisplaySynchronizer;
    use crate::engine::clock::testing::ManualClock;
    use crate::engine::{
        CompletionFinalizer, CompletionLedger, JobBoard, JobSettings, Money, PayoutOption,
        PayoutOptions,
    };
    use actix_web::{http::StatusCode, test, App};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;

    fn service(clock: Arc<ManualClock>) -> JobService {
        service_with(clock, JobSettings::default())
    }

    fn service_with(clock: Arc<ManualClock>, settings: JobSettings) -> JobService {
        let payouts = PayoutOptions::new(vec![PayoutOption::new("savings", "Savings Account", "")]);
        let board = Arc::new(JobBoard::new(
            CompletionFinalizer::new(CompletionLedger::in_memory(), payouts),
            settings,
        ));
        let display = Arc::new(DisplaySynchronizer::new(clock.clone(), Duration::from_secs(1)));
        JobService::new(board, display, clock)
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()))
    }

    macro_rules! app {
        ($service:expr) => {
            test::init_service(
                App::new()
                    .app_data(Data::new($service))
                    .app_data(validation::json_config())
                    .configure(job_config),
            )
            .await
        };
    }

    macro_rules! create {
        ($app:expr, $body:expr $(,)?) => {{
            let req = test::TestRequest::post().uri("/jobs").set_json($body).to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            let body: Value = test::read_body_json(resp).await;
            body["job"]["id"].as_str().unwrap().to_string()
        }};
    }

    #[actix_web::test]
    async fn time_job_session_round_trip() {
        let clock = clock();
        let settings = JobSettings {
            minimum_hourly_wage: Money::from_cents(1200),
            ..Default::default()
        };
        let app = app!(service_with(clock.clone(), settings));
        let id = create!(
            app,
            json!({"title": "Support", "pay_type": "time", "rate": 12.0, "daily_limit": 0}),
        );

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/start")).to_request();
        let started: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(started["status"], "active");
        assert_eq!(started["remaining"], "unlimited");
        assert_eq!(started["active_session_accumulated_seconds"], 0);

        clock.advance(3661);
        let req = test::TestRequest::post()
            .uri(&format!("/jobs/{id}/complete"))
            .set_json(json!({"payout_destination": "savings"}))
            .to_request();
        let done: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(done["completion"]["amount"], 12.21);
        assert_eq!(done["completion"]["payout_destination"], "savings");
        assert_eq!(done["completion"]["accrued_seconds"], 3661);
        assert_eq!(done["job"]["status"], "available");
        assert_eq!(done["job"]["active_session_started_at"], Value::Null);

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/complete")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"]["code"], "stale_state");
        assert_eq!(body["fields"]["job"]["id"], id.as_str());

        let req = test::TestRequest::get()
            .uri(&format!("/completions?job_id={id}"))
            .to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["completions"].as_array().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn task_job_reports_capacity_with_limit() {
        let app = app!(service(clock()));
        let id = create!(
            app,
            json!({"title": "Survey", "pay_type": "task", "rate": 25, "daily_limit": 1}),
        );

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/complete")).to_request();
        let done: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(done["completion"]["amount"], 25.0);
        assert_eq!(done["completion"]["payout_destination"], "hand");
        assert_eq!(done["job"]["status"], "at_capacity");
        assert_eq!(done["job"]["remaining"], 0);

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/complete")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Daily limit reached");
        assert_eq!(body["fields"]["limit"], 1);
        assert_eq!(body["fields"]["message"], "this job has reached its 1-per-day limit");
    }

    #[actix_web::test]
    async fn zero_accrual_is_unprocessable() {
        let app = app!(service(clock()));
        let id = create!(
            app,
            json!({"title": "Shift", "pay_type": "time", "rate": 12.0}));

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/complete")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn pause_on_idle_job_conflicts() {
        let app = app!(service(clock()));
        let id = create!(
            app,
            json!({"title": "Shift", "pay_type": "time", "rate": 20.0}));

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/pause")).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["fields"]["code"], "not_active");
        assert_eq!(body["fields"]["job"]["status"], "available");
    }

    #[actix_web::test]
    async fn unknown_job_is_not_found() {
        let app = app!(service(clock()));
        let req = test::TestRequest::post().uri("/jobs/99/start").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn invalid_job_request_is_rejected() {
        let app = app!(service(clock()));
        let req = test::TestRequest::post()
            .uri("/jobs")
            .set_json(json!({"title": "", "pay_type": "time", "rate": 0.0}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Validation failed");
        assert!(body["fields"]["title"].is_object());
        assert!(body["fields"]["rate"].is_object());
    }

    #[actix_web::test]
    async fn live_display_follows_session() {
        let clock = clock();
        let app = app!(service(clock.clone()));
        let id = create!(
            app,
            json!({"title": "Shift", "pay_type": "time", "rate": 18.0}));

        let req = test::TestRequest::get().uri(&format!("/jobs/{id}/display")).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/start")).to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::get().uri(&format!("/jobs/{id}/display")).to_request();
        let frame: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(frame["elapsed_display"], "00:00:00");

        clock.advance(120);
        let req = test::TestRequest::post().uri(&format!("/jobs/{id}/complete")).to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::get().uri("/display").to_request();
        let frames: Value = test::call_and_read_body_json(&app, req).await;
        assert!(frames.as_array().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn import_reports_per_job_errors() {
        let app = app!(service(clock()));
        let payload = json!([
            {"title": "Walk dogs", "pay_type": "task", "rate": 18},
            {"title": "", "pay_type": "task", "rate": 18},
            {"title": "Night shift", "pay_type": "time", "rate": 22.5, "daily_limit": 2}
        ]);
        let body = format!(
            "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"jobs.json\"\r\nContent-Type: application/json\r\n\r\n{}\r\n--XBOUNDARY--\r\n",
            payload
        );
        let req = test::TestRequest::post()
            .uri("/jobs/import")
            .insert_header(("content-type", "multipart/form-data; boundary=XBOUNDARY"))
            .set_payload(body)
            .to_request();
        let result: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(result["created"], 2);
        assert_eq!(result["errors"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/jobs").to_request();
        let listed: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listed["jobs"][0]["title"], "Night shift");
    }

    #[actix_web::test]
    async fn settings_round_trip() {
        let app = app!(service(clock()));
        let req = test::TestRequest::put()
            .uri("/settings")
            .set_json(json!({"minimum_hourly_wage": 18.0, "daily_reset_hour": 13}))
            .to_request();
        let settings: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(settings["minimum_hourly_wage"], 18.0);
        assert_eq!(settings["minimum_hourly_wage_display"], "$18.00");
        assert_eq!(settings["daily_reset_label"], "01:00 PM");

        let req = test::TestRequest::put()
            .uri("/settings")
            .set_json(json!({"daily_reset_hour": 24}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn payouts_always_include_cash() {
        let app = app!(service(clock()));
        let req = test::TestRequest::get().uri("/payouts").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["options"][0]["value"], "hand");
        assert_eq!(body["options"][1]["value"], "savings");
    }
}
