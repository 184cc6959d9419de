use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, dev::Server, get, post, web};
use course_core::model::{RunAccepted, RunRejected, RunRequest, RunStatus};
use tracing::{info, warn};

use crate::error::SupervisorError;
use crate::supervisor::TestSupervisor;

#[post("/run-tests")]
async fn run_tests(
    supervisor: web::Data<TestSupervisor>,
    body: Option<web::Json<RunRequest>>,
) -> impl Responder {
    let request = body.map(web::Json::into_inner).unwrap_or_default();

    match supervisor.try_start(&request) {
        Ok(()) => HttpResponse::Ok().json(RunAccepted {
            message: "Tests started".into(),
            running: true,
        }),
        Err(SupervisorError::AlreadyRunning) => {
            info!("run request rejected; tests already running");
            HttpResponse::Conflict().json(RunRejected {
                error: SupervisorError::AlreadyRunning.to_string(),
                running: true,
            })
        }
        Err(err @ SupervisorError::InvalidRequest(_)) => {
            warn!(error = %err, "rejecting run request");
            HttpResponse::BadRequest().json(RunRejected {
                error: err.to_string(),
                running: false,
            })
        }
        Err(err) => {
            warn!(error = %err, "test run could not be started");
            HttpResponse::InternalServerError().json(RunRejected {
                error: err.to_string(),
                running: supervisor.is_running(),
            })
        }
    }
}

#[get("/test-status")]
async fn test_status(supervisor: web::Data<TestSupervisor>) -> impl Responder {
    HttpResponse::Ok().json(RunStatus {
        running: supervisor.is_running(),
    })
}

/// Register the `/api` routes; `TestSupervisor` must be in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").service(run_tests).service(test_status));
}

/// Bind the run-trigger service to `bind` (e.g. `127.0.0.1:3001`).
///
/// # Errors
///
/// Returns the bind error if the address is unavailable.
pub fn start_server(supervisor: TestSupervisor, bind: &str) -> std::io::Result<Server> {
    let state = web::Data::new(supervisor);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind)?
    .run();

    info!(%bind, "test runner listening");
    Ok(server)
}
