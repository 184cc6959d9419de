use std::time::Duration;

use actix_web::{App, http::StatusCode, test, web};
use course_core::model::{RunAccepted, RunRejected, RunStatus};
use runner::{SupervisorConfig, TestSupervisor, configure};

fn supervisor(command: &str) -> TestSupervisor {
    TestSupervisor::new(SupervisorConfig {
        base_command: command.into(),
        process_timeout: Duration::from_secs(10),
        force_reset: Duration::from_secs(15),
        ..SupervisorConfig::default()
    })
}

#[actix_web::test]
async fn status_is_idle_before_any_run() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(supervisor("true")))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/test-status").to_request();
    let status: RunStatus = test::call_and_read_body_json(&app, req).await;
    assert!(!status.running);
}

#[actix_web::test]
async fn second_start_conflicts_while_first_runs() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(supervisor("sleep 5")))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/run-tests")
        .set_json(serde_json::json!({"testFile": "02-Session1-Props.test.tsx", "exerciseNumber": "3"}))
        .to_request();
    let accepted: RunAccepted = test::call_and_read_body_json(&app, req).await;
    assert_eq!(accepted.message, "Tests started");
    assert!(accepted.running);

    let req = test::TestRequest::post().uri("/api/run-tests").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let rejected: RunRejected = test::read_body_json(resp).await;
    assert_eq!(rejected.error, "Tests are already running");
    assert!(rejected.running);

    let req = test::TestRequest::get().uri("/api/test-status").to_request();
    let status: RunStatus = test::call_and_read_body_json(&app, req).await;
    assert!(status.running);
}

#[actix_web::test]
async fn run_without_body_runs_everything() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(supervisor("true")))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post().uri("/api/run-tests").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn unsafe_file_name_is_a_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(supervisor("true")))
            .configure(configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/run-tests")
        .set_json(serde_json::json!({"testFile": "$(reboot)"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/test-status").to_request();
    let status: RunStatus = test::call_and_read_body_json(&app, req).await;
    assert!(!status.running);
}
