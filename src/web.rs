use actix_web::{middleware, web, App, HttpResponse, HttpServer, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ErrorKind, SchedulerError};
use crate::form::{
    BatchRequest, GenerateRequest, NextTurnRequest, PartitionRequest, RandomizeRequest,
    ReassignRequest,
};
use crate::parser::read_roster;
use crate::schedule::batch::BatchResult;
use crate::schedule::{CleaningGroup, Program};
use crate::service::SchedulingService;

#[derive(Serialize)]
struct ProgramResponse {
    success: bool,
    program: Program,
}

#[derive(Serialize)]
struct BatchResponse {
    success: bool,
    targets: usize,
    flagged: usize,
    failures: usize,
    #[serde(flatten)]
    result: BatchResult,
}

#[derive(Serialize)]
struct GroupsResponse {
    success: bool,
    groups: Vec<CleaningGroup>,
}

#[derive(Serialize)]
struct GroupResponse {
    success: bool,
    group: CleaningGroup,
}

/// JSON error body with a status code per error kind
fn error_response(err: &SchedulerError) -> HttpResponse {
    let kind = err.kind();
    let mut builder = match kind {
        ErrorKind::Configuration => HttpResponse::BadRequest(),
        ErrorKind::NotFound => HttpResponse::NotFound(),
        ErrorKind::DuplicateTarget | ErrorKind::InvalidState => HttpResponse::Conflict(),
        ErrorKind::Timeout => HttpResponse::ServiceUnavailable(),
    };
    builder.json(serde_json::json!({
        "success": false,
        "kind": kind,
        "error": err.to_string(),
    }))
}

fn program_response(result: crate::error::Result<Program>) -> HttpResponse {
    match result {
        Ok(program) => HttpResponse::Ok().json(ProgramResponse {
            success: true,
            program,
        }),
        Err(err) => error_response(&err),
    }
}

// Single-date generation endpoint
async fn generate(
    req: web::Json<GenerateRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.generate(&req).await))
}

// Batch generation endpoint; per-target failures still return 200
async fn batch_generate(
    req: web::Json<BatchRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    match service.batch_generate(req.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Ok().json(BatchResponse {
            success: true,
            targets: result.len(),
            flagged: result.flagged(),
            failures: result.failures(),
            result,
        })),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_program(
    id: web::Path<Uuid>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.program(*id).await))
}

async fn list_programs(service: web::Data<SchedulingService>) -> Result<HttpResponse> {
    let programs = service.programs().await;
    Ok(HttpResponse::Ok().json(serde_json::json!({"success": true, "programs": programs})))
}

async fn commit_program(
    id: web::Path<Uuid>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.commit(*id).await))
}

async fn cancel_program(
    id: web::Path<Uuid>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.cancel(*id).await))
}

async fn discard_program(
    id: web::Path<Uuid>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    match service.discard(*id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(serde_json::json!({"success": true}))),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn reassign_program(
    id: web::Path<Uuid>,
    req: web::Json<ReassignRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.reassign(*id, &req).await))
}

async fn randomize_program(
    id: web::Path<Uuid>,
    req: web::Json<RandomizeRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    Ok(program_response(service.randomize(*id, &req).await))
}

async fn partition_groups(
    req: web::Json<PartitionRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    match service.partition_groups(&req).await {
        Ok(groups) => Ok(HttpResponse::Ok().json(GroupsResponse {
            success: true,
            groups,
        })),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn next_group_turn(
    req: web::Json<NextTurnRequest>,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    match service.next_group_turn(&req).await {
        Ok(group) => Ok(HttpResponse::Ok().json(GroupResponse {
            success: true,
            group,
        })),
        Err(err) => Ok(error_response(&err)),
    }
}

async fn get_groups(service: web::Data<SchedulingService>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(GroupsResponse {
        success: true,
        groups: service.groups().await,
    }))
}

// Roster CSV upload endpoint
async fn upload_roster(
    body: web::Bytes,
    service: web::Data<SchedulingService>,
) -> Result<HttpResponse> {
    match read_roster(&body[..]) {
        Ok(roster) => {
            let people = roster.len();
            service.replace_roster(roster).await;
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "people": people,
            })))
        }
        Err(err) => Ok(error_response(&err)),
    }
}

/// Registers every API route; shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/generate", web::post().to(generate))
        .route("/api/batch", web::post().to(batch_generate))
        .route("/api/programs", web::get().to(list_programs))
        .service(
            web::resource("/api/programs/{id}")
                .route(web::get().to(get_program))
                .route(web::delete().to(discard_program)),
        )
        .route("/api/programs/{id}/commit", web::post().to(commit_program))
        .route("/api/programs/{id}/cancel", web::post().to(cancel_program))
        .route("/api/programs/{id}/reassign", web::post().to(reassign_program))
        .route("/api/programs/{id}/randomize", web::post().to(randomize_program))
        .route("/api/groups", web::get().to(get_groups))
        .route("/api/groups/partition", web::post().to(partition_groups))
        .route("/api/groups/next-turn", web::post().to(next_group_turn))
        .route("/api/roster", web::post().to(upload_roster));
}

pub async fn start_server(port: u16, service: SchedulingService) -> std::io::Result<()> {
    let service = web::Data::new(service);

    HttpServer::new(move || {
        App::new()
            .app_data(service.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
