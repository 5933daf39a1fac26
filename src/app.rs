use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::http::header;
use actix_web::{get, HttpRequest, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::controller::{InboundRequest, Redirect, Subscriptions};

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().finish()
}

/// Every other request goes through the subscription workflow
#[tracing::instrument(name = "Workflow request", skip(req, workflow), fields(path = %req.path()))]
async fn workflow_request(
    req: HttpRequest,
    workflow: web::Data<Arc<Subscriptions>>,
) -> HttpResponse {
    let request = InboundRequest::new(req.path(), Some(req.query_string()));
    let redirect = workflow.respond(&request).await;

    see_other(&redirect)
}

fn see_other(redirect: &Redirect) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, redirect.location.as_str()))
        .insert_header((header::ACCESS_CONTROL_ALLOW_ORIGIN, Redirect::ALLOW_ORIGIN))
        .finish()
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, workflow: Arc<Subscriptions>) -> anyhow::Result<Server> {
    // Wrap application data
    let workflow = web::Data::new(workflow);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(workflow.clone())
            .service(health_check)
            .default_service(web::to(workflow_request))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
