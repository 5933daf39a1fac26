use lambda_http::http::{header, StatusCode};
use lambda_http::{Body, Error, Request, RequestExt, Response};

use crate::controller::{InboundRequest, Redirect, Subscriptions};

/// Decode the raw path and query string of an API Gateway HTTP event
pub fn inbound_request(event: &Request) -> InboundRequest {
    let path = match event.raw_http_path() {
        "" => event.uri().path(),
        raw => raw,
    };
    InboundRequest::new(path, event.uri().query())
}

/// Handle one invocation. Workflow failures are logged and redirected,
/// never returned to the runtime as invocation errors.
#[tracing::instrument(name = "Lambda invocation", skip(workflow, event))]
pub async fn handle(workflow: &Subscriptions, event: Request) -> Result<Response<Body>, Error> {
    let request = inbound_request(&event);
    let redirect = workflow.respond(&request).await;

    let response = Response::builder()
        .status(StatusCode::from_u16(Redirect::STATUS)?)
        .header(header::LOCATION, redirect.location)
        .header(header::ACCESS_CONTROL_ALLOW_ORIGIN, Redirect::ALLOW_ORIGIN)
        .body(Body::Empty)?;
    Ok(response)
}
