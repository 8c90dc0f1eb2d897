use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

use crate::comment::{CreateComment, NewComment};
use crate::db::{CommentStore, Connector};
use crate::error::HandlerError;

/// The subset of an API Gateway proxy event this function reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    http_method: Option<String>,
    query_string_parameters: Option<HashMap<String, String>>,
    body: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    status_code: u16,
    headers: BTreeMap<&'static str, &'static str>,
    body: String,
    is_base64_encoded: bool,
}

impl Response {
    fn preflight() -> Self {
        let headers = BTreeMap::from([
            ("Access-Control-Allow-Origin", "*"),
            ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
            ("Access-Control-Allow-Headers", "Content-Type"),
            ("Access-Control-Max-Age", "86400"),
        ]);

        Response {
            status_code: 200,
            headers,
            body: String::new(),
            is_base64_encoded: false,
        }
    }

    fn json(status_code: u16, body: String) -> Self {
        let headers = BTreeMap::from([
            ("Content-Type", "application/json"),
            ("Access-Control-Allow-Origin", "*"),
        ]);

        Response {
            status_code,
            headers,
            body,
            is_base64_encoded: false,
        }
    }

    fn error(status_code: u16, err: &HandlerError) -> Self {
        Response::json(status_code, json!({ "error": err.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    List,
    Create,
    Preflight,
    Unsupported,
}

impl Route {
    fn from_method(method: Option<&str>) -> Self {
        match method.unwrap_or("GET") {
            "GET" => Route::List,
            "POST" => Route::Create,
            "OPTIONS" => Route::Preflight,
            _ => Route::Unsupported,
        }
    }
}

pub(crate) async fn function_handler<C: Connector>(
    connector: &C,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    tracing::info!(
        request_id = %event.context.request_id,
        method = event.payload.http_method.as_deref().unwrap_or("GET"),
        "handling request"
    );

    handle(connector, event.payload).await
}

async fn handle<C: Connector>(connector: &C, request: Request) -> Result<Response, Error> {
    let route = Route::from_method(request.http_method.as_deref());

    match dispatch(connector, route, &request).await {
        Ok(response) => Ok(response),
        Err(err) => match err.status_code() {
            Some(status_code) => {
                tracing::warn!(?route, status_code, error = %err, "rejecting request");
                Ok(Response::error(status_code, &err))
            }
            None => {
                tracing::error!(?route, error = %err, "request failed");
                Err(err.into())
            }
        },
    }
}

// Every arm but the preflight holds a store for its whole body, so the
// connection is released on each way out, early returns included.
async fn dispatch<C: Connector>(
    connector: &C,
    route: Route,
    request: &Request,
) -> Result<Response, HandlerError> {
    match route {
        Route::Preflight => Ok(Response::preflight()),
        Route::List => {
            let store = connector.connect().await?;
            list_comments(&store, request).await
        }
        Route::Create => {
            let store = connector.connect().await?;
            create_comment(&store, request).await
        }
        Route::Unsupported => {
            let _store = connector.connect().await?;
            Err(HandlerError::MethodNotAllowed)
        }
    }
}

async fn list_comments<S: CommentStore>(
    store: &S,
    request: &Request,
) -> Result<Response, HandlerError> {
    let story_id = request
        .query_string_parameters
        .as_ref()
        .and_then(|params| params.get("story_id"))
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| HandlerError::MalformedInput("Invalid story_id"))
        })
        .transpose()?;

    let comments = match story_id.map(i32::try_from) {
        None => store.list(None).await?,
        Some(Ok(story_id)) => store.list(Some(story_id)).await?,
        // No row can reference a story id outside the column's range.
        Some(Err(_)) => Vec::new(),
    };

    Ok(Response::json(200, serde_json::to_string(&comments)?))
}

async fn create_comment<S: CommentStore>(
    store: &S,
    request: &Request,
) -> Result<Response, HandlerError> {
    let payload = match request.body.as_deref().map(str::trim) {
        None | Some("") => CreateComment::default(),
        Some(body) => serde_json::from_str(body)
            .map_err(|_| HandlerError::MalformedInput("Invalid JSON body"))?,
    };
    let comment = NewComment::try_from(payload)?;

    let created = store.insert(&comment).await?;
    tracing::info!(id = created.id, story_id = created.story_id, "comment created");

    Ok(Response::json(201, serde_json::to_string(&created)?))
}
