// src/api.rs
use crate::error::TrackerError;
use crate::models::{Holding, HoldingId, HoldingRecord};
use crate::portfolio::{AddOutcome, AddRequest, PortfolioService, PortfolioView};
use crate::validation::PositionForm;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Result of a mutation, with the portfolio re-read after it completed so
/// clients re-render from the store rather than from their own edits.
#[derive(Serialize)]
struct CommandReply {
    holding: Option<Holding>,
    portfolio: Option<PortfolioView>,
}

pub fn routes(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let search = warp::path!("quotes" / String)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(search_handler);

    let detail = warp::path!("stocks" / String)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(detail_handler);

    let view = warp::path!("portfolio")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(view_handler);

    let summary = warp::path!("portfolio" / "summary")
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(summary_handler);

    let by_symbol = warp::path!("portfolio" / "symbol" / String)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(by_symbol_handler);

    let get = warp::path!("portfolio" / String)
        .and(warp::get())
        .and(with_service(service.clone()))
        .and_then(get_holding_handler);

    let add = warp::path!("portfolio")
        .and(warp::post())
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(add_holding_handler);

    let replace = warp::path!("portfolio" / String)
        .and(warp::put())
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(replace_holding_handler);

    let position = warp::path!("portfolio" / String / "position")
        .and(warp::post())
        .and(with_service(service.clone()))
        .and(warp::body::json())
        .and_then(edit_position_handler);

    let refresh = warp::path!("portfolio" / String / "refresh")
        .and(warp::post())
        .and(with_service(service.clone()))
        .and_then(refresh_handler);

    let delete = warp::path!("portfolio" / String)
        .and(warp::delete())
        .and(with_service(service))
        .and_then(delete_holding_handler);

    search
        .or(detail)
        .or(view)
        .or(summary)
        .or(by_symbol)
        .or(get)
        .or(add)
        .or(replace)
        .or(position)
        .or(refresh)
        .or(delete)
}

/// All routes with rejections turned into JSON error replies.
pub fn api(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    routes(service).recover(handle_rejection)
}

fn with_service(
    service: Arc<PortfolioService>,
) -> impl Filter<Extract = (Arc<PortfolioService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

fn reject(action: &str, err: TrackerError) -> Rejection {
    match &err {
        TrackerError::Transport { .. } | TrackerError::Config(_) => {
            error!("Failed to {}: {}", action, err)
        }
        _ => info!("Could not {}: {}", action, err),
    }
    warp::reject::custom(err)
}

async fn refetched(service: &PortfolioService) -> Option<PortfolioView> {
    match service.view().await {
        Ok(view) => Some(view),
        Err(e) => {
            warn!("Portfolio re-fetch after command failed: {}", e);
            None
        }
    }
}

async fn search_handler(
    symbol: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.search(&symbol).await {
        Ok(result) => Ok(warp::reply::json(&result)),
        Err(e) => Err(reject("search for stock", e)),
    }
}

async fn detail_handler(
    symbol: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.detail(&symbol).await {
        Ok(detail) => Ok(warp::reply::json(&detail)),
        Err(e) => Err(reject("load stock details", e)),
    }
}

async fn view_handler(service: Arc<PortfolioService>) -> Result<impl Reply, Rejection> {
    match service.view().await {
        Ok(view) => Ok(warp::reply::json(&view)),
        Err(e) => Err(reject("load portfolio", e)),
    }
}

async fn summary_handler(service: Arc<PortfolioService>) -> Result<impl Reply, Rejection> {
    match service.summary().await {
        Ok(summary) => Ok(warp::reply::json(&summary)),
        Err(e) => Err(reject("load portfolio summary", e)),
    }
}

async fn by_symbol_handler(
    symbol: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.find_by_symbol(&symbol).await {
        Ok(holding) => Ok(warp::reply::json(&holding)),
        Err(e) => Err(reject("look up holding", e)),
    }
}

async fn get_holding_handler(
    id: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.holding(&HoldingId::from_string(id)).await {
        Ok(view) => Ok(warp::reply::json(&view)),
        Err(e) => Err(reject("load holding", e)),
    }
}

async fn add_holding_handler(
    service: Arc<PortfolioService>,
    request: AddRequest,
) -> Result<impl Reply, Rejection> {
    let outcome = service
        .add(request)
        .await
        .map_err(|e| reject("add stock to portfolio", e))?;
    let status = match outcome {
        AddOutcome::Created(_) => StatusCode::CREATED,
        AddOutcome::AlreadyTracked(_) => StatusCode::OK,
    };
    let reply = CommandReply {
        holding: Some(outcome.holding().clone()),
        portfolio: refetched(&service).await,
    };
    Ok(warp::reply::with_status(warp::reply::json(&reply), status))
}

async fn replace_holding_handler(
    id: String,
    service: Arc<PortfolioService>,
    record: HoldingRecord,
) -> Result<impl Reply, Rejection> {
    let holding = service
        .replace(&HoldingId::from_string(id), record)
        .await
        .map_err(|e| reject("update holding", e))?;
    let reply = CommandReply {
        holding: Some(holding),
        portfolio: refetched(&service).await,
    };
    Ok(warp::reply::json(&reply))
}

async fn edit_position_handler(
    id: String,
    service: Arc<PortfolioService>,
    form: PositionForm,
) -> Result<impl Reply, Rejection> {
    let holding = service
        .edit_position(&HoldingId::from_string(id), &form)
        .await
        .map_err(|e| reject("update holding", e))?;
    let reply = CommandReply {
        holding: Some(holding),
        portfolio: refetched(&service).await,
    };
    Ok(warp::reply::json(&reply))
}

async fn refresh_handler(
    id: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    match service.refresh(&HoldingId::from_string(id)).await {
        Ok(outcome) => Ok(warp::reply::json(&outcome)),
        Err(e) => Err(reject("refresh holding", e)),
    }
}

async fn delete_holding_handler(
    id: String,
    service: Arc<PortfolioService>,
) -> Result<impl Reply, Rejection> {
    service
        .remove(&HoldingId::from_string(id))
        .await
        .map_err(|e| reject("remove stock", e))?;
    let reply = CommandReply {
        holding: None,
        portfolio: refetched(&service).await,
    };
    Ok(warp::reply::json(&reply))
}

/// Map rejections to `{ error, message, retryable }` JSON bodies.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, kind, message, retryable) = if let Some(e) = err.find::<TrackerError>() {
        let status = match e {
            TrackerError::NotFound(_) => StatusCode::NOT_FOUND,
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Transport { .. } => StatusCode::BAD_GATEWAY,
            TrackerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match e {
            TrackerError::Transport { .. } => format!("{}. Please try again.", e),
            _ => e.to_string(),
        };
        (status, e.kind(), message, e.is_retryable())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "no such route".to_string(), false)
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "validation_failure", e.to_string(), false)
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed".to_string(),
            false,
        )
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "internal error".to_string(),
            false,
        )
    };

    let body = json!({ "error": kind, "message": message, "retryable": retryable });
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
