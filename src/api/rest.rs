// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only analytical API: every handler fetches the upstream history,
// recomputes the requested view, and returns JSON. Nothing is cached or
// persisted between requests.
//
// Error mapping:
//   * invalid query parameters  -> 400 with a message naming valid options
//   * upstream feed failures    -> 502
//   * anything unexpected       -> 500 (none escape uncaught)
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::analysis::{backtest, comparison, lead_lag, regime, volatility};
use crate::app_state::{AppState, Computed};
use crate::types::BacktestSignal;

/// Hard cap on the `limit` query parameter.
const MAX_LIMIT: usize = 1000;
/// Bounds for the lead-lag and backtest horizon parameters, in days.
const MAX_LAG_RANGE: std::ops::RangeInclusive<usize> = 1..=30;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // ── Activity index ──────────────────────────────────────────
        .route("/api/wai/latest", get(wai_latest))
        .route("/api/wai/history", get(wai_history))
        .route("/api/wai/statistics", get(wai_statistics))
        .route("/api/wai/comparison", get(wai_comparison))
        // ── Intent index ────────────────────────────────────────────
        .route("/api/wii/latest", get(wii_latest))
        .route("/api/wii/history", get(wii_history))
        // ── Research reports ────────────────────────────────────────
        .route("/api/analysis/lead-lag", get(analysis_lead_lag))
        .route("/api/analysis/regime-detection", get(analysis_regime))
        .route(
            "/api/analysis/conditional-volatility",
            get(analysis_volatility),
        )
        .route("/api/analysis/backtest", get(analysis_backtest))
        .route("/api/analysis/summary", get(analysis_summary))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// Client sent an invalid parameter; message names the valid options.
    BadRequest(String),
    /// An upstream feed failed; the request cannot be served.
    Upstream(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Upstream(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => {
                warn!(error = %msg, "rejected request");
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Upstream(err) => {
                error!(error = %err, "upstream feed failure");
                (StatusCode::BAD_GATEWAY, format!("upstream feed failed: {err:#}"))
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Query parameters
// =============================================================================

#[derive(Debug, Deserialize)]
struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct LeadLagQuery {
    max_lag: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct BacktestQuery {
    signal: Option<String>,
    horizon: Option<usize>,
}

fn parse_date(raw: &str, param: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid {param} '{raw}', expected YYYY-MM-DD")))
}

/// Resolve the date range and limit into a set of row indices, ascending.
/// `limit` keeps the most recent rows of the filtered range.
fn select_rows(dates: &[NaiveDate], query: &RangeQuery) -> ApiResult<Vec<usize>> {
    let start = query
        .start_date
        .as_deref()
        .map(|raw| parse_date(raw, "start_date"))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|raw| parse_date(raw, "end_date"))
        .transpose()?;

    if let Some(limit) = query.limit {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
    }

    let mut rows: Vec<usize> = (0..dates.len())
        .filter(|&i| {
            start.map_or(true, |s| dates[i] >= s) && end.map_or(true, |e| dates[i] <= e)
        })
        .collect();

    if let Some(limit) = query.limit {
        if rows.len() > limit {
            rows.drain(..rows.len() - limit);
        }
    }
    Ok(rows)
}

// =============================================================================
// Health
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp_millis(),
    }))
}

// =============================================================================
// Activity index endpoints
// =============================================================================

fn wai_row(computed: &Computed, i: usize) -> serde_json::Value {
    let r = &computed.records[i];
    let a = &computed.activity[i];
    serde_json::json!({
        "date": a.date,
        "wai": a.index,
        "wai_legacy": a.index_legacy,
        "raw_score": a.raw_score,
        "weight_tx": a.weight_tx,
        "weight_volume": a.weight_volume,
        "tx_count": r.whale_tx_count,
        "volume": r.whale_tx_volume,
        "asset_close": r.asset_close,
        "asset_return_1d": r.asset_return_1d,
        "asset_volatility_7d": r.asset_volatility_7d,
    })
}

async fn wai_latest(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let Some(i) = computed.activity.len().checked_sub(1) else {
        return Err(ApiError::Upstream(anyhow::anyhow!("feed returned no daily records")));
    };

    let dates: Vec<NaiveDate> = computed.activity.iter().map(|p| p.date).collect();
    let index: Vec<i64> = computed.activity.iter().map(|p| p.index).collect();
    let momentum = state.engine.momentum(&dates, &index);
    let confidence = state.engine.confidence(&computed.records);

    let mut row = wai_row(&computed, i);
    let obj = row.as_object_mut().expect("wai_row builds an object");
    obj.insert(
        "momentum".to_string(),
        serde_json::json!({
            "value": momentum[i].momentum,
            "band": momentum[i].band,
        }),
    );
    obj.insert(
        "confidence".to_string(),
        serde_json::json!({
            "score": confidence[i].score,
            "band": confidence[i].band,
        }),
    );
    Ok(Json(row))
}

async fn wai_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let dates: Vec<NaiveDate> = computed.activity.iter().map(|p| p.date).collect();
    let rows = select_rows(&dates, &query)?;
    let data: Vec<serde_json::Value> = rows.iter().map(|&i| wai_row(&computed, i)).collect();
    Ok(Json(serde_json::json!({
        "count": data.len(),
        "data": data,
    })))
}

async fn wai_statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let dates: Vec<NaiveDate> = computed.activity.iter().map(|p| p.date).collect();
    let rows = select_rows(&dates, &query)?;
    if rows.is_empty() {
        return Ok(Json(serde_json::json!({
            "count": 0,
            "message": "no data in the requested range",
        })));
    }

    let values: Vec<f64> = rows.iter().map(|&i| computed.activity[i].index as f64).collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mut sorted = values.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2]
    } else {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    };

    let first = rows[0];
    let last = *rows.last().expect("rows non-empty");
    Ok(Json(serde_json::json!({
        "count": rows.len(),
        "start_date": dates[first],
        "end_date": dates[last],
        "mean": mean,
        "median": median,
        "std": crate::series::rolling::sample_std(&values),
        "min": sorted.first(),
        "max": sorted.last(),
        "current": computed.activity[last].index,
        "days_above_75": values.iter().filter(|&&v| v > 75.0).count(),
        "days_below_25": values.iter().filter(|&&v| v < 25.0).count(),
    })))
}

async fn wai_comparison(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<comparison::ComparisonReport>> {
    let computed = state.computed().await?;
    Ok(Json(comparison::compare(&computed.activity)))
}

// =============================================================================
// Intent index endpoints
// =============================================================================

fn wii_row(computed: &Computed, i: usize) -> serde_json::Value {
    let r = &computed.records[i];
    let p = &computed.intent[i];
    serde_json::json!({
        "date": p.date,
        "wii": p.index,
        "wii_signal": p.signal,
        "exchange_inflow": r.exchange_inflow,
        "exchange_outflow": r.exchange_outflow,
        "exchange_netflow": p.netflow,
        "netflow_ratio": p.netflow_ratio,
    })
}

fn wii_interpretation() -> serde_json::Value {
    serde_json::json!({
        "selling_pressure": "index < 30: heavy inflow to exchanges, whales likely selling",
        "neutral": "index 30-70: balanced exchange activity",
        "accumulation": "index > 70: heavy outflow from exchanges, whales accumulating",
    })
}

async fn wii_latest(State(state): State<Arc<AppState>>) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let Some(i) = computed.intent.len().checked_sub(1) else {
        return Err(ApiError::Upstream(anyhow::anyhow!("feed returned no daily records")));
    };
    let mut row = wii_row(&computed, i);
    row.as_object_mut()
        .expect("wii_row builds an object")
        .insert("interpretation".to_string(), wii_interpretation());
    Ok(Json(row))
}

async fn wii_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let dates: Vec<NaiveDate> = computed.intent.iter().map(|p| p.date).collect();
    let rows = select_rows(&dates, &query)?;
    let data: Vec<serde_json::Value> = rows.iter().map(|&i| wii_row(&computed, i)).collect();
    Ok(Json(serde_json::json!({
        "count": data.len(),
        "data": data,
        "interpretation": wii_interpretation(),
    })))
}

// =============================================================================
// Research reports
// =============================================================================

async fn analysis_lead_lag(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeadLagQuery>,
) -> ApiResult<Json<lead_lag::LeadLagReport>> {
    let max_lag = query.max_lag.unwrap_or(7);
    if !MAX_LAG_RANGE.contains(&max_lag) {
        return Err(ApiError::BadRequest(format!(
            "max_lag must be between {} and {}",
            MAX_LAG_RANGE.start(),
            MAX_LAG_RANGE.end()
        )));
    }
    let computed = state.computed().await?;
    Ok(Json(lead_lag::analyze(
        &computed.records,
        &computed.activity,
        &computed.intent,
        max_lag,
    )))
}

async fn analysis_regime(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<regime::RegimeReport>> {
    let computed = state.computed().await?;
    Ok(Json(regime::detect(
        &computed.records,
        &computed.activity,
        &computed.intent,
    )))
}

async fn analysis_volatility(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<volatility::VolatilityReport>> {
    let computed = state.computed().await?;
    Ok(Json(volatility::analyze(&computed.records, &computed.intent)))
}

async fn analysis_backtest(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BacktestQuery>,
) -> ApiResult<Json<backtest::BacktestReport>> {
    let signal = match query.signal.as_deref() {
        Some(name) => BacktestSignal::parse(name).map_err(ApiError::BadRequest)?,
        None => BacktestSignal::Accumulation,
    };
    let horizon = query.horizon.unwrap_or(7);
    if !MAX_LAG_RANGE.contains(&horizon) {
        return Err(ApiError::BadRequest(format!(
            "horizon must be between {} and {}",
            MAX_LAG_RANGE.start(),
            MAX_LAG_RANGE.end()
        )));
    }
    let computed = state.computed().await?;
    Ok(Json(backtest::run(
        &computed.records,
        &computed.intent,
        signal,
        horizon,
    )))
}

/// Everything at once: latest values plus all research reports, for
/// dashboards that want a single round trip.
async fn analysis_summary(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let computed = state.computed().await?;
    let latest = computed
        .activity
        .len()
        .checked_sub(1)
        .map(|i| {
            serde_json::json!({
                "date": computed.activity[i].date,
                "wai": computed.activity[i].index,
                "wii": computed.intent[i].index,
                "wii_signal": computed.intent[i].signal,
            })
        })
        .unwrap_or(serde_json::Value::Null);

    Ok(Json(serde_json::json!({
        "latest": latest,
        "lead_lag": lead_lag::analyze(&computed.records, &computed.activity, &computed.intent, 7),
        "regimes": regime::detect(&computed.records, &computed.activity, &computed.intent),
        "conditional_volatility": volatility::analyze(&computed.records, &computed.intent),
        "backtests": BacktestSignal::VALID_NAMES
            .iter()
            .map(|name| {
                let signal = BacktestSignal::parse(name).expect("names are valid");
                backtest::run(&computed.records, &computed.intent, signal, 7)
            })
            .collect::<Vec<_>>(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::day;

    fn range(start: Option<&str>, end: Option<&str>, limit: Option<usize>) -> RangeQuery {
        RangeQuery {
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            limit,
        }
    }

    #[test]
    fn select_rows_filters_and_limits() {
        let dates: Vec<NaiveDate> = (0..10).map(day).collect();
        let all = select_rows(&dates, &range(None, None, None)).unwrap();
        assert_eq!(all.len(), 10);

        let bounded =
            select_rows(&dates, &range(Some("2024-01-03"), Some("2024-01-06"), None)).unwrap();
        assert_eq!(bounded, vec![2, 3, 4, 5]);

        // Limit keeps the most recent rows of the range, still ascending.
        let limited =
            select_rows(&dates, &range(Some("2024-01-03"), Some("2024-01-06"), Some(2))).unwrap();
        assert_eq!(limited, vec![4, 5]);
    }

    #[test]
    fn malformed_dates_and_limits_are_client_errors() {
        let dates: Vec<NaiveDate> = (0..5).map(day).collect();
        assert!(matches!(
            select_rows(&dates, &range(Some("03.01.2024"), None, None)),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            select_rows(&dates, &range(None, None, Some(0))),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            select_rows(&dates, &range(None, None, Some(1001))),
            Err(ApiError::BadRequest(_))
        ));
    }
}
