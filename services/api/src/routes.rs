use crate::infra::{parse_date, AppState};
use axum::body::Bytes;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use xpendit::workflows::expenses::ingest::parse_amount;
use xpendit::workflows::expenses::{Employee, Expense, ExpenseId, Verdict};

pub(crate) fn expense_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/expenses/validate",
            post(validate_expense_endpoint).fallback(method_not_allowed),
        )
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Evaluates one expense with the configured policy and its fallback rate table.
pub(crate) async fn validate_expense_endpoint(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<Verdict>, EvaluationRequestError> {
    let request = EvaluationRequest::from_slice(&body)?;
    let today = request
        .today
        .unwrap_or_else(|| Local::now().date_naive());

    Ok(Json(state.engine.evaluate(&request.expense, today)))
}

async fn method_not_allowed() -> EvaluationRequestError {
    EvaluationRequestError::MethodNotAllowed
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvaluationRequestError {
    MethodNotAllowed,
    InvalidJson(String),
    MissingField(&'static str),
    InvalidField(&'static str),
    InvalidDate { field: &'static str, value: String },
    InvalidAmount(String),
}

impl EvaluationRequestError {
    fn kind(&self) -> &'static str {
        match self {
            EvaluationRequestError::MethodNotAllowed => "method_not_allowed",
            EvaluationRequestError::InvalidJson(_) => "invalid_json",
            EvaluationRequestError::MissingField(_) => "missing_field",
            EvaluationRequestError::InvalidField(_) => "invalid_field",
            EvaluationRequestError::InvalidDate { .. } => "invalid_date",
            EvaluationRequestError::InvalidAmount(_) => "invalid_amount",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EvaluationRequestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for EvaluationRequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluationRequestError::MethodNotAllowed => write!(f, "only POST is allowed"),
            EvaluationRequestError::InvalidJson(reason) => {
                write!(f, "invalid JSON body: {}", reason)
            }
            EvaluationRequestError::MissingField(field) => {
                write!(f, "missing required field: {}", field)
            }
            EvaluationRequestError::InvalidField(field) => {
                write!(f, "field {} must be a string", field)
            }
            EvaluationRequestError::InvalidDate { field, value } => write!(
                f,
                "field {} has invalid date '{}', expected YYYY-MM-DD",
                field, value
            ),
            EvaluationRequestError::InvalidAmount(value) => {
                write!(f, "field monto has invalid amount '{}'", value)
            }
        }
    }
}

impl std::error::Error for EvaluationRequestError {}

impl IntoResponse for EvaluationRequestError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string(), "kind": self.kind() }));
        (self.status(), body).into_response()
    }
}

#[derive(Debug)]
struct EvaluationRequest {
    expense: Expense,
    today: Option<NaiveDate>,
}

/// Wire shape of the request. Fields stay untyped so each one can report its own error kind.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EvaluationPayload {
    gasto_id: Option<Value>,
    monto: Option<Value>,
    moneda: Option<Value>,
    fecha: Option<Value>,
    categoria: Option<Value>,
    empleado_id: Option<Value>,
    empleado_nombre: Option<Value>,
    empleado_apellido: Option<Value>,
    empleado_cost_center: Option<Value>,
    today: Option<Value>,
}

impl EvaluationRequest {
    fn from_slice(body: &[u8]) -> Result<Self, EvaluationRequestError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|err| EvaluationRequestError::InvalidJson(err.to_string()))?;
        if !value.is_object() {
            return Err(EvaluationRequestError::InvalidJson(
                "expected a JSON object".to_string(),
            ));
        }
        let payload: EvaluationPayload = serde_json::from_value(value)
            .map_err(|err| EvaluationRequestError::InvalidJson(err.to_string()))?;

        let expense_id = required_text(payload.gasto_id.as_ref(), "gasto_id")?;
        let amount = required_amount(payload.monto.as_ref())?;
        let currency = required_text(payload.moneda.as_ref(), "moneda")?;
        let date = required_date(payload.fecha.as_ref(), "fecha")?;
        let category = required_text(payload.categoria.as_ref(), "categoria")?;
        let employee_id = required_text(payload.empleado_id.as_ref(), "empleado_id")?;
        let today = match optional_text(payload.today.as_ref(), "today")? {
            Some(raw) => Some(date_value("today", &raw)?),
            None => None,
        };
        let first_name = optional_text(payload.empleado_nombre.as_ref(), "empleado_nombre")?;
        let last_name = optional_text(payload.empleado_apellido.as_ref(), "empleado_apellido")?;
        let cost_center =
            optional_text(payload.empleado_cost_center.as_ref(), "empleado_cost_center")?;

        Ok(Self {
            expense: Expense {
                id: ExpenseId(expense_id),
                amount,
                currency,
                date,
                category,
                employee: Employee {
                    id: employee_id,
                    first_name: first_name.unwrap_or_default(),
                    last_name: last_name.unwrap_or_default(),
                    cost_center: cost_center.unwrap_or_default(),
                },
            },
            today,
        })
    }
}

/// Identifiers may arrive as JSON numbers; they are kept as their textual form.
fn required_text(
    value: Option<&Value>,
    field: &'static str,
) -> Result<String, EvaluationRequestError> {
    match value {
        None | Some(Value::Null) => Err(EvaluationRequestError::MissingField(field)),
        Some(Value::String(text)) if text.trim().is_empty() => {
            Err(EvaluationRequestError::MissingField(field))
        }
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(_) => Err(EvaluationRequestError::InvalidField(field)),
    }
}

fn optional_text(
    value: Option<&Value>,
    field: &'static str,
) -> Result<Option<String>, EvaluationRequestError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim().to_string())),
        Some(_) => Err(EvaluationRequestError::InvalidField(field)),
    }
}

fn required_date(
    value: Option<&Value>,
    field: &'static str,
) -> Result<NaiveDate, EvaluationRequestError> {
    match value {
        None | Some(Value::Null) => Err(EvaluationRequestError::MissingField(field)),
        Some(Value::String(raw)) => date_value(field, raw),
        Some(other) => Err(EvaluationRequestError::InvalidDate {
            field,
            value: other.to_string(),
        }),
    }
}

fn date_value(field: &'static str, raw: &str) -> Result<NaiveDate, EvaluationRequestError> {
    parse_date(raw).map_err(|_| EvaluationRequestError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

/// `monto` is accepted as a JSON number or a numeric string, parsed without float rounding.
fn required_amount(value: Option<&Value>) -> Result<rust_decimal::Decimal, EvaluationRequestError> {
    let raw = match value {
        None | Some(Value::Null) => return Err(EvaluationRequestError::MissingField("monto")),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => return Err(EvaluationRequestError::InvalidAmount(other.to_string())),
    };

    parse_amount(&raw).ok_or(EvaluationRequestError::InvalidAmount(raw))
}
