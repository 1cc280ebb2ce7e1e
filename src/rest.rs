//! REST API layer using Axum (exposed on port 11111 by default)
//!
//! Per-tenant resources live under `/api/:slug/...`; the slug is resolved
//! through the tenant slug index on every request. Responses use the
//! `{success, data?, error?}` envelope.
//!
//! Tenant data routes perform no role check against the caller. Only the
//! platform console (`/api/admin/...`), `/api/auth/me` and member join sit
//! behind the bearer-token middleware.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, Claims, TokenIssuer};
use crate::error::{AuthError, StoreError, TenancyError};
use crate::models::{
    AppUser, BankInfo, Event, EventRegistration, ForumPost, InventoryItem, ItemCondition,
    Notification, PaymentStatus, PrayerSchedule, Tenant, TenantStatus, Transaction,
    TransactionType, UserProfile, UserRole, ZisFlow, ZisTransaction, ZisType,
};
use crate::reports::{finance_summary, zis_summary, FinanceSummary, ZisSummary};
use crate::storage::{merge_patch, Entity, ListResult, Storage};
use crate::tenancy::{register_tenant, resolve_tenant, transition_status, NewTenant};

const MIN_PASSWORD_LEN: usize = 8;
const PORTAL_EVENTS: usize = 5;
const PORTAL_POSTS: usize = 5;

/// Shared app state for REST handlers (Arc-wrapped for concurrency)
pub struct AppState {
    pub storage: Storage,
    pub tokens: TokenIssuer,
}

// ---------------------------------------------------------------------------
// Envelope & errors
// ---------------------------------------------------------------------------

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type CreatedResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn created<T>(data: T) -> CreatedResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                error!(%detail, "Request failed");
                "internal server error".to_string()
            }
            other => {
                debug!(%status, error = %other, "Request rejected");
                other.to_string()
            }
        };
        (status, Json(ApiResponse::<()>::failure(message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            StoreError::InvalidPatch { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<TenancyError> for ApiError {
    fn from(err: TenancyError) -> Self {
        match err {
            TenancyError::InvalidSlug { .. } => ApiError::BadRequest(err.to_string()),
            TenancyError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            TenancyError::Store(store) => store.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the API envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

    let claims = state
        .tokens
        .validate(token)
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Create the Axum router with every endpoint.
pub fn create_router(storage: Storage, tokens: TokenIssuer) -> Router {
    let state = Arc::new(AppState { storage, tokens });

    let auth_routes = Router::new()
        .route("/api/auth/me", get(me_handler))
        .route("/api/admin/tenants", get(admin_list_tenants_handler))
        .route("/api/admin/tenants/:id/approve", post(approve_tenant_handler))
        .route("/api/admin/tenants/:id/suspend", post(suspend_tenant_handler))
        .route("/api/:slug/members/join", post(join_tenant_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let tenant_routes = Router::new()
        .route("/api/:slug/settings", put(update_settings_handler))
        .route("/api/:slug/finance", get(list_finance_handler).post(create_finance_handler))
        .route("/api/:slug/finance/summary", get(finance_summary_handler))
        .route("/api/:slug/finance/:id", patch(patch_finance_handler))
        .route("/api/:slug/zis", get(list_zis_handler).post(create_zis_handler))
        .route("/api/:slug/zis/summary", get(zis_summary_handler))
        .route("/api/:slug/zis/:id", patch(patch_zis_handler))
        .route("/api/:slug/inventory", get(list_inventory_handler).post(create_inventory_handler))
        .route("/api/:slug/inventory/:id", patch(patch_inventory_handler))
        .route("/api/:slug/events", get(list_events_handler).post(create_event_handler))
        .route("/api/:slug/events/:id", patch(patch_event_handler))
        .route("/api/:slug/events/:id/register", post(register_event_handler))
        .route("/api/:slug/events/:id/registrations", get(list_registrations_handler))
        .route("/api/:slug/members", get(list_members_handler))
        .route("/api/:slug/forum", get(list_forum_handler).post(create_forum_handler))
        .route("/api/:slug/forum/:id", delete(delete_forum_handler))
        .route("/api/:slug/prayer-times", get(get_prayer_times_handler).put(put_prayer_times_handler))
        .route("/api/:slug/notifications", get(list_notifications_handler).post(create_notification_handler))
        .route("/api/:slug/notifications/:id/read", post(read_notification_handler))
        .route("/api/:slug/portal", get(portal_handler));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/tenants", get(list_tenants_handler))
        .route("/api/tenants/:slug", get(get_tenant_handler))
        .merge(tenant_routes)
        .merge(auth_routes)
        .layer(TraceLayer::new_for_http())
        // Web dashboard and public portal are served from other origins
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn tenant_by_slug(state: &AppState, slug: &str) -> Result<Tenant, ApiError> {
    resolve_tenant(&state.storage, slug)?
        .ok_or_else(|| ApiError::NotFound(format!("tenant '{}' not found", slug)))
}

fn require_text(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_platform_admin(claims: &Claims) -> Result<(), ApiError> {
    if !claims.is_platform_admin() {
        warn!(user_id = %claims.sub, role = %claims.role, "Platform console access denied");
        return Err(ApiError::Forbidden("platform administrator role required".to_string()));
    }
    Ok(())
}

/// Record `id` of collection `E`, only if it belongs to `tenant`.
fn owned_record<E: Entity>(state: &AppState, tenant: &Tenant, id: &str) -> Result<E, ApiError> {
    state
        .storage
        .find::<E>(id)?
        .filter(|record| record.tenant_id() == Some(tenant.id.as_str()))
        .ok_or_else(|| ApiError::NotFound(format!("{} '{}' not found", E::COLLECTION, id)))
}

/// Patch a tenant-owned record. Ownership and identity fields (plus any in
/// `protected`) are stripped from the body first.
fn patch_owned<E: Entity>(
    state: &AppState,
    tenant: &Tenant,
    id: &str,
    body: Value,
    protected: &[&str],
) -> Result<E, ApiError> {
    patch_owned_checked(state, tenant, id, body, protected, |_: &E| Ok(()))
}

/// Like [`patch_owned`], with `check` run on the merged record inside the
/// compare-and-swap, so it sees every concurrent write that lands first.
fn patch_owned_checked<E, C>(
    state: &AppState,
    tenant: &Tenant,
    id: &str,
    body: Value,
    protected: &[&str],
    check: C,
) -> Result<E, ApiError>
where
    E: Entity,
    C: Fn(&E) -> Result<(), ApiError>,
{
    let Value::Object(mut fields) = body else {
        return Err(ApiError::BadRequest("patch body must be a JSON object".to_string()));
    };
    for field in ["id", "tenantId"].iter().chain(protected) {
        fields.remove(*field);
    }

    let not_found = || ApiError::NotFound(format!("{} '{}' not found", E::COLLECTION, id));
    state
        .storage
        .update::<E, _, ApiError>(id, |current| {
            if current.tenant_id() != Some(tenant.id.as_str()) {
                return Err(not_found());
            }
            let next = merge_patch(current, &fields).map_err(|err| match err {
                StoreError::Serialization(err) => {
                    ApiError::BadRequest(format!("invalid field value: {}", err))
                }
                other => other.into(),
            })?;
            check(&next)?;
            Ok(next)
        })?
        .ok_or_else(not_found)
}

// ---------------------------------------------------------------------------
// Health & auth
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check handler
async fn health_handler() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MosqueRegistration {
    pub name: String,
    pub slug: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Registering a mosque makes the user its DKM admin and creates a pending tenant.
    pub mosque: Option<MosqueRegistration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> CreatedResult<RegisterResponse> {
    require_text("name", &payload.name)?;
    let email = AppUser::normalize_email(&payload.email);
    if !email.contains('@') {
        return Err(ApiError::BadRequest("email is not valid".to_string()));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user_id = new_id();
    let tenant = match payload.mosque {
        Some(mosque) => {
            require_text("mosque.name", &mosque.name)?;
            Some(register_tenant(
                &state.storage,
                NewTenant {
                    name: mosque.name,
                    slug: mosque.slug,
                    owner_id: user_id.clone(),
                    address: mosque.address,
                },
            )?)
        }
        None => None,
    };

    let user = AppUser {
        id: user_id,
        name: payload.name,
        email,
        role: if tenant.is_some() {
            UserRole::DkmAdmin
        } else {
            UserRole::Jamaah
        },
        tenant_ids: tenant.iter().map(|t| t.id.clone()).collect(),
        password_hash: Some(hash_password(&payload.password)?),
        created_at: Utc::now(),
    };

    if let Err(err) = state.storage.create(&user) {
        if let Some(tenant) = &tenant {
            state.storage.delete::<Tenant>(&tenant.id)?;
        }
        return Err(err.into());
    }

    info!(user_id = %user.id, role = %user.role, "User registered");
    created(RegisterResponse {
        user: user.profile(),
        tenant,
    })
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserProfile,
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let rejected = || ApiError::Unauthorized("invalid email or password".to_string());

    let user: AppUser = state
        .storage
        .find_by("email", &AppUser::normalize_email(&payload.email))?
        .ok_or_else(rejected)?;
    let hash = user.password_hash.as_deref().ok_or_else(rejected)?;
    if !verify_password(&payload.password, hash).unwrap_or(false) {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(rejected());
    }

    let token = state.tokens.issue(&user)?;
    info!(user_id = %user.id, "User logged in");
    ok(LoginResponse {
        token,
        user: user.profile(),
    })
}

async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<UserProfile> {
    let user = state
        .storage
        .find::<AppUser>(&claims.sub)?
        .ok_or_else(|| ApiError::NotFound("user no longer exists".to_string()))?;
    ok(user.profile())
}

// ---------------------------------------------------------------------------
// Tenants & settings
// ---------------------------------------------------------------------------

async fn list_tenants_handler(State(state): State<Arc<AppState>>) -> ApiResult<ListResult<Tenant>> {
    let items = state
        .storage
        .list::<Tenant>()?
        .items
        .into_iter()
        .filter(|tenant| tenant.status == TenantStatus::Active)
        .collect();
    ok(ListResult { items })
}

async fn get_tenant_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Tenant> {
    ok(tenant_by_slug(&state, &slug)?)
}

/// Editable tenant profile fields. Slug, owner and status are not settings.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_info: Option<BankInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(settings): ApiJson<TenantSettings>,
) -> ApiResult<Tenant> {
    let tenant = tenant_by_slug(&state, &slug)?;
    if let Some(name) = &settings.name {
        require_text("name", name)?;
    }

    let partial = serde_json::to_value(&settings).map_err(StoreError::from)?;
    let updated = state.storage.patch::<Tenant>(&tenant.id, &partial)?;
    info!(tenant_id = %tenant.id, "Tenant settings updated");
    ok(updated)
}

// ---------------------------------------------------------------------------
// Finance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: u64,
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub date: Option<NaiveDate>,
    pub created_by: Option<String>,
}

async fn list_finance_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<Transaction>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.list_for_tenant(&tenant.id)?)
}

async fn create_finance_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewTransaction>,
) -> CreatedResult<Transaction> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("category", &payload.category)?;

    let now = Utc::now();
    let transaction = Transaction {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        kind: payload.kind,
        amount: payload.amount,
        category: payload.category,
        description: payload.description,
        date: payload.date.unwrap_or_else(|| now.date_naive()),
        created_by: payload.created_by.unwrap_or_default(),
        created_at: now,
    };
    state.storage.create(&transaction)?;

    info!(tenant_id = %tenant.id, id = %transaction.id, amount = transaction.amount, "Transaction recorded");
    created(transaction)
}

async fn patch_finance_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Transaction> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(patch_owned(&state, &tenant, &id, body, &["createdAt"])?)
}

async fn finance_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<FinanceSummary> {
    let tenant = tenant_by_slug(&state, &slug)?;
    let rows = state.storage.list_for_tenant::<Transaction>(&tenant.id)?;
    ok(finance_summary(&rows.items))
}

// ---------------------------------------------------------------------------
// ZIS
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewZisTransaction {
    #[serde(rename = "type")]
    pub kind: ZisType,
    pub flow: ZisFlow,
    pub amount: u64,
    #[serde(rename = "muzakki_name")]
    pub muzakki_name: Option<String>,
    #[serde(rename = "mustahik_id")]
    pub mustahik_id: Option<String>,
    #[serde(rename = "payment_status")]
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
    pub created_by: Option<String>,
}

async fn list_zis_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<ZisTransaction>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.list_for_tenant(&tenant.id)?)
}

async fn create_zis_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewZisTransaction>,
) -> CreatedResult<ZisTransaction> {
    let tenant = tenant_by_slug(&state, &slug)?;
    match payload.flow {
        ZisFlow::In if payload.muzakki_name.as_deref().map_or(true, |n| n.trim().is_empty()) => {
            return Err(ApiError::BadRequest("muzakki_name is required for collections".to_string()));
        }
        ZisFlow::Out if payload.mustahik_id.as_deref().map_or(true, |m| m.trim().is_empty()) => {
            return Err(ApiError::BadRequest("mustahik_id is required for disbursements".to_string()));
        }
        _ => {}
    }

    let now = Utc::now();
    let row = ZisTransaction {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        kind: payload.kind,
        flow: payload.flow,
        amount: payload.amount,
        muzakki_name: payload.muzakki_name,
        mustahik_id: payload.mustahik_id,
        payment_status: payload.payment_status.unwrap_or_default(),
        notes: payload.notes,
        date: payload.date.unwrap_or_else(|| now.date_naive()),
        created_by: payload.created_by.unwrap_or_default(),
        created_at: now,
    };
    state.storage.create(&row)?;

    info!(tenant_id = %tenant.id, id = %row.id, flow = ?row.flow, amount = row.amount, "ZIS row recorded");
    created(row)
}

async fn patch_zis_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<ZisTransaction> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(patch_owned(&state, &tenant, &id, body, &["createdAt"])?)
}

async fn zis_summary_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ZisSummary> {
    let tenant = tenant_by_slug(&state, &slug)?;
    let rows = state.storage.list_for_tenant::<ZisTransaction>(&tenant.id)?;
    ok(zis_summary(&rows.items))
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInventoryItem {
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub condition: ItemCondition,
    pub location: Option<String>,
    pub notes: Option<String>,
}

async fn list_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<InventoryItem>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.list_for_tenant(&tenant.id)?)
}

async fn create_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewInventoryItem>,
) -> CreatedResult<InventoryItem> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("name", &payload.name)?;

    let item = InventoryItem {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        name: payload.name,
        category: payload.category,
        quantity: payload.quantity,
        unit: payload.unit,
        condition: payload.condition,
        location: payload.location,
        notes: payload.notes,
        created_at: Utc::now(),
    };
    state.storage.create(&item)?;

    info!(tenant_id = %tenant.id, id = %item.id, "Inventory item added");
    created(item)
}

async fn patch_inventory_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<InventoryItem> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(patch_owned(&state, &tenant, &id, body, &["createdAt"])?)
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: chrono::DateTime<Utc>,
    #[serde(default)]
    pub location: String,
    pub speaker: Option<String>,
    pub capacity: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSignup {
    pub name: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResult {
    pub registration: EventRegistration,
    pub event: Event,
    /// `None` when the event has no capacity limit
    pub remaining_seats: Option<u32>,
}

async fn list_events_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<Event>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.list_for_tenant(&tenant.id)?)
}

async fn create_event_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewEvent>,
) -> CreatedResult<Event> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("title", &payload.title)?;

    let event = Event {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        title: payload.title,
        description: payload.description,
        date: payload.date,
        location: payload.location,
        speaker: payload.speaker,
        capacity: payload.capacity,
        current_registrations: 0,
        created_at: Utc::now(),
    };
    state.storage.create(&event)?;

    info!(tenant_id = %tenant.id, id = %event.id, capacity = ?event.capacity, "Event created");
    created(event)
}

async fn patch_event_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<Event> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(patch_owned_checked(
        &state,
        &tenant,
        &id,
        body,
        &["currentRegistrations", "createdAt"],
        |event: &Event| match event.capacity {
            Some(capacity) if capacity < event.current_registrations => {
                Err(ApiError::Conflict(format!(
                    "capacity {} is below the {} existing registrations",
                    capacity, event.current_registrations
                )))
            }
            _ => Ok(()),
        },
    )?)
}

/// Claim a seat with a compare-and-swap on the event, then write the
/// registration. A failed registration write gives the seat back.
async fn register_event_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, event_id)): Path<(String, String)>,
    ApiJson(payload): ApiJson<EventSignup>,
) -> CreatedResult<SignupResult> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("name", &payload.name)?;

    let event = state
        .storage
        .update(&event_id, |mut event: Event| {
            if event.tenant_id != tenant.id {
                return Err(ApiError::NotFound(format!("event '{}' not found", event_id)));
            }
            if event.is_full() {
                return Err(ApiError::Conflict("event is full".to_string()));
            }
            event.current_registrations += 1;
            Ok(event)
        })?
        .ok_or_else(|| ApiError::NotFound(format!("event '{}' not found", event_id)))?;

    let registration = EventRegistration {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        event_id: event.id.clone(),
        user_id: payload.user_id,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        registered_at: Utc::now(),
    };

    if let Err(err) = state.storage.create(&registration) {
        let released = state.storage.update::<Event, _, StoreError>(&event_id, |mut event| {
            event.current_registrations = event.current_registrations.saturating_sub(1);
            Ok(event)
        });
        if let Err(release_err) = released {
            error!(event_id = %event_id, error = %release_err, "Failed to release seat after registration error");
        }
        return Err(err.into());
    }

    info!(
        tenant_id = %tenant.id,
        event_id = %event.id,
        registrations = event.current_registrations,
        "Event registration accepted"
    );
    created(SignupResult {
        remaining_seats: event.remaining_seats(),
        registration,
        event,
    })
}

async fn list_registrations_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, event_id)): Path<(String, String)>,
) -> ApiResult<ListResult<EventRegistration>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    owned_record::<Event>(&state, &tenant, &event_id)?;

    let items = state
        .storage
        .list_for_tenant::<EventRegistration>(&tenant.id)?
        .items
        .into_iter()
        .filter(|registration| registration.event_id == event_id)
        .collect();
    ok(ListResult { items })
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

async fn list_members_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<UserProfile>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    let items = state
        .storage
        .list::<AppUser>()?
        .items
        .iter()
        .filter(|user| user.is_member_of(&tenant.id))
        .map(AppUser::profile)
        .collect();
    ok(ListResult { items })
}

async fn join_tenant_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> ApiResult<UserProfile> {
    let tenant = tenant_by_slug(&state, &slug)?;
    if tenant.status != TenantStatus::Active {
        return Err(ApiError::Forbidden(format!(
            "tenant '{}' is {} and not accepting members",
            slug, tenant.status
        )));
    }

    let user = state
        .storage
        .update::<AppUser, _, StoreError>(&claims.sub, |mut user| {
            user.tenant_ids.insert(tenant.id.clone());
            Ok(user)
        })?
        .ok_or_else(|| ApiError::NotFound("user no longer exists".to_string()))?;

    info!(user_id = %user.id, tenant_id = %tenant.id, "Member joined tenant");
    ok(user.profile())
}

// ---------------------------------------------------------------------------
// Forum
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewForumPost {
    pub author_name: String,
    pub author_id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: String,
}

async fn list_forum_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<ListResult<ForumPost>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.list_for_tenant(&tenant.id)?)
}

async fn create_forum_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewForumPost>,
) -> CreatedResult<ForumPost> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("title", &payload.title)?;
    require_text("content", &payload.content)?;

    let post = ForumPost {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        author_id: payload.author_id,
        author_name: payload.author_name,
        title: payload.title,
        content: payload.content,
        category: payload.category,
        created_at: Utc::now(),
    };
    state.storage.create(&post)?;
    created(post)
}

async fn delete_forum_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
) -> ApiResult<String> {
    let tenant = tenant_by_slug(&state, &slug)?;
    owned_record::<ForumPost>(&state, &tenant, &id)?;
    state.storage.delete::<ForumPost>(&id)?;

    info!(tenant_id = %tenant.id, id = %id, "Forum post deleted");
    ok(id)
}

// ---------------------------------------------------------------------------
// Prayer times
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrayerTimesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fajr: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhuhr: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asr: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maghrib: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isha: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jumuah_khatib: Option<String>,
}

async fn get_prayer_times_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<PrayerSchedule> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(state.storage.get::<PrayerSchedule>(&tenant.id)?)
}

async fn put_prayer_times_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(update): ApiJson<PrayerTimesUpdate>,
) -> ApiResult<PrayerSchedule> {
    let tenant = tenant_by_slug(&state, &slug)?;

    let mut fields = match serde_json::to_value(&update).map_err(StoreError::from)? {
        Value::Object(fields) => fields,
        _ => Map::new(),
    };
    fields.insert("tenantId".to_string(), Value::String(tenant.id.clone()));
    fields.insert(
        "updatedAt".to_string(),
        serde_json::to_value(Utc::now()).map_err(StoreError::from)?,
    );

    let schedule = state
        .storage
        .patch::<PrayerSchedule>(&tenant.id, &Value::Object(fields))?;
    info!(tenant_id = %tenant.id, "Prayer schedule updated");
    ok(schedule)
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    /// Only broadcasts plus this user's notifications.
    pub user_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub user_id: Option<String>,
}

async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<ListResult<Notification>> {
    let tenant = tenant_by_slug(&state, &slug)?;
    let items = state
        .storage
        .list_for_tenant::<Notification>(&tenant.id)?
        .items
        .into_iter()
        .filter(|n| match (&query.user_id, &n.user_id) {
            (Some(wanted), Some(owner)) => wanted == owner,
            _ => true,
        })
        .filter(|n| !query.unread_only || !n.read)
        .collect();
    ok(ListResult { items })
}

async fn create_notification_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ApiJson(payload): ApiJson<NewNotification>,
) -> CreatedResult<Notification> {
    let tenant = tenant_by_slug(&state, &slug)?;
    require_text("title", &payload.title)?;

    let notification = Notification {
        id: new_id(),
        tenant_id: tenant.id.clone(),
        user_id: payload.user_id,
        title: payload.title,
        message: payload.message,
        read: false,
        created_at: Utc::now(),
    };
    state.storage.create(&notification)?;
    created(notification)
}

async fn read_notification_handler(
    State(state): State<Arc<AppState>>,
    Path((slug, id)): Path<(String, String)>,
) -> ApiResult<Notification> {
    let tenant = tenant_by_slug(&state, &slug)?;
    ok(patch_owned(
        &state,
        &tenant,
        &id,
        serde_json::json!({ "read": true }),
        &[],
    )?)
}

// ---------------------------------------------------------------------------
// Public portal
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalView {
    pub tenant: Tenant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prayer_schedule: Option<PrayerSchedule>,
    pub upcoming_events: Vec<Event>,
    pub recent_posts: Vec<ForumPost>,
    pub finance: FinanceSummary,
    pub zis: ZisSummary,
}

/// Public landing page data. Only active tenants have a portal.
async fn portal_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<PortalView> {
    let tenant = tenant_by_slug(&state, &slug)?;
    if tenant.status != TenantStatus::Active {
        return Err(ApiError::NotFound(format!("tenant '{}' not found", slug)));
    }
    let storage = &state.storage;

    let prayer_schedule = storage
        .find::<PrayerSchedule>(&tenant.id)?
        .filter(PrayerSchedule::is_configured);

    let now = Utc::now();
    let mut upcoming_events: Vec<Event> = storage
        .list_for_tenant::<Event>(&tenant.id)?
        .items
        .into_iter()
        .filter(|event| event.date >= now)
        .collect();
    upcoming_events.sort_by_key(|event| event.date);
    upcoming_events.truncate(PORTAL_EVENTS);

    let mut recent_posts = storage.list_for_tenant::<ForumPost>(&tenant.id)?.items;
    recent_posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent_posts.truncate(PORTAL_POSTS);

    let finance = finance_summary(&storage.list_for_tenant::<Transaction>(&tenant.id)?.items);
    let zis = zis_summary(&storage.list_for_tenant::<ZisTransaction>(&tenant.id)?.items);

    ok(PortalView {
        tenant,
        prayer_schedule,
        upcoming_events,
        recent_posts,
        finance,
        zis,
    })
}

// ---------------------------------------------------------------------------
// Platform console
// ---------------------------------------------------------------------------

async fn admin_list_tenants_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<ListResult<Tenant>> {
    require_platform_admin(&claims)?;
    ok(state.storage.list::<Tenant>()?)
}

async fn approve_tenant_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Tenant> {
    require_platform_admin(&claims)?;
    change_status(&state, &tenant_id, TenantStatus::Active)
}

async fn suspend_tenant_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Tenant> {
    require_platform_admin(&claims)?;
    change_status(&state, &tenant_id, TenantStatus::Suspended)
}

fn change_status(state: &AppState, tenant_id: &str, next: TenantStatus) -> ApiResult<Tenant> {
    let tenant = transition_status(&state.storage, tenant_id, next)?
        .ok_or_else(|| ApiError::NotFound(format!("tenant '{}' not found", tenant_id)))?;
    ok(tenant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use crate::models::{demo, ensure_seed_data};
    use axum::body::Body;
    use serde_json::json;
    use tower::ServiceExt; // For .oneshot() testing

    fn test_app() -> (Router, Storage) {
        let storage = Storage::open_temporary().expect("Storage for REST test");
        ensure_seed_data(&storage).expect("Seed data");
        let app = create_router(storage.clone(), TokenIssuer::new(&AuthConfig::default()));
        (app, storage)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = axum::http::Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(app: &Router, email: &str, password: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/auth/login",
            Some(json!({ "email": email, "password": password })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_event(app: &Router, slug: &str, capacity: u32) -> String {
        let (status, body) = send(
            app,
            "POST",
            &format!("/api/{}/events", slug),
            Some(json!({
                "title": "Tabligh Akbar",
                "date": "2030-01-01T19:30:00Z",
                "capacity": capacity
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_and_unknown_tenant() {
        let (app, _) = test_app();

        let (status, body) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(&app, "GET", "/api/tenants/nowhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("nowhere"));

        let (status, _) = send(&app, "GET", "/api/nowhere/finance", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tenant_lookup_by_slug() {
        let (app, _) = test_app();
        let (status, body) = send(&app, "GET", "/api/tenants/al-ikhlas", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], demo::TENANT_ID);
        assert_eq!(body["data"]["status"], "active");

        // Pending tenants are not listed in the public directory
        let (_, body) = send(&app, "GET", "/api/tenants", None, None).await;
        let slugs: Vec<&str> = body["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["slug"].as_str().unwrap())
            .collect();
        assert_eq!(slugs, vec!["al-ikhlas"]);
    }

    #[tokio::test]
    async fn test_finance_is_scoped_to_tenant() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/an-nur/finance",
            Some(json!({ "type": "income", "amount": 150000, "category": "Donasi" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["tenantId"], demo::PENDING_TENANT_ID);

        let (_, body) = send(&app, "GET", "/api/an-nur/finance", None, None).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["amount"], 150000);

        let (_, body) = send(&app, "GET", "/api/al-ikhlas/finance", None, None).await;
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|tx| tx["tenantId"] == demo::TENANT_ID));

        let (_, body) = send(&app, "GET", "/api/al-ikhlas/finance/summary", None, None).await;
        assert_eq!(body["data"]["totalIncome"], 3_500_000);
        assert_eq!(body["data"]["totalExpense"], 750_000);
        assert_eq!(body["data"]["balance"], 2_750_000);
    }

    #[tokio::test]
    async fn test_invalid_bodies_are_bad_requests() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/al-ikhlas/finance",
            Some(json!({ "type": "expense", "amount": -10, "category": "Listrik" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            "POST",
            "/api/al-ikhlas/zis",
            Some(json!({ "type": "zakat_maal", "flow": "in", "amount": 100 })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/al-ikhlas/finance/{}", "f0000000-0000-4000-8000-000000000001"),
            Some(json!({ "amount": -1 })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_inventory_patch_changes_only_given_fields() {
        let (app, _) = test_app();
        let item_id = "b0000000-0000-4000-8000-000000000002";

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/al-ikhlas/inventory/{}", item_id),
            Some(json!({ "condition": "good", "tenantId": "someone-else", "id": "other" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["condition"], "good");
        assert_eq!(body["data"]["name"], "Sound System");
        assert_eq!(body["data"]["quantity"], 1);
        assert_eq!(body["data"]["tenantId"], demo::TENANT_ID);
        assert_eq!(body["data"]["id"], item_id);

        // Another tenant cannot reach the item
        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/an-nur/inventory/{}", item_id),
            Some(json!({ "quantity": 0 })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_zis_payment_counts_once_marked_paid() {
        let (app, _) = test_app();

        let (status, before) = send(&app, "GET", "/api/al-ikhlas/zis/summary", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let collected = before["data"]["collected"].as_u64().unwrap();
        let pending = before["data"]["pendingCount"].as_u64().unwrap();

        let (status, body) = send(
            &app,
            "POST",
            "/api/al-ikhlas/zis",
            Some(json!({
                "type": "zakat_maal",
                "flow": "in",
                "amount": 250000,
                "muzakki_name": "Hamba Allah"
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["payment_status"], "pending");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        // Pending rows are counted but not collected
        let (_, summary) = send(&app, "GET", "/api/al-ikhlas/zis/summary", None, None).await;
        assert_eq!(summary["data"]["collected"], collected);
        assert_eq!(summary["data"]["pendingCount"], pending + 1);

        let (status, body) = send(
            &app,
            "PATCH",
            &format!("/api/al-ikhlas/zis/{}", id),
            Some(json!({ "payment_status": "paid" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["payment_status"], "paid");
        assert_eq!(body["data"]["amount"], 250000);

        let (_, summary) = send(&app, "GET", "/api/al-ikhlas/zis/summary", None, None).await;
        assert_eq!(summary["data"]["collected"], collected + 250_000);
        assert_eq!(summary["data"]["pendingCount"], pending);
        assert!(summary["data"]["byType"]["zakat_maal"]["collected"].as_u64().unwrap() >= 250_000);
    }

    #[tokio::test]
    async fn test_event_registration_respects_capacity() {
        let (app, storage) = test_app();
        let event_id = create_event(&app, "al-ikhlas", 2).await;
        let uri = format!("/api/al-ikhlas/events/{}/register", event_id);

        for expected in 1..=2 {
            let (status, body) = send(&app, "POST", &uri, Some(json!({ "name": "Jamaah" })), None).await;
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["data"]["event"]["currentRegistrations"], expected);
            assert_eq!(body["data"]["remainingSeats"], 2 - expected);
        }

        let (status, body) = send(&app, "POST", &uri, Some(json!({ "name": "Late" })), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "event is full");

        assert_eq!(storage.get::<Event>(&event_id).unwrap().current_registrations, 2);
        let (_, body) = send(
            &app,
            "GET",
            &format!("/api/al-ikhlas/events/{}/registrations", event_id),
            None,
            None,
        )
        .await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);

        // Capacity cannot drop below existing registrations
        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/api/al-ikhlas/events/{}", event_id),
            Some(json!({ "capacity": 1 })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        // The event belongs to al-ikhlas only
        let (status, _) = send(
            &app,
            "POST",
            &format!("/api/an-nur/events/{}/register", event_id),
            Some(json!({ "name": "Jamaah" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_concurrent_registrations_never_exceed_capacity() {
        let (app, storage) = test_app();
        let event_id = create_event(&app, "al-ikhlas", 5).await;
        let uri = format!("/api/al-ikhlas/events/{}/register", event_id);

        let tasks: Vec<_> = (0..12)
            .map(|i| {
                let app = app.clone();
                let uri = uri.clone();
                tokio::spawn(async move {
                    send(&app, "POST", &uri, Some(json!({ "name": format!("Jamaah {}", i) })), None)
                        .await
                        .0
                })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap() == StatusCode::CREATED {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 5);
        assert_eq!(storage.get::<Event>(&event_id).unwrap().current_registrations, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capacity_patch_racing_registrations_keeps_seats_consistent() {
        let (app, storage) = test_app();

        for _ in 0..10 {
            let event_id = create_event(&app, "al-ikhlas", 10).await;
            let register_uri = format!("/api/al-ikhlas/events/{}/register", event_id);
            let patch_uri = format!("/api/al-ikhlas/events/{}", event_id);

            let registrations: Vec<_> = (0..10)
                .map(|i| {
                    let app = app.clone();
                    let uri = register_uri.clone();
                    tokio::spawn(async move {
                        send(&app, "POST", &uri, Some(json!({ "name": format!("Jamaah {}", i) })), None)
                            .await
                            .0
                    })
                })
                .collect();
            let shrink = {
                let app = app.clone();
                tokio::spawn(async move {
                    send(&app, "PATCH", &patch_uri, Some(json!({ "capacity": 4 })), None)
                        .await
                        .0
                })
            };

            let mut accepted = 0;
            for task in registrations {
                if task.await.unwrap() == StatusCode::CREATED {
                    accepted += 1;
                }
            }
            let shrink_status = shrink.await.unwrap();
            assert!(
                shrink_status == StatusCode::OK || shrink_status == StatusCode::CONFLICT,
                "unexpected status {}",
                shrink_status
            );

            let event = storage.get::<Event>(&event_id).unwrap();
            let capacity = event.capacity.unwrap();
            if shrink_status == StatusCode::OK {
                assert_eq!(capacity, 4);
            } else {
                assert_eq!(capacity, 10);
            }
            assert!(event.current_registrations <= capacity);
            assert_eq!(event.current_registrations, accepted);

            let (_, body) = send(
                &app,
                "GET",
                &format!("/api/al-ikhlas/events/{}/registrations", event_id),
                None,
                None,
            )
            .await;
            assert_eq!(body["data"]["items"].as_array().unwrap().len() as u32, accepted);
        }
    }

    #[tokio::test]
    async fn test_register_login_and_join() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({ "name": "Fatimah", "email": "Fatimah@Example.com", "password": "rahasia123" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["role"], "jamaah");
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({ "name": "Copy", "email": "fatimah@example.com", "password": "rahasia123" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "fatimah@example.com", "password": "wrong-password" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app, "fatimah@example.com", "rahasia123").await;
        let (status, body) = send(&app, "GET", "/api/auth/me", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "fatimah@example.com");

        let (status, _) = send(&app, "POST", "/api/al-ikhlas/members/join", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "POST", "/api/an-nur/members/join", None, Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, "POST", "/api/al-ikhlas/members/join", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tenantIds"], json!([demo::TENANT_ID]));

        let (_, body) = send(&app, "GET", "/api/al-ikhlas/members", None, None).await;
        let emails: Vec<&str> = body["data"]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["email"].as_str().unwrap())
            .collect();
        assert!(emails.contains(&"fatimah@example.com"));
        assert!(emails.contains(&demo::DKM_ADMIN_EMAIL));
        assert!(!emails.contains(&demo::SUPERADMIN_EMAIL));
    }

    #[tokio::test]
    async fn test_mosque_onboarding_and_approval() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({
                "name": "Hasan",
                "email": "hasan@baitur-rahman.id",
                "password": "rahasia123",
                "mosque": { "name": "Masjid Baitur Rahman", "slug": "baitur-rahman" }
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["role"], "dkm_admin");
        assert_eq!(body["data"]["tenant"]["status"], "pending");
        let tenant_id = body["data"]["tenant"]["id"].as_str().unwrap().to_string();

        // Taken slug is rejected and leaves no user behind
        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/register",
            Some(json!({
                "name": "Other",
                "email": "other@example.com",
                "password": "rahasia123",
                "mosque": { "name": "Masjid Lain", "slug": "al-ikhlas" }
            })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(
            &app,
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "other@example.com", "password": "rahasia123" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/api/baitur-rahman/portal", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let approve = format!("/api/admin/tenants/{}/approve", tenant_id);
        let (status, _) = send(&app, "POST", &approve, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let dkm = login(&app, "hasan@baitur-rahman.id", "rahasia123").await;
        let (status, _) = send(&app, "POST", &approve, None, Some(&dkm)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = login(&app, demo::SUPERADMIN_EMAIL, demo::SUPERADMIN_PASSWORD).await;
        let (status, body) = send(&app, "POST", &approve, None, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "active");

        let (status, body) = send(&app, "GET", "/api/baitur-rahman/portal", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tenant"]["slug"], "baitur-rahman");

        // Approving twice is an invalid transition
        let (status, _) = send(&app, "POST", &approve, None, Some(&admin)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let suspend = format!("/api/admin/tenants/{}/suspend", tenant_id);
        let (status, body) = send(&app, "POST", &suspend, None, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "suspended");

        let (status, body) = send(&app, "GET", "/api/admin/tenants", None, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_settings_keep_slug_and_status() {
        let (app, _) = test_app();
        let (status, body) = send(
            &app,
            "PUT",
            "/api/al-ikhlas/settings",
            Some(json!({ "bio": "Masjid ramah anak", "slug": "hijacked", "status": "suspended" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["bio"], "Masjid ramah anak");
        assert_eq!(body["data"]["slug"], "al-ikhlas");
        assert_eq!(body["data"]["status"], "active");
        assert_eq!(body["data"]["name"], "Masjid Al-Ikhlas");
    }

    #[tokio::test]
    async fn test_forum_delete_and_prayer_times() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/al-ikhlas/forum",
            Some(json!({ "authorName": "Umar", "title": "Parkir", "content": "Mohon rapikan parkir motor" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let post_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/api/an-nur/forum/{}", post_id), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, "DELETE", &format!("/api/al-ikhlas/forum/{}", post_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, "GET", "/api/al-ikhlas/forum", None, None).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        // An-Nur has no schedule yet: the initial state comes back unconfigured
        let (status, body) = send(&app, "GET", "/api/an-nur/prayer-times", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fajr"], Value::Null);

        let (status, body) = send(
            &app,
            "PUT",
            "/api/an-nur/prayer-times",
            Some(json!({ "fajr": "04:40:00", "maghrib": "17:58:00" })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fajr"], "04:40:00");
        assert_eq!(body["data"]["tenantId"], demo::PENDING_TENANT_ID);

        let (_, body) = send(&app, "GET", "/api/an-nur/prayer-times", None, None).await;
        assert_eq!(body["data"]["maghrib"], "17:58:00");
        assert_eq!(body["data"]["isha"], Value::Null);
    }

    #[tokio::test]
    async fn test_notifications_and_portal() {
        let (app, _) = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/api/al-ikhlas/notifications",
            Some(json!({ "title": "Infaq", "message": "Terima kasih", "userId": demo::AMIL_ID })),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (_, body) = send(
            &app,
            "GET",
            &format!("/api/al-ikhlas/notifications?userId={}", demo::DKM_ADMIN_ID),
            None,
            None,
        )
        .await;
        // Only the seeded broadcast is visible to another user
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/al-ikhlas/notifications/{}/read", id),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["read"], true);

        let (_, body) = send(&app, "GET", "/api/al-ikhlas/notifications?unreadOnly=true", None, None).await;
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "GET", "/api/al-ikhlas/portal", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tenant"]["slug"], "al-ikhlas");
        assert!(body["data"]["prayerSchedule"]["fajr"].is_string());
        assert_eq!(body["data"]["upcomingEvents"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["zis"]["collected"], 450_000);
        assert_eq!(body["data"]["zis"]["reconciled"], true);
    }
}
