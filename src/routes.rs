// Parking Vecinal - HTTP routes and handlers
// Request cycle: router -> 0-1 prepared statements -> flash -> redirect
// (mutations) or rendered page (reads). The SQLite connection is shared
// behind a mutex, as in any single-process deployment of this size.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use axum::extract::{FromRef, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::cookie::{Key, SignedCookieJar};
use rusqlite::Connection;
use serde::Deserialize;
use tower_http::services::ServeDir;

use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::flash::{self, Flash};
use crate::uploads;
use crate::views;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub upload_dir: PathBuf,
    key: Key,
}

impl AppState {
    pub fn new(conn: Connection, config: &Config) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            upload_dir: config.upload_dir.clone(),
            key: flash::signing_key(&config.secret_key),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    let upload_dir = state.upload_dir.clone();

    Router::new()
        .route("/", get(dashboard))
        .route("/admin/users", get(users).post(create_user))
        .route("/admin/users/:neighbor_id/delete", post(delete_user))
        .route(
            "/admin/users/:neighbor_id/vehicles",
            get(vehicles).post(create_vehicle),
        )
        .route(
            "/admin/users/:neighbor_id/vehicles/:vehicle_id/delete",
            post(delete_vehicle),
        )
        .route(
            "/admin/users/:neighbor_id/payments",
            get(payments).post(create_payment),
        )
        .route(
            "/admin/users/:neighbor_id/payments/:payment_id/delete",
            post(delete_payment),
        )
        .route("/portal", get(portal).post(portal_results))
        .route("/portal/:neighbor_id", get(portal_detail))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .fallback(not_found)
        .with_state(state)
}

// ============================================================================
// Forms
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct NeighborForm {
    first_name: String,
    last_name: String,
    address: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VehicleForm {
    license_plate: String,
    make: String,
    model: String,
    control_number: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchForm {
    query: String,
}

// ============================================================================
// Dashboard & neighbor management
// ============================================================================

async fn dashboard(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);

    let rows = {
        let conn = state.db.lock().unwrap();
        db::list_neighbors_dashboard(&conn)?
    };

    Ok((jar, Html(views::dashboard_page(flash.as_ref(), &rows))).into_response())
}

async fn users(State(state): State<AppState>, jar: SignedCookieJar) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);

    let neighbors = {
        let conn = state.db.lock().unwrap();
        db::list_neighbors_alpha(&conn)?
    };

    Ok((jar, Html(views::users_page(flash.as_ref(), &neighbors))).into_response())
}

async fn create_user(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<NeighborForm>,
) -> Result<Response, AppError> {
    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    let address = form.address.trim();

    let jar = if first_name.is_empty() || last_name.is_empty() || address.is_empty() {
        flash::set_flash(jar, &Flash::error("Todos los campos son obligatorios"))
    } else {
        let conn = state.db.lock().unwrap();
        db::insert_neighbor(&conn, first_name, last_name, address)?;
        drop(conn);
        flash::set_flash(jar, &Flash::success("Vecino registrado correctamente"))
    };

    Ok((jar, Redirect::to("/admin/users")).into_response())
}

async fn delete_user(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();

    if db::get_neighbor(&conn, neighbor_id)?.is_none() {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
        return Ok((jar, Redirect::to("/admin/users")).into_response());
    }

    // Receipt files first, then the row; the cascade removes dependents
    let files = db::neighbor_receipt_files(&conn, neighbor_id)?;
    for file in &files {
        uploads::delete_receipt(&state.upload_dir, file)?;
    }
    db::delete_neighbor(&conn, neighbor_id)?;
    drop(conn);

    let jar = flash::set_flash(jar, &Flash::success("Vecino eliminado"));
    Ok((jar, Redirect::to("/admin/users")).into_response())
}

// ============================================================================
// Vehicle management
// ============================================================================

async fn vehicles(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);
    let conn = state.db.lock().unwrap();

    let Some(neighbor) = db::get_neighbor(&conn, neighbor_id)? else {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
        return Ok((jar, Redirect::to("/admin/users")).into_response());
    };

    let vehicles = db::list_vehicles(&conn, neighbor_id)?;
    drop(conn);

    Ok((
        jar,
        Html(views::vehicles_page(flash.as_ref(), &neighbor, &vehicles)),
    )
        .into_response())
}

async fn create_vehicle(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
    Form(form): Form<VehicleForm>,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();

    if db::get_neighbor(&conn, neighbor_id)?.is_none() {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
        return Ok((jar, Redirect::to("/admin/users")).into_response());
    }

    let license_plate = form.license_plate.trim();
    let make = form.make.trim();
    let model = form.model.trim();
    let control_number = form.control_number.trim();

    let jar = if license_plate.is_empty()
        || make.is_empty()
        || model.is_empty()
        || control_number.is_empty()
    {
        drop(conn);
        flash::set_flash(jar, &Flash::error("Todos los campos son obligatorios"))
    } else {
        db::insert_vehicle(&conn, neighbor_id, license_plate, make, model, control_number)?;
        drop(conn);
        flash::set_flash(jar, &Flash::success("Vehículo agregado"))
    };

    Ok((
        jar,
        Redirect::to(&format!("/admin/users/{neighbor_id}/vehicles")),
    )
        .into_response())
}

async fn delete_vehicle(
    State(state): State<AppState>,
    Path((neighbor_id, vehicle_id)): Path<(i64, i64)>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let deleted = {
        let conn = state.db.lock().unwrap();
        db::delete_vehicle(&conn, neighbor_id, vehicle_id)?
    };

    let jar = if deleted {
        flash::set_flash(jar, &Flash::success("Vehículo eliminado"))
    } else {
        flash::set_flash(jar, &Flash::error("Vehículo no encontrado"))
    };

    Ok((
        jar,
        Redirect::to(&format!("/admin/users/{neighbor_id}/vehicles")),
    )
        .into_response())
}

// ============================================================================
// Payment management
// ============================================================================

async fn payments(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);
    let conn = state.db.lock().unwrap();

    let Some(neighbor) = db::get_neighbor(&conn, neighbor_id)? else {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
        return Ok((jar, Redirect::to("/admin/users")).into_response());
    };

    let payments = db::list_payments(&conn, neighbor_id)?;
    drop(conn);

    Ok((
        jar,
        Html(views::payments_page(flash.as_ref(), &neighbor, &payments)),
    )
        .into_response())
}

async fn create_payment(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut method = String::new();
    let mut amount_raw = String::new();
    let mut deposit_account = String::new();
    let mut receipt: Option<String> = None;
    let mut bad_extension = false;

    // Drain the multipart body before touching the connection; the
    // receipt is written to disk as soon as its extension passes.
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "method" => method = field.text().await?.trim().to_string(),
            "amount" => amount_raw = field.text().await?.trim().to_string(),
            "deposit_account" => deposit_account = field.text().await?.trim().to_string(),
            "receipt" => {
                let original = field.file_name().unwrap_or("").to_string();
                if original.is_empty() {
                    continue;
                }
                match uploads::stored_filename(&original) {
                    Some(stored) => {
                        let bytes = field.bytes().await?;
                        uploads::save_receipt(&state.upload_dir, &stored, &bytes)?;
                        receipt = Some(stored);
                    }
                    None => bad_extension = true,
                }
            }
            _ => {}
        }
    }

    let back = format!("/admin/users/{neighbor_id}/payments");

    {
        let conn = state.db.lock().unwrap();
        if db::get_neighbor(&conn, neighbor_id)?.is_none() {
            drop(conn);
            if let Some(file) = &receipt {
                uploads::delete_receipt(&state.upload_dir, file)?;
            }
            let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
            return Ok((jar, Redirect::to("/admin/users")).into_response());
        }
    }

    if bad_extension {
        if let Some(file) = &receipt {
            uploads::delete_receipt(&state.upload_dir, file)?;
        }
        let jar = flash::set_flash(
            jar,
            &Flash::error("Formato de archivo no permitido. Usa png, jpg, jpeg, gif o pdf."),
        );
        return Ok((jar, Redirect::to(&back)).into_response());
    }

    let parsed = amount_raw.parse::<f64>().ok().filter(|a| a.is_finite());
    let Some(amount) = parsed.filter(|_| !method.is_empty()) else {
        // Validation failed after the file may already be on disk
        if let Some(file) = &receipt {
            uploads::delete_receipt(&state.upload_dir, file)?;
        }
        let jar = flash::set_flash(
            jar,
            &Flash::error("Debe capturar el método de pago y un monto válido"),
        );
        return Ok((jar, Redirect::to(&back)).into_response());
    };

    let deposit = (!deposit_account.is_empty()).then_some(deposit_account.as_str());
    {
        let conn = state.db.lock().unwrap();
        db::insert_payment(&conn, neighbor_id, &method, amount, deposit, receipt.as_deref())?;
    }

    let jar = flash::set_flash(jar, &Flash::success("Pago registrado"));
    Ok((jar, Redirect::to(&back)).into_response())
}

async fn delete_payment(
    State(state): State<AppState>,
    Path((neighbor_id, payment_id)): Path<(i64, i64)>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let conn = state.db.lock().unwrap();

    let Some(payment) = db::get_payment(&conn, neighbor_id, payment_id)? else {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Pago no encontrado"));
        return Ok((
            jar,
            Redirect::to(&format!("/admin/users/{neighbor_id}/payments")),
        )
            .into_response());
    };

    if let Some(file) = &payment.receipt_file {
        uploads::delete_receipt(&state.upload_dir, file)?;
    }
    db::delete_payment(&conn, neighbor_id, payment_id)?;
    drop(conn);

    let jar = flash::set_flash(jar, &Flash::success("Pago eliminado"));
    Ok((
        jar,
        Redirect::to(&format!("/admin/users/{neighbor_id}/payments")),
    )
        .into_response())
}

// ============================================================================
// Resident portal
// ============================================================================

async fn portal(jar: SignedCookieJar) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);
    Ok((jar, Html(views::portal_search_page(flash.as_ref(), "", &[]))).into_response())
}

async fn portal_results(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(form): Form<SearchForm>,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);
    let query = form.query.trim();

    // An empty query shows the blank form again, never the full roster
    let results = if query.is_empty() {
        Vec::new()
    } else {
        let conn = state.db.lock().unwrap();
        db::search_neighbors(&conn, query)?
    };

    Ok((
        jar,
        Html(views::portal_search_page(flash.as_ref(), query, &results)),
    )
        .into_response())
}

async fn portal_detail(
    State(state): State<AppState>,
    Path(neighbor_id): Path<i64>,
    jar: SignedCookieJar,
) -> Result<Response, AppError> {
    let (jar, flash) = flash::take_flash(jar);
    let conn = state.db.lock().unwrap();

    let Some(neighbor) = db::get_neighbor(&conn, neighbor_id)? else {
        drop(conn);
        let jar = flash::set_flash(jar, &Flash::error("Vecino no encontrado"));
        return Ok((jar, Redirect::to("/portal")).into_response());
    };

    let vehicles = db::list_vehicles(&conn, neighbor_id)?;
    let payments = db::list_payments(&conn, neighbor_id)?;
    drop(conn);

    Ok((
        jar,
        Html(views::portal_detail_page(
            flash.as_ref(),
            &neighbor,
            &vehicles,
            &payments,
        )),
    )
        .into_response())
}

// ============================================================================
// Error pages
// ============================================================================

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(views::not_found_page())).into_response()
}
