pub mod ai;
pub mod core;
pub mod errors;
pub mod i18n;
pub mod models;
pub mod nav;
pub mod redaction;
pub mod session;
pub mod store;

use crate::core::CrmCore;
use crate::models::{
    AppSettings, BooleanResponse, Customer, CustomerNote, CustomerUpdate, DashboardStats, Employee,
    Language, Lead, LeadInsight, LeadInsightPayload, LeadStatus, LocaleSnapshot, MarketIntel,
    MarketIntelPayload, NewCustomer, NewEmployee, NewLead, NewSale, NewTask, NewTicket,
    RouteResolution, Sale, SessionStatus, SignInPayload, Task, Ticket,
};
use std::path::Path;
use tauri::Manager;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Clone)]
struct AppState {
    core: CrmCore,
}

#[tauri::command]
fn sign_in(state: tauri::State<'_, AppState>, payload: SignInPayload) -> Result<BooleanResponse, String> {
    Ok(state.core.sign_in(payload))
}

#[tauri::command]
fn sign_out(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    Ok(state.core.sign_out())
}

#[tauri::command]
fn session_status(state: tauri::State<'_, AppState>) -> Result<SessionStatus, String> {
    Ok(state.core.session_status())
}

#[tauri::command]
fn resolve_route(state: tauri::State<'_, AppState>, path: String) -> Result<RouteResolution, String> {
    Ok(state.core.resolve_route(&path))
}

#[tauri::command]
fn list_leads(state: tauri::State<'_, AppState>) -> Result<Vec<Lead>, String> {
    Ok(state.core.leads())
}

#[tauri::command]
fn add_lead(state: tauri::State<'_, AppState>, payload: NewLead) -> Result<Lead, String> {
    Ok(state.core.add_lead(payload))
}

#[tauri::command]
fn set_lead_status(
    state: tauri::State<'_, AppState>,
    lead_id: String,
    status: LeadStatus,
) -> Result<Lead, String> {
    state
        .core
        .set_lead_status(&lead_id, status)
        .map_err(to_client_error)
}

#[tauri::command]
fn list_customers(state: tauri::State<'_, AppState>) -> Result<Vec<Customer>, String> {
    Ok(state.core.customers())
}

#[tauri::command]
fn get_customer(state: tauri::State<'_, AppState>, customer_id: String) -> Result<Option<Customer>, String> {
    Ok(state.core.customer_by_id(&customer_id))
}

#[tauri::command]
fn add_customer(state: tauri::State<'_, AppState>, payload: NewCustomer) -> Result<Customer, String> {
    Ok(state.core.add_customer(payload))
}

#[tauri::command]
fn update_customer(
    state: tauri::State<'_, AppState>,
    customer_id: String,
    update: CustomerUpdate,
) -> Result<Option<Customer>, String> {
    Ok(state.core.update_customer(&customer_id, update))
}

#[tauri::command]
fn add_customer_note(
    state: tauri::State<'_, AppState>,
    customer_id: String,
    text: String,
) -> Result<CustomerNote, String> {
    state
        .core
        .add_customer_note(&customer_id, &text)
        .map_err(to_client_error)
}

#[tauri::command]
fn delete_customer_note(
    state: tauri::State<'_, AppState>,
    customer_id: String,
    note_id: String,
) -> Result<BooleanResponse, String> {
    state
        .core
        .delete_customer_note(&customer_id, &note_id)
        .map(|_| BooleanResponse { success: true })
        .map_err(to_client_error)
}

#[tauri::command]
fn list_sales(state: tauri::State<'_, AppState>) -> Result<Vec<Sale>, String> {
    Ok(state.core.sales())
}

#[tauri::command]
fn add_sale(state: tauri::State<'_, AppState>, payload: NewSale) -> Result<Sale, String> {
    Ok(state.core.add_sale(payload))
}

#[tauri::command]
fn list_tasks(state: tauri::State<'_, AppState>) -> Result<Vec<Task>, String> {
    Ok(state.core.tasks())
}

#[tauri::command]
fn set_tasks(state: tauri::State<'_, AppState>, tasks: Vec<Task>) -> Result<BooleanResponse, String> {
    state.core.set_tasks(tasks);
    Ok(BooleanResponse { success: true })
}

#[tauri::command]
fn add_task(state: tauri::State<'_, AppState>, payload: NewTask) -> Result<Task, String> {
    Ok(state.core.add_task(payload))
}

#[tauri::command]
fn toggle_task(state: tauri::State<'_, AppState>, task_id: String) -> Result<Task, String> {
    state.core.toggle_task(&task_id).map_err(to_client_error)
}

#[tauri::command]
fn list_employees(state: tauri::State<'_, AppState>) -> Result<Vec<Employee>, String> {
    Ok(state.core.employees())
}

#[tauri::command]
fn add_employee(state: tauri::State<'_, AppState>, payload: NewEmployee) -> Result<Employee, String> {
    Ok(state.core.add_employee(payload))
}

#[tauri::command]
fn list_tickets(state: tauri::State<'_, AppState>) -> Result<Vec<Ticket>, String> {
    Ok(state.core.tickets())
}

#[tauri::command]
fn add_ticket(state: tauri::State<'_, AppState>, payload: NewTicket) -> Result<Ticket, String> {
    Ok(state.core.add_ticket(payload))
}

#[tauri::command]
fn dashboard_stats(state: tauri::State<'_, AppState>) -> Result<DashboardStats, String> {
    Ok(state.core.dashboard_stats())
}

#[tauri::command]
fn set_language(state: tauri::State<'_, AppState>, language: Language) -> Result<LocaleSnapshot, String> {
    Ok(state.core.set_language(language))
}

#[tauri::command]
fn get_locale(state: tauri::State<'_, AppState>) -> Result<LocaleSnapshot, String> {
    Ok(state.core.locale())
}

#[tauri::command]
async fn lead_insight(
    state: tauri::State<'_, AppState>,
    payload: LeadInsightPayload,
) -> Result<LeadInsight, String> {
    Ok(state.core.lead_insight(payload).await)
}

#[tauri::command]
async fn market_intel(
    state: tauri::State<'_, AppState>,
    payload: MarketIntelPayload,
) -> Result<MarketIntel, String> {
    Ok(state.core.market_intel(payload).await)
}

#[tauri::command]
fn get_settings(state: tauri::State<'_, AppState>) -> Result<AppSettings, String> {
    Ok(state.core.settings())
}

#[tauri::command]
fn update_settings(
    state: tauri::State<'_, AppState>,
    settings: serde_json::Value,
) -> Result<AppSettings, String> {
    state.core.update_settings(settings).map_err(to_client_error)
}

#[tauri::command]
async fn save_api_token(state: tauri::State<'_, AppState>, token: String) -> Result<BooleanResponse, String> {
    state.core.save_api_token(token).await.map_err(to_client_error)
}

#[tauri::command]
async fn clear_api_token(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.core.clear_api_token().await.map_err(to_client_error)
}

#[tauri::command]
async fn has_api_token(state: tauri::State<'_, AppState>) -> Result<BooleanResponse, String> {
    state.core.has_api_token().await.map_err(to_client_error)
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            init_tracing(&app_data_dir).map_err(|error| error.to_string())?;

            let core = CrmCore::new(&app_data_dir).map_err(|error| error.to_string())?;
            app.manage(AppState { core });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            sign_in,
            sign_out,
            session_status,
            resolve_route,
            list_leads,
            add_lead,
            set_lead_status,
            list_customers,
            get_customer,
            add_customer,
            update_customer,
            add_customer_note,
            delete_customer_note,
            list_sales,
            add_sale,
            list_tasks,
            set_tasks,
            add_task,
            toggle_task,
            list_employees,
            add_employee,
            list_tickets,
            add_ticket,
            dashboard_stats,
            set_language,
            get_locale,
            lead_insight,
            market_intel,
            get_settings,
            update_settings,
            save_api_token,
            clear_api_token,
            has_api_token
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "waterberry.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
