use crate::ai::gemini::GeminiBackend;
use crate::ai::InsightGateway;
use crate::errors::{AppError, AppResult};
use crate::i18n::{self, LocaleState};
use crate::models::{
    AppSettings, BooleanResponse, Customer, CustomerNote, CustomerUpdate, DashboardStats, Employee,
    Language, Lead, LeadInsight, LeadInsightPayload, LeadStatus, LocaleSnapshot, MarketIntel,
    MarketIntelPayload, NewCustomer, NewEmployee, NewLead, NewSale, NewTask, NewTicket,
    RouteResolution, Sale, SaleStatus, SessionStatus, SignInPayload, Task, Ticket, TicketStatus,
};
use crate::nav;
use crate::redaction::Scrubber;
use crate::session;
use crate::store::Store;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

const KEYRING_SERVICE: &str = "waterberry-crm";
const KEYRING_USER: &str = "gemini";

#[derive(Clone)]
pub struct CrmCore {
    store: Arc<Store>,
    locale: Arc<LocaleState>,
    keyring_lock: Arc<Mutex<()>>,
}

impl CrmCore {
    pub fn new(app_data_dir: &Path) -> AppResult<Self> {
        let store = Store::new(&app_data_dir.join("waterberry.db"))?;
        let default_language = store.settings().default_language;
        Ok(Self {
            store: Arc::new(store),
            locale: Arc::new(LocaleState::new(default_language)),
            keyring_lock: Arc::new(Mutex::new(())),
        })
    }

    // ─── Session ────────────────────────────────────────────────────────────

    /// A failed check is a user-visible outcome, not an error.
    pub fn sign_in(&self, payload: SignInPayload) -> BooleanResponse {
        if session::check_credentials(&payload.email, &payload.password) {
            self.store.set_session_flag(true);
            BooleanResponse { success: true }
        } else {
            tracing::info!("sign-in rejected");
            BooleanResponse { success: false }
        }
    }

    pub fn sign_out(&self) -> BooleanResponse {
        self.store.set_session_flag(false);
        BooleanResponse { success: true }
    }

    pub fn session_status(&self) -> SessionStatus {
        SessionStatus {
            authenticated: self.store.session_flag(),
        }
    }

    pub fn resolve_route(&self, path: &str) -> RouteResolution {
        nav::resolve(path, self.store.session_flag())
    }

    // ─── Entities ───────────────────────────────────────────────────────────

    pub fn leads(&self) -> Vec<Lead> {
        self.store.leads()
    }

    pub fn add_lead(&self, payload: NewLead) -> Lead {
        self.store.add_lead(payload)
    }

    pub fn set_lead_status(&self, id: &str, status: LeadStatus) -> AppResult<Lead> {
        self.store.set_lead_status(id, status)
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.store.customers()
    }

    pub fn customer_by_id(&self, id: &str) -> Option<Customer> {
        self.store.customer_by_id(id)
    }

    pub fn add_customer(&self, payload: NewCustomer) -> Customer {
        self.store.add_customer(payload)
    }

    pub fn update_customer(&self, id: &str, update: CustomerUpdate) -> Option<Customer> {
        self.store.update_customer(id, update)
    }

    pub fn add_customer_note(&self, customer_id: &str, text: &str) -> AppResult<CustomerNote> {
        self.store.add_customer_note(customer_id, text)
    }

    pub fn delete_customer_note(&self, customer_id: &str, note_id: &str) -> AppResult<()> {
        self.store.delete_customer_note(customer_id, note_id)
    }

    pub fn sales(&self) -> Vec<Sale> {
        self.store.sales()
    }

    pub fn add_sale(&self, payload: NewSale) -> Sale {
        self.store.add_sale(payload)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.store.tasks()
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        self.store.set_tasks(&tasks);
    }

    pub fn add_task(&self, payload: NewTask) -> Task {
        self.store.add_task(payload)
    }

    pub fn toggle_task(&self, id: &str) -> AppResult<Task> {
        self.store.toggle_task(id)
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.store.employees()
    }

    pub fn add_employee(&self, payload: NewEmployee) -> Employee {
        self.store.add_employee(payload)
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.store.tickets()
    }

    pub fn add_ticket(&self, payload: NewTicket) -> Ticket {
        self.store.add_ticket(payload)
    }

    // ─── Dashboard ──────────────────────────────────────────────────────────

    pub fn dashboard_stats(&self) -> DashboardStats {
        let leads = self.store.leads();
        let mut leads_by_status: BTreeMap<String, u64> = BTreeMap::new();
        for lead in &leads {
            *leads_by_status
                .entry(lead.status.as_str().to_string())
                .or_insert(0) += 1;
        }

        let sales = self.store.sales();
        let (mut pipeline, mut closed) = (0.0, 0.0);
        for sale in &sales {
            let amount = parse_amount(&sale.amount);
            match sale.status {
                SaleStatus::Closed => closed += amount,
                SaleStatus::Negotiation | SaleStatus::Invoiced => pipeline += amount,
            }
        }

        DashboardStats {
            total_leads: leads.len() as u64,
            leads_by_status,
            total_customers: self.store.customers().len() as u64,
            open_tickets: self
                .store
                .tickets()
                .iter()
                .filter(|ticket| ticket.status != TicketStatus::Resolved)
                .count() as u64,
            pending_tasks: self
                .store
                .tasks()
                .iter()
                .filter(|task| !task.completed)
                .count() as u64,
            pipeline_revenue: pipeline,
            closed_revenue: closed,
        }
    }

    // ─── Localization ───────────────────────────────────────────────────────

    pub fn set_language(&self, language: Language) -> LocaleSnapshot {
        self.locale.set_language(language)
    }

    pub fn locale(&self) -> LocaleSnapshot {
        self.locale.snapshot()
    }

    // ─── AI gateway ─────────────────────────────────────────────────────────

    pub async fn lead_insight(&self, payload: LeadInsightPayload) -> LeadInsight {
        let settings = self.store.settings();
        let Some(gateway) = self.gateway(&settings).await else {
            return crate::ai::fallback_insight();
        };
        gateway
            .lead_insight(
                &settings.insight_model,
                &payload.name,
                payload.status,
                &payload.context,
            )
            .await
    }

    pub async fn market_intel(&self, payload: MarketIntelPayload) -> MarketIntel {
        let settings = self.store.settings();
        let Some(gateway) = self.gateway(&settings).await else {
            return crate::ai::fallback_intel();
        };
        gateway
            .market_intel(
                &settings.research_model,
                &payload.query,
                i18n::language_name(payload.language),
            )
            .await
    }

    async fn gateway(&self, settings: &AppSettings) -> Option<InsightGateway> {
        let Some(api_key) = self.resolve_api_key().await else {
            tracing::warn!(cause = "credential-missing", "AI request degraded to fallback");
            return None;
        };
        Some(InsightGateway::new(
            Arc::new(GeminiBackend::new(api_key)),
            Scrubber::new(settings.redact_aggressive),
        ))
    }

    /// Keyring first, environment second. Absence is not an error here; the
    /// gateway degrades to its fallback values.
    async fn resolve_api_key(&self) -> Option<String> {
        {
            let _guard = self.keyring_lock.lock().await;
            if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER) {
                match entry.get_password() {
                    Ok(value) if !value.is_empty() => return Some(value),
                    Ok(_) | Err(keyring::Error::NoEntry) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "keyring read failed, falling back to environment");
                    }
                }
            }
        }
        std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|value| !value.is_empty())
    }

    // ─── Credential management ──────────────────────────────────────────────

    pub async fn save_api_token(&self, token: String) -> AppResult<BooleanResponse> {
        let _guard = self.keyring_lock.lock().await;
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|error| AppError::Io(error.to_string()))?;
        entry
            .set_password(&token)
            .map_err(|error| AppError::Io(error.to_string()))?;
        Ok(BooleanResponse { success: true })
    }

    pub async fn clear_api_token(&self) -> AppResult<BooleanResponse> {
        let _guard = self.keyring_lock.lock().await;
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|error| AppError::Io(error.to_string()))?;
        match entry.delete_credential() {
            Ok(_) => Ok(BooleanResponse { success: true }),
            Err(keyring::Error::NoEntry) => Ok(BooleanResponse { success: true }),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    pub async fn has_api_token(&self) -> AppResult<BooleanResponse> {
        let _guard = self.keyring_lock.lock().await;
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
            .map_err(|error| AppError::Io(error.to_string()))?;
        match entry.get_password() {
            Ok(value) => Ok(BooleanResponse {
                success: !value.is_empty(),
            }),
            Err(keyring::Error::NoEntry) => Ok(BooleanResponse { success: false }),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    // ─── Settings ───────────────────────────────────────────────────────────

    pub fn settings(&self) -> AppSettings {
        self.store.settings()
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        self.store.update_settings(update)
    }
}

/// Sale amounts are display strings ("₪4,500", "12000.50"); strip everything
/// but the numeric core and tolerate the rest. Unparsable amounts count as
/// zero rather than failing the whole rollup.
fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}
