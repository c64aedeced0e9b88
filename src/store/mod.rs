use crate::errors::{AppError, AppResult};
use crate::models::{
    AppSettings, Customer, CustomerNote, CustomerUpdate, Employee, Lead, LeadStatus, NewCustomer,
    NewEmployee, NewLead, NewSale, NewTask, NewTicket, Priority, Sale, SaleStatus, Task, Ticket,
    TicketStatus,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Every collection row shares this prefix so other tools using the same
/// database file cannot collide with CRM state.
const STORE_NAMESPACE: &str = "WATERBERRY_V2_";

const LEADS_KEY: &str = "leads";
const CUSTOMERS_KEY: &str = "customers";
const SALES_KEY: &str = "sales";
const TASKS_KEY: &str = "tasks";
const EMPLOYEES_KEY: &str = "employees";
const TICKETS_KEY: &str = "tickets";
const SESSION_KEY: &str = "session";
const SETTINGS_KEY: &str = "settings";

/// Record store over a single key-value table. One row per collection; every
/// mutation reads the full collection, modifies it in memory, and writes the
/// whole collection back. The connection mutex serializes writers, so the
/// read-modify-write cycle cannot interleave.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ─── Key-value adapter ──────────────────────────────────────────────────

    /// Best-effort read. Malformed payloads and storage faults degrade to
    /// `None`; the cause is logged so the failure classes stay distinguishable.
    pub fn kv_get(&self, key: &str) -> Option<serde_json::Value> {
        match self.read_raw(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(key, cause = "malformed-payload", error = %error, "store read degraded to absent");
                    None
                }
            },
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(key, cause = "storage", error = %error, "store read degraded to absent");
                None
            }
        }
    }

    /// Best-effort write. A failed write is logged and dropped; callers must
    /// treat persistence as non-durable.
    pub fn kv_set(&self, key: &str, value: &serde_json::Value) {
        if let Err(error) = self.write_raw(key, value) {
            tracing::warn!(key, cause = "storage", error = %error, "store write dropped");
        }
    }

    fn read_raw(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("store mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM collections WHERE key = ?1",
                [namespaced(key)],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(raw)
    }

    fn write_raw(&self, key: &str, value: &serde_json::Value) -> AppResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| AppError::Internal("store mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO collections (key, value_json, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![namespaced(key), serde_json::to_string(value)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn read_collection<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        let value = self.kv_get(key)?;
        match serde_json::from_value(value) {
            Ok(items) => Some(items),
            Err(error) => {
                tracing::warn!(key, cause = "malformed-payload", error = %error, "collection unreadable, falling back to seed");
                None
            }
        }
    }

    fn write_collection<T: Serialize>(&self, key: &str, items: &[T]) {
        match serde_json::to_value(items) {
            Ok(value) => self.kv_set(key, &value),
            Err(error) => {
                tracing::warn!(key, cause = "serialization", error = %error, "collection write dropped");
            }
        }
    }

    // ─── Leads ──────────────────────────────────────────────────────────────

    pub fn leads(&self) -> Vec<Lead> {
        self.read_collection(LEADS_KEY).unwrap_or_default()
    }

    pub fn add_lead(&self, payload: NewLead) -> Lead {
        let mut leads = self.leads();
        let lead = Lead {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            email: payload.email,
            company: payload.company,
            status: payload.status.unwrap_or(LeadStatus::New),
            source: payload.source,
            assigned_to: payload.assigned_to,
            created_at: Utc::now().to_rfc3339(),
            avatar: payload.avatar,
        };
        leads.push(lead.clone());
        self.write_collection(LEADS_KEY, &leads);
        lead
    }

    pub fn set_lead_status(&self, id: &str, status: LeadStatus) -> AppResult<Lead> {
        let mut leads = self.leads();
        let Some(lead) = leads.iter_mut().find(|lead| lead.id == id) else {
            return Err(AppError::NotFound(format!("No lead with id {}", id)));
        };
        lead.status = status;
        let updated = lead.clone();
        self.write_collection(LEADS_KEY, &leads);
        Ok(updated)
    }

    // ─── Customers ──────────────────────────────────────────────────────────

    pub fn customers(&self) -> Vec<Customer> {
        self.read_collection(CUSTOMERS_KEY)
            .unwrap_or_else(seed_customers)
    }

    pub fn customer_by_id(&self, id: &str) -> Option<Customer> {
        self.customers().into_iter().find(|customer| customer.id == id)
    }

    pub fn add_customer(&self, payload: NewCustomer) -> Customer {
        let mut customers = self.customers();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            company: payload.company,
            email: payload.email,
            phone: payload.phone,
            status: payload.status.unwrap_or_else(|| "Active".to_string()),
            tags: Vec::new(),
            notes: Vec::new(),
        };
        customers.push(customer.clone());
        self.write_collection(CUSTOMERS_KEY, &customers);
        customer
    }

    pub fn update_customer(&self, id: &str, update: CustomerUpdate) -> Option<Customer> {
        let mut customers = self.customers();
        let customer = customers.iter_mut().find(|customer| customer.id == id)?;
        if let Some(name) = update.name {
            customer.name = name;
        }
        if let Some(company) = update.company {
            customer.company = company;
        }
        if let Some(email) = update.email {
            customer.email = email;
        }
        if let Some(phone) = update.phone {
            customer.phone = phone;
        }
        if let Some(status) = update.status {
            customer.status = status;
        }
        if let Some(tags) = update.tags {
            customer.tags = tags;
        }
        let updated = customer.clone();
        self.write_collection(CUSTOMERS_KEY, &customers);
        Some(updated)
    }

    /// Unknown customer ids are a surfaced failure, not a silent no-op.
    pub fn add_customer_note(&self, customer_id: &str, text: &str) -> AppResult<CustomerNote> {
        let mut customers = self.customers();
        let Some(customer) = customers.iter_mut().find(|customer| customer.id == customer_id)
        else {
            return Err(AppError::NotFound(format!(
                "No customer with id {}",
                customer_id
            )));
        };
        let note = CustomerNote {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        customer.notes.push(note.clone());
        self.write_collection(CUSTOMERS_KEY, &customers);
        Ok(note)
    }

    pub fn delete_customer_note(&self, customer_id: &str, note_id: &str) -> AppResult<()> {
        let mut customers = self.customers();
        let Some(customer) = customers.iter_mut().find(|customer| customer.id == customer_id)
        else {
            return Err(AppError::NotFound(format!(
                "No customer with id {}",
                customer_id
            )));
        };
        let before = customer.notes.len();
        customer.notes.retain(|note| note.id != note_id);
        if customer.notes.len() == before {
            return Err(AppError::NotFound(format!("No note with id {}", note_id)));
        }
        self.write_collection(CUSTOMERS_KEY, &customers);
        Ok(())
    }

    // ─── Sales ──────────────────────────────────────────────────────────────

    pub fn sales(&self) -> Vec<Sale> {
        self.read_collection(SALES_KEY).unwrap_or_else(seed_sales)
    }

    pub fn add_sale(&self, payload: NewSale) -> Sale {
        let mut sales = self.sales();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            client: payload.client,
            amount: payload.amount,
            status: payload.status,
            date: payload
                .date
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
        };
        sales.push(sale.clone());
        self.write_collection(SALES_KEY, &sales);
        sale
    }

    // ─── Tasks ──────────────────────────────────────────────────────────────

    pub fn tasks(&self) -> Vec<Task> {
        self.read_collection(TASKS_KEY).unwrap_or_else(seed_tasks)
    }

    /// Bulk replacement: the caller hands back the whole list, one write.
    pub fn set_tasks(&self, tasks: &[Task]) {
        self.write_collection(TASKS_KEY, tasks);
    }

    pub fn add_task(&self, payload: NewTask) -> Task {
        let mut tasks = self.tasks();
        let task = Task {
            id: Uuid::new_v4().to_string(),
            text: payload.text,
            completed: false,
            due: payload.due,
            priority: payload.priority,
        };
        tasks.push(task.clone());
        self.write_collection(TASKS_KEY, &tasks);
        task
    }

    pub fn toggle_task(&self, id: &str) -> AppResult<Task> {
        let mut tasks = self.tasks();
        let Some(task) = tasks.iter_mut().find(|task| task.id == id) else {
            return Err(AppError::NotFound(format!("No task with id {}", id)));
        };
        task.completed = !task.completed;
        let updated = task.clone();
        self.write_collection(TASKS_KEY, &tasks);
        Ok(updated)
    }

    // ─── Employees ──────────────────────────────────────────────────────────

    pub fn employees(&self) -> Vec<Employee> {
        self.read_collection(EMPLOYEES_KEY)
            .unwrap_or_else(seed_employees)
    }

    pub fn add_employee(&self, payload: NewEmployee) -> Employee {
        let mut employees = self.employees();
        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            name: payload.name,
            role: payload.role,
            email: payload.email,
            performance: "100%".to_string(),
        };
        employees.push(employee.clone());
        self.write_collection(EMPLOYEES_KEY, &employees);
        employee
    }

    // ─── Tickets ────────────────────────────────────────────────────────────

    pub fn tickets(&self) -> Vec<Ticket> {
        self.read_collection(TICKETS_KEY)
            .unwrap_or_else(seed_tickets)
    }

    pub fn add_ticket(&self, payload: NewTicket) -> Ticket {
        let mut tickets = self.tickets();
        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            reference: ticket_reference(),
            user: payload.user,
            issue: payload.issue,
            priority: payload.priority,
            status: TicketStatus::New,
        };
        tickets.push(ticket.clone());
        self.write_collection(TICKETS_KEY, &tickets);
        ticket
    }

    // ─── Session flag ───────────────────────────────────────────────────────

    pub fn set_session_flag(&self, active: bool) {
        self.kv_set(SESSION_KEY, &serde_json::Value::Bool(active));
    }

    pub fn session_flag(&self) -> bool {
        self.kv_get(SESSION_KEY)
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    // ─── Settings ───────────────────────────────────────────────────────────

    pub fn settings(&self) -> AppSettings {
        match self.kv_get(SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value).unwrap_or_default(),
            None => AppSettings::default(),
        }
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<AppSettings> {
        let current = self.settings();
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)?;
        self.kv_set(SETTINGS_KEY, &serde_json::to_value(&settings)?);
        Ok(settings)
    }
}

fn namespaced(key: &str) -> String {
    format!("{}{}", STORE_NAMESPACE, key)
}

/// Human-facing ticket reference in the `#TK-NNN` format the views display.
/// Not an identity; the uuid `id` field is.
fn ticket_reference() -> String {
    format!("#TK-{}", rand::random_range(100..1000))
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

// ─── Seed data ──────────────────────────────────────────────────────────────

fn seed_customers() -> Vec<Customer> {
    vec![
        Customer {
            id: "1".to_string(),
            name: "אבי כהן".to_string(),
            company: "אלביט".to_string(),
            email: "avi@elbit.com".to_string(),
            phone: "050-1234567".to_string(),
            status: "Active".to_string(),
            tags: vec!["High Value".to_string(), "Tech".to_string()],
            notes: Vec::new(),
        },
        Customer {
            id: "2".to_string(),
            name: "ליאת רז".to_string(),
            company: "Wix".to_string(),
            email: "liat@wix.com".to_string(),
            phone: "052-9876543".to_string(),
            status: "Premium".to_string(),
            tags: vec!["Enterprise".to_string()],
            notes: Vec::new(),
        },
    ]
}

fn seed_sales() -> Vec<Sale> {
    vec![
        Sale {
            id: "1".to_string(),
            client: "Acme Corp".to_string(),
            amount: "₪4,500".to_string(),
            status: SaleStatus::Closed,
            date: "2025-06-01".to_string(),
        },
        Sale {
            id: "2".to_string(),
            client: "Globex".to_string(),
            amount: "₪12,000".to_string(),
            status: SaleStatus::Negotiation,
            date: "2025-06-02".to_string(),
        },
    ]
}

fn seed_tasks() -> Vec<Task> {
    vec![Task {
        id: "1".to_string(),
        text: "שיחה עם משקיעים".to_string(),
        completed: false,
        due: "14:00".to_string(),
        priority: Priority::High,
    }]
}

fn seed_employees() -> Vec<Employee> {
    vec![
        Employee {
            id: "1".to_string(),
            name: "ישראל ישראלי".to_string(),
            role: "מנהל מכירות".to_string(),
            email: "israel@wb.com".to_string(),
            performance: "98%".to_string(),
        },
        Employee {
            id: "2".to_string(),
            name: "דנה לוי".to_string(),
            role: "תמיכה טכנית".to_string(),
            email: "dana@wb.com".to_string(),
            performance: "92%".to_string(),
        },
    ]
}

fn seed_tickets() -> Vec<Ticket> {
    vec![Ticket {
        id: "1".to_string(),
        reference: "#TK-101".to_string(),
        user: "אבי כהן".to_string(),
        issue: "בעיית התחברות".to_string(),
        priority: Priority::High,
        status: TicketStatus::Open,
    }]
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::errors::AppError;
    use crate::models::{
        CustomerUpdate, LeadStatus, NewCustomer, NewLead, NewTask, NewTicket, Priority,
        TicketStatus,
    };

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::new(&dir.path().join("test.db")).expect("store")
    }

    fn lead_payload(name: &str) -> NewLead {
        NewLead {
            name: name.to_string(),
            email: format!("{}@example.com", name),
            company: "Y".to_string(),
            status: None,
            source: "web".to_string(),
            assigned_to: "dana".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn kv_round_trips_arbitrary_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let value = serde_json::json!({
            "nested": { "list": [1, 2, 3], "flag": true },
            "text": "שלום"
        });
        store.kv_set("roundtrip", &value);
        assert_eq!(store.kv_get("roundtrip"), Some(value));
    }

    #[test]
    fn kv_get_on_absent_key_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);
        assert!(store.kv_get("missing").is_none());
    }

    #[test]
    fn add_lead_assigns_identity_and_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        assert!(store.leads().is_empty());

        let first = store.add_lead(lead_payload("X"));
        assert!(!first.id.is_empty());
        assert_eq!(first.status, LeadStatus::New);
        assert!(!first.created_at.is_empty());

        let second = store.add_lead(lead_payload("Z"));
        assert_ne!(first.id, second.id);

        let leads = store.leads();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].name, "X");
        assert_eq!(leads[1].name, "Z");
    }

    #[test]
    fn lead_status_transition_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let lead = store.add_lead(lead_payload("X"));
        store
            .set_lead_status(&lead.id, LeadStatus::Converted)
            .expect("transition");
        assert_eq!(store.leads()[0].status, LeadStatus::Converted);

        let missing = store.set_lead_status("nope", LeadStatus::Rejected);
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn customers_seed_until_first_write() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let seeded = store.customers();
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[0].id, "1");
        // Reads do not materialize the seed.
        assert_eq!(store.customers().len(), 2);

        store.add_customer(NewCustomer {
            name: "New".to_string(),
            company: "Co".to_string(),
            email: "new@co.com".to_string(),
            phone: "03-0000000".to_string(),
            status: None,
        });
        assert_eq!(store.customers().len(), 3);
    }

    #[test]
    fn customer_by_id_finds_only_existing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        assert!(store.customer_by_id("1").is_some());
        assert!(store.customer_by_id("no-such-id").is_none());
    }

    #[test]
    fn update_customer_replaces_matching_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let updated = store
            .update_customer(
                "1",
                CustomerUpdate {
                    status: Some("Churned".to_string()),
                    tags: Some(vec!["Dormant".to_string()]),
                    ..CustomerUpdate::default()
                },
            )
            .expect("customer exists");
        assert_eq!(updated.status, "Churned");
        assert_eq!(updated.tags, vec!["Dormant".to_string()]);
        // Untouched fields survive.
        assert_eq!(updated.name, "אבי כהן");

        assert!(store.update_customer("nope", CustomerUpdate::default()).is_none());
    }

    #[test]
    fn add_note_appends_exactly_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let note = store.add_customer_note("1", "call back monday").expect("note");
        assert!(!note.id.is_empty());
        assert!(!note.created_at.is_empty());

        let customer = store.customer_by_id("1").expect("customer");
        assert_eq!(customer.notes.len(), 1);
        assert_eq!(customer.notes[0].text, "call back monday");
    }

    #[test]
    fn add_note_on_unknown_customer_is_surfaced_and_mutates_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let result = store.add_customer_note("no-such-id", "hello");
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store
            .customers()
            .iter()
            .all(|customer| customer.notes.is_empty()));
    }

    #[test]
    fn delete_note_removes_only_the_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let first = store.add_customer_note("1", "a").expect("note");
        let second = store.add_customer_note("1", "b").expect("note");

        store.delete_customer_note("1", &first.id).expect("delete");
        let customer = store.customer_by_id("1").expect("customer");
        assert_eq!(customer.notes.len(), 1);
        assert_eq!(customer.notes[0].id, second.id);

        let missing = store.delete_customer_note("1", &first.id);
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[test]
    fn tasks_bulk_replace_is_a_single_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let mut tasks = store.tasks();
        assert_eq!(tasks.len(), 1);
        tasks[0].completed = true;
        tasks.push(crate::models::Task {
            id: "2".to_string(),
            text: "invoice follow-up".to_string(),
            completed: false,
            due: "16:00".to_string(),
            priority: Priority::Medium,
        });
        store.set_tasks(&tasks);

        let reread = store.tasks();
        assert_eq!(reread.len(), 2);
        assert!(reread[0].completed);
    }

    #[test]
    fn toggle_task_flips_completion() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let task = store.add_task(NewTask {
            text: "send quote".to_string(),
            due: "12:00".to_string(),
            priority: Priority::Low,
        });
        assert!(!task.completed);

        let toggled = store.toggle_task(&task.id).expect("toggle");
        assert!(toggled.completed);
        let toggled = store.toggle_task(&task.id).expect("toggle");
        assert!(!toggled.completed);
    }

    #[test]
    fn employee_gets_default_performance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let employee = store.add_employee(crate::models::NewEmployee {
            name: "N".to_string(),
            role: "Sales".to_string(),
            email: "n@wb.com".to_string(),
        });
        assert_eq!(employee.performance, "100%");
        assert_eq!(store.employees().len(), 3);
    }

    #[test]
    fn ticket_starts_new_with_reference() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let ticket = store.add_ticket(NewTicket {
            user: "avi".to_string(),
            issue: "login".to_string(),
            priority: Priority::High,
        });
        assert_eq!(ticket.status, TicketStatus::New);
        assert!(ticket.reference.starts_with("#TK-"));
        assert!(!ticket.id.is_empty());
        assert_ne!(ticket.id, ticket.reference);
    }

    #[test]
    fn session_flag_defaults_false_and_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        assert!(!store.session_flag());
        store.set_session_flag(true);
        assert!(store.session_flag());
        store.set_session_flag(false);
        assert!(!store.session_flag());
    }

    #[test]
    fn settings_merge_updates_partial_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        let defaults = store.settings();
        assert!(defaults.redact_aggressive);

        let updated = store
            .update_settings(serde_json::json!({ "redactAggressive": false }))
            .expect("update");
        assert!(!updated.redact_aggressive);
        assert_eq!(updated.insight_model, defaults.insight_model);

        // Persisted, not just returned.
        assert!(!store.settings().redact_aggressive);
    }

    #[test]
    fn malformed_collection_payload_degrades_to_seed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = open_store(&dir);

        store.kv_set("customers", &serde_json::json!({ "not": "a list" }));
        assert_eq!(store.customers().len(), 2);
    }
}
