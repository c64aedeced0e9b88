use crate::models::{Direction, Language, LocaleSnapshot};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::Mutex;

type Table = BTreeMap<&'static str, &'static str>;

static HE: Lazy<Table> = Lazy::new(|| {
    BTreeMap::from([
        ("appName", "ווטרברי"),
        ("loginTitle", "התחברות למערכת"),
        ("loginSubtitle", "ניהול לקוחות, מכירות ומשימות במקום אחד"),
        ("loginError", "פרטי התחברות שגויים"),
        ("emailLabel", "דואר אלקטרוני"),
        ("passwordLabel", "סיסמה"),
        ("signIn", "כניסה"),
        ("signOut", "יציאה"),
        ("dashboard", "לוח בקרה"),
        ("leads", "לידים"),
        ("customers", "לקוחות"),
        ("customerProfile", "כרטיס לקוח"),
        ("sales", "מכירות"),
        ("tasks", "משימות"),
        ("analytics", "אנליטיקה"),
        ("marketing", "שיווק"),
        ("support", "תמיכה"),
        ("employees", "עובדים"),
        ("settings", "הגדרות"),
        ("addLead", "הוספת ליד"),
        ("addCustomer", "הוספת לקוח"),
        ("addSale", "הוספת מכירה"),
        ("addTask", "הוספת משימה"),
        ("addEmployee", "הוספת עובד"),
        ("addTicket", "פתיחת פנייה"),
        ("addNote", "הוספת הערה"),
        ("search", "חיפוש"),
        ("statusNew", "חדש"),
        ("statusInProgress", "בטיפול"),
        ("statusConverted", "הומר"),
        ("statusRejected", "לא רלוונטי"),
        ("priorityLow", "נמוכה"),
        ("priorityMedium", "בינונית"),
        ("priorityHigh", "גבוהה"),
        ("insight", "תובנה"),
        ("nextStep", "הצעד הבא"),
        ("marketResearch", "מחקר שוק"),
        ("sources", "מקורות"),
        ("loading", "טוען..."),
        ("noResults", "לא נמצאו תוצאות"),
    ])
});

static EN: Lazy<Table> = Lazy::new(|| {
    BTreeMap::from([
        ("appName", "Waterberry"),
        ("loginTitle", "Sign in"),
        ("loginSubtitle", "Customers, sales and tasks in one place"),
        ("loginError", "Invalid login details"),
        ("emailLabel", "Email"),
        ("passwordLabel", "Password"),
        ("signIn", "Sign in"),
        ("signOut", "Sign out"),
        ("dashboard", "Dashboard"),
        ("leads", "Leads"),
        ("customers", "Customers"),
        ("customerProfile", "Customer profile"),
        ("sales", "Sales"),
        ("tasks", "Tasks"),
        ("analytics", "Analytics"),
        ("marketing", "Marketing"),
        ("support", "Support"),
        ("employees", "Employees"),
        ("settings", "Settings"),
        ("addLead", "Add lead"),
        ("addCustomer", "Add customer"),
        ("addSale", "Add sale"),
        ("addTask", "Add task"),
        ("addEmployee", "Add employee"),
        ("addTicket", "Open ticket"),
        ("addNote", "Add note"),
        ("search", "Search"),
        ("statusNew", "New"),
        ("statusInProgress", "In progress"),
        ("statusConverted", "Converted"),
        ("statusRejected", "Not relevant"),
        ("priorityLow", "Low"),
        ("priorityMedium", "Medium"),
        ("priorityHigh", "High"),
        ("insight", "Insight"),
        ("nextStep", "Next step"),
        ("marketResearch", "Market research"),
        ("sources", "Sources"),
        ("loading", "Loading..."),
        ("noResults", "No results found"),
    ])
});

static AR: Lazy<Table> = Lazy::new(|| {
    BTreeMap::from([
        ("appName", "ووتربيري"),
        ("loginTitle", "تسجيل الدخول"),
        ("loginSubtitle", "العملاء والمبيعات والمهام في مكان واحد"),
        ("loginError", "بيانات تسجيل الدخول غير صحيحة"),
        ("emailLabel", "البريد الإلكتروني"),
        ("passwordLabel", "كلمة المرور"),
        ("signIn", "دخول"),
        ("signOut", "خروج"),
        ("dashboard", "لوحة التحكم"),
        ("leads", "العملاء المحتملون"),
        ("customers", "العملاء"),
        ("customerProfile", "ملف العميل"),
        ("sales", "المبيعات"),
        ("tasks", "المهام"),
        ("analytics", "التحليلات"),
        ("marketing", "التسويق"),
        ("support", "الدعم"),
        ("employees", "الموظفون"),
        ("settings", "الإعدادات"),
        ("addLead", "إضافة عميل محتمل"),
        ("addCustomer", "إضافة عميل"),
        ("addSale", "إضافة عملية بيع"),
        ("addTask", "إضافة مهمة"),
        ("addEmployee", "إضافة موظف"),
        ("addTicket", "فتح تذكرة"),
        ("addNote", "إضافة ملاحظة"),
        ("search", "بحث"),
        ("statusNew", "جديد"),
        ("statusInProgress", "قيد المعالجة"),
        ("statusConverted", "تم التحويل"),
        ("statusRejected", "غير ملائم"),
        ("priorityLow", "منخفضة"),
        ("priorityMedium", "متوسطة"),
        ("priorityHigh", "عالية"),
        ("insight", "رؤية"),
        ("nextStep", "الخطوة التالية"),
        ("marketResearch", "أبحاث السوق"),
        ("sources", "المصادر"),
        ("loading", "جارٍ التحميل..."),
        ("noResults", "لا توجد نتائج"),
    ])
});

fn table(language: Language) -> &'static Table {
    match language {
        Language::He => &HE,
        Language::En => &EN,
        Language::Ar => &AR,
    }
}

pub fn direction(language: Language) -> Direction {
    match language {
        Language::He | Language::Ar => Direction::Rtl,
        Language::En => Direction::Ltr,
    }
}

/// Localized display name passed into AI prompts so replies come back in the
/// operator's language.
pub fn language_name(language: Language) -> &'static str {
    match language {
        Language::He => "Hebrew",
        Language::En => "English",
        Language::Ar => "Arabic",
    }
}

/// Active-language state for the process. Initialized once at startup from
/// settings, changed only by explicit selection, alive for the whole run.
#[derive(Debug)]
pub struct LocaleState {
    current: Mutex<Language>,
}

impl LocaleState {
    pub fn new(initial: Language) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    pub fn language(&self) -> Language {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_language(&self, language: Language) -> LocaleSnapshot {
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = language;
        snapshot(language)
    }

    pub fn snapshot(&self) -> LocaleSnapshot {
        snapshot(self.language())
    }
}

/// Full string table for the view layer. Keys missing from a language fall
/// back to Hebrew, so a consumer always resolves something renderable.
pub fn snapshot(language: Language) -> LocaleSnapshot {
    let mut strings: BTreeMap<String, String> = HE
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    if language != Language::He {
        for (key, value) in table(language).iter() {
            strings.insert(key.to_string(), value.to_string());
        }
    }
    LocaleSnapshot {
        language,
        dir: direction(language),
        strings,
    }
}
