use crate::models::RouteResolution;

/// The client's named views. `Login` is the only route reachable without an
/// active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Leads,
    Customers,
    CustomerDetail,
    Sales,
    Tasks,
    Analytics,
    Marketing,
    Support,
    Employees,
    Settings,
}

impl Route {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Dashboard => "dashboard",
            Self::Leads => "leads",
            Self::Customers => "customers",
            Self::CustomerDetail => "customer",
            Self::Sales => "sales",
            Self::Tasks => "tasks",
            Self::Analytics => "analytics",
            Self::Marketing => "marketing",
            Self::Support => "support",
            Self::Employees => "employees",
            Self::Settings => "settings",
        }
    }

    /// Parses a path like `/customer/42` or `dashboard`. Unknown paths yield
    /// `None`; the guard turns those into the catch-all redirect.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.trim_start_matches('/');
        let head = trimmed.split('/').next().unwrap_or_default();
        match head {
            "" | "login" => Some(Self::Login),
            "dashboard" => Some(Self::Dashboard),
            "leads" => Some(Self::Leads),
            "customers" => Some(Self::Customers),
            "customer" => Some(Self::CustomerDetail),
            "sales" => Some(Self::Sales),
            "tasks" => Some(Self::Tasks),
            "analytics" => Some(Self::Analytics),
            "marketing" => Some(Self::Marketing),
            "support" => Some(Self::Support),
            "employees" => Some(Self::Employees),
            "settings" => Some(Self::Settings),
            _ => None,
        }
    }
}

/// Guard decision for a navigation attempt. Unauthenticated access to any
/// non-login view bounces to login; unknown paths bounce to the dashboard.
pub fn resolve(path: &str, authenticated: bool) -> RouteResolution {
    let route = Route::parse(path);
    match route {
        Some(Route::Login) => RouteResolution {
            target: Route::Login.as_str().to_string(),
            redirected: false,
        },
        Some(route) if authenticated => RouteResolution {
            target: route.as_str().to_string(),
            redirected: false,
        },
        Some(_) => RouteResolution {
            target: Route::Login.as_str().to_string(),
            redirected: true,
        },
        None if authenticated => RouteResolution {
            target: Route::Dashboard.as_str().to_string(),
            redirected: true,
        },
        None => RouteResolution {
            target: Route::Login.as_str().to_string(),
            redirected: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, Route};

    #[test]
    fn parses_known_paths_with_and_without_slash() {
        assert_eq!(Route::parse("/dashboard"), Some(Route::Dashboard));
        assert_eq!(Route::parse("tasks"), Some(Route::Tasks));
        assert_eq!(Route::parse("/customer/42"), Some(Route::CustomerDetail));
        assert_eq!(Route::parse("/"), Some(Route::Login));
        assert_eq!(Route::parse("/nonsense"), None);
    }

    #[test]
    fn login_is_reachable_without_a_session() {
        let resolution = resolve("/login", false);
        assert_eq!(resolution.target, "login");
        assert!(!resolution.redirected);
    }

    #[test]
    fn unauthenticated_views_bounce_to_login() {
        for path in ["/dashboard", "/sales", "/customer/1", "/settings"] {
            let resolution = resolve(path, false);
            assert_eq!(resolution.target, "login");
            assert!(resolution.redirected);
        }
    }

    #[test]
    fn authenticated_views_pass_through() {
        let resolution = resolve("/marketing", true);
        assert_eq!(resolution.target, "marketing");
        assert!(!resolution.redirected);
    }

    #[test]
    fn unknown_paths_catch_all_to_dashboard() {
        let resolution = resolve("/no-such-view", true);
        assert_eq!(resolution.target, "dashboard");
        assert!(resolution.redirected);
    }
}
