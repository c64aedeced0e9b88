//! Sign-in gate for the single-operator client.
//!
//! One credential pair is compiled in and checked verbatim. This is not a
//! security boundary: the pair ships inside the client binary and the session
//! flag is a plain persisted boolean. It only keeps the app's views behind an
//! explicit sign-in step.

const OPERATOR_EMAIL: &str = "admin@waterberry.app";
const OPERATOR_PASSWORD: &str = "waterberry-local";

/// Exact, case-sensitive match against the compiled-in pair.
pub fn check_credentials(email: &str, password: &str) -> bool {
    email == OPERATOR_EMAIL && password == OPERATOR_PASSWORD
}

#[cfg(test)]
mod tests {
    use super::check_credentials;

    #[test]
    fn accepts_only_the_exact_pair() {
        assert!(check_credentials("admin@waterberry.app", "waterberry-local"));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(!check_credentials("", ""));
        assert!(!check_credentials("admin@waterberry.app", ""));
        assert!(!check_credentials("", "waterberry-local"));
        assert!(!check_credentials("Admin@Waterberry.app", "waterberry-local"));
        assert!(!check_credentials("admin@waterberry.app", "Waterberry-Local"));
        assert!(!check_credentials("admin@waterberry.app", "waterberry-local "));
        assert!(!check_credentials("someone@else.com", "waterberry-local"));
    }
}
