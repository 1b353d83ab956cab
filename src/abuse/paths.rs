//! Path rules: vulnerability-scan targets and paths the filter skips.

use regex::{RegexSet, RegexSetBuilder};

const SUSPICIOUS: &[&str] = &[
    // script extensions this site never serves
    r"\.(php\d?|phtml|asp|aspx|jsp|jspx|cgi|pl|sh|bak|sql|old|swp)(/|$)",
    // dotfiles and VCS metadata
    r"(^|/)\.(env|git|svn|hg|ht|aws|ssh|ds_store|vscode|idea)",
    // admin panels and config files
    r"(^|/)(wp-admin|wp-login|wp-content|wp-includes|wordpress|xmlrpc|phpmyadmin|pma|myadmin|administrator|admin|config|configuration|setup|install)(/|\.|$)",
    // shells and gateways
    r"(^|/)(cgi-bin|shell|cmd|console|actuator|solr|boaform|hnap1)(/|$)",
    // traversal
    r"\.\./|%2e%2e",
];

const EXEMPT_PREFIXES: &[&str] = &["/_next/", "/static/", "/assets/", "/api-docs/"];

const EXEMPT_PATHS: &[&str] = &["/favicon.ico", "/robots.txt", "/health"];

#[derive(Clone, Debug)]
pub struct PathFilter {
    suspicious: RegexSet,
}

impl PathFilter {
    /// # Errors
    /// Returns an error if a pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            suspicious: RegexSetBuilder::new(SUSPICIOUS)
                .case_insensitive(true)
                .build()?,
        })
    }

    #[must_use]
    pub fn is_suspicious(&self, path: &str) -> bool {
        self.suspicious.is_match(path)
    }
}

/// Static assets and internal endpoints bypass the user-agent and flood
/// checks. Single files match exactly, asset trees by prefix.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PATHS.contains(&path) || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn scan_targets_are_suspicious() {
        let filter = PathFilter::new().unwrap();
        for path in [
            "/wp-admin/config.php",
            "/wp-login.php",
            "/index.php",
            "/.env",
            "/.git/config",
            "/phpmyadmin/",
            "/admin",
            "/cgi-bin/test.cgi",
            "/shell",
            "/backup.sql",
            "/static/../../etc/passwd",
            "/WP-ADMIN/",
        ] {
            assert!(filter.is_suspicious(path), "{path}");
        }
    }

    #[test]
    fn site_paths_are_not_suspicious() {
        let filter = PathFilter::new().unwrap();
        for path in [
            "/",
            "/proposal/adb",
            "/auth/verify",
            "/auth/session",
            "/api/contract/submit",
            "/api/voice/signed-url",
            "/administration-guide",
            "/configurator",
        ] {
            assert!(!filter.is_suspicious(path), "{path}");
        }
    }

    #[test]
    fn exempt_prefixes() {
        assert!(is_exempt("/_next/static/chunk.js"));
        assert!(is_exempt("/favicon.ico"));
        assert!(is_exempt("/robots.txt"));
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api-docs/openapi.json"));
        assert!(!is_exempt("/proposal/adb"));
        assert!(!is_exempt("/"));
    }

    #[test]
    fn lookalikes_are_not_exempt() {
        for path in [
            "/health.php",
            "/healthz",
            "/health-admin",
            "/health/",
            "/favicon.ico.php",
            "/robots.txt/../.env",
            "/api-docs",
        ] {
            assert!(!is_exempt(path), "{path}");
        }
    }
}
