//! User agent shared by the HTTP client and the browser renderer.

/// Opera sites serve degraded pages (or 403) to non-browser agents, so the
/// default is a current desktop Chrome.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configured agent, or the default when unset or blank.
pub fn resolve_user_agent(config: Option<&str>) -> String {
    config
        .map(str::trim)
        .filter(|ua| !ua.is_empty())
        .unwrap_or(USER_AGENT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_is_a_browser() {
        assert_eq!(resolve_user_agent(None), USER_AGENT);
        assert_eq!(resolve_user_agent(Some("  ")), USER_AGENT);
    }

    #[test]
    fn test_configured_user_agent_wins() {
        assert_eq!(resolve_user_agent(Some("Seatwatch/1.0")), "Seatwatch/1.0");
    }
}
