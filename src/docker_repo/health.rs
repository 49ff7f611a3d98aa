// Health extraction from the free-text container status

use regex::Regex;
use std::sync::LazyLock;

static HEALTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(health: (\w+)\)").expect("health regex is valid"));

/// Parse the health out of a container status. The format is either:
///  - `Up 5 seconds (health: starting)`
///  - `Up about an hour`
pub fn parse_container_health(status: &str) -> &str {
    // Most statuses carry no health suffix; skip the regex for those.
    if !status.contains('(') {
        return "";
    }
    HEALTH_RE
        .captures(status)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}
