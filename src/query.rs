/// Search query classification
///
/// Routes freeform search text to the correct resolution path. The rule
/// list is ordered and the order is significant: explicit prefixes win
/// over URL detection, which wins over bare DIDs and shorthands.
use serde::{Deserialize, Serialize};

/// Hosting platform a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Github,
    Gitlab,
    Gitea,
    Radicle,
}

impl Platform {
    /// Canonical host used when normalizing a repo path to a URL
    fn host(&self) -> &'static str {
        match self {
            Platform::Github => "github.com",
            Platform::Gitlab => "gitlab.com",
            Platform::Gitea => "gitea.example.com",
            Platform::Radicle => "radicle.example.com",
        }
    }
}

/// A classified search query
///
/// Every consumer must handle every variant; `raw` always carries the
/// original input and `normalized` the canonical form for that variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParsedSearchQuery {
    Package {
        raw: String,
        normalized: String,
    },
    Repo {
        raw: String,
        normalized: String,
        platform: Platform,
    },
    Identity {
        raw: String,
        normalized: String,
        platform: Platform,
        namespace: String,
    },
    Did {
        raw: String,
        normalized: String,
        platform: Option<Platform>,
        namespace: Option<String>,
    },
    Unknown {
        raw: String,
        normalized: String,
    },
}

/// Classify a raw search input into a typed query. Total and deterministic.
pub fn parse_search_query(input: &str) -> ParsedSearchQuery {
    let raw = input.to_string();
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ParsedSearchQuery::Unknown {
            raw,
            normalized: String::new(),
        };
    }

    // Rule 1: npm: prefix -> package
    if let Some(name) = trimmed.strip_prefix("npm:") {
        return ParsedSearchQuery::Package {
            raw,
            normalized: name.to_string(),
        };
    }

    // Rule 2: explicit platform prefix (gitlab:, radicle:, gitea:, github/)
    if let Some((platform, remainder)) = extract_platform_prefix(trimmed) {
        if let Some(full_did) = detect_did(remainder) {
            return ParsedSearchQuery::Did {
                raw,
                normalized: full_did.clone(),
                platform: Some(platform),
                namespace: Some(full_did),
            };
        }
        if remainder.contains('/') {
            return ParsedSearchQuery::Repo {
                raw,
                normalized: format!("https://{}/{}", platform.host(), remainder),
                platform,
            };
        }
        return ParsedSearchQuery::Identity {
            raw,
            normalized: remainder.to_string(),
            platform,
            namespace: remainder.to_string(),
        };
    }

    // Rule 3: full URL on a known forge host
    if let Some((platform, path)) = detect_url(trimmed) {
        return ParsedSearchQuery::Repo {
            raw,
            normalized: format!("https://{}/{}", platform.host(), path),
            platform,
        };
    }

    // Rule 4: bare did:<method>:...
    if let Some(full_did) = detect_did(trimmed) {
        return ParsedSearchQuery::Did {
            raw,
            normalized: full_did,
            platform: None,
            namespace: None,
        };
    }

    // Rule 5: @name shorthand, defaults to github
    if let Some(namespace) = detect_identity_shorthand(trimmed) {
        return ParsedSearchQuery::Identity {
            raw,
            normalized: namespace.clone(),
            platform: Platform::Github,
            namespace,
        };
    }

    // Rule 6: bare owner/repo (no dots), defaults to github
    if let Some(normalized) = detect_repo_pattern(trimmed) {
        return ParsedSearchQuery::Repo {
            raw,
            normalized,
            platform: Platform::Github,
        };
    }

    // Rule 7: unknown
    ParsedSearchQuery::Unknown {
        raw,
        normalized: trimmed.to_string(),
    }
}

/// Extract an explicit platform prefix: `gitlab:`, `radicle:`, `gitea:`, `github/`
fn extract_platform_prefix(input: &str) -> Option<(Platform, &str)> {
    if let Some(rest) = input.strip_prefix("github/") {
        return Some((Platform::Github, rest));
    }
    for (prefix, platform) in [
        ("gitlab:", Platform::Gitlab),
        ("radicle:", Platform::Radicle),
        ("gitea:", Platform::Gitea),
    ] {
        if let Some(rest) = input.strip_prefix(prefix) {
            return Some((platform, rest));
        }
    }
    None
}

/// Detect a full URL on a known host, scheme optional
fn detect_url(input: &str) -> Option<(Platform, String)> {
    let stripped = input
        .strip_prefix("https://")
        .or_else(|| input.strip_prefix("http://"))
        .unwrap_or(input);

    for (host, platform) in [
        ("github.com", Platform::Github),
        ("gitlab.com", Platform::Gitlab),
    ] {
        if let Some(path) = stripped.strip_prefix(&format!("{}/", host)) {
            let path = path.trim_end_matches('/');
            if !path.is_empty() {
                return Some((platform, path.to_string()));
            }
        }
    }
    None
}

/// Detect `did:<method>:<identifier>`
fn detect_did(input: &str) -> Option<String> {
    let rest = input.strip_prefix("did:")?;
    let (method, identifier) = rest.split_once(':')?;
    if method.is_empty()
        || identifier.is_empty()
        || !method.chars().all(|c| c.is_ascii_alphabetic())
    {
        return None;
    }
    Some(input.to_string())
}

/// Detect the `@username` identity shorthand
fn detect_identity_shorthand(input: &str) -> Option<String> {
    let namespace = input.strip_prefix('@')?;
    if !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Some(namespace.to_string());
    }
    None
}

/// Detect a bare `owner/repo` pattern (no dots anywhere)
fn detect_repo_pattern(input: &str) -> Option<String> {
    if input.contains('.') {
        return None;
    }
    let (owner, repo) = input.split_once('/')?;
    let owner_ok = !owner.is_empty()
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    let repo_ok = !repo.is_empty()
        && !repo.contains('/')
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
    if owner_ok && repo_ok {
        Some(format!("https://github.com/{}", input))
    } else {
        None
    }
}
