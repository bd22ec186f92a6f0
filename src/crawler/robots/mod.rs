#[cfg(test)]
mod tests;

use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Parsed robots.txt rules. Specific user-agent groups take precedence over
/// the `*` group, and `Allow:` beats `Disallow:` within a group.
#[derive(Debug, Clone, Default)]
pub struct RobotsTxt {
    rules: HashMap<String, AgentRules>,
    default_rules: AgentRules,
}

#[derive(Debug, Clone, Default)]
struct AgentRules {
    disallowed: Vec<String>,
    allowed: Vec<String>,
}

impl RobotsTxt {
    /// Parse robots.txt content. Unknown directives are ignored; a file with
    /// no rules allows everything.
    #[inline]
    pub fn parse(content: &str) -> Self {
        let mut rules: HashMap<String, AgentRules> = HashMap::new();
        let mut default_rules = AgentRules::default();
        let mut current_agents: Vec<String> = Vec::new();
        let mut in_rule_block = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match directive.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share the next rule
                    // group; a User-agent after rules starts a fresh group.
                    if in_rule_block {
                        current_agents.clear();
                        in_rule_block = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" | "allow" => {
                    in_rule_block = true;
                    if current_agents.is_empty() {
                        debug!("robots.txt rule without a user-agent: {}", line);
                        continue;
                    }
                    if value.is_empty() {
                        // An empty Disallow means allow-all; nothing to record.
                        continue;
                    }

                    let allow = directive.trim().eq_ignore_ascii_case("allow");
                    for agent in &current_agents {
                        let target = if agent == "*" {
                            &mut default_rules
                        } else {
                            rules.entry(agent.clone()).or_default()
                        };
                        if allow {
                            target.allowed.push(value.to_string());
                        } else {
                            target.disallowed.push(value.to_string());
                        }
                    }
                }
                _ => {
                    debug!("Ignoring robots.txt directive: {}", line);
                }
            }
        }

        Self {
            rules,
            default_rules,
        }
    }

    /// Whether the given URL may be fetched by the given user agent
    #[inline]
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        let path = url.path();

        if let Some(agent_rules) = self.rules.get(&user_agent.to_lowercase()) {
            return agent_rules.permits(path);
        }

        self.default_rules.permits(path)
    }
}

impl AgentRules {
    fn permits(&self, path: &str) -> bool {
        if self.allowed.iter().any(|p| pattern_matches(path, p)) {
            return true;
        }
        !self.disallowed.iter().any(|p| pattern_matches(path, p))
    }
}

/// Prefix match with `*` wildcards and an optional `$` end anchor
fn pattern_matches(path: &str, pattern: &str) -> bool {
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(stripped) => (stripped, true),
        None => (pattern, false),
    };

    let mut remaining = path;
    let mut segments = pattern.split('*');

    // The first segment must match at the start; later segments anywhere
    // after the previous match.
    if let Some(first) = segments.next() {
        if !remaining.starts_with(first) {
            return false;
        }
        remaining = &remaining[first.len()..];
    }

    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    if anchored && !pattern.ends_with('*') {
        return remaining.is_empty();
    }
    true
}
