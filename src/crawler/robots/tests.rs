use super::*;

fn url(path: &str) -> Url {
    Url::parse(&format!("https://example.com{}", path)).expect("valid URL")
}

#[test]
fn empty_file_allows_everything() {
    let robots = RobotsTxt::parse("");
    assert!(robots.is_allowed(&url("/anything"), "DocativeBot"));
}

#[test]
fn default_group_disallow_applies_to_all_agents() {
    let robots = RobotsTxt::parse("User-agent: *\nDisallow: /private");

    assert!(!robots.is_allowed(&url("/private/page"), "DocativeBot"));
    assert!(robots.is_allowed(&url("/public"), "DocativeBot"));
}

#[test]
fn specific_agent_rules_take_precedence() {
    let robots = RobotsTxt::parse(
        "User-agent: *\nDisallow: /\n\nUser-agent: DocativeBot\nDisallow: /private",
    );

    assert!(robots.is_allowed(&url("/public"), "DocativeBot"));
    assert!(!robots.is_allowed(&url("/private"), "DocativeBot"));
    assert!(!robots.is_allowed(&url("/public"), "OtherBot"));
}

#[test]
fn allow_beats_disallow_within_a_group() {
    let robots = RobotsTxt::parse("User-agent: *\nDisallow: /docs\nAllow: /docs/public");

    assert!(!robots.is_allowed(&url("/docs/secret"), "DocativeBot"));
    assert!(robots.is_allowed(&url("/docs/public/page"), "DocativeBot"));
}

#[test]
fn empty_disallow_means_allow_all() {
    let robots = RobotsTxt::parse("User-agent: *\nDisallow:");
    assert!(robots.is_allowed(&url("/anything"), "DocativeBot"));
}

#[test]
fn consecutive_user_agents_share_a_group() {
    let robots = RobotsTxt::parse("User-agent: a\nUser-agent: b\nDisallow: /x");

    assert!(!robots.is_allowed(&url("/x"), "a"));
    assert!(!robots.is_allowed(&url("/x"), "b"));
}

#[test]
fn a_new_group_does_not_inherit_previous_agents() {
    let robots = RobotsTxt::parse("User-agent: a\nDisallow: /x\n\nUser-agent: b\nDisallow: /y");

    assert!(!robots.is_allowed(&url("/x"), "a"));
    assert!(robots.is_allowed(&url("/y"), "a"));
    assert!(robots.is_allowed(&url("/x"), "b"));
    assert!(!robots.is_allowed(&url("/y"), "b"));
}

#[test]
fn wildcard_and_anchor_patterns() {
    let robots = RobotsTxt::parse("User-agent: *\nDisallow: /*.json$\nDisallow: /tmp*");

    assert!(!robots.is_allowed(&url("/data/export.json"), "DocativeBot"));
    assert!(robots.is_allowed(&url("/data/export.json.html"), "DocativeBot"));
    assert!(!robots.is_allowed(&url("/tmp/scratch"), "DocativeBot"));
}

#[test]
fn comments_are_stripped() {
    let robots = RobotsTxt::parse("# all bots\nUser-agent: * # everyone\nDisallow: /private");
    assert!(!robots.is_allowed(&url("/private"), "DocativeBot"));
}
