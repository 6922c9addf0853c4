// SPDX-License-Identifier: MIT

use super::*;
use yare::parameterized;

#[parameterized(
    direct = { "direct", MergeMode::Direct },
    pr_auto = { "pr-auto", MergeMode::PrAuto },
    pr_review = { "pr-review", MergeMode::PrReview },
)]
fn merge_mode_round_trips(s: &str, expected: MergeMode) {
    assert_eq!(s.parse::<MergeMode>().unwrap(), expected);
    assert_eq!(expected.to_string(), s);

    let json = serde_json::to_string(&expected).unwrap();
    assert_eq!(json, format!("\"{s}\""));
}

#[test]
fn auto_rebase_serializes_as_bool_or_string() {
    assert_eq!(serde_json::to_string(&AutoRebase::On).unwrap(), "true");
    assert_eq!(serde_json::to_string(&AutoRebase::Off).unwrap(), "false");
    assert_eq!(serde_json::to_string(&AutoRebase::Prompt).unwrap(), "\"prompt\"");
}

#[parameterized(
    bool_true = { "true", AutoRebase::On },
    bool_false = { "false", AutoRebase::Off },
    str_prompt = { "\"prompt\"", AutoRebase::Prompt },
    str_true = { "\"true\"", AutoRebase::On },
)]
fn auto_rebase_deserializes(json: &str, expected: AutoRebase) {
    let got: AutoRebase = serde_json::from_str(json).unwrap();
    assert_eq!(got, expected);
}

#[test]
fn auto_rebase_rejects_other_strings() {
    assert!(serde_json::from_str::<AutoRebase>("\"maybe\"").is_err());
    assert!(serde_json::from_str::<AutoRebase>("3").is_err());
}

#[test]
fn project_defaults_are_minimal() {
    let project = Project::new("demo", "/tmp/repo");
    assert_eq!(project.default_branch, "main");
    assert_eq!(project.merge_mode, MergeMode::Direct);
    assert_eq!(project.auto_rebase, AutoRebase::Off);
    assert!(project.test_env.is_none());
    assert!(!project.require_ci);
}

#[test]
fn project_round_trips_through_json() {
    let mut project = Project::new("demo", "/tmp/repo");
    project.repo_url = "git@example.com:demo.git".into();
    project.bead_prefix = "dm".into();
    project.merge_mode = MergeMode::PrReview;
    project.auto_rebase = AutoRebase::Prompt;
    project.test_env = Some(TestEnv {
        setup: Some("make up".into()),
        teardown: Some("make down".into()),
        health_check: Some("curl -fs localhost:$PORT_OFFSET/health".into()),
        port_env: "PORT_OFFSET".into(),
    });
    project.on_create = vec!["direnv allow".into()];

    let json = serde_json::to_string_pretty(&project).unwrap();
    let back: Project = serde_json::from_str(&json).unwrap();
    assert_eq!(back, project);
}

#[test]
fn test_env_port_env_defaults() {
    let env: TestEnv = serde_json::from_str("{}").unwrap();
    assert_eq!(env.port_env, "PORT_OFFSET");
}
