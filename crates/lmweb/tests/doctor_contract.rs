fn doctor(args: &[&str]) -> std::process::Output {
    let bin = assert_cmd::cargo::cargo_bin!("lmweb");
    std::process::Command::new(bin)
        .args(args)
        .env_remove("LMWEB_ENV_FILE")
        .env_remove("LMWEB_TAVILY_API_KEY")
        .env_remove("LMWEB_SEARCH_MODE")
        .env_remove("LMWEB_GOV_SITE_FILTER")
        .env_remove("LMWEB_TOP_K")
        .env("LM_API_KEY", "lm-very-secret")
        .env("TAVILY_API_KEY", "tvly-very-secret")
        .output()
        .expect("run lmweb doctor")
}

#[test]
fn lmweb_doctor_contract_reports_booleans_not_secrets() {
    let out = doctor(&["doctor"]);
    assert!(out.status.success(), "lmweb doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(!s.contains("very-secret"), "doctor leaked a secret: {s}");

    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");
    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("doctor"));
    assert_eq!(v["name"].as_str(), Some("lmweb"));
    assert!(v.get("elapsed_ms").is_some());
    assert_eq!(v["configured"]["lm_api_key"].as_bool(), Some(true));
    assert_eq!(v["configured"]["providers"]["tavily"].as_bool(), Some(true));
    assert_eq!(v["configured"]["providers"]["wikipedia"].as_bool(), Some(true));
    assert_eq!(v["configured"]["search_mode"].as_str(), Some("auto"));

    let checks = v["checks"].as_array().expect("checks array");
    let lm = checks
        .iter()
        .find(|c| c["name"].as_str() == Some("lm_reachable"))
        .expect("lm_reachable check");
    assert_eq!(lm["skipped"].as_bool(), Some(true));
    assert_eq!(lm["ok"].as_bool(), Some(true));
}

#[test]
fn lmweb_doctor_text_output_contract() {
    let out = doctor(&["doctor", "--output", "text", "--check-lm=false"]);
    assert!(out.status.success(), "lmweb doctor failed");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.contains("lmweb "), "expected doctor text output to mention lmweb");
    assert!(s.contains("checks:"), "expected checks summary");
    assert!(!s.contains("very-secret"));
}
