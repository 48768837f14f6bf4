//! Doctor checks against fake hosts

mod common;

use common::{test_config, MockApi, MockHost};
use ollamaprep::doctor::{CheckStatus, Doctor};
use std::sync::Arc;

fn doctor(host: MockHost, api: MockApi) -> Doctor {
    Doctor::with_parts(test_config(), Arc::new(host), Arc::new(api))
}

#[test]
fn test_utility_present_passes() {
    let check = doctor(MockHost::prepared(), MockApi::up()).check_utility();
    assert_eq!(check.status, CheckStatus::Pass);
    assert!(check.message.contains("zstd"));
}

#[test]
fn test_missing_utility_is_only_a_warning() {
    let check = doctor(MockHost::new(), MockApi::up()).check_utility();
    assert_eq!(check.status, CheckStatus::Warning);
}

#[test]
fn test_package_manager_detection() {
    let d = doctor(MockHost::new().with_commands(&["yum", "pacman"]), MockApi::up());
    let check = d.check_package_manager();
    assert_eq!(check.status, CheckStatus::Pass);
    assert_eq!(check.message, "yum");
}

#[test]
fn test_no_manager_and_no_utility_fails() {
    let check = doctor(MockHost::new(), MockApi::up()).check_package_manager();
    assert_eq!(check.status, CheckStatus::Fail);
}

#[test]
fn test_no_manager_with_utility_warns() {
    let check = doctor(MockHost::new().with_commands(&["zstd"]), MockApi::up()).check_package_manager();
    assert_eq!(check.status, CheckStatus::Warning);
}

#[test]
fn test_server_binary() {
    let present = doctor(MockHost::new().with_commands(&["ollama"]), MockApi::up());
    assert_eq!(present.check_server_binary().status, CheckStatus::Pass);

    let missing = doctor(MockHost::new(), MockApi::up());
    assert_eq!(missing.check_server_binary().status, CheckStatus::Warning);
}

#[tokio::test]
async fn test_server_api_reports_version() {
    let check = doctor(MockHost::new(), MockApi::up()).check_server_api().await;
    assert_eq!(check.status, CheckStatus::Pass);
    assert!(check.message.contains("0.5.7"));
    assert!(check.latency_ms.is_some());
}

#[tokio::test]
async fn test_server_api_down_warns() {
    let check = doctor(MockHost::new(), MockApi::down()).check_server_api().await;
    assert_eq!(check.status, CheckStatus::Warning);
}

#[tokio::test]
async fn test_model_not_pulled_warns() {
    let check = doctor(MockHost::new(), MockApi::up()).check_model().await;
    assert_eq!(check.status, CheckStatus::Warning);
    assert!(check.message.contains("qwen2.5-coder:1.5b"));
}
