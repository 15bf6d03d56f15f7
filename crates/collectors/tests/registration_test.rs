mod common;

use inventory_collectors::register_all;
use inventory_core::{config::AppConfig, InventoryError};

use common::{config, harness, harness_with};

#[test]
fn test_enabled_providers_register_all_tasks() {
    let h = harness();
    let mut names = h.ctx.tasks.keys();
    names.sort();
    assert_eq!(
        names,
        vec![
            "aws:collect-all",
            "aws:collect-instances",
            "aws:collect-regions",
            "aws:collect-vpcs",
            "aws:link-all",
            "g:collect-all",
            "g:collect-cloud-profile-images",
            "g:collect-projects",
            "g:collect-seeds",
            "g:collect-shoots",
            "g:link-all",
        ]
    );

    let jobs: Vec<String> = h.ctx.default_jobs().into_iter().map(|j| j.task_name).collect();
    assert_eq!(
        jobs,
        vec!["aws:collect-all", "aws:link-all", "g:collect-all", "g:link-all"]
    );
}

#[test]
fn test_registering_twice_is_fatal() {
    let h = harness();
    let err = register_all(&h.ctx).unwrap_err();
    assert!(matches!(err, InventoryError::Registry(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_disabled_providers_register_nothing() {
    let h = harness_with(AppConfig::default());
    register_all(&h.ctx).unwrap();
    assert!(h.ctx.tasks.is_empty());
    assert!(h.ctx.default_jobs().is_empty());
}

#[test]
fn test_default_jobs_can_be_turned_off() {
    let mut config = config();
    config.scheduler.default_jobs = false;
    let h = harness_with(config);
    register_all(&h.ctx).unwrap();
    assert_eq!(h.ctx.tasks.len(), 11);
    assert!(h.ctx.default_jobs().is_empty());
}

#[test]
fn test_enabled_provider_without_source_fails() {
    let mut config = config();
    config.aws.enabled = false;
    let h = harness_with(config);
    h.ctx.sources.unregister("gardener");

    let err = register_all(&h.ctx).unwrap_err();
    assert!(matches!(err, InventoryError::Configuration(_)));
}
