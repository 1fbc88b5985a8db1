//! pgaudit Integration Tests
//!
//! End-to-end runs of the audit pipeline:
//! - Against in-memory array snapshots
//! - Against a mocked REST API over HTTP

use std::collections::BTreeSet;
use std::sync::Arc;

use pgaudit::adapters::{FailOn, InMemoryArraySource};
use pgaudit::domain::{HostGroup, ProtectionGroup, ProtectionSchedule, Volume, VolumeName};
use pgaudit::report::{render_line, write_report};
use pgaudit::{
    compute_protected_volumes, find_unprotected, AuditOptions, EnabledCheckMode,
    ReachabilityMode,
};

fn names(report: &[VolumeName]) -> Vec<&str> {
    report.iter().map(|n| n.as_str()).collect()
}

async fn audit(source: InMemoryArraySource, check_mode: EnabledCheckMode) -> Vec<VolumeName> {
    let options = AuditOptions {
        check_mode,
        ..Default::default()
    };
    find_unprotected(Arc::new(source), &options).await.unwrap()
}

// =============================================================================
// Scenario Tests
// =============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_local_snapshot_scenario() {
        let source = InMemoryArraySource::new()
            .with_group(ProtectionGroup::new("pg1").with_volumes(["v1"]))
            .with_schedule(ProtectionSchedule::new("pg1", true, false))
            .with_volume(Volume::new("v1"))
            .with_volume(Volume::new("v2"));

        let report = audit(source, EnabledCheckMode::Local).await;

        let lines: Vec<String> = report
            .iter()
            .map(|n| render_line(n, EnabledCheckMode::Local, false))
            .collect();
        assert_eq!(lines, vec!["v2 is not in a PG with a snap schedule enabled."]);
    }

    #[tokio::test]
    async fn test_remote_without_allowed_target() {
        let source = InMemoryArraySource::new()
            .with_group(
                ProtectionGroup::new("pg2")
                    .with_volumes(["v1"])
                    .with_target("dr-array", false),
            )
            .with_schedule(ProtectionSchedule::new("pg2", false, true))
            .with_volume(Volume::new("v1"));

        let report = audit(source, EnabledCheckMode::Remote).await;
        assert_eq!(names(&report), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_remote_with_allowed_target() {
        let source = InMemoryArraySource::new()
            .with_group(
                ProtectionGroup::new("pg2")
                    .with_volumes(["v1"])
                    .with_target("dr-array", true),
            )
            .with_schedule(ProtectionSchedule::new("pg2", false, true))
            .with_volume(Volume::new("v1"));

        let report = audit(source, EnabledCheckMode::Remote).await;
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_host_group_expansion() {
        let source = InMemoryArraySource::new()
            .with_group(ProtectionGroup::new("pg1").with_hgroups(["hg1"]))
            .with_schedule(ProtectionSchedule::new("pg1", true, false))
            .with_host_group(HostGroup::new("hg1", ["h1"]))
            .with_connection(Volume::new("v3").connected_to_host("h1"))
            .with_volume(Volume::new("v3"))
            .with_volume(Volume::new("v4"));

        let report = audit(source, EnabledCheckMode::Either).await;
        assert_eq!(names(&report), vec!["v4"]);
    }

    #[tokio::test]
    async fn test_nocheck_finds_volumes_outside_every_group() {
        let array = || {
            InMemoryArraySource::new()
                .with_group(ProtectionGroup::new("pg-disabled").with_volumes(["v1"]))
                .with_schedule(ProtectionSchedule::new("pg-disabled", false, false))
                .with_volume(Volume::new("v1"))
                .with_volume(Volume::new("v2"))
        };

        let either = audit(array(), EnabledCheckMode::Either).await;
        let nocheck = audit(array(), EnabledCheckMode::NoCheck).await;

        assert_eq!(names(&either), vec!["v1", "v2"]);
        assert_eq!(names(&nocheck), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_group_without_schedule_does_not_protect() {
        let source = InMemoryArraySource::new()
            .with_group(ProtectionGroup::new("pg-orphan").with_volumes(["v1"]))
            .with_volume(Volume::new("v1"));

        let report = audit(source, EnabledCheckMode::Either).await;
        assert_eq!(names(&report), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_direct_mode_misses_host_protection() {
        let source = InMemoryArraySource::new()
            .with_group(ProtectionGroup::new("pg1").with_hosts(["h1"]))
            .with_schedule(ProtectionSchedule::new("pg1", true, false))
            .with_connection(Volume::new("v1").connected_to_host("h1"))
            .with_volume(Volume::new("v1"));
        let options = AuditOptions {
            reachability: ReachabilityMode::Direct,
            ..Default::default()
        };

        let report = find_unprotected(Arc::new(source), &options).await.unwrap();
        assert_eq!(names(&report), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_quiet_output() {
        let source = InMemoryArraySource::new()
            .with_volume(Volume::new("b"))
            .with_volume(Volume::new("a"));

        let report = audit(source, EnabledCheckMode::Either).await;
        let mut out = Vec::new();
        write_report(&mut out, &report, EnabledCheckMode::Either, true).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_any_failed_query_aborts() {
        for fail_on in [
            FailOn::ProtectionGroups,
            FailOn::Schedules,
            FailOn::HostGroups,
            FailOn::ConnectedVolumes,
            FailOn::Volumes,
        ] {
            let source = InMemoryArraySource::new()
                .with_volume(Volume::new("v1"))
                .failing_on(fail_on);

            let result = find_unprotected(Arc::new(source), &AuditOptions::default()).await;
            assert!(result.is_err(), "{:?} should abort the run", fail_on);
        }
    }

    #[test]
    fn test_builder_is_idempotent() {
        let groups = vec![ProtectionGroup::new("pg1")
            .with_volumes(["v1"])
            .with_hgroups(["hg1"])];
        let schedules = vec![ProtectionSchedule::new("pg1", true, true)];
        let host_groups = vec![HostGroup::new("hg1", ["h1", "h2"])];
        let connections = vec![
            Volume::new("v2").connected_to_host("h2"),
            Volume::new("v3").connected_to_hgroup("hg1"),
        ];

        let first = compute_protected_volumes(
            &groups,
            &schedules,
            &host_groups,
            &connections,
            EnabledCheckMode::Either,
        );
        let second = compute_protected_volumes(
            &groups,
            &schedules,
            &host_groups,
            &connections,
            EnabledCheckMode::Either,
        );

        let expected: BTreeSet<VolumeName> =
            ["v1", "v2", "v3"].into_iter().map(VolumeName::new).collect();
        assert_eq!(first, expected);
        assert_eq!(first, second);
    }
}

// =============================================================================
// REST API Tests
// =============================================================================

mod rest_tests {
    use super::*;
    use mockito::Matcher;
    use pgaudit::{ArrayConfig, Credentials, Error, FlashArrayClient};
    use std::time::Duration;

    fn no_query() -> Matcher {
        Matcher::Regex("^$".to_string())
    }

    #[tokio::test]
    async fn test_full_audit_over_http() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/1.19/auth/session")
            .with_status(200)
            .with_body(r#"{"username": "pureuser"}"#)
            .create_async()
            .await;

        // Query-specific mocks first so they win over the plain listings
        server
            .mock("GET", "/api/1.19/pgroup")
            .match_query(Matcher::UrlEncoded("schedule".into(), "true".into()))
            .with_status(200)
            .with_body(
                r#"[
                    {"name": "pg-db", "snap_enabled": true, "replicate_enabled": false},
                    {"name": "pg-dr", "snap_enabled": false, "replicate_enabled": true}
                ]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/1.19/volume")
            .match_query(Matcher::UrlEncoded("connect".into(), "true".into()))
            .with_status(200)
            .with_body(
                r#"[
                    {"name": "esx-ds1", "host": "esx-01", "hgroup": "cluster-a", "lun": 1},
                    {"name": "web-1", "host": "web-01", "hgroup": null, "lun": 2}
                ]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/1.19/pgroup")
            .match_query(no_query())
            .with_status(200)
            .with_body(
                r#"[
                    {"name": "pg-db", "volumes": ["db-data"], "hosts": null, "hgroups": null, "targets": null},
                    {"name": "pg-dr", "volumes": null, "hosts": null, "hgroups": ["cluster-a"],
                     "targets": [{"name": "dr-array", "allowed": true}]}
                ]"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/api/1.19/hgroup")
            .with_status(200)
            .with_body(r#"[{"name": "cluster-a", "hosts": ["esx-01", "esx-02"]}]"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/1.19/volume")
            .match_query(no_query())
            .with_status(200)
            .with_body(
                r#"[
                    {"name": "web-1", "size": 1024},
                    {"name": "db-data", "size": 1024},
                    {"name": "esx-ds1", "size": 1024},
                    {"name": "archive", "size": 1024}
                ]"#,
            )
            .create_async()
            .await;

        let config = ArrayConfig {
            endpoint: server.url(),
            request_timeout: Duration::from_secs(5),
            ..Default::default()
        };
        let client =
            FlashArrayClient::connect(config, &Credentials::ApiToken("token".into()))
                .await
                .unwrap();

        let report = find_unprotected(Arc::new(client), &AuditOptions::default())
            .await
            .unwrap();

        assert_eq!(names(&report), vec!["archive", "web-1"]);
    }

    #[tokio::test]
    async fn test_rejected_token_is_connectivity_failure() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/api/1.19/auth/session")
            .with_status(401)
            .create_async()
            .await;

        let config = ArrayConfig {
            endpoint: server.url(),
            ..Default::default()
        };
        let err = FlashArrayClient::connect(config, &Credentials::ApiToken("bad".into()))
            .await
            .unwrap_err();

        assert!(err.is_connectivity());
        assert!(matches!(err, Error::Authentication(_)));
    }
}
