//! Provision and deprovision against in-memory zones

mod common;

use broker_admin::AdminError;
use broker_admin::memory::Operation;
use broker_orchestration::{ErrorKind, ReplicationOutcome};
use common::Harness;
use futures::join;

#[smol_potat::test]
async fn test_provision_creates_namespace_user_and_grant() {
    let harness = Harness::single_zone();

    let provisioned = harness.provisioning.provision("inst-42", "z1").await.unwrap();

    assert!(harness.cluster.has_namespace("z1", "inst-42"));
    assert!(harness.cluster.has_user("z1", "m-inst-42"));
    assert!(harness.cluster.has_full_access("z1", "m-inst-42", "inst-42"));
    assert_eq!(provisioned.username, "m-inst-42");
    assert!(provisioned.replication.is_empty());

    let password = harness.cluster.user_password("z1", "m-inst-42").unwrap();
    assert_eq!(
        provisioned.dashboard_url,
        format!("http://h1:15672/#/login/m-inst-42/{}", password)
    );
}

#[smol_potat::test]
async fn test_provision_uses_zone_trace_flag() {
    let mut zone = common::zone("z1", "h1");
    zone.trace = true;
    let harness = Harness::new(vec![zone]);

    harness.provisioning.provision("traced", "z1").await.unwrap();
    assert_eq!(harness.cluster.namespace_tracing("z1", "traced"), Some(true));
}

#[smol_potat::test]
async fn test_duplicate_provision_is_conflict_and_leaves_instance_intact() {
    let harness = Harness::single_zone();
    harness.provisioning.provision("inst", "z1").await.unwrap();
    let password = harness.cluster.user_password("z1", "m-inst");

    let err = harness.provisioning.provision("inst", "z1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert!(harness.cluster.has_namespace("z1", "inst"));
    assert_eq!(harness.cluster.user_password("z1", "m-inst"), password);
    assert!(harness.cluster.has_full_access("z1", "m-inst", "inst"));
}

#[smol_potat::test]
async fn test_provisions_of_different_instances_interleave() {
    let harness = Harness::single_zone();

    let (a, b) = join!(
        harness.provisioning.provision("a", "z1"),
        harness.provisioning.provision("b", "z1")
    );

    assert!(a.is_ok() && b.is_ok());
    let subjects: Vec<_> = harness
        .cluster
        .calls("z1")
        .into_iter()
        .take(2)
        .map(|call| (call.operation, call.subject))
        .collect();
    assert_eq!(
        subjects,
        vec![
            (Operation::NamespaceExists, "a".to_string()),
            (Operation::NamespaceExists, "b".to_string()),
        ]
    );
}

#[smol_potat::test]
async fn test_user_creation_failure_removes_namespace() {
    let harness = Harness::single_zone();
    harness
        .cluster
        .fail_next("z1", Operation::PutUser, AdminError::transport("boom"));

    let err = harness.provisioning.provision("inst", "z1").await.unwrap_err();

    assert_eq!(err, AdminError::transport("boom"));
    assert!(!harness.cluster.has_namespace("z1", "inst"));
    assert_eq!(
        harness.cluster.operations("z1").last(),
        Some(&Operation::DeleteNamespace)
    );
}

#[smol_potat::test]
async fn test_existing_management_user_is_conflict_without_residue() {
    let harness = Harness::single_zone();
    harness.cluster.insert_user("z1", "m-inst", "stale");

    let err = harness.provisioning.provision("inst", "z1").await.unwrap_err();

    assert!(err.is_conflict());
    assert!(!harness.cluster.has_namespace("z1", "inst"));
    // The pre-existing user was not ours to delete
    assert_eq!(
        harness.cluster.user_password("z1", "m-inst").as_deref(),
        Some("stale")
    );
}

#[smol_potat::test]
async fn test_grant_failure_rolls_back_in_reverse_order() {
    let harness = Harness::single_zone();
    harness.cluster.fail_next(
        "z1",
        Operation::GrantFullAccess,
        AdminError::transport("permission API down"),
    );

    let err = harness.provisioning.provision("inst", "z1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!harness.cluster.has_namespace("z1", "inst"));
    assert!(!harness.cluster.has_user("z1", "m-inst"));

    let ops = harness.cluster.operations("z1");
    let user_deleted = ops.iter().position(|op| *op == Operation::DeleteUser);
    let namespace_deleted = ops.iter().position(|op| *op == Operation::DeleteNamespace);
    assert!(user_deleted.is_some());
    assert!(user_deleted < namespace_deleted);
}

#[smol_potat::test]
async fn test_rollback_failure_does_not_mask_original_error() {
    let harness = Harness::single_zone();
    harness
        .cluster
        .fail_next("z1", Operation::GrantFullAccess, AdminError::transport("grant"));
    harness
        .cluster
        .fail_next("z1", Operation::DeleteUser, AdminError::transport("cleanup"));

    let err = harness.provisioning.provision("inst", "z1").await.unwrap_err();

    assert_eq!(err, AdminError::transport("grant"));
    // Rollback carries on past the failed step
    assert!(!harness.cluster.has_namespace("z1", "inst"));
    assert!(harness.cluster.has_user("z1", "m-inst"));
}

#[smol_potat::test]
async fn test_unreachable_peer_does_not_block_provision() {
    let harness = Harness::new(vec![common::zone("z1", "h1"), common::zone("z2", "h2")]);
    harness.cluster.set_unreachable("z2", true);

    let provisioned = harness.provisioning.provision("inst", "z1").await.unwrap();

    assert!(provisioned.dashboard_url.contains("h1"));
    assert!(harness.cluster.has_namespace("z1", "inst"));
    assert_eq!(provisioned.replication.len(), 1);
    assert_eq!(provisioned.replication[0].zone, "z2");
    assert!(matches!(
        &provisioned.replication[0].outcome,
        ReplicationOutcome::Failed { error } if error.contains("unreachable")
    ));
    assert_eq!(provisioned.warnings().count(), 1);
}

#[smol_potat::test]
async fn test_peers_federate_from_home_zone() {
    let harness = Harness::three_zones();
    // z2 already carries the instance namespace and management user, z3 does not
    harness.cluster.insert_namespace("z2", "inst");
    harness.cluster.insert_user("z2", "m-inst", "peer-password");

    let provisioned = harness.provisioning.provision("inst", "z1").await.unwrap();

    let outcomes: Vec<_> = provisioned
        .replication
        .iter()
        .map(|r| (r.zone.as_str(), r.is_failed()))
        .collect();
    assert_eq!(outcomes, vec![("z2", false), ("z3", true)]);

    let password = harness.cluster.user_password("z1", "m-inst").unwrap();
    let upstream = harness.cluster.upstream("z2", "inst", "f-inst").unwrap();
    assert_eq!(upstream.uri, format!("amqp://m-inst:{}@h1:5672/inst", password));
    assert_eq!(upstream.max_hops, 1);
    assert_eq!(upstream.ack_mode, "on-confirm");

    let policy = harness.cluster.policy("z2", "inst", "p-inst").unwrap();
    assert_eq!(policy.pattern, r"^ps\.");
    assert_eq!(policy.apply_to, "all");
    assert_eq!(policy.definition["federation-upstream-set"], "all");

    // The fan-out authenticates as the new management user
    assert!(
        harness
            .cluster
            .calls("z2")
            .iter()
            .all(|call| call.caller == "m-inst")
    );
    assert!(harness.cluster.operations("z1").iter().all(|op| !matches!(
        op,
        Operation::SetUpstream | Operation::SetPolicy
    )));
}

#[smol_potat::test]
async fn test_peer_without_management_user_is_not_linked() {
    let harness = Harness::new(vec![common::zone("z1", "h1"), common::zone("z2", "h2")]);
    harness.cluster.insert_namespace("z2", "inst");

    let provisioned = harness.provisioning.provision("inst", "z1").await.unwrap();

    assert_eq!(provisioned.replication.len(), 1);
    assert!(matches!(
        &provisioned.replication[0].outcome,
        ReplicationOutcome::Failed { error } if error.contains("401")
    ));
    assert!(harness.cluster.upstream("z2", "inst", "f-inst").is_none());
    assert!(harness.cluster.policy("z2", "inst", "p-inst").is_none());
    // The home zone instance is unaffected
    assert!(harness.cluster.has_full_access("z1", "m-inst", "inst"));
}

#[smol_potat::test]
async fn test_deprovision_removes_everything() {
    let harness = Harness::single_zone();
    harness.provisioning.provision("inst", "z1").await.unwrap();

    harness.provisioning.deprovision("inst", "z1").await.unwrap();

    assert!(!harness.cluster.has_namespace("z1", "inst"));
    assert!(!harness.cluster.has_user("z1", "m-inst"));
}

#[smol_potat::test]
async fn test_deprovision_of_unknown_instance_succeeds() {
    let harness = Harness::three_zones();

    let deprovisioned = harness.provisioning.deprovision("never-was", "z1").await.unwrap();

    assert_eq!(deprovisioned.teardown.len(), 2);
    assert_eq!(deprovisioned.warnings().count(), 0);
}

#[smol_potat::test]
async fn test_deprovision_surfaces_transport_errors() {
    let harness = Harness::single_zone();
    harness.provisioning.provision("inst", "z1").await.unwrap();
    harness
        .cluster
        .fail_next("z1", Operation::DeleteNamespace, AdminError::transport("down"));

    let err = harness.provisioning.deprovision("inst", "z1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    // A retry finishes the job
    harness.provisioning.deprovision("inst", "z1").await.unwrap();
    assert!(!harness.cluster.has_namespace("z1", "inst"));
}

#[smol_potat::test]
async fn test_deprovision_tears_down_peer_replication() {
    let harness = Harness::three_zones();
    harness.cluster.insert_namespace("z2", "inst");
    harness.cluster.insert_user("z2", "m-inst", "peer-password");
    harness.cluster.insert_namespace("z3", "inst");
    harness.provisioning.provision("inst", "z1").await.unwrap();
    assert!(harness.cluster.upstream("z2", "inst", "f-inst").is_some());
    harness.cluster.set_unreachable("z3", true);

    let deprovisioned = harness.provisioning.deprovision("inst", "z1").await.unwrap();

    assert!(harness.cluster.upstream("z2", "inst", "f-inst").is_none());
    assert!(harness.cluster.policy("z2", "inst", "p-inst").is_none());
    // The peer namespace belongs to the peer's own instance and stays
    assert!(harness.cluster.has_namespace("z2", "inst"));

    let z3 = deprovisioned
        .teardown
        .iter()
        .find(|r| r.zone == "z3")
        .unwrap();
    assert!(z3.is_failed());
    assert_eq!(deprovisioned.warnings().count(), 1);
}

#[smol_potat::test]
async fn test_unknown_zone_is_internal() {
    let harness = Harness::single_zone();

    let err = harness.provisioning.provision("inst", "nowhere").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(harness.cluster.calls("z1").is_empty());
}
