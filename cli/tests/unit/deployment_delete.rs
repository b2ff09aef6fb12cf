//! Unit tests for the deployment teardown use-case.
//!
//! Every test drives `delete_deployment` against scripted ports and checks
//! the port call order, the reported steps, and what is left in the records.

#![allow(clippy::expect_used)]

use solo_cli::application::repository::DeploymentRepo;
use solo_cli::application::services::deployment::{
    DeleteOutcome, DeletedResource, delete_deployment, find_current_deployment,
};
use solo_cli::domain::CloudErrorKind;
use solo_common::{DiskAttributes, ResourceKind};

use crate::helpers::{
    MemoryStore, RecordedStep, Recorder, RecordingStage, ScriptedAgent, ScriptedCloud, Seed,
    StepState, finished, seed, seeded_repo,
};

const WAIT: &str = "Waiting for the agent on VM 'vm-1'";
const STOP: &str = "Stopping jobs on instance 'unknown/0'";
const UNMOUNT: &str = "Unmounting disk 'disk-1'";
const DELETE_VM: &str = "Deleting VM 'vm-1'";
const DELETE_DISK: &str = "Deleting disk 'disk-1'";
const DELETE_STEMCELL: &str = "Deleting stemcell 'stemcell-1'";

async fn assert_nothing_current(repo: &DeploymentRepo<MemoryStore>) {
    let state = repo.snapshot().await.expect("snapshot");
    assert!(state.vms.current().is_none());
    assert!(state.disks.current().is_none());
    assert!(state.stemcells.current().is_none());
}

// ── Normal teardown ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_stops_unmounts_and_deletes_in_order() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let cloud = ScriptedCloud::new(&recorder);
    let agent = ScriptedAgent::new(&recorder).with_mounted(&["disk-1"]);
    let stage = RecordingStage::default();

    delete_deployment(&cloud, &agent, &repo, &stage)
        .await
        .expect("delete");

    assert_eq!(
        recorder.calls(),
        vec![
            "has_vm(vm-1)",
            "ping",
            "stop",
            "list_disk",
            "unmount_disk(disk-1)",
            "delete_vm(vm-1)",
            "delete_disk(disk-1)",
            "delete_stemcell(stemcell-1)",
        ]
    );
    assert_eq!(
        stage.steps(),
        vec![
            finished(WAIT),
            finished(STOP),
            finished(UNMOUNT),
            finished(DELETE_VM),
            finished(DELETE_DISK),
            finished(DELETE_STEMCELL),
        ]
    );
}

#[tokio::test]
async fn test_delete_removes_all_records() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();

    let outcome = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("delete");

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted(vec![
            DeletedResource {
                kind: ResourceKind::Vm,
                cid: "vm-1".to_string(),
                already_gone: false,
            },
            DeletedResource {
                kind: ResourceKind::Disk,
                cid: "disk-1".to_string(),
                already_gone: false,
            },
            DeletedResource {
                kind: ResourceKind::Stemcell,
                cid: "stemcell-1".to_string(),
                already_gone: false,
            },
        ])
    );
    assert_nothing_current(&repo).await;
    assert!(repo.vms().all().await.expect("vms").is_empty());
    assert!(repo.disks().all().await.expect("disks").is_empty());
    assert!(repo.stemcells().all().await.expect("stemcells").is_empty());
    assert!(find_current_deployment(&repo).await.expect("find").is_none());
}

#[tokio::test]
async fn test_second_delete_makes_no_calls_and_no_steps() {
    let repo = seeded_repo().await;
    let first = Recorder::default();
    delete_deployment(
        &ScriptedCloud::new(&first),
        &ScriptedAgent::new(&first),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("first delete");

    let second = Recorder::default();
    let stage = RecordingStage::default();
    let outcome = delete_deployment(
        &ScriptedCloud::new(&second),
        &ScriptedAgent::new(&second),
        &repo,
        &stage,
    )
    .await
    .expect("second delete");

    assert_eq!(outcome, DeleteOutcome::NothingToDelete);
    assert!(second.calls().is_empty());
    assert!(stage.steps().is_empty());
}

#[tokio::test]
async fn test_delete_with_nothing_recorded() {
    let repo = DeploymentRepo::new(MemoryStore::default());
    let recorder = Recorder::default();
    let stage = RecordingStage::default();

    let outcome = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &stage,
    )
    .await
    .expect("delete");

    assert_eq!(outcome, DeleteOutcome::NothingToDelete);
    assert!(recorder.calls().is_empty());
    assert!(stage.steps().is_empty());
}

// ── Agent states ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unresponsive_agent_skips_stop_and_unmount() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let mut agent = ScriptedAgent::new(&recorder).with_mounted(&["disk-1"]);
    agent.responsive = false;
    let stage = RecordingStage::default();

    delete_deployment(&ScriptedCloud::new(&recorder), &agent, &repo, &stage)
        .await
        .expect("unresponsive agent is not fatal");

    assert_eq!(
        recorder.calls(),
        vec![
            "has_vm(vm-1)",
            "ping",
            "delete_vm(vm-1)",
            "delete_disk(disk-1)",
            "delete_stemcell(stemcell-1)",
        ]
    );
    assert_eq!(
        stage.steps()[0],
        RecordedStep {
            name: WAIT.to_string(),
            states: vec![StepState::Started, StepState::Failed],
        }
    );
    assert_eq!(
        stage.names()[1..],
        [DELETE_VM, DELETE_DISK, DELETE_STEMCELL]
    );
    assert_nothing_current(&repo).await;
}

#[tokio::test]
async fn test_vm_deleted_out_of_band_skips_agent() {
    let repo = DeploymentRepo::new(MemoryStore::default());
    seed(
        &repo,
        Seed {
            vm: true,
            disk: false,
            stemcell: false,
        },
    )
    .await;
    let recorder = Recorder::default();
    let mut cloud = ScriptedCloud::new(&recorder);
    cloud.vm_exists = false;
    let stage = RecordingStage::default();

    delete_deployment(&cloud, &ScriptedAgent::new(&recorder), &repo, &stage)
        .await
        .expect("delete");

    assert_eq!(recorder.calls(), vec!["has_vm(vm-1)", "delete_vm(vm-1)"]);
    assert_eq!(
        stage.steps(),
        vec![
            RecordedStep {
                name: WAIT.to_string(),
                states: vec![StepState::Started, StepState::Skipped],
            },
            finished(DELETE_VM),
        ]
    );
    assert!(repo.vms().find_current().await.expect("vm").is_none());
}

#[tokio::test]
async fn test_vm_only_deployment_still_unmounts_reported_disks() {
    let repo = DeploymentRepo::new(MemoryStore::default());
    seed(
        &repo,
        Seed {
            vm: true,
            disk: false,
            stemcell: false,
        },
    )
    .await;
    let recorder = Recorder::default();
    let agent = ScriptedAgent::new(&recorder).with_mounted(&["disk-1"]);

    delete_deployment(
        &ScriptedCloud::new(&recorder),
        &agent,
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("delete");

    assert_eq!(
        recorder.calls(),
        vec![
            "has_vm(vm-1)",
            "ping",
            "stop",
            "list_disk",
            "unmount_disk(disk-1)",
            "delete_vm(vm-1)",
        ]
    );
}

#[tokio::test]
async fn test_disk_and_stemcell_without_vm_skip_agent_entirely() {
    let repo = DeploymentRepo::new(MemoryStore::default());
    seed(
        &repo,
        Seed {
            vm: false,
            disk: true,
            stemcell: true,
        },
    )
    .await;
    let recorder = Recorder::default();
    let stage = RecordingStage::default();

    delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &stage,
    )
    .await
    .expect("delete");

    assert_eq!(
        recorder.calls(),
        vec!["delete_disk(disk-1)", "delete_stemcell(stemcell-1)"]
    );
    assert_eq!(
        stage.steps(),
        vec![finished(DELETE_DISK), finished(DELETE_STEMCELL)]
    );
}

// ── Not-found handling ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_not_found_is_ignored_for_every_resource() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let cloud = ScriptedCloud::new(&recorder)
        .failing("delete_vm", CloudErrorKind::VmNotFound)
        .failing("delete_disk", CloudErrorKind::DiskNotFound)
        .failing("delete_stemcell", CloudErrorKind::StemcellNotFound);
    let stage = RecordingStage::default();

    let outcome = delete_deployment(&cloud, &ScriptedAgent::new(&recorder), &repo, &stage)
        .await
        .expect("not-found is success");

    let DeleteOutcome::Deleted(resources) = outcome else {
        panic!("expected deleted resources, got {outcome:?}");
    };
    assert!(resources.iter().all(|r| r.already_gone));
    let skipped = |name: &str| RecordedStep {
        name: name.to_string(),
        states: vec![StepState::Started, StepState::Skipped],
    };
    assert_eq!(
        stage.steps(),
        vec![
            finished(WAIT),
            finished(STOP),
            skipped(DELETE_VM),
            skipped(DELETE_DISK),
            skipped(DELETE_STEMCELL),
        ]
    );
    assert_nothing_current(&repo).await;
}

#[tokio::test]
async fn test_not_found_of_another_kind_is_fatal() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let cloud =
        ScriptedCloud::new(&recorder).failing("delete_stemcell", CloudErrorKind::DiskNotFound);

    let err = delete_deployment(
        &cloud,
        &ScriptedAgent::new(&recorder),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect_err("mismatched not-found must fail");

    assert!(format!("{err:#}").starts_with(DELETE_STEMCELL));
    assert!(
        repo.stemcells()
            .find_current()
            .await
            .expect("stemcell")
            .is_some()
    );
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_vm_failure_keeps_records_and_rerun_resumes() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let cloud = ScriptedCloud::new(&recorder)
        .failing("delete_vm", CloudErrorKind::Cpi("Bosh::Clouds::CloudError".into()));
    let stage = RecordingStage::default();

    let err = delete_deployment(&cloud, &ScriptedAgent::new(&recorder), &repo, &stage)
        .await
        .expect_err("delete_vm failure is fatal");

    assert!(format!("{err:#}").starts_with(DELETE_VM));
    assert_eq!(recorder.method_names().last().map(String::as_str), Some("delete_vm"));
    assert_eq!(
        stage.steps().last(),
        Some(&RecordedStep {
            name: DELETE_VM.to_string(),
            states: vec![StepState::Started, StepState::Failed],
        })
    );
    let state = repo.snapshot().await.expect("snapshot");
    assert!(state.vms.current().is_some());
    assert!(state.disks.current().is_some());
    assert!(state.stemcells.current().is_some());

    let rerun = Recorder::default();
    delete_deployment(
        &ScriptedCloud::new(&rerun),
        &ScriptedAgent::new(&rerun),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("rerun");
    assert_eq!(
        rerun.method_names(),
        vec!["has_vm", "ping", "stop", "list_disk", "delete_vm", "delete_disk", "delete_stemcell"]
    );
    assert_nothing_current(&repo).await;
}

#[tokio::test]
async fn test_disk_failure_after_vm_deleted_resumes_at_disk() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let cloud = ScriptedCloud::new(&recorder).failing("delete_disk", CloudErrorKind::Transport);

    delete_deployment(
        &cloud,
        &ScriptedAgent::new(&recorder),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect_err("disk failure is fatal");

    let state = repo.snapshot().await.expect("snapshot");
    assert!(state.vms.current().is_none());
    assert!(state.vms.all().is_empty());
    assert!(state.disks.current().is_some());
    assert!(state.stemcells.current().is_some());
    assert!(!recorder.method_names().contains(&"delete_stemcell".to_string()));

    let rerun = Recorder::default();
    delete_deployment(
        &ScriptedCloud::new(&rerun),
        &ScriptedAgent::new(&rerun),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("rerun");
    assert_eq!(
        rerun.calls(),
        vec!["delete_disk(disk-1)", "delete_stemcell(stemcell-1)"]
    );
}

#[tokio::test]
async fn test_has_vm_failure_is_fatal_and_named() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let mut cloud = ScriptedCloud::new(&recorder);
    cloud.has_vm_error = Some(CloudErrorKind::Transport);
    let stage = RecordingStage::default();

    let err = delete_deployment(&cloud, &ScriptedAgent::new(&recorder), &repo, &stage)
        .await
        .expect_err("has_vm failure is fatal");

    assert!(format!("{err:#}").starts_with(WAIT));
    assert_eq!(recorder.calls(), vec!["has_vm(vm-1)"]);
    assert_eq!(
        stage.steps(),
        vec![RecordedStep {
            name: WAIT.to_string(),
            states: vec![StepState::Started, StepState::Failed],
        }]
    );
}

#[tokio::test]
async fn test_stop_failure_is_fatal_and_vm_is_kept() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let mut agent = ScriptedAgent::new(&recorder);
    agent.fail_on = Some("stop");

    let err = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &agent,
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect_err("stop failure is fatal");

    assert!(format!("{err:#}").starts_with(STOP));
    assert_eq!(recorder.method_names(), vec!["has_vm", "ping", "stop"]);
    assert!(repo.vms().find_current().await.expect("vm").is_some());
}

#[tokio::test]
async fn test_list_disk_failure_is_fatal() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let mut agent = ScriptedAgent::new(&recorder);
    agent.fail_on = Some("list_disk");

    let err = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &agent,
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect_err("list_disk failure is fatal");

    assert!(format!("{err:#}").contains("listing mounted disks on VM 'vm-1'"));
    assert!(!recorder.method_names().contains(&"delete_vm".to_string()));
}

#[tokio::test]
async fn test_unmount_failure_is_fatal() {
    let repo = seeded_repo().await;
    let recorder = Recorder::default();
    let mut agent = ScriptedAgent::new(&recorder).with_mounted(&["disk-1"]);
    agent.fail_on = Some("unmount_disk");

    let err = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &agent,
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect_err("unmount failure is fatal");

    assert!(format!("{err:#}").starts_with(UNMOUNT));
    assert!(!recorder.method_names().contains(&"delete_vm".to_string()));
}

// ── Dangling current pointers ────────────────────────────────────────────────

#[tokio::test]
async fn test_dangling_vm_pointer_is_cleared_and_rest_deleted() {
    let repo = seeded_repo().await;
    let vm = repo
        .vms()
        .find_current()
        .await
        .expect("vm")
        .expect("seeded vm");
    repo.vms().delete(&vm).await.expect("delete vm record");
    let recorder = Recorder::default();
    let stage = RecordingStage::default();

    let outcome = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &stage,
    )
    .await
    .expect("delete");

    assert_eq!(
        recorder.calls(),
        vec!["delete_disk(disk-1)", "delete_stemcell(stemcell-1)"]
    );
    assert_eq!(stage.names(), vec![DELETE_DISK, DELETE_STEMCELL]);
    assert!(matches!(outcome, DeleteOutcome::Deleted(ref r) if r.len() == 2));
    let state = repo.snapshot().await.expect("snapshot");
    assert!(state.vms.current_id.is_none());
    assert_nothing_current(&repo).await;
}

#[tokio::test]
async fn test_only_dangling_pointer_is_nothing_to_delete() {
    let repo = DeploymentRepo::new(MemoryStore::default());
    seed(
        &repo,
        Seed {
            vm: true,
            disk: false,
            stemcell: false,
        },
    )
    .await;
    let vm = repo
        .vms()
        .find_current()
        .await
        .expect("vm")
        .expect("seeded vm");
    repo.vms().delete(&vm).await.expect("delete vm record");
    let recorder = Recorder::default();

    let outcome = delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("delete");

    assert_eq!(outcome, DeleteOutcome::NothingToDelete);
    assert!(recorder.calls().is_empty());
    let state = repo.snapshot().await.expect("snapshot");
    assert!(state.vms.current_id.is_none());
}

// ── Records outside the deployment ───────────────────────────────────────────

#[tokio::test]
async fn test_orphaned_records_are_left_alone() {
    let repo = seeded_repo().await;
    let orphan = repo
        .disks()
        .save(DiskAttributes {
            cid: "disk-orphan".to_string(),
            size: 512,
            metadata: serde_json::Map::new(),
        })
        .await
        .expect("save orphan");
    let recorder = Recorder::default();

    delete_deployment(
        &ScriptedCloud::new(&recorder),
        &ScriptedAgent::new(&recorder),
        &repo,
        &RecordingStage::default(),
    )
    .await
    .expect("delete");

    assert!(!recorder.calls().contains(&"delete_disk(disk-orphan)".to_string()));
    assert_eq!(repo.disks().all().await.expect("disks"), vec![orphan]);
    assert!(find_current_deployment(&repo).await.expect("find").is_none());
}
