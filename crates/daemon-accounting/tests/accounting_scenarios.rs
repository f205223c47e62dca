use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use daemon_accounting::domain::cache::PodIdentity;
use daemon_accounting::domain::cache::PodSnapshot;
use daemon_accounting::domain::classifier::OwnerRef;
use daemon_accounting::domain::owner_kind::ConfigError;
use daemon_accounting::domain::quantity::ResourceList;
use daemon_accounting::DaemonPodCache;
use daemon_accounting::NodeCapacityAccountant;
use daemon_accounting::OwnerKindRegistry;
use daemon_accounting::PodClassification;
use similar_asserts::assert_eq;

fn setup(owner_kinds: &[&str]) -> (Arc<DaemonPodCache>, NodeCapacityAccountant) {
    let registry = Arc::new(OwnerKindRegistry::parse(owner_kinds).expect("registry should parse"));
    let cache = Arc::new(DaemonPodCache::new(registry.clone()));
    let accountant = NodeCapacityAccountant::new(registry, cache.clone());
    (cache, accountant)
}

fn resources(pairs: &[(&str, &str)]) -> ResourceList {
    ResourceList::parse(pairs.iter().copied()).expect("resources should parse")
}

fn custom_daemon_pod() -> PodSnapshot {
    PodSnapshot::new(PodIdentity::new("monitoring", "p"))
        .with_node("n1")
        .with_owner(OwnerRef::from_api_version("custom.io/v1", "CustomDaemon", true))
        .with_requests(resources(&[("cpu", "100m"), ("memory", "128Mi")]))
}

#[test]
fn other_daemon_pod_is_accounted_on_its_node() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let pod = custom_daemon_pod();

    cache.upsert(&pod);

    assert_eq!(accountant.classify(&pod), PodClassification::OtherDaemon);
    assert!(!accountant.is_provisionable(&pod));
    assert!(!accountant.is_reschedulable(&pod));
    assert_eq!(
        accountant.reserved_capacity("n1"),
        resources(&[("cpu", "100m"), ("memory", "128Mi")])
    );
}

#[test]
fn ordinary_pod_is_never_counted() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let ordinary = PodSnapshot::new(PodIdentity::new("default", "q"))
        .with_node("n1")
        .with_requests(resources(&[("cpu", "2")]));

    cache.upsert(&custom_daemon_pod());
    cache.upsert(&ordinary);

    assert_eq!(accountant.classify(&ordinary), PodClassification::Ordinary);
    assert!(accountant.is_provisionable(&ordinary));
    assert!(accountant.is_reschedulable(&ordinary));
    assert_eq!(
        accountant.reserved_capacity("n1"),
        resources(&[("cpu", "100m"), ("memory", "128Mi")])
    );
}

#[test]
fn removing_daemon_pod_frees_its_reservation() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let pod = custom_daemon_pod();
    cache.upsert(&pod);

    cache.remove(&pod.identity);

    assert_eq!(accountant.reserved_capacity("n1"), ResourceList::new());
    assert!(cache.is_empty());
}

#[test]
fn repeated_upserts_are_idempotent() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let pod = custom_daemon_pod();

    cache.upsert(&pod);
    let once = accountant.reserved_capacity("n1");
    cache.upsert(&pod);
    cache.upsert(&pod);

    assert_eq!(accountant.reserved_capacity("n1"), once);
    assert_eq!(cache.len(), 1);
}

#[test]
fn upsert_then_remove_restores_prior_state() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let kept = custom_daemon_pod();
    cache.upsert(&kept);
    let before = accountant.reserved_capacity("n1");

    let transient = PodSnapshot::new(PodIdentity::new("kube-system", "proxy"))
        .with_node("n1")
        .with_owner(OwnerRef::from_api_version("apps/v1", "DaemonSet", true))
        .with_requests(resources(&[("cpu", "50m")]));
    cache.upsert(&transient);
    cache.remove(&transient.identity);

    assert_eq!(accountant.reserved_capacity("n1"), before);
}

#[test]
fn reservation_is_sum_of_daemon_requests() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let builtin = PodSnapshot::new(PodIdentity::new("kube-system", "proxy"))
        .with_node("n1")
        .with_owner(OwnerRef::from_api_version("apps/v1", "DaemonSet", true))
        .with_requests(resources(&[("cpu", "150m"), ("nvidia.com/gpu", "1")]));

    cache.upsert(&custom_daemon_pod());
    cache.upsert(&builtin);

    assert_eq!(
        accountant.reserved_capacity("n1"),
        resources(&[("cpu", "250m"), ("memory", "128Mi"), ("nvidia.com/gpu", "1")])
    );
}

#[test]
fn reclassification_follows_registry_and_owners() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let pod = custom_daemon_pod();
    cache.upsert(&pod);

    // Same pod, now owned by an unregistered kind
    let orphaned = PodSnapshot {
        owner_references: vec![OwnerRef::from_api_version("custom.io/v2", "CustomDaemon", true)],
        ..pod
    };
    cache.upsert(&orphaned);

    assert_eq!(accountant.classify(&orphaned), PodClassification::Ordinary);
    assert_eq!(accountant.reserved_capacity("n1"), ResourceList::new());
}

#[test]
fn duplicate_registry_entries_collapse() {
    let registry =
        OwnerKindRegistry::parse(["custom.io/v1/CustomDaemon", "custom.io/v1/CustomDaemon"])
            .expect("duplicates should parse");

    assert_eq!(registry.len(), 1);
}

#[test]
fn malformed_registry_entry_is_rejected() {
    let err = OwnerKindRegistry::parse(["custom.io/v1/CustomDaemon", "custom.io/CustomDaemon"])
        .expect_err("two segment entry should be rejected");

    assert_eq!(
        err,
        ConfigError::MalformedOwnerKind {
            index: 1,
            entry: "custom.io/CustomDaemon".to_string(),
        }
    );
}

#[test]
fn concurrent_upserts_on_one_node_are_additive() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let cache = &cache;
            scope.spawn(move || {
                for i in 0..25 {
                    let identity = PodIdentity::new("monitoring", format!("p-{worker}-{i}"));
                    let owner = OwnerRef::from_api_version("custom.io/v1", "CustomDaemon", true);
                    let pod = PodSnapshot::new(identity)
                        .with_node("n1")
                        .with_owner(owner)
                        .with_requests(resources(&[("cpu", "10m")]));
                    cache.upsert(&pod);
                }
            });
        }
    });

    assert_eq!(accountant.reserved_capacity("n1"), resources(&[("cpu", "1")]));
}

/// Memory millis per cpu milli for pods built by `ratio_pod`.
const MEMORY_PER_CPU: i64 = 1024 * 1024 * 100;

fn ratio_pod(name: &str, size: u32) -> PodSnapshot {
    PodSnapshot::new(PodIdentity::new("monitoring", name))
        .with_node("n1")
        .with_owner(OwnerRef::from_api_version("custom.io/v1", "CustomDaemon", true))
        .with_requests(resources(&[
            ("cpu", format!("{}m", size * 10).as_str()),
            ("memory", format!("{size}Mi").as_str()),
        ]))
}

#[test]
fn reservations_read_during_updates_see_whole_records() {
    let (cache, accountant) = setup(&["custom.io/v1/CustomDaemon"]);
    let writers_done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let readers: Vec<_> = (0..2)
            .map(|_| {
                let accountant = &accountant;
                let writers_done = &writers_done;
                scope.spawn(move || {
                    let mut observed = 0;
                    loop {
                        let finished = writers_done.load(Ordering::Acquire);
                        let reserved = accountant.reserved_capacity("n1");
                        let cpu = reserved.get("cpu").millis();
                        let memory = reserved.get("memory").millis();
                        assert_eq!(memory, cpu * MEMORY_PER_CPU, "torn reservation {reserved:?}");
                        observed += 1;
                        if finished {
                            return observed;
                        }
                    }
                })
            })
            .collect();

        let writers: Vec<_> = (0..3)
            .map(|worker| {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..200_u32 {
                        let name = format!("p-{worker}-{}", i % 5);
                        cache.upsert(&ratio_pod(&name, i % 7 + 1));
                        cache.upsert(&ratio_pod(&name, i % 3 + 2));
                        if i % 4 == 0 {
                            cache.remove(&PodIdentity::new("monitoring", name));
                        }
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().expect("writer should finish");
        }
        writers_done.store(true, Ordering::Release);

        for reader in readers {
            let observed = reader.join().expect("reader should finish");
            assert!(observed > 0);
        }
    });

    let reserved = accountant.reserved_capacity("n1");
    assert_eq!(
        reserved.get("memory").millis(),
        reserved.get("cpu").millis() * MEMORY_PER_CPU
    );
}
