//! Exposure reconciler (C8): registrar upserts `WorkloadExposure.spec`; the
//! mirror step copies a validated `exposures[0].url` onto `Workload.status.endpoint`.

use chrono::Utc;
use scoreplane_domain::{ObjectMeta, Workload, WorkloadExposure, WorkloadExposureSpec};
use scoreplane_store::{AuditEvent, DeclarativeStore};
use uuid::Uuid;

use crate::error::ReconcileError;
use crate::select::SelectedBackend;

/// How many generations stale an exposure's `observedWorkloadGeneration` may
/// be and still be trusted by the mirror step. Not named numerically;
/// chosen to tolerate one in-flight reconcile racing a runtime update.
const GENERATION_TOLERANCE: u64 = 1;

/// Registrar half of C8: upserts spec-only, idempotently.
pub async fn upsert_exposure_if_changed(
    store: &dyn DeclarativeStore,
    workload: &Workload,
    selected: &SelectedBackend,
) -> Result<(), ReconcileError> {
    let workload_ref = workload.meta.workload_ref();
    let desired = WorkloadExposureSpec {
        workload_ref: scoreplane_domain::WorkloadRefWithUid {
            namespace: workload_ref.namespace.clone(),
            name: workload_ref.name.clone(),
            uid: workload.meta.uid,
        },
        observed_workload_generation: workload.meta.generation,
        runtime_class: selected.runtime_class.clone(),
    };

    match store.get_exposure(&workload_ref).await? {
        None => {
            let exposure = WorkloadExposure::new(ObjectMeta::new(workload_ref.namespace.clone(), workload_ref.name.clone(), Utc::now()), desired);
            store.upsert_exposure(&exposure).await?;
            store.append_event(&AuditEvent::ExposureUpserted { id: Uuid::new_v4(), at: Utc::now(), workload_ref }).await?;
        }
        Some(mut existing) => {
            let changed = existing.spec.observed_workload_generation != desired.observed_workload_generation
                || existing.spec.runtime_class != desired.runtime_class
                || existing.spec.workload_ref.uid != desired.workload_ref.uid;
            if changed {
                existing.spec = desired;
                existing.meta.resource_version += 1;
                store.upsert_exposure(&existing).await?;
                store.append_event(&AuditEvent::ExposureUpserted { id: Uuid::new_v4(), at: Utc::now(), workload_ref }).await?;
            }
        }
    }
    Ok(())
}

/// Mirror half of C8: the highest-priority exposure entry, if it passes
/// validation against `workload`, becomes the next `status.endpoint`. Any
/// failure (absent exposure, bad url, identity mismatch, stale generation)
/// resolves to `None` rather than an error — the endpoint simply stays null.
pub async fn mirrored_endpoint(store: &dyn DeclarativeStore, workload: &Workload) -> Result<Option<String>, ReconcileError> {
    let workload_ref = workload.meta.workload_ref();
    let Some(exposure) = store.get_exposure(&workload_ref).await? else { return Ok(None) };
    let Some(entry) = exposure.status.exposures.first() else { return Ok(None) };

    if entry.parse_url().is_err() {
        return Ok(None);
    }
    if !exposure.spec.workload_ref.matches(&workload_ref, workload.meta.uid) {
        return Ok(None);
    }
    let observed = exposure.spec.observed_workload_generation;
    if observed + GENERATION_TOLERANCE < workload.meta.generation {
        return Ok(None);
    }

    Ok(Some(entry.url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreplane_domain::{
        Container, ExposureEntry, TemplateKind, TemplateSpec, WorkloadRefWithUid, WorkloadSpec,
    };
    use scoreplane_store::InMemoryStore;
    use std::collections::HashMap;

    fn selected() -> SelectedBackend {
        SelectedBackend {
            runtime_class: "kubernetes".to_string(),
            template: TemplateSpec { kind: TemplateKind::Manifests, ref_: "oci://chart".to_string(), default_values: None },
            default_values: None,
        }
    }

    fn workload() -> Workload {
        let mut containers = HashMap::new();
        containers.insert(
            "main".to_string(),
            Container { image: "nginx".to_string(), command: vec![], args: vec![], env: HashMap::new(), files: vec![], probes: None, resources: None },
        );
        Workload::new(ObjectMeta::new("default", "web", Utc::now()), WorkloadSpec { containers, ..Default::default() })
    }

    fn entry(url: &str, ready: bool) -> ExposureEntry {
        ExposureEntry { name: None, url: url.to_string(), type_: None, ready, scope: None, scheme_hint: None, reachable: None }
    }

    #[tokio::test]
    async fn registrar_creates_exposure_on_first_pass() {
        let store = InMemoryStore::new();
        let wl = workload();
        upsert_exposure_if_changed(&store, &wl, &selected()).await.unwrap();
        let exposure = store.get_exposure(&wl.meta.workload_ref()).await.unwrap().unwrap();
        assert_eq!(exposure.spec.runtime_class, "kubernetes");
        assert_eq!(exposure.spec.workload_ref.uid, wl.meta.uid);
    }

    #[tokio::test]
    async fn registrar_second_pass_with_no_changes_is_idempotent() {
        let store = InMemoryStore::new();
        let wl = workload();
        upsert_exposure_if_changed(&store, &wl, &selected()).await.unwrap();
        let before = store.get_exposure(&wl.meta.workload_ref()).await.unwrap().unwrap();
        upsert_exposure_if_changed(&store, &wl, &selected()).await.unwrap();
        let after = store.get_exposure(&wl.meta.workload_ref()).await.unwrap().unwrap();
        assert_eq!(before.meta.resource_version, after.meta.resource_version);
    }

    #[tokio::test]
    async fn mirror_copies_first_valid_exposure_url() {
        let store = InMemoryStore::new();
        let wl = workload();
        upsert_exposure_if_changed(&store, &wl, &selected()).await.unwrap();
        let mut exposure = store.get_exposure(&wl.meta.workload_ref()).await.unwrap().unwrap();
        exposure.status.exposures = vec![entry("http://web.default.svc:8000", true)];
        store.upsert_exposure(&exposure).await.unwrap();

        let endpoint = mirrored_endpoint(&store, &wl).await.unwrap();
        assert_eq!(endpoint.as_deref(), Some("http://web.default.svc:8000"));
    }

    #[tokio::test]
    async fn mirror_rejects_invalid_url() {
        let store = InMemoryStore::new();
        let wl = workload();
        upsert_exposure_if_changed(&store, &wl, &selected()).await.unwrap();
        let mut exposure = store.get_exposure(&wl.meta.workload_ref()).await.unwrap().unwrap();
        exposure.status.exposures = vec![entry("ftp://bad", true)];
        store.upsert_exposure(&exposure).await.unwrap();

        let endpoint = mirrored_endpoint(&store, &wl).await.unwrap();
        assert!(endpoint.is_none());
    }

    #[tokio::test]
    async fn mirror_rejects_uid_mismatch() {
        let store = InMemoryStore::new();
        let wl = workload();
        let mut exposure = WorkloadExposure::new(
            ObjectMeta::new("default", "web", Utc::now()),
            WorkloadExposureSpec {
                workload_ref: WorkloadRefWithUid { namespace: "default".to_string(), name: "web".to_string(), uid: Uuid::new_v4() },
                observed_workload_generation: wl.meta.generation,
                runtime_class: "kubernetes".to_string(),
            },
        );
        exposure.status.exposures = vec![entry("http://web.default.svc:8000", true)];
        store.upsert_exposure(&exposure).await.unwrap();

        let endpoint = mirrored_endpoint(&store, &wl).await.unwrap();
        assert!(endpoint.is_none());
    }

    #[tokio::test]
    async fn mirror_rejects_stale_generation_beyond_tolerance() {
        let store = InMemoryStore::new();
        let mut wl = workload();
        wl.meta.generation = 5;
        let mut exposure = WorkloadExposure::new(
            ObjectMeta::new("default", "web", Utc::now()),
            WorkloadExposureSpec {
                workload_ref: WorkloadRefWithUid { namespace: "default".to_string(), name: "web".to_string(), uid: wl.meta.uid },
                observed_workload_generation: 2,
                runtime_class: "kubernetes".to_string(),
            },
        );
        exposure.status.exposures = vec![entry("http://web.default.svc:8000", true)];
        store.upsert_exposure(&exposure).await.unwrap();

        let endpoint = mirrored_endpoint(&store, &wl).await.unwrap();
        assert!(endpoint.is_none());
    }
}
