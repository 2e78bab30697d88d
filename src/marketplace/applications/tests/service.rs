use super::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, Duration, Utc};

use crate::config::LeasingConfig;
use crate::marketplace::applications::{
    ApplicationId, ApplicationQuery, ApplicationRepository, ApplicationRequest,
    ApplicationService, ApplicationStatus,
};
use crate::marketplace::error::ServiceError;
use crate::marketplace::leases::{LeaseFilter, LeaseRepository};
use crate::marketplace::properties::PropertyId;

fn lease_count(store: &impl LeaseRepository) -> usize {
    store
        .list_leases(&LeaseFilter::default())
        .expect("leases listed")
        .len()
}

#[test]
fn approval_issues_default_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let update = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval succeeds");

    assert_eq!(update.application.application.status, ApplicationStatus::Approved);
    assert!(update.transition.changed);
    let lease = update.lease.expect("lease issued");
    assert_eq!(lease.property_id, property_id);
    assert_eq!(lease.tenant_cognito_id, TENANT);
    assert_eq!(lease.rent, 1500);
    assert_eq!(lease.deposit, 1500);
    assert_eq!(lease.start_date, now());
    assert_eq!(lease.end_date - lease.start_date, Duration::days(365));
    assert_eq!(lease_count(store.as_ref()), 1);
}

#[test]
fn repeated_approval_keeps_a_single_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let first = service
        .update_status_at(&manager(), id, "approved", now())
        .expect("first approval");
    let second = service
        .update_status_at(&manager(), id, "APPROVED", now() + Duration::hours(1))
        .expect("second approval");

    assert!(!second.transition.changed);
    assert_eq!(
        first.lease.expect("lease").id,
        second.lease.expect("lease").id
    );
    assert_eq!(lease_count(store.as_ref()), 1);
}

#[test]
fn denial_issues_no_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let update = service
        .update_status_at(&manager(), id, "denied", now())
        .expect("denial succeeds");

    assert_eq!(update.application.application.status, ApplicationStatus::Denied);
    assert!(update.lease.is_none());
    assert_eq!(lease_count(store.as_ref()), 0);
}

#[test]
fn unrecognised_status_is_rejected_before_any_lookup() {
    let (service, _, _) = build_service();
    for raw in ["accepted", " approved", ""] {
        match service.update_status_at(&manager(), ApplicationId(404), raw, now()) {
            Err(ServiceError::Validation(_)) => {}
            other => panic!("expected validation error for {raw:?}, got {other:?}"),
        }
    }
}

#[test]
fn missing_application_is_not_found() {
    let (service, _, _) = build_service();
    match service.update_status_at(&manager(), ApplicationId(404), "Approved", now()) {
        Err(ServiceError::NotFound(_)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn other_managers_and_tenants_cannot_decide() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    for caller in [other_manager(), tenant()] {
        match service.update_status_at(&caller, id, "Approved", now()) {
            Err(ServiceError::Forbidden(_)) => {}
            other => panic!("expected forbidden for {caller:?}, got {other:?}"),
        }
    }

    let stored = store
        .fetch_application(id)
        .expect("fetch succeeds")
        .expect("application present");
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert_eq!(lease_count(store.as_ref()), 0);
}

#[test]
fn admins_can_decide_any_application() {
    let (service, _, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let update = service
        .update_status_at(&admin(), id, "Approved", now())
        .expect("admin approval");
    assert!(update.lease.is_some());
}

#[test]
fn zero_priced_property_uses_fallback_rent() {
    let (service, _, property_id) = build_service_with(0, LeasingConfig::default());
    let id = submit_pending(&service, property_id);

    let lease = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval")
        .lease
        .expect("lease issued");
    assert_eq!(lease.rent, 1000);
    assert_eq!(lease.deposit, 1000);
}

#[test]
fn lease_failure_does_not_undo_the_approval() {
    let (store, property_id) = seeded_store(1500);
    let service = ApplicationService::new(
        store.clone(),
        Arc::new(UnavailableLeases),
        &LeasingConfig::default(),
    );
    let id = submit_pending(&service, property_id);

    let update = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("status change still succeeds");

    assert!(update.lease.is_none());
    assert_eq!(update.application.application.status, ApplicationStatus::Approved);
    let stored = store
        .fetch_application(id)
        .expect("fetch succeeds")
        .expect("application present");
    assert_eq!(stored.status, ApplicationStatus::Approved);
}

#[test]
fn oversized_lease_terms_are_capped_instead_of_panicking() {
    let (service, _store, property_id) = build_service_with(
        1500,
        LeasingConfig {
            term_days: 100_000_000,
            ..LeasingConfig::default()
        },
    );
    let id = submit_pending(&service, property_id);

    let lease = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval")
        .lease
        .expect("lease");
    assert_eq!(
        lease.end_date - lease.start_date,
        Duration::days(crate::config::MAX_LEASE_TERM_DAYS)
    );
}

#[test]
fn undraftable_lease_leaves_the_approval_without_a_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);
    let end_of_calendar = DateTime::<Utc>::MAX_UTC - Duration::days(1);

    let update = service
        .update_status_at(&manager(), id, "Approved", end_of_calendar)
        .expect("status change still succeeds");

    assert!(update.lease.is_none());
    assert_eq!(update.application.application.status, ApplicationStatus::Approved);
    assert_eq!(lease_count(store.as_ref()), 0);
}

#[test]
fn out_of_order_approvals_reuse_the_overlapping_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let later = service
        .update_status_at(&manager(), id, "Approved", now() + Duration::milliseconds(5))
        .expect("approval")
        .lease
        .expect("lease");
    let earlier = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval")
        .lease
        .expect("overlapping lease returned");

    assert_eq!(earlier.id, later.id);
    assert_eq!(lease_count(store.as_ref()), 1);
}

#[test]
fn reapproval_after_denial_reuses_the_active_lease() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let issued = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval")
        .lease
        .expect("lease");
    service
        .update_status_at(&manager(), id, "Denied", now() + Duration::days(1))
        .expect("denial");
    let reissued = service
        .update_status_at(&manager(), id, "Approved", now() + Duration::days(2))
        .expect("re-approval")
        .lease
        .expect("lease");

    assert_eq!(issued.id, reissued.id);
    assert_eq!(lease_count(store.as_ref()), 1);
}

#[test]
fn expired_lease_is_replaced_by_a_fresh_one() {
    let (service, store, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    let old = service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval")
        .lease
        .expect("lease");
    let later = old.end_date + Duration::days(1);
    let fresh = service
        .update_status_at(&manager(), id, "Approved", later)
        .expect("approval after expiry")
        .lease
        .expect("fresh lease");

    assert_ne!(old.id, fresh.id);
    assert_eq!(fresh.start_date, later);
    assert_eq!(lease_count(store.as_ref()), 2);
}

#[test]
fn concurrent_approvals_issue_at_most_one_lease() {
    let (service, store, property_id) = build_service();
    let service = Arc::new(service);
    let first = submit_pending(service.as_ref(), property_id);
    let second = submit_pending(service.as_ref(), property_id);

    let handles: Vec<_> = (0..8)
        .map(|n| {
            let service = service.clone();
            let id = if n % 2 == 0 { first } else { second };
            thread::spawn(move || service.update_status_at(&manager(), id, "Approved", now()))
        })
        .collect();

    let lease_ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread completes"))
        .map(|result| result.expect("approval succeeds").lease.expect("lease").id)
        .collect();

    assert!(lease_ids.windows(2).all(|pair| pair[0] == pair[1]));
    let active: Vec<_> = store
        .list_leases(&LeaseFilter::default())
        .expect("leases listed")
        .into_iter()
        .filter(|lease| lease.is_active_at(now()))
        .collect();
    assert_eq!(active.len(), 1);
}

#[test]
fn strict_policy_refuses_flipping_a_decision() {
    let (service, store, property_id) = build_service_with(1500, strict_config());
    let id = submit_pending(&service, property_id);
    service
        .update_status_at(&manager(), id, "Denied", now())
        .expect("denial");

    match service.update_status_at(&manager(), id, "Approved", now()) {
        Err(ServiceError::Conflict(_)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
    let stored = store
        .fetch_application(id)
        .expect("fetch succeeds")
        .expect("application present");
    assert_eq!(stored.status, ApplicationStatus::Denied);
    assert_eq!(lease_count(store.as_ref()), 0);
}

#[test]
fn strict_decisions_race_to_a_single_winner() {
    for _ in 0..16 {
        let (service, store, property_id) = build_service_with(1500, strict_config());
        let service = Arc::new(service);
        let id = submit_pending(service.as_ref(), property_id);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["Approved", "Denied"]
            .into_iter()
            .map(|status| {
                let service = service.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    (status, service.update_status_at(&manager(), id, status, now()))
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect();
        let winners: Vec<_> = results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(status, _)| *status)
            .collect();
        assert_eq!(winners.len(), 1, "{results:?}");
        assert!(results
            .iter()
            .any(|(_, result)| matches!(result, Err(ServiceError::Conflict(_)))));

        let stored = store
            .fetch_application(id)
            .expect("fetch succeeds")
            .expect("application present");
        assert_eq!(stored.status.label(), winners[0]);
        let expected_leases = usize::from(winners[0] == "Approved");
        assert_eq!(lease_count(store.as_ref()), expected_leases);
    }
}

#[test]
fn submit_defaults_contact_to_the_tenant_profile() {
    let (service, _, property_id) = build_service();
    let application = service
        .submit(&tenant(), request(property_id), now())
        .expect("submitted");

    assert_eq!(application.status, ApplicationStatus::Pending);
    assert_eq!(application.contact.name, "Ada Lovelace");
    assert_eq!(application.contact.email, "ada@example.ac.uk");
    assert_eq!(application.application_date, now());
}

#[test]
fn submit_validates_ownership_and_references() {
    let (service, _, property_id) = build_service();

    let missing = ApplicationRequest {
        property_id: None,
        ..request(property_id)
    };
    assert!(matches!(
        service.submit(&tenant(), missing, now()),
        Err(ServiceError::Validation(_))
    ));

    assert!(matches!(
        service.submit(&manager(), request(property_id), now()),
        Err(ServiceError::Forbidden(_))
    ));

    assert!(matches!(
        service.submit(&tenant(), request(PropertyId(99)), now()),
        Err(ServiceError::NotFound(_))
    ));
}

#[test]
fn list_is_scoped_to_the_caller() {
    let (service, _, property_id) = build_service();
    let id = submit_pending(&service, property_id);
    service
        .update_status_at(&manager(), id, "Approved", now())
        .expect("approval");

    let own = service
        .list(&tenant(), ApplicationQuery::default(), now())
        .expect("tenant listing");
    assert_eq!(own.len(), 1);
    assert!(own[0].lease.is_some());

    let managed = service
        .list(&manager(), ApplicationQuery::default(), now())
        .expect("manager listing");
    assert_eq!(managed.len(), 1);

    let unrelated = service
        .list(&other_manager(), ApplicationQuery::default(), now())
        .expect("other manager listing");
    assert!(unrelated.is_empty());

    let foreign = ApplicationQuery {
        user_id: Some(MANAGER.to_string()),
        ..ApplicationQuery::default()
    };
    assert!(matches!(
        service.list(&tenant(), foreign, now()),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn list_filters_by_normalized_status() {
    let (service, _, property_id) = build_service();
    submit_pending(&service, property_id);

    let approved = ApplicationQuery {
        status: Some("APPROVED".to_string()),
        ..ApplicationQuery::default()
    };
    assert!(service
        .list(&admin(), approved, now())
        .expect("listing")
        .is_empty());

    let bogus = ApplicationQuery {
        status: Some("maybe".to_string()),
        ..ApplicationQuery::default()
    };
    assert!(matches!(
        service.list(&admin(), bogus, now()),
        Err(ServiceError::Validation(_))
    ));

    let untyped = ApplicationQuery {
        user_id: Some(TENANT.to_string()),
        ..ApplicationQuery::default()
    };
    assert!(matches!(
        service.list(&admin(), untyped, now()),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn get_is_limited_to_applicant_and_manager() {
    let (service, _, property_id) = build_service();
    let id = submit_pending(&service, property_id);

    assert!(service.get(&tenant(), id, now()).is_ok());
    assert!(service.get(&manager(), id, now()).is_ok());
    assert!(matches!(
        service.get(&other_manager(), id, now()),
        Err(ServiceError::Forbidden(_))
    ));
}
