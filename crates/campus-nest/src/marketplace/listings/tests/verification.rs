use super::common::*;
use crate::marketplace::listings::domain::{VerificationStatus, VisitChecklist};
use crate::marketplace::listings::repository::ListingRepository;
use crate::marketplace::listings::{ListingServiceError, VerificationError, VisitReport};

fn report(approve: bool) -> VisitReport {
    VisitReport {
        checklist: VisitChecklist {
            network_tested: true,
            network_speed_mbps: Some(48.5),
            video_recorded: true,
            video_url: Some("https://videos.example/walkthrough.mp4".to_string()),
            physical_inspection: true,
            notes: "Matches photos".to_string(),
        },
        approve,
        visited_at: None,
    }
}

fn assert_verification_error(
    result: Result<crate::marketplace::listings::Listing, ListingServiceError>,
    expected: VerificationError,
) {
    match result {
        Err(ListingServiceError::Verification(actual)) => assert_eq!(actual, expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

#[tokio::test]
async fn owner_pays_and_executive_verifies() {
    let (service, store, _) = build_service(None);
    let id = approved_listing(&service).await;

    let pending = service
        .begin_verification(&owner(), &id, " PAY-123 ")
        .expect("verification starts");
    let verification = pending.verification.expect("verification recorded");
    assert_eq!(verification.status, VerificationStatus::Pending);
    assert_eq!(verification.fee, 999);
    assert_eq!(verification.payment_id, "PAY-123");

    let verified = service
        .complete_verification(&executive(), &id, report(true))
        .expect("executive completes");
    assert_eq!(verified.verification_status(), Some(VerificationStatus::Verified));

    let visit = store
        .fetch(&id)
        .expect("fetch")
        .and_then(|listing| listing.verification)
        .and_then(|verification| verification.visit)
        .expect("visit recorded");
    assert_eq!(visit.decided_by, executive().user_id);
    assert!(visit.checklist.network_tested);
}

#[tokio::test]
async fn verification_requires_approved_listing() {
    let (service, _, _) = build_service(None);
    let receipt = service
        .submit(&owner(), details())
        .await
        .expect("submission succeeds");

    assert_verification_error(
        service.begin_verification(&owner(), &receipt.listing.id, "PAY-1"),
        VerificationError::NotApproved,
    );
}

#[tokio::test]
async fn only_owner_can_request_verification() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;

    assert_verification_error(
        service.begin_verification(&other_user(), &id, "PAY-1"),
        VerificationError::NotOwner,
    );
}

#[tokio::test]
async fn pending_and_verified_cannot_be_reentered() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;

    service
        .begin_verification(&owner(), &id, "PAY-1")
        .expect("verification starts");
    assert_verification_error(
        service.begin_verification(&owner(), &id, "PAY-2"),
        VerificationError::AlreadyPending,
    );

    service
        .complete_verification(&admin(), &id, report(true))
        .expect("admin completes");
    assert_verification_error(
        service.begin_verification(&owner(), &id, "PAY-3"),
        VerificationError::AlreadyVerified,
    );
}

#[tokio::test]
async fn rejected_verification_may_be_requested_again() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;

    service
        .begin_verification(&owner(), &id, "PAY-1")
        .expect("verification starts");
    let rejected = service
        .complete_verification(&executive(), &id, report(false))
        .expect("executive rejects");
    assert_eq!(rejected.verification_status(), Some(VerificationStatus::Rejected));

    let retry = service
        .begin_verification(&owner(), &id, "PAY-2")
        .expect("retry allowed");
    assert_eq!(retry.verification_status(), Some(VerificationStatus::Pending));
}

#[tokio::test]
async fn completion_requires_pending_status() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;

    assert_verification_error(
        service.complete_verification(&executive(), &id, report(true)),
        VerificationError::NotPending { current: None },
    );
}

#[tokio::test]
async fn completion_requires_staff() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;
    service
        .begin_verification(&owner(), &id, "PAY-1")
        .expect("verification starts");

    assert_verification_error(
        service.complete_verification(&owner(), &id, report(true)),
        VerificationError::NotStaff,
    );
}

#[tokio::test]
async fn blank_payment_reference_is_rejected() {
    let (service, _, _) = build_service(None);
    let id = approved_listing(&service).await;

    assert_verification_error(
        service.begin_verification(&owner(), &id, "  "),
        VerificationError::MissingPaymentReference,
    );
}
