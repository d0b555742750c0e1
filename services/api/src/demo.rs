use crate::infra::Marketplace;
use async_trait::async_trait;
use campus_nest::auth::{Principal, Role};
use campus_nest::config::MarketplaceConfig;
use campus_nest::error::AppError;
use campus_nest::events::EventBus;
use campus_nest::marketplace::bookings::{AddOnKit, BookingRequest};
use campus_nest::marketplace::listings::{
    ContentReviewer, GenderPolicy, ListingDetails, ModerationEngine, ModerationPolicy,
    NearbyInstitution, NearbyPlace, NearbyPlaces, PropertyKind, ReviewRequest, ReviewerError,
    RoomType, VisitChecklist, VisitReport,
};
use campus_nest::marketplace::reviews::ReviewSubmission;
use campus_nest::marketplace::{ItemKind, ItemRef};
use campus_nest::store::MemoryStore;
use clap::Args;
use std::sync::Arc;

const DEMO_VERDICT: &str = r#"{"confidence": 88, "score": 81, "recommendation": "APPROVE", "reason": "Complete details, realistic pricing", "concerns": []}"#;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Run without the automated reviewer so the listing waits for an admin.
    #[arg(long)]
    pub(crate) manual: bool,
    /// Commission rate (percent) applied to the demo booking.
    #[arg(long)]
    pub(crate) commission_rate: Option<f64>,
    /// Stop after the listing and verification steps.
    #[arg(long)]
    pub(crate) skip_booking: bool,
}

/// Reviewer that always answers with a fixed approving verdict.
struct CannedReviewer;

#[async_trait]
impl ContentReviewer for CannedReviewer {
    async fn review(&self, _request: &ReviewRequest) -> Result<String, ReviewerError> {
        Ok(DEMO_VERDICT.to_string())
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        manual,
        commission_rate,
        skip_booking,
    } = args;

    let owner = Principal::new("owner-demo", Role::User, "Lakshmi Iyer");
    let student = Principal::new("student-demo", Role::User, "Rahul Verma");
    let admin = Principal::new("admin-demo", Role::Admin, "Campus Nest Admin");
    let executive = Principal::new("exec-demo", Role::Executive, "Field Executive");

    let reviewer: Option<Arc<dyn ContentReviewer>> = if manual {
        None
    } else {
        Some(Arc::new(CannedReviewer))
    };
    let config = MarketplaceConfig::default();
    let marketplace = Marketplace::build(
        Arc::new(MemoryStore::new()),
        ModerationEngine::new(reviewer, ModerationPolicy::default()),
        EventBus::default(),
        &config,
    );

    println!("Campus Nest marketplace demo");
    let receipt = match marketplace.listings.submit(&owner, demo_listing()).await {
        Ok(receipt) => receipt,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    let id = receipt.listing.id.clone();
    println!(
        "- Submitted {} '{}' -> review {}",
        id, receipt.listing.details.title, receipt.review.outcome
    );
    if let Some(review) = &receipt.listing.ai_review {
        println!(
            "  Automated review: confidence {} | score {} | {}",
            review.confidence, review.score, review.analysis
        );
    }
    if let Some(reason) = &receipt.review.reason {
        println!("  Held for admin: {reason}");
    }

    if !receipt.listing.is_approved {
        match marketplace.listings.approve(&admin, &id) {
            Ok(_) => println!("- Admin approved {id} manually"),
            Err(err) => {
                println!("  Approval failed: {err}");
                return Ok(());
            }
        }
    }

    println!(
        "\nVerification track (fee INR {})",
        config.verification_fee
    );
    if let Err(err) = marketplace
        .listings
        .begin_verification(&owner, &id, "DEMO-PAYMENT-001")
    {
        println!("  Verification request failed: {err}");
        return Ok(());
    }
    println!("- Owner paid; verification pending");

    let report = VisitReport {
        checklist: VisitChecklist {
            network_tested: true,
            network_speed_mbps: Some(48.0),
            video_recorded: true,
            video_url: None,
            physical_inspection: true,
            notes: "Rooms, kitchen, and study area match the listing".to_string(),
        },
        approve: true,
        visited_at: None,
    };
    match marketplace
        .listings
        .complete_verification(&executive, &id, report)
    {
        Ok(listing) => println!(
            "- Executive visit recorded -> {}",
            listing
                .verification_status()
                .map(|status| status.label())
                .unwrap_or("none")
        ),
        Err(err) => {
            println!("  Verification completion failed: {err}");
            return Ok(());
        }
    }

    if skip_booking {
        return Ok(());
    }

    println!("\nBooking flow");
    let request = BookingRequest {
        property_id: id.clone(),
        room_type: Some("Twin".to_string()),
        commission_rate,
        kit: Some(AddOnKit {
            name: "Welcome kit".to_string(),
            price: 499,
        }),
        guests: 1,
    };
    let booking = match marketplace.bookings.create(&student, request) {
        Ok(booking) => booking,
        Err(err) => {
            println!("  Booking rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Booking {}: rent {} + commission {} ({}%) + kit {} = {}",
        booking.id,
        booking.price,
        booking.commission_amount,
        booking.commission_rate,
        booking.kit.as_ref().map(|kit| kit.price).unwrap_or(0),
        booking.total_amount
    );

    match marketplace
        .bookings
        .capture_payment(&student, &booking.id, "DEMO-ORDER-001")
    {
        Ok(paid) => println!("  Payment captured -> booking {}", paid.status.label()),
        Err(err) => println!("  Payment capture failed: {err}"),
    }

    let submission = ReviewSubmission {
        item_type: ItemKind::Property,
        item_id: id.0.clone(),
        rating: 5,
        comment: "Friendly owner and a quiet study hall".to_string(),
    };
    match marketplace.reviews.submit(&student, submission) {
        Ok(receipt) => println!(
            "- Review recorded: average {:.1} across {} review(s)",
            receipt.rating, receipt.reviews
        ),
        Err(err) => println!("  Review rejected: {err}"),
    }

    match marketplace
        .likes
        .toggle(&student, ItemRef::new(ItemKind::Property, id.0.clone()))
    {
        Ok(state) => println!("- Liked: {} ({} total)", state.liked, state.count),
        Err(err) => println!("  Like failed: {err}"),
    }

    match marketplace.listings.get(Some(&student), &id) {
        Ok(listing) => match serde_json::to_string_pretty(&listing.view()) {
            Ok(json) => println!("\nPublic listing payload:\n{json}"),
            Err(err) => println!("  Listing payload unavailable: {err}"),
        },
        Err(err) => println!("  Listing lookup failed: {err}"),
    }

    Ok(())
}

fn demo_listing() -> ListingDetails {
    ListingDetails {
        title: "Sunrise Residency PG".to_string(),
        description: "Furnished twin and single rooms with home-style meals, \
                      daily housekeeping, and a quiet study hall."
            .to_string(),
        kind: PropertyKind::Pg,
        gender: GenderPolicy::Any,
        address: "14 FC Road, Shivajinagar".to_string(),
        location: "Pune".to_string(),
        coordinates: None,
        price: 9_000,
        deposit: 18_000,
        room_types: vec![
            RoomType {
                label: "Twin".to_string(),
                price: 8_000,
                available: 3,
            },
            RoomType {
                label: "Single".to_string(),
                price: 12_000,
                available: 1,
            },
        ],
        amenities: vec![
            "WiFi".to_string(),
            "Meals".to_string(),
            "Laundry".to_string(),
        ],
        rules: vec!["No smoking".to_string()],
        nearby_places: NearbyPlaces {
            messes: vec![NearbyPlace {
                name: "Shree Mess".to_string(),
                distance_km: 0.4,
                rating: Some(4.5),
            }],
            ..NearbyPlaces::default()
        },
        nearby_institutions: vec![NearbyInstitution {
            name: "Fergusson College".to_string(),
            distance_km: 0.8,
        }],
    }
}
