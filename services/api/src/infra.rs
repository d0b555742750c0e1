use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use campus_nest::config::MarketplaceConfig;
use campus_nest::events::EventBus;
use campus_nest::marketplace::bookings::BookingService;
use campus_nest::marketplace::likes::LikeService;
use campus_nest::marketplace::listings::{
    AdminNotice, AdminNotifier, ListingService, ModerationEngine, NotifyError,
};
use campus_nest::marketplace::reviews::ReviewService;
use campus_nest::store::MemoryStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<MemoryStore>,
}

/// Writes admin notices to the log in place of an e-mail transport.
#[derive(Debug, Default, Clone)]
pub(crate) struct TracingNotifier;

impl AdminNotifier for TracingNotifier {
    fn notify(&self, notice: AdminNotice) -> Result<(), NotifyError> {
        info!(
            template = %notice.template,
            recipient = %notice.recipient,
            listing_id = %notice.listing_id,
            details = ?notice.details,
            "admin notice"
        );
        Ok(())
    }
}

pub(crate) type Listings = ListingService<MemoryStore, TracingNotifier>;
pub(crate) type Bookings = BookingService<MemoryStore, MemoryStore>;
pub(crate) type Reviews = ReviewService<MemoryStore, MemoryStore>;
pub(crate) type Likes = LikeService<MemoryStore>;

/// Every marketplace service wired over one shared store.
#[derive(Clone)]
pub(crate) struct Marketplace {
    pub(crate) listings: Arc<Listings>,
    pub(crate) bookings: Arc<Bookings>,
    pub(crate) reviews: Arc<Reviews>,
    pub(crate) likes: Arc<Likes>,
}

impl Marketplace {
    pub(crate) fn build(
        store: Arc<MemoryStore>,
        moderation: ModerationEngine,
        events: EventBus,
        config: &MarketplaceConfig,
    ) -> Self {
        let listings = ListingService::new(
            store.clone(),
            Arc::new(TracingNotifier),
            moderation,
            events.clone(),
            config,
        );
        let bookings = BookingService::new(
            store.clone(),
            store.clone(),
            config.commission,
            events.clone(),
        );
        let reviews = ReviewService::new(store.clone(), store.clone(), events);
        let likes = LikeService::new(store);

        Self {
            listings: Arc::new(listings),
            bookings: Arc::new(bookings),
            reviews: Arc::new(reviews),
            likes: Arc::new(likes),
        }
    }
}

/// Log every marketplace event until the bus closes.
pub(crate) fn spawn_audit_log(events: &EventBus) -> JoinHandle<()> {
    let mut receiver = events.subscribe();
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(envelope) => info!(
                    target: "audit",
                    at = %envelope.at,
                    user = %envelope.event.topic(),
                    event = ?envelope.event,
                    "marketplace event"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "audit log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
