//! Counters exported when the `metrics` feature is enabled.

#[cfg(feature = "metrics")]
mod enabled {
    pub const ROOMS_PROVISIONED_TOTAL: &str = "tempvoice_rooms_provisioned_total";
    pub const ROOMS_RECLAIMED_TOTAL: &str = "tempvoice_rooms_reclaimed_total";
    pub const ACTIONS_TOTAL: &str = "tempvoice_actions_total";
}

pub(crate) fn room_provisioned() {
    #[cfg(feature = "metrics")]
    metrics::counter!(enabled::ROOMS_PROVISIONED_TOTAL).increment(1);
}

pub(crate) fn room_reclaimed() {
    #[cfg(feature = "metrics")]
    metrics::counter!(enabled::ROOMS_RECLAIMED_TOTAL).increment(1);
}

pub(crate) fn action(name: &'static str, outcome: &'static str) {
    #[cfg(feature = "metrics")]
    metrics::counter!(enabled::ACTIONS_TOTAL, "action" => name, "outcome" => outcome).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = (name, outcome);
}
