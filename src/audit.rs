use crate::{
    broker::{Broker, BrokerError},
    event::{Event, OTP_EXPIRED, OTP_REQUESTED, OTP_VERIFIED},
};

fn user(event: &Event) -> &str {
    event.user().unwrap_or("<unknown>")
}

fn log_requested(event: &Event) {
    tracing::info!(user = user(event), "[EVENT] OTP requested");
}

fn log_verified(event: &Event) {
    tracing::info!(user = user(event), "[EVENT] OTP verified");
}

fn log_expired(event: &Event) {
    tracing::info!(user = user(event), "[EVENT] OTP expired");
}

/// Subscribes the log listeners for every OTP lifecycle event. The issued
/// code itself is never written to the log.
pub fn register(broker: &Broker) -> Result<(), BrokerError> {
    broker.subscribe(OTP_REQUESTED, log_requested)?;
    broker.subscribe(OTP_VERIFIED, log_verified)?;
    broker.subscribe(OTP_EXPIRED, log_expired)?;
    Ok(())
}
