use std::{sync::Arc, time::Duration};

use crate::{
    broker::Broker,
    code::generate_code,
    event::Event,
    store::{OtpStore, StoreError},
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid request")]
    InvalidRequest,
    #[error("no OTP available for user")]
    NotFound,
    #[error("OTP expired")]
    Expired,
    #[error("invalid OTP")]
    InvalidCode,
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => ServiceError::NotFound,
            StoreError::Expired => ServiceError::Expired,
            StoreError::Internal(e) => ServiceError::Internal(e),
        }
    }
}

/// Issues and checks codes against a store, announcing each step on the
/// broker.
#[derive(Debug)]
pub struct OtpService<S> {
    store: S,
    broker: Arc<Broker>,
    ttl: Duration,
}

impl<S: OtpStore> OtpService<S> {
    pub fn new(store: S, broker: Arc<Broker>, ttl: Duration) -> Self {
        OtpService { store, broker, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn request(&self, user: &str) -> Result<String, ServiceError> {
        if user.is_empty() {
            return Err(ServiceError::InvalidRequest);
        }
        let code = generate_code();
        self.store.set(user, &code, self.ttl).await;
        self.broker.publish(Event::otp_requested(user, &code));
        Ok(code)
    }

    /// Checks `code` for `user` and consumes it on a match. A wrong code
    /// leaves the stored one in place.
    pub async fn verify(&self, user: &str, code: &str) -> Result<(), ServiceError> {
        if !self.store.consume(user, code).await? {
            return Err(ServiceError::InvalidCode);
        }
        self.broker.publish(Event::otp_verified(user));
        Ok(())
    }
}
