//! Rate limiting for observer connections

use std::num::NonZeroU32;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};

/// Max client messages per second per connection
pub const CLIENT_MSG_RATE_LIMIT: u32 = 30;

/// Token bucket owned by one connection's reader loop
pub struct ConnectionRateLimiter {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ConnectionRateLimiter {
    /// A zero rate is raised to one message per second
    pub fn per_second(messages: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(messages).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Consume one message worth of quota; false means drop the message
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::per_second(CLIENT_MSG_RATE_LIMIT)
    }
}
