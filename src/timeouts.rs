//! Timeout and poll-pacing configuration for gateway operations.
//!
//! Centralizes every duration the client uses: HTTP timeouts and the pacing
//! of the long-poll loop that drives statement results.

use std::time::Duration;

/// Timeout configuration for gateway-link operations.
///
/// # Examples
///
/// ```rust
/// use gateway_link::GatewayTimeouts;
/// use std::time::Duration;
///
/// // Defaults are suitable for most deployments
/// let timeouts = GatewayTimeouts::default();
///
/// // Custom pacing for a slow gateway
/// let timeouts = GatewayTimeouts::builder()
///     .request_timeout(Duration::from_secs(60))
///     .poll_interval(Duration::from_millis(500))
///     .build();
///
/// // Aggressive timeouts for local development
/// let timeouts = GatewayTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct GatewayTimeouts {
    /// Timeout for establishing connections (TCP + TLS handshake).
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Timeout for a single HTTP request/response round trip.
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Delay before re-fetching after the gateway reports a page is not
    /// ready yet. Default: 300 milliseconds
    pub poll_interval: Duration,

    /// Slice size for the inter-poll delay. The delay is waited in slices
    /// of this length so a cancellation request takes effect within one
    /// slice rather than after the full interval. Default: 50 milliseconds
    pub cancel_check_interval: Duration,
}

impl Default for GatewayTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(300),
            cancel_check_interval: Duration::from_millis(50),
        }
    }
}

impl GatewayTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> GatewayTimeoutsBuilder {
        GatewayTimeoutsBuilder::new()
    }

    /// Timeouts optimized for fast local development.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            cancel_check_interval: Duration::from_millis(10),
        }
    }

    /// Timeouts optimized for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            cancel_check_interval: Duration::from_millis(100),
        }
    }
}

/// Builder for creating custom [`GatewayTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct GatewayTimeoutsBuilder {
    timeouts: GatewayTimeouts,
}

impl GatewayTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: GatewayTimeouts::default(),
        }
    }

    /// Set the connection timeout (TCP + TLS handshake).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_timeout = timeout;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.request_timeout = timeout;
        self
    }

    /// Set the delay before re-fetching a not-ready result page.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.timeouts.poll_interval = interval;
        self
    }

    /// Set the cancellation check slice for the inter-poll delay.
    pub fn cancel_check_interval(mut self, interval: Duration) -> Self {
        self.timeouts.cancel_check_interval = interval;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> GatewayTimeouts {
        self.timeouts
    }
}
