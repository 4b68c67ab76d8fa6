use std::env;
use tracing::warn;

/// Runtime configuration for the booking core, read from the environment.
/// Every value has a working default so tests and local runs need no setup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Locale used when a notification template is missing for the requested one.
    pub default_locale: String,
    /// Upper bound for a single notification channel call, in milliseconds.
    pub channel_timeout_ms: u64,
    /// Maximum pending/confirmed appointments a patient may hold on one day.
    pub max_appointments_per_patient_per_day: i32,
}

impl CoreConfig {
    pub fn from_env() -> Self {
        Self {
            default_locale: env::var("BOOKING_DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            channel_timeout_ms: env::var("BOOKING_CHANNEL_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(|| {
                    warn!("BOOKING_CHANNEL_TIMEOUT_MS not set or invalid, using 500");
                    500
                }),
            max_appointments_per_patient_per_day: env::var("BOOKING_MAX_DAILY_APPOINTMENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            channel_timeout_ms: 500,
            max_appointments_per_patient_per_day: 3,
        }
    }
}
