//! Resource attribute keys set by this crate.

/// Logical name of the service.
pub const SERVICE_NAME: &str = "service.name";

/// The name of the telemetry SDK.
pub const TELEMETRY_SDK_NAME: &str = "telemetry.sdk.name";

/// The language of the telemetry SDK.
pub const TELEMETRY_SDK_LANGUAGE: &str = "telemetry.sdk.language";

/// The version string of the telemetry SDK.
pub const TELEMETRY_SDK_VERSION: &str = "telemetry.sdk.version";

/// Fallback `service.name` when none is configured.
pub(crate) const UNKNOWN_SERVICE: &str = "unknown_service";
