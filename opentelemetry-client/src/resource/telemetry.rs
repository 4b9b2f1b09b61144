use crate::resource::attributes::{
    TELEMETRY_SDK_LANGUAGE, TELEMETRY_SDK_NAME, TELEMETRY_SDK_VERSION,
};
use crate::resource::{Resource, ResourceDetector, ResourceError};
use opentelemetry::KeyValue;

/// Detect the telemetry SDK information used to capture data recorded by the instrumentation libraries.
///
/// It provides:
/// - The name of the telemetry SDK(`telemetry.sdk.name`). It will be `opentelemetry`.
/// - The language of the telemetry SDK(`telemetry.sdk.language`). It will be `rust`.
/// - The version of the telemetry SDK(`telemetry.sdk.version`). It will be the current `opentelemetry-client` crate version.
///
/// See [semantic conventions](https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/resource/semantic_conventions/README.md#telemetry-sdk) for details.
#[derive(Debug)]
pub struct TelemetryResourceDetector;

impl ResourceDetector for TelemetryResourceDetector {
    fn detect(&self) -> Result<Resource, ResourceError> {
        Ok(Resource::builder_empty()
            .with_attributes([
                KeyValue::new(TELEMETRY_SDK_NAME, "opentelemetry"),
                KeyValue::new(TELEMETRY_SDK_LANGUAGE, "rust"),
                KeyValue::new(TELEMETRY_SDK_VERSION, env!("CARGO_PKG_VERSION")),
            ])
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::TelemetryResourceDetector;
    use crate::resource::ResourceDetector;
    use opentelemetry::{Key, Value};

    #[test]
    fn detects_sdk_identity() {
        let resource = TelemetryResourceDetector.detect().unwrap();
        assert_eq!(resource.len(), 3);
        assert_eq!(
            resource.get(&Key::from_static_str("telemetry.sdk.language")),
            Some(Value::from("rust"))
        );
    }
}
