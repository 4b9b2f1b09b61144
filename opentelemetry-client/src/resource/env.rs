//! Environment variables resource detector
//!
//! Implementation of `ResourceDetector` to extract a `Resource` from environment
//! variables.
use crate::resource::attributes::{SERVICE_NAME, UNKNOWN_SERVICE};
use crate::resource::{Resource, ResourceDetector, ResourceError};
use opentelemetry::{otel_debug, Key, KeyValue, Value};
use percent_encoding::percent_decode_str;
use std::env;

const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

const MAX_LENGTH: usize = 255;

/// EnvResourceDetector extract resource from environment variable
/// `OTEL_RESOURCE_ATTRIBUTES`. See [OpenTelemetry Resource
/// Spec](https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/resource/sdk.md#specifying-resource-information-via-an-environment-variable)
/// for details.
///
/// The variable holds a comma separated list of `key=value` pairs. Values may
/// be wrapped in double quotes and are percent-decoded. An entry with more
/// than one `=` is skipped. An entry without `=`, or with a key or value
/// outside the printable ASCII set, makes the whole variable invalid.
#[derive(Debug)]
pub struct EnvResourceDetector {
    _private: (),
}

impl ResourceDetector for EnvResourceDetector {
    fn detect(&self) -> Result<Resource, ResourceError> {
        match env::var(OTEL_RESOURCE_ATTRIBUTES) {
            Ok(s) if !s.trim().is_empty() => Ok(Resource::builder_empty()
                .with_attributes(parse_resource_attributes(&s)?)
                .build()),
            Ok(_) | Err(_) => Ok(Resource::empty()), // return empty resource
        }
    }
}

impl EnvResourceDetector {
    /// Create `EnvResourceDetector` instance.
    pub fn new() -> Self {
        EnvResourceDetector { _private: () }
    }
}

impl Default for EnvResourceDetector {
    fn default() -> Self {
        EnvResourceDetector::new()
    }
}

/// Parse a `key1=value1,key2=value2` list, as found in
/// `OTEL_RESOURCE_ATTRIBUTES`, into attributes.
///
/// Blank entries and entries with more than one `=` are skipped. Values are
/// trimmed, stripped of surrounding double quotes and percent-decoded. An
/// entry without `=`, or a key or value outside printable ASCII (excluding
/// `,`, `;` and `\`) or longer than 255 characters, rejects the whole list.
///
/// ```
/// use opentelemetry_client::resource::parse_resource_attributes;
///
/// let attributes = parse_resource_attributes("a=1, b=2").unwrap();
/// assert_eq!(attributes.len(), 2);
/// assert!(parse_resource_attributes("a=1,bad").is_err());
/// ```
pub fn parse_resource_attributes(raw: &str) -> Result<Vec<KeyValue>, ResourceError> {
    let mut attributes = Vec::new();

    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let Some((key, value)) = entry.split_once('=') else {
            return Err(ResourceError::MissingSeparator(entry.to_owned()));
        };
        if value.contains('=') {
            otel_debug!(
                name: "EnvResourceDetector.EntrySkipped",
                reason = "more than one '=' in entry",
                key = key.trim().to_owned()
            );
            continue;
        }

        let key = key.trim();
        if key.is_empty() || !is_valid(key) {
            return Err(ResourceError::InvalidKey(key.to_owned()));
        }

        let value = unquote(value.trim());
        if !is_valid(value) {
            return Err(ResourceError::InvalidValue {
                key: key.to_owned(),
            });
        }
        let value = percent_decode_str(value)
            .decode_utf8()
            .map_err(|_| ResourceError::InvalidEncoding {
                key: key.to_owned(),
            })?;

        attributes.push(KeyValue::new(key.to_owned(), value.into_owned()));
    }

    Ok(attributes)
}

fn unquote(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

// printable ASCII without separators, at most 255 characters
fn is_valid(s: &str) -> bool {
    s.len() <= MAX_LENGTH
        && s.bytes()
            .all(|b| (0x21..=0x7e).contains(&b) && !matches!(b, b',' | b';' | b'\\'))
}

/// There are attributes which MUST be provided by the SDK as specified in
/// [the Resource SDK specification]. This detector detects those attributes and
/// if the attribute cannot be detected, it uses the default value.
///
/// This detector will first try `OTEL_SERVICE_NAME` env. If it's not available,
/// then it will check the `OTEL_RESOURCE_ATTRIBUTES` env and see if it contains
/// `service.name` resource. If it's also not available, it will use `unknown_service`.
///
/// [the Resource SDK specification]:https://github.com/open-telemetry/opentelemetry-specification/blob/main/specification/resource/sdk.md#sdk-provided-resource-attributes
#[derive(Debug)]
pub struct SdkProvidedResourceDetector;

impl ResourceDetector for SdkProvidedResourceDetector {
    fn detect(&self) -> Result<Resource, ResourceError> {
        let service_name = env::var(OTEL_SERVICE_NAME)
            .ok()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .map(Value::from)
            .or_else(|| {
                EnvResourceDetector::new()
                    .detect()
                    .ok()
                    .and_then(|resource| resource.get(&Key::from_static_str(SERVICE_NAME)))
            })
            .unwrap_or_else(|| UNKNOWN_SERVICE.into());

        Ok(Resource::builder_empty()
            .with_attribute(KeyValue::new(SERVICE_NAME, service_name))
            .build())
    }
}
