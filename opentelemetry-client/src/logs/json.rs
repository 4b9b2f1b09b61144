//! Log exporter writing one JSON object per line.
use crate::error::{OTelSdkError, OTelSdkResult};
use crate::logs::{LogBatch, LogExporter, SdkLogRecord};
use crate::Resource;
use opentelemetry::logs::AnyValue;
use opentelemetry::{InstrumentationScope, Value};
use serde::Serialize;
use serde_json::{json, Map};
use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A [`LogExporter`] that writes every record as a single line of JSON.
///
/// Each line carries the timestamps (nanoseconds since the Unix epoch), the
/// severity, the body, the attributes, the trace context, the instrumentation
/// scope and the resource the record belongs to.
///
/// ```
/// use opentelemetry_client::logs::JsonLogExporter;
///
/// let exporter = JsonLogExporter::new(std::io::stdout());
/// # drop(exporter);
/// ```
pub struct JsonLogExporter<W> {
    writer: Mutex<W>,
    resource: Resource,
}

impl<W> fmt::Debug for JsonLogExporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLogExporter")
            .field("resource", &self.resource)
            .finish()
    }
}

impl<W: Write + Send> JsonLogExporter<W> {
    /// Create an exporter writing to `writer`.
    pub fn new(writer: W) -> Self {
        JsonLogExporter {
            writer: Mutex::new(writer),
            resource: Resource::builder_empty().build(),
        }
    }

    fn write_batch(&self, batch: &LogBatch<'_>) -> io::Result<()> {
        let resource = resource_to_json(&self.resource);
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "writer lock poisoned"))?;
        for (record, scope) in batch.iter() {
            serde_json::to_writer(&mut *writer, &JsonLogLine::new(record, scope, &resource))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl<W: Write + Send + 'static> LogExporter for JsonLogExporter<W> {
    async fn export(&self, batch: LogBatch<'_>) -> OTelSdkResult {
        self.write_batch(&batch)
            .map_err(|err| OTelSdkError::InternalFailure(format!("failed to write logs: {err}")))
    }

    async fn shutdown(&mut self) -> OTelSdkResult {
        let writer = self
            .writer
            .get_mut()
            .map_err(|_| OTelSdkError::InternalFailure("writer lock poisoned".into()))?;
        writer
            .flush()
            .map_err(|err| OTelSdkError::InternalFailure(format!("failed to flush logs: {err}")))
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.resource = resource.clone();
    }
}

#[derive(Serialize)]
struct JsonLogLine<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    time_unix_nano: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed_time_unix_nano: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity_number: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<serde_json::Value>,
    attributes: Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "is_zero")]
    dropped_attributes_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flags: Option<u8>,
    scope: JsonScope<'a>,
    resource: &'a Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct JsonScope<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
}

fn is_zero(count: &u32) -> bool {
    *count == 0
}

impl<'a> JsonLogLine<'a> {
    fn new(
        record: &'a SdkLogRecord,
        scope: &'a InstrumentationScope,
        resource: &'a Map<String, serde_json::Value>,
    ) -> Self {
        let trace_context = record.trace_context();
        JsonLogLine {
            time_unix_nano: record.timestamp().map(unix_nanos),
            observed_time_unix_nano: record.observed_timestamp().map(unix_nanos),
            severity_number: record.severity_number().map(|severity| severity as i32),
            severity_text: record
                .severity_text()
                .or_else(|| record.severity_number().map(|severity| severity.name())),
            event_name: record.event_name(),
            target: record.target().map(|target| &**target),
            body: record.body().map(any_value_to_json),
            attributes: record
                .attributes_iter()
                .map(|(key, value)| (key.as_str().to_owned(), any_value_to_json(value)))
                .collect(),
            dropped_attributes_count: record.dropped_attributes_count(),
            trace_id: trace_context.map(|context| context.trace_id.to_string()),
            span_id: trace_context.map(|context| context.span_id.to_string()),
            flags: trace_context
                .and_then(|context| context.trace_flags)
                .map(|flags| flags.to_u8()),
            scope: JsonScope {
                name: scope.name(),
                version: scope.version(),
            },
            resource,
        }
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn resource_to_json(resource: &Resource) -> Map<String, serde_json::Value> {
    resource
        .iter()
        .map(|(key, value)| (key.as_str().to_owned(), value_to_json(value)))
        .collect()
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Bool(b) => json!(b),
        Value::I64(i) => json!(i),
        Value::F64(f) => json!(f),
        other => json!(other.as_str()),
    }
}

fn any_value_to_json(value: &AnyValue) -> serde_json::Value {
    match value {
        AnyValue::Int(i) => json!(i),
        AnyValue::Double(d) => json!(d),
        AnyValue::String(s) => json!(s.as_str()),
        AnyValue::Boolean(b) => json!(b),
        AnyValue::Bytes(bytes) => json!(bytes.to_vec()),
        AnyValue::ListAny(list) => list.iter().map(any_value_to_json).collect(),
        AnyValue::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(key, value)| (key.as_str().to_owned(), any_value_to_json(value)))
                .collect(),
        ),
        _ => serde_json::Value::Null,
    }
}
