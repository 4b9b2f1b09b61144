//! Representations of entities producing telemetry.
//!
//! A [Resource] is an immutable representation of the entity producing
//! telemetry as attributes. For example, a process producing telemetry that is
//! running in a container on Kubernetes has a Pod name, it is in a namespace
//! and possibly is part of a Deployment which also has a name. All three of
//! these attributes can be included in the `Resource`. Note that there are
//! certain ["standard attributes"] that have prescribed meanings.
//!
//! Some attributes are only known after an asynchronous lookup. Such a
//! resource reports [`Resource::async_attributes_pending`] until the lookup has
//! been driven to completion with [`Resource::wait_for_async_attributes`].
//! Reading attributes before that point logs a diagnostic and only returns
//! the attributes that were known up front.
//!
//! ["standard attributes"]: https://github.com/open-telemetry/opentelemetry-specification/blob/v1.9.0/specification/resource/semantic_conventions/README.md
//!
//! # Resource detectors
//!
//! [`ResourceDetector`]s are used to detect resource from runtime or
//! environmental variables. The following are provided by default with this
//! SDK.
//!
//! - [`EnvResourceDetector`] - detect resource from environmental variables.
//! - [`TelemetryResourceDetector`] - detect telemetry SDK's information.
//! - [`SdkProvidedResourceDetector`] - detect `service.name`.
//!
//! A detector that fails contributes nothing; the failure is logged and the
//! remaining detectors still run.
pub mod attributes;
mod env;
mod telemetry;

pub use env::{parse_resource_attributes, EnvResourceDetector, SdkProvidedResourceDetector};
pub use telemetry::TelemetryResourceDetector;

use futures_util::future::{self, BoxFuture, FutureExt, Shared};
use opentelemetry::{otel_error, otel_warn, Key, KeyValue, Value};
use std::borrow::Cow;
use std::collections::{hash_map, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

type PendingAttributes = Shared<BoxFuture<'static, HashMap<Key, Value>>>;

/// Errors raised by [`ResourceDetector`]s.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ResourceError {
    /// An entry of an attribute list has no `=` separator.
    #[error("resource attribute entry {0:?} is not a key=value pair")]
    MissingSeparator(String),

    /// An attribute key is empty, too long or contains characters outside the
    /// allowed set.
    #[error("resource attribute key {0:?} must be printable ASCII without ',', ';' or '\\' and at most 255 characters")]
    InvalidKey(String),

    /// An attribute value is too long or contains characters outside the
    /// allowed set.
    #[error("value of resource attribute {key:?} must be printable ASCII without ',', ';' or '\\' and at most 255 characters")]
    InvalidValue {
        /// Key of the offending attribute.
        key: String,
    },

    /// An attribute value is not valid percent-encoded UTF-8.
    #[error("value of resource attribute {key:?} is not valid percent-encoded UTF-8")]
    InvalidEncoding {
        /// Key of the offending attribute.
        key: String,
    },

    /// Any other detection failure.
    #[error("resource detection failed: {0}")]
    Other(String),
}

/// An immutable representation of the entity producing telemetry as attributes.
/// Utilizes `Arc` for efficient sharing and cloning.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

struct ResourceInner {
    attrs: HashMap<Key, Value>,
    schema_url: Option<Cow<'static, str>>,
    // resolves to the complete attribute set, `attrs` included
    pending: Option<PendingAttributes>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("attrs", &self.inner.attrs)
            .field("schema_url", &self.inner.schema_url)
            .field("async_attributes_pending", &self.async_attributes_pending())
            .finish()
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.attributes() == other.attributes() && self.schema_url() == other.schema_url()
    }
}

impl Resource {
    /// Creates a [ResourceBuilder] that allows you to configure multiple aspects of the Resource.
    ///
    /// This [ResourceBuilder] will include the following [ResourceDetector]s:
    /// - [EnvResourceDetector]
    /// - [SdkProvidedResourceDetector]
    /// - [TelemetryResourceDetector]
    pub fn builder() -> ResourceBuilder {
        ResourceBuilder::default().with_detectors(&[
            Box::new(EnvResourceDetector::new()),
            Box::new(SdkProvidedResourceDetector),
            Box::new(TelemetryResourceDetector),
        ])
    }

    /// Creates a [ResourceBuilder] that allows you to configure multiple aspects of the Resource.
    ///
    /// This [ResourceBuilder] will not include any attributes.
    pub fn builder_empty() -> ResourceBuilder {
        ResourceBuilder::default()
    }

    /// Creates an empty resource.
    pub(crate) fn empty() -> Self {
        Resource::from_parts(HashMap::new(), None, None)
    }

    fn from_parts(
        attrs: HashMap<Key, Value>,
        schema_url: Option<Cow<'static, str>>,
        pending: Option<PendingAttributes>,
    ) -> Self {
        Resource {
            inner: Arc::new(ResourceInner {
                attrs,
                schema_url: schema_url.filter(|url| !url.is_empty()),
                pending,
            }),
        }
    }

    fn from_attributes<T: IntoIterator<Item = KeyValue>>(kvs: T) -> Self {
        let attrs = kvs.into_iter().map(|kv| (kv.key, kv.value)).collect();
        Resource::from_parts(attrs, None, None)
    }

    fn from_async_attributes<F>(attributes: F) -> Self
    where
        F: Future<Output = Vec<KeyValue>> + Send + 'static,
    {
        let pending = async move {
            attributes
                .await
                .into_iter()
                .map(|kv| (kv.key, kv.value))
                .collect::<HashMap<_, _>>()
        }
        .boxed()
        .shared();
        Resource::from_parts(HashMap::new(), None, Some(pending))
    }

    fn has_no_content(&self) -> bool {
        self.inner.attrs.is_empty() && self.inner.pending.is_none() && self.inner.schema_url.is_none()
    }

    /// Create a new `Resource` by combining two resources.
    ///
    /// ### Key value pairs
    /// When a key exists in both resources, the value of `self`, the receiver,
    /// is kept and the value of `other` is ignored. Asynchronous attributes of
    /// either side stay pending on the merged resource and follow the same
    /// rule once settled.
    ///
    /// ### [Schema url]
    /// The receiver's schema url is kept if it has one, otherwise the schema
    /// url of `other` is used.
    ///
    /// [Schema url]: https://github.com/open-telemetry/opentelemetry-specification/blob/v1.9.0/specification/schemas/overview.md#schema-url
    pub fn merge(&self, other: &Resource) -> Self {
        if other.has_no_content() {
            return self.clone();
        }
        if self.has_no_content() {
            return other.clone();
        }

        let mut attrs = other.inner.attrs.clone();
        attrs.extend(
            self.inner
                .attrs
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );

        let schema_url = self
            .inner
            .schema_url
            .clone()
            .or_else(|| other.inner.schema_url.clone());

        let pending = if self.inner.pending.is_some() || other.inner.pending.is_some() {
            let (receiver, other) = (self.clone(), other.clone());
            Some(
                async move {
                    let (mine, mut merged) =
                        future::join(receiver.settled_attributes(), other.settled_attributes())
                            .await;
                    merged.extend(mine);
                    merged
                }
                .boxed()
                .shared(),
            )
        } else {
            None
        };

        Resource::from_parts(attrs, schema_url, pending)
    }

    fn settled_attributes(&self) -> impl Future<Output = HashMap<Key, Value>> + Send + 'static {
        let pending = self.inner.pending.clone();
        let attrs = self.inner.attrs.clone();
        async move {
            match pending {
                Some(pending) => pending.await,
                None => attrs,
            }
        }
    }

    /// Whether some attributes of this resource are still being resolved.
    pub fn async_attributes_pending(&self) -> bool {
        self.inner
            .pending
            .as_ref()
            .is_some_and(|pending| pending.peek().is_none())
    }

    /// Drive the asynchronous attributes of this resource to completion.
    ///
    /// Resolves immediately for a resource without asynchronous attributes.
    /// Clones of this resource observe the settled attributes as well.
    pub fn wait_for_async_attributes(&self) -> impl Future<Output = ()> + Send + 'static {
        let pending = self.inner.pending.clone();
        async move {
            if let Some(pending) = pending {
                pending.await;
            }
        }
    }

    fn attributes(&self) -> &HashMap<Key, Value> {
        match &self.inner.pending {
            None => &self.inner.attrs,
            Some(pending) => match pending.peek() {
                Some(settled) => settled,
                None => {
                    otel_error!(
                        name: "Resource.AttributesReadBeforeSettled",
                        message = "Accessing resource attributes before async attributes settled. Await wait_for_async_attributes() first; only the synchronous attributes are returned."
                    );
                    &self.inner.attrs
                }
            },
        }
    }

    /// Returns the number of attributes for this resource
    pub fn len(&self) -> usize {
        self.attributes().len()
    }

    /// Returns `true` if the resource contains no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes().is_empty()
    }

    /// Gets an iterator over the attributes of this resource.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.attributes().iter())
    }

    /// Retrieve the value from resource associate with given key.
    pub fn get(&self, key: &Key) -> Option<Value> {
        self.attributes().get(key).cloned()
    }

    /// Returns the [schema url] of the resource, if any.
    ///
    /// [schema url]: https://github.com/open-telemetry/opentelemetry-specification/blob/v1.9.0/specification/schemas/overview.md#schema-url
    pub fn schema_url(&self) -> Option<&str> {
        self.inner.schema_url.as_deref()
    }
}

/// An iterator over the entries of a `Resource`.
#[derive(Debug)]
pub struct Iter<'a>(hash_map::Iter<'a, Key, Value>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl<'a> IntoIterator for &'a Resource {
    type Item = (&'a Key, &'a Value);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// ResourceDetector detects OpenTelemetry resource information
///
/// Implementations of this trait can be passed to
/// the [`ResourceBuilder::with_detectors`] function to generate a Resource from the merged information.
pub trait ResourceDetector: fmt::Debug + Send + Sync {
    /// detect returns an initialized Resource based on gathered information.
    ///
    /// If source information to construct a Resource is inaccessible, an empty
    /// Resource should be returned. An error means the source was present but
    /// could not be understood.
    fn detect(&self) -> Result<Resource, ResourceError>;
}

/// Builder for [Resource]
///
/// Every step is merged on top of the previous ones, so when two steps set the
/// same key the later one wins.
#[derive(Debug)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl Default for ResourceBuilder {
    fn default() -> Self {
        ResourceBuilder {
            resource: Resource::empty(),
        }
    }
}

impl ResourceBuilder {
    /// Add a single [ResourceDetector] to your resource.
    pub fn with_detector(self, detector: Box<dyn ResourceDetector>) -> Self {
        self.with_detectors(&[detector])
    }

    /// Add multiple [ResourceDetector]s to your resource.
    ///
    /// A detector returning an error is skipped.
    pub fn with_detectors(mut self, detectors: &[Box<dyn ResourceDetector>]) -> Self {
        for detector in detectors {
            match detector.detect() {
                Ok(detected) => self.resource = detected.merge(&self.resource),
                Err(err) => {
                    otel_warn!(
                        name: "ResourceDetector.Failed",
                        detector = format!("{detector:?}"),
                        error = format!("{err}")
                    );
                }
            }
        }
        self
    }

    /// Add a [KeyValue] to the resource.
    pub fn with_attribute(self, kv: KeyValue) -> Self {
        self.with_attributes([kv])
    }

    /// Add multiple [KeyValue]s to the resource.
    pub fn with_attributes<T: IntoIterator<Item = KeyValue>>(mut self, kvs: T) -> Self {
        self.resource = Resource::from_attributes(kvs).merge(&self.resource);
        self
    }

    /// Add the `service.name` attribute.
    pub fn with_service_name(self, name: impl Into<Value>) -> Self {
        self.with_attribute(KeyValue::new(attributes::SERVICE_NAME, name.into()))
    }

    /// Set the [schema url] of the resource.
    ///
    /// [schema url]: https://github.com/open-telemetry/opentelemetry-specification/blob/v1.9.0/specification/schemas/overview.md#schema-url
    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        let with_url = Resource::from_parts(HashMap::new(), Some(schema_url.into()), None);
        self.resource = with_url.merge(&self.resource);
        self
    }

    /// Add attributes that are only known once `attributes` resolves.
    ///
    /// The future is not polled until the resource is awaited with
    /// [`Resource::wait_for_async_attributes`], which the batch processors do
    /// before their first export.
    pub fn with_async_attributes<F>(mut self, attributes: F) -> Self
    where
        F: Future<Output = Vec<KeyValue>> + Send + 'static,
    {
        self.resource = Resource::from_async_attributes(attributes).merge(&self.resource);
        self
    }

    /// Create a [Resource] with the options provided to the [ResourceBuilder].
    pub fn build(self) -> Resource {
        self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::time::Duration;

    fn resource(kvs: impl IntoIterator<Item = KeyValue>) -> Resource {
        Resource::builder_empty().with_attributes(kvs).build()
    }

    #[test]
    fn merge_keeps_receiver_value_on_collision() {
        let a = resource([KeyValue::new("x", 1)]);
        let b = resource([KeyValue::new("x", 2), KeyValue::new("y", 3)]);

        let merged = b.merge(&a);

        assert_eq!(merged, resource([KeyValue::new("x", 2), KeyValue::new("y", 3)]));
        assert_eq!(a.merge(&b).get(&Key::new("x")), Some(Value::I64(1)));
    }

    #[test]
    fn merge_with_empty_resource_is_identity() {
        let a = resource([KeyValue::new("service.name", "api")]);
        assert_eq!(a.merge(&Resource::empty()), a);
        assert_eq!(Resource::empty().merge(&a), a);
    }

    #[test]
    fn merge_schema_url_prefers_receiver() {
        let with_url = |url: &'static str| {
            Resource::builder_empty()
                .with_attribute(KeyValue::new("k", "v"))
                .with_schema_url(url)
                .build()
        };
        let none = resource([KeyValue::new("k", "v")]);

        assert_eq!(
            with_url("http://a").merge(&with_url("http://b")).schema_url(),
            Some("http://a")
        );
        assert_eq!(none.merge(&with_url("http://b")).schema_url(), Some("http://b"));
        assert_eq!(with_url("").schema_url(), None);
    }

    #[test]
    fn builder_later_steps_override_earlier_ones() {
        let resource = Resource::builder_empty()
            .with_attribute(KeyValue::new("service.name", "first"))
            .with_service_name("second")
            .build();

        assert_eq!(
            resource.get(&Key::new(attributes::SERVICE_NAME)),
            Some(Value::from("second"))
        );
        assert_eq!(resource.len(), 1);
    }

    #[derive(Debug)]
    struct FailingDetector;

    impl ResourceDetector for FailingDetector {
        fn detect(&self) -> Result<Resource, ResourceError> {
            Err(ResourceError::Other("metadata endpoint unreachable".into()))
        }
    }

    #[derive(Debug)]
    struct StaticDetector;

    impl ResourceDetector for StaticDetector {
        fn detect(&self) -> Result<Resource, ResourceError> {
            Ok(resource([KeyValue::new("host.name", "node-1")]))
        }
    }

    #[test]
    fn failing_detector_contributes_nothing() {
        let resource = Resource::builder_empty()
            .with_detectors(&[Box::new(FailingDetector), Box::new(StaticDetector)])
            .build();

        assert_eq!(resource.len(), 1);
        assert_eq!(
            resource.get(&Key::new("host.name")),
            Some(Value::from("node-1"))
        );
    }

    #[test]
    fn reading_before_async_attributes_settle_returns_sync_attributes() {
        let resource = Resource::builder_empty()
            .with_attribute(KeyValue::new("service.name", "api"))
            .with_async_attributes(future::pending())
            .build();

        assert!(resource.async_attributes_pending());
        assert_eq!(resource.len(), 1);
        assert_eq!(resource.get(&Key::new("host.id")), None);
        assert!(resource.wait_for_async_attributes().now_or_never().is_none());
    }

    #[tokio::test]
    async fn async_attributes_settle_and_are_shared_by_clones() {
        let resource = Resource::builder_empty()
            .with_attribute(KeyValue::new("service.name", "api"))
            .with_async_attributes(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                vec![
                    KeyValue::new("host.id", "i-123"),
                    KeyValue::new("service.name", "from-metadata"),
                ]
            })
            .build();
        let clone = resource.clone();

        resource.wait_for_async_attributes().await;

        assert!(!clone.async_attributes_pending());
        assert_eq!(clone.get(&Key::new("host.id")), Some(Value::from("i-123")));
        // added after the sync attribute, so it wins
        assert_eq!(
            clone.get(&Key::new("service.name")),
            Some(Value::from("from-metadata"))
        );
    }

    #[tokio::test]
    async fn merge_keeps_receiver_precedence_for_async_attributes() {
        let receiver = resource([KeyValue::new("region", "eu")]);
        let other = Resource::builder_empty()
            .with_async_attributes(async {
                vec![KeyValue::new("region", "us"), KeyValue::new("zone", "b")]
            })
            .build();

        let merged = receiver.merge(&other);
        assert!(merged.async_attributes_pending());

        merged.wait_for_async_attributes().await;
        assert_eq!(merged.get(&Key::new("region")), Some(Value::from("eu")));
        assert_eq!(merged.get(&Key::new("zone")), Some(Value::from("b")));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn iterates_over_all_attributes() {
        let resource = resource([KeyValue::new("a", 1), KeyValue::new("b", true)]);
        let mut keys: Vec<_> = resource.iter().map(|(key, _)| key.as_str().to_owned()).collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!((&resource).into_iter().count(), 2);
    }
}
