//! Validator construction with per-keyword memoization.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::equivalence::Equivalent;
use crate::error::ProcessingError;
use crate::keyword::{KeywordDescriptor, KeywordValidator};

type Slot = Arc<OnceCell<Arc<dyn KeywordValidator>>>;

/// Validators built so far, one table per keyword, keyed by digest.
///
/// A digest is built at most once: concurrent requests for the same digest
/// wait on one slot and observe the same validator. A failed construction
/// leaves its slot empty, so a later request tries again.
#[derive(Debug)]
pub struct ValidatorCache {
    tables: HashMap<String, DashMap<Equivalent, Slot>>,
}

impl ValidatorCache {
    /// Empty cache with a table for every validating keyword of `dialect`.
    pub fn new(dialect: &Dialect) -> Self {
        let tables = dialect
            .descriptors()
            .map(|d| (d.name().to_string(), DashMap::new()))
            .collect();
        Self { tables }
    }

    /// The validator for `digest`, built by `descriptor` on first request.
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::UnknownKeyword` when the keyword has no
    /// table, or the factory's `ProcessingError::Construction`.
    pub fn build(
        &self,
        descriptor: &KeywordDescriptor,
        digest: &Value,
    ) -> Result<Arc<dyn KeywordValidator>, ProcessingError> {
        let table = self
            .tables
            .get(descriptor.name())
            .ok_or_else(|| ProcessingError::UnknownKeyword {
                keyword: descriptor.name().to_string(),
            })?;
        // Take the slot out of the map before building: the factory must not
        // run while a shard lock is held.
        let slot = Arc::clone(table.entry(Equivalent(digest.clone())).or_default().value());
        slot.get_or_try_init(|| {
            debug!(keyword = descriptor.name(), %digest, "building validator");
            descriptor.build(digest).map_err(|e| {
                warn!(keyword = descriptor.name(), error = %e, "validator construction failed");
                e
            })
        })
        .map(Arc::clone)
    }

    /// Number of validators built.
    pub fn len(&self) -> usize {
        self.tables
            .values()
            .map(|table| table.iter().filter(|slot| slot.value().get().is_some()).count())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::Keyword;
    use crate::processor::{FullData, ValidationContext};
    use crate::report::ProcessingReport;
    use crate::types::NodeTypeSet;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Noop;

    impl KeywordValidator for Noop {
        fn validate(&self, _: &mut ValidationContext<'_>, _: &mut ProcessingReport, _: &FullData<'_>) {}
    }

    fn counting(name: &str, counter: Arc<AtomicUsize>) -> KeywordDescriptor {
        Keyword::new(name)
            .with_validator(
                NodeTypeSet::ALL,
                |schema| schema.clone(),
                move |digest| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if digest.get("fail").is_some() {
                        return Err(ProcessingError::Construction {
                            keyword: "counting".into(),
                            message: "asked to fail".into(),
                        });
                    }
                    Ok(Noop)
                },
            )
            .descriptor()
            .cloned()
            .unwrap()
    }

    fn cache_for(descriptor: &KeywordDescriptor) -> ValidatorCache {
        let dialect = crate::dialect::DialectBuilder::new("urn:test")
            .keyword(Keyword::new(descriptor.name()).with_validator(
                descriptor.kinds(),
                |v| v.clone(),
                |_| Ok(Noop),
            ))
            .build();
        ValidatorCache::new(&dialect)
    }

    #[test]
    fn equivalent_digests_share_one_validator() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = counting("counting", Arc::clone(&counter));
        let cache = cache_for(&descriptor);

        let one: Value = serde_json::from_str(r#"{"n": 1}"#).unwrap();
        let other: Value = serde_json::from_str(r#"{"n": 1.0}"#).unwrap();
        let a = cache.build(&descriptor, &one).unwrap();
        let b = cache.build(&descriptor, &other).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = counting("counting", Arc::clone(&counter));
        let cache = cache_for(&descriptor);

        let bad = json!({"fail": true});
        assert!(cache.build(&descriptor, &bad).is_err());
        assert!(cache.build(&descriptor, &bad).is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn unknown_keyword() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = counting("counting", counter);
        let cache = ValidatorCache::new(&crate::dialect::DialectBuilder::new("urn:empty").build());
        assert!(matches!(
            cache.build(&descriptor, &json!({})),
            Err(ProcessingError::UnknownKeyword { .. })
        ));
    }

    #[test]
    fn concurrent_builds_run_the_factory_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let descriptor = counting("counting", Arc::clone(&counter));
        let cache = cache_for(&descriptor);
        let digest = json!({"shared": [1, 2, 3]});

        let built: Vec<Arc<dyn KeywordValidator>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.build(&descriptor, &digest).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(built.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
