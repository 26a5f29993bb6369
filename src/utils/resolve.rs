// src/utils/resolve.rs - Generic cache-or-compute resolution
//
// Both cache-then-enrich sites in this crate (venue geocoding and the
// registry's get-or-create master path) go through this one helper so the
// two call sites cannot drift apart.
use anyhow::Result;
use std::future::Future;

/// A resolved value plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<V> {
    pub value: V,
    pub from_cache: bool,
}

/// Normalize a raw key, try the cache, and fall back to computing and
/// storing the value. `store` runs only on a cache miss.
pub async fn resolve_with_cache<RK, K, V, N, L, LFut, C, CFut, S, SFut>(
    raw_key: RK,
    normalize: N,
    lookup: L,
    compute: C,
    store: S,
) -> Result<Resolved<V>>
where
    K: Clone,
    V: Clone,
    N: FnOnce(&RK) -> K,
    L: FnOnce(K) -> LFut,
    LFut: Future<Output = Result<Option<V>>>,
    C: FnOnce(K) -> CFut,
    CFut: Future<Output = Result<V>>,
    S: FnOnce(K, V) -> SFut,
    SFut: Future<Output = Result<()>>,
{
    let key = normalize(&raw_key);

    if let Some(value) = lookup(key.clone()).await? {
        return Ok(Resolved {
            value,
            from_cache: true,
        });
    }

    let value = compute(key.clone()).await?;
    store(key, value.clone()).await?;

    Ok(Resolved {
        value,
        from_cache: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn test_hit_skips_compute_and_store() {
        let cache = Mutex::new(HashMap::from([("k".to_string(), 7u32)]));
        let computes = AtomicUsize::new(0);
        let cache_ref = &cache;
        let computes_ref = &computes;

        let resolved = resolve_with_cache(
            "K",
            |raw: &&str| raw.to_lowercase(),
            |key| async move { Ok(cache_ref.lock().await.get(&key).copied()) },
            |_key| async move {
                computes_ref.fetch_add(1, Ordering::SeqCst);
                Ok(99u32)
            },
            |key, value| async move {
                cache_ref.lock().await.insert(key, value);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(resolved.value, 7);
        assert!(resolved.from_cache);
        assert_eq!(computes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_computes_and_stores() {
        let cache: Mutex<HashMap<String, u32>> = Mutex::new(HashMap::new());
        let cache_ref = &cache;

        let resolved = resolve_with_cache(
            "K",
            |raw: &&str| raw.to_lowercase(),
            |key| async move { Ok(cache_ref.lock().await.get(&key).copied()) },
            |_key| async move { Ok(42u32) },
            |key, value| async move {
                cache_ref.lock().await.insert(key, value);
                Ok(())
            },
        )
        .await
        .unwrap();

        assert_eq!(resolved.value, 42);
        assert!(!resolved.from_cache);
        assert_eq!(cache.lock().await.get("k"), Some(&42));
    }

    #[tokio::test]
    async fn test_compute_error_propagates_without_store() {
        let cache: Mutex<HashMap<String, u32>> = Mutex::new(HashMap::new());
        let cache_ref = &cache;

        let result = resolve_with_cache(
            "K",
            |raw: &&str| raw.to_lowercase(),
            |key| async move { Ok(cache_ref.lock().await.get(&key).copied()) },
            |_key| async move { anyhow::bail!("vendor down") },
            |key, value: u32| async move {
                cache_ref.lock().await.insert(key, value);
                Ok(())
            },
        )
        .await;

        assert!(result.is_err());
        assert!(cache.lock().await.is_empty());
    }
}
