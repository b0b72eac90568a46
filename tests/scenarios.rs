//! End-to-end behaviour of the cache through its public API.

use blitzcache::storage::{Cache, CacheConfig, ConfigError};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[tokio::test]
async fn walkthrough_set_expire_delete_stats() {
    let cache = Cache::new(4);

    // A key without TTL
    cache.set("a", "1", Duration::ZERO);
    assert_eq!(cache.get(b"a").as_deref(), Some(&b"1"[..]));

    // A key that outlives its TTL
    cache.set("b", "x", Duration::from_millis(150));
    sleep(Duration::from_millis(400)).await;
    assert_eq!(cache.get(b"b"), None);

    // An explicit delete
    cache.set("c", "y", Duration::ZERO);
    assert!(cache.delete(b"c"));
    assert_eq!(cache.get(b"c"), None);

    let stats = cache.stats();
    assert_eq!(stats.sets, 3);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.get("keys"), Some(1));

    cache.close();
}

#[tokio::test]
async fn ttl_beyond_horizon_fires_at_horizon() {
    let tick = Duration::from_millis(50);
    let horizon = Duration::from_millis(500);
    let cache = Cache::with_config(CacheConfig {
        shard_count: 4,
        tick_duration: tick,
        wheel_horizon: horizon,
    })
    .unwrap();

    let start = Instant::now();
    cache.set("d", "z", horizon * 2);

    sleep_until(start + horizon - tick * 2).await;
    assert_eq!(cache.count(), 1, "key removed before the horizon");
    assert!(cache.get(b"d").is_some());

    sleep_until(start + horizon + tick * 4).await;
    assert_eq!(cache.count(), 0, "key not removed at the horizon");
    assert_eq!(cache.stats().evictions, 1);

    cache.close();
}

async fn sleep_until(deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
}

#[tokio::test]
async fn expired_keys_leave_without_being_read() {
    let cache = Cache::with_config(CacheConfig {
        shard_count: 8,
        tick_duration: Duration::from_millis(10),
        ..Default::default()
    })
    .unwrap();

    for i in 0..100 {
        cache.set(format!("temp:{}", i), "v", Duration::from_millis(50));
    }
    cache.set("keep", "v", Duration::ZERO);
    assert_eq!(cache.count(), 101);

    sleep(Duration::from_millis(300)).await;

    let stats = cache.stats();
    assert_eq!(stats.keys, 1);
    assert_eq!(stats.evictions, 100);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.deletes, 0);
}

#[tokio::test]
async fn overwrite_with_longer_ttl_is_not_cut_short() {
    let cache = Cache::with_config(CacheConfig {
        shard_count: 4,
        tick_duration: Duration::from_millis(10),
        ..Default::default()
    })
    .unwrap();

    let v1 = cache.set("k", "short", Duration::from_millis(50));
    let v2 = cache.set("k", "long", Duration::from_secs(30));
    assert!(v2 > v1);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(cache.get(b"k").as_deref(), Some(&b"long"[..]));
    assert_eq!(cache.stats().evictions, 0);
}

#[tokio::test]
async fn flush_keeps_counters() {
    let cache = Cache::new(16);
    for i in 0..50 {
        cache.set(format!("k{}", i), "v", Duration::ZERO);
    }

    cache.flush();

    assert_eq!(cache.count(), 0);
    assert_eq!(cache.get(b"k0"), None);
    let stats = cache.stats();
    assert_eq!(stats.sets, 50);
    assert_eq!(stats.keys, 0);
}

#[tokio::test]
async fn delete_of_missing_key_is_not_counted() {
    let cache = Cache::new(4);
    assert!(!cache.delete(b"ghost"));
    assert_eq!(cache.stats().deletes, 0);
}

#[tokio::test]
async fn close_is_idempotent() {
    let cache = Cache::new(4);
    cache.close();
    cache.close();
    assert!(cache.is_closed());

    // Storage still works without the ticker
    cache.set("a", "1", Duration::ZERO);
    assert!(cache.get(b"a").is_some());
}

#[test]
fn invalid_config_is_rejected_before_anything_starts() {
    let err = Cache::with_config(CacheConfig {
        tick_duration: Duration::ZERO,
        ..Default::default()
    })
    .unwrap_err();
    assert_eq!(err, ConfigError::ZeroTick);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_workers_on_disjoint_keys() {
    let cache = Arc::new(Cache::new(32));

    let tasks: Vec<_> = (0..8)
        .map(|worker| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                for i in 0..1_000 {
                    let key = format!("w{}:{}", worker, i);
                    cache.set(key.clone(), "v", Duration::ZERO);
                    assert!(cache.get(key.as_bytes()).is_some());
                    // Every fourth key is removed again
                    if i % 4 == 0 {
                        assert!(cache.delete(key.as_bytes()));
                    }
                }
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    let stats = cache.stats();
    assert_eq!(stats.keys, 8 * 750);
    assert_eq!(stats.sets, 8 * 1_000);
    assert_eq!(stats.deletes, 8 * 250);
    assert_eq!(stats.hits, 8 * 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_writers_on_one_key_get_gapless_versions() {
    const WORKERS: usize = 8;
    const WRITES: usize = 500;

    let cache = Cache::new(4);

    let mut writes: Vec<(u64, String)> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let cache = &cache;
                s.spawn(move || {
                    (0..WRITES)
                        .map(|i| {
                            let value = format!("{}:{}", worker, i);
                            let version = cache.set("shared", value.clone(), Duration::ZERO);
                            (version, value)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    writes.sort_by_key(|(version, _)| *version);
    let versions: Vec<u64> = writes.iter().map(|(version, _)| *version).collect();
    let expected: Vec<u64> = (1..=(WORKERS * WRITES) as u64).collect();
    assert_eq!(versions, expected);

    assert_eq!(cache.count(), 1);

    // Last write wins: the stored value is the one with the highest version
    let (_, last) = writes.last().unwrap();
    assert_eq!(cache.get(b"shared").as_deref(), Some(last.as_bytes()));
    assert_eq!(cache.stats().sets, (WORKERS * WRITES) as u64);
}
