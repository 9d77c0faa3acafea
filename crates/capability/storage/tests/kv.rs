use upsmon_storage::{InMemoryKvStore, KvOp, KvStore};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn set_ex_expires_after_clock_advance() {
    let kv = InMemoryKvStore::new();
    kv.set_ex("k", "v", 1800).await.expect("set_ex");
    assert_eq!(kv.get("k").await.expect("get"), Some("v".to_string()));

    kv.advance_secs(1799);
    assert_eq!(kv.get("k").await.expect("get"), Some("v".to_string()));

    kv.advance_secs(1);
    assert_eq!(kv.get("k").await.expect("get"), None);
}

#[tokio::test]
async fn plain_set_clears_expiry() {
    let kv = InMemoryKvStore::new();
    kv.set_ex("k", "v1", 10).await.expect("set_ex");
    kv.set("k", "v2").await.expect("set");
    kv.advance_secs(3600);
    assert_eq!(kv.get("k").await.expect("get"), Some("v2".to_string()));
}

#[tokio::test]
async fn lpush_orders_newest_first_and_ltrim_caps() {
    let kv = InMemoryKvStore::new();
    kv.lpush("log", &strings(&["a"])).await.expect("push");
    kv.lpush("log", &strings(&["b"])).await.expect("push");
    kv.lpush("log", &strings(&["c"])).await.expect("push");
    assert_eq!(
        kv.lrange("log", 0, -1).await.expect("range"),
        strings(&["c", "b", "a"])
    );

    kv.ltrim("log", 0, 1).await.expect("trim");
    assert_eq!(
        kv.lrange("log", 0, -1).await.expect("range"),
        strings(&["c", "b"])
    );
}

#[tokio::test]
async fn rpush_with_negative_trim_keeps_tail() {
    let kv = InMemoryKvStore::new();
    for i in 0..5 {
        kv.rpush("hist", &format!("e{}", i)).await.expect("push");
    }
    // 保留最后 3 条（ups:hist 的长度上限裁剪方式）
    kv.ltrim("hist", -3, -1).await.expect("trim");
    assert_eq!(
        kv.lrange("hist", 0, -1).await.expect("range"),
        strings(&["e2", "e3", "e4"])
    );
    assert_eq!(kv.lindex("hist", 0).await.expect("lindex"), Some("e2".to_string()));
    assert_eq!(kv.lindex("hist", -1).await.expect("lindex"), Some("e4".to_string()));
    assert_eq!(kv.lpop("hist").await.expect("lpop"), Some("e2".to_string()));
}

#[tokio::test]
async fn empty_trim_range_removes_key() {
    let kv = InMemoryKvStore::new();
    kv.rpush("hist", "e0").await.expect("push");
    kv.ltrim("hist", 5, 9).await.expect("trim");
    assert_eq!(kv.lrange("hist", 0, -1).await.expect("range"), Vec::<String>::new());
    assert_eq!(kv.scan_prefix("hist").await.expect("scan"), Vec::<String>::new());
}

#[tokio::test]
async fn incr_by_float_accumulates_and_keeps_expiry() {
    let kv = InMemoryKvStore::new();
    let first = kv.incr_by_float("energy", 1500.0).await.expect("incr");
    assert_eq!(first, 1500.0);
    kv.expire("energy", 60).await.expect("expire");
    let second = kv.incr_by_float("energy", 250.5).await.expect("incr");
    assert_eq!(second, 1750.5);

    kv.advance_secs(61);
    assert_eq!(kv.get("energy").await.expect("get"), None);
}

#[tokio::test]
async fn hash_set_and_read_back() {
    let kv = InMemoryKvStore::new();
    kv.hset_all(
        "bucket",
        &[
            ("minute".to_string(), "202601021530".to_string()),
            ("sum".to_string(), "600".to_string()),
            ("count".to_string(), "3".to_string()),
        ],
    )
    .await
    .expect("hset");
    let hash = kv.hgetall("bucket").await.expect("hgetall");
    assert_eq!(hash.get("minute").map(String::as_str), Some("202601021530"));
    assert_eq!(hash.len(), 3);
    assert!(kv.hgetall("missing").await.expect("hgetall").is_empty());
}

#[tokio::test]
async fn scan_prefix_filters_keys() {
    let kv = InMemoryKvStore::new();
    kv.rpush("ups:hist:a", "x").await.expect("push");
    kv.rpush("ups:hist:b", "x").await.expect("push");
    kv.set("ups:snap:a", "x").await.expect("set");
    let mut keys = kv.scan_prefix("ups:hist:").await.expect("scan");
    keys.sort();
    assert_eq!(keys, strings(&["ups:hist:a", "ups:hist:b"]));
}

#[tokio::test]
async fn multi_applies_batch_as_a_whole() {
    let kv = InMemoryKvStore::new();
    kv.multi(&[
        KvOp::HSetAll {
            key: "snap".to_string(),
            fields: vec![("STATUS".to_string(), "ONLINE".to_string())],
        },
        KvOp::RPush {
            key: "hist".to_string(),
            value: "e0".to_string(),
        },
        KvOp::LTrim {
            key: "hist".to_string(),
            start: -2,
            stop: -1,
        },
    ])
    .await
    .expect("multi");
    assert_eq!(
        kv.hgetall("snap").await.expect("hgetall").get("STATUS").map(String::as_str),
        Some("ONLINE")
    );
    assert_eq!(kv.lrange("hist", 0, -1).await.expect("range"), strings(&["e0"]));
}

#[tokio::test]
async fn wrong_type_access_is_an_error() {
    let kv = InMemoryKvStore::new();
    kv.set("k", "v").await.expect("set");
    let err = kv.lrange("k", 0, -1).await.expect_err("wrong type");
    assert_eq!(err.to_string(), "wrong type");
}
