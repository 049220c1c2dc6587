#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use crate::clock::vector::VectorClock;
    use crate::storage::causal::CausalStore;
    use crate::storage::protocol::{clean_payload, MethodReply, ReplicaTransmit};
    use crate::storage::types::{CausalContext, GetStatus, PutStatus, Version};

    fn clock_of(pairs: &[(u32, u32)]) -> VectorClock {
        let mut clock = VectorClock::new();
        for &(identifier, count) in pairs {
            clock = clock.add(identifier, count).0;
        }
        clock
    }

    fn payload_of(pairs: &[(u32, u32)], key: &str) -> String {
        serde_json::to_string(&CausalContext {
            clock: clock_of(pairs),
            key: key.to_string(),
        })
        .unwrap()
    }

    fn version(data: &str) -> Version {
        Version::new(data, Utc::now())
    }

    fn version_at(data: &str, timestamp: DateTime<Utc>) -> Version {
        Version::new(data, timestamp)
    }

    // ============================================================
    // PUT / GET SCENARIOS
    // ============================================================

    #[test]
    fn test_linear_chain_on_single_shard() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (first, echo_first, status) = store.put("a", version("1"), zero.as_bytes(), 0);
        assert_eq!(status, PutStatus::Added);
        assert_eq!(first.unwrap().clock.get(0), 1);

        let (second, echo_second, status) =
            store.put("a", version("2"), echo_first.as_bytes(), 0);
        assert_eq!(status, PutStatus::Replaced);
        assert_eq!(second.unwrap().clock.get(0), 2);

        // Compaction collapses the chain to its newest version.
        store.garbage_collect();

        let (value, _, status) = store.get("a", echo_second.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "2");

        // A reader still carrying the older context sees the newer value.
        let (value, _, status) = store.get("a", echo_first.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "2");
    }

    #[test]
    fn test_get_prefers_equal_over_larger() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo_first, _) = store.put("a", version("1"), zero.as_bytes(), 0);
        store.put("a", version("2"), echo_first.as_bytes(), 0);

        // Before compaction both versions coexist; the exact match wins.
        let (value, _, status) = store.get("a", echo_first.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "1");
    }

    #[test]
    fn test_get_echoes_served_clock() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo, _) = store.put("a", version("1"), zero.as_bytes(), 0);
        let (_, returned, _) = store.get("a", echo.as_bytes());

        let context: CausalContext = serde_json::from_str(&returned).unwrap();
        assert_eq!(context.key, "a");
        assert_eq!(context.clock.get(0), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let store = CausalStore::new();
        let (_, _, status) = store.get("nothing", payload_of(&[(0, 0)], "").as_bytes());
        assert_eq!(status, GetStatus::NotFound);
    }

    #[test]
    fn test_get_diverged_context() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0), (1, 0)], "");
        store.put("k", version("A"), zero.as_bytes(), 0);

        // A context that advanced along the other shard's coordinate is
        // unrelated to the stored {0:1}.
        let diverged = payload_of(&[(1, 3)], "k");
        let (_, _, status) = store.get("k", diverged.as_bytes());
        assert_eq!(status, GetStatus::Diverged);
    }

    #[test]
    fn test_get_old_context_is_served() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");
        store.put("k", version("A"), zero.as_bytes(), 0);

        // The reader is ahead of the store; the stored version is older but
        // still the best on offer.
        let ahead = payload_of(&[(0, 9)], "k");
        let (value, _, status) = store.get("k", ahead.as_bytes());
        assert_eq!(status, GetStatus::Old);
        assert_eq!(value.unwrap().data, "A");
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");
        store.put("k", version("A"), zero.as_bytes(), 0);

        let (_, _, status) = store.get("k", b"not json");
        assert_eq!(status, GetStatus::Err);
        let (_, _, status) = store.get("k", b"");
        assert_eq!(status, GetStatus::Err);

        let (_, _, status) = store.put("k", version("B"), b"not json", 0);
        assert_eq!(status, PutStatus::Err);

        assert!(!store.delete("k", b"not json"));
        assert!(!store.delete("missing", zero.as_bytes()));
    }

    // ============================================================
    // CONCURRENT SIBLINGS & COMPACTION
    // ============================================================

    #[test]
    fn test_concurrent_siblings_coexist_until_gc() {
        let store = CausalStore::new();
        let base = Utc::now();
        let zero = payload_of(&[(0, 0), (1, 0)], "");

        // Two partitioned writers, one per shard coordinate.
        store.put("k", version_at("A", base), zero.as_bytes(), 0);
        store.put(
            "k",
            version_at("B", base + Duration::seconds(3)),
            zero.as_bytes(),
            1,
        );
        assert_eq!(store.version_count(), 2);

        // A zero-context reader gets one of the siblings.
        let (value, _, status) = store.get("k", zero.as_bytes());
        assert_eq!(status, GetStatus::Found);
        let data = value.unwrap().data;
        assert!(data == "A" || data == "B");

        // Compaction resolves unrelated siblings by recency.
        store.garbage_collect();
        assert_eq!(store.version_count(), 1);
        let (value, _, status) = store.get("k", zero.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "B");
    }

    #[test]
    fn test_gc_timestamp_tie_drops_first_inserted() {
        let store = CausalStore::new();
        let instant = Utc::now();
        let zero = payload_of(&[(0, 0), (1, 0)], "");

        store.put("k", version_at("first", instant), zero.as_bytes(), 0);
        store.put("k", version_at("second", instant), zero.as_bytes(), 1);

        store.garbage_collect();
        let (value, _, _) = store.get("k", zero.as_bytes());
        assert_eq!(value.unwrap().data, "second");
    }

    #[test]
    fn test_gc_keeps_causally_dominant_version() {
        let store = CausalStore::new();
        let base = Utc::now();
        let zero = payload_of(&[(0, 0)], "");

        // The dominated version has the newer wall clock; causality must
        // still win.
        let (_, echo, _) = store.put(
            "k",
            version_at("old", base + Duration::seconds(60)),
            zero.as_bytes(),
            0,
        );
        store.put("k", version_at("new", base), echo.as_bytes(), 0);

        store.garbage_collect();
        assert_eq!(store.version_count(), 1);
        let (value, _, _) = store.get("k", zero.as_bytes());
        assert_eq!(value.unwrap().data, "new");
    }

    #[test]
    fn test_buckets_converge_to_one_version_after_gc() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0), (1, 0)], "");

        for round in 0..5u32 {
            let writer = round % 2;
            store.put("x", version(&format!("x{}", round)), zero.as_bytes(), writer);
            store.put("y", version(&format!("y{}", round)), zero.as_bytes(), writer);
        }
        store.delete("x", zero.as_bytes());
        assert!(store.version_count() > store.key_count());

        store.garbage_collect();
        assert!(store.version_count() <= store.key_count());
    }

    // ============================================================
    // AVAILABILITY
    // ============================================================

    #[test]
    fn test_unmet_dependency_hides_version() {
        // A replica that never received the version of "a" this write
        // depends on must not serve it.
        let store = CausalStore::new();
        let depends_on_a = payload_of(&[(0, 1)], "a");
        store.put("b", version("2"), depends_on_a.as_bytes(), 1);

        let zero = payload_of(&[(0, 0), (1, 0)], "");
        let (_, _, status) = store.get("b", zero.as_bytes());
        assert_eq!(status, GetStatus::NotFound);
    }

    #[test]
    fn test_availability_is_transitive() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo_a, _) = store.put("a", version("1"), zero.as_bytes(), 0);
        let (_, echo_b, _) = store.put("b", version("2"), echo_a.as_bytes(), 0);
        let (value, _, _) = store.put("c", version("3"), echo_b.as_bytes(), 0);

        assert!(store.is_available(&value.unwrap()));
        let (got, _, status) = store.get("c", zero.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(got.unwrap().data, "3");
    }

    #[test]
    fn test_availability_breaks_without_chain_root() {
        // Same chain as above, but the root "a" never arrived here.
        let store = CausalStore::new();
        let depends_on_a = payload_of(&[(0, 1)], "a");
        let (_, echo_b, _) = store.put("b", version("2"), depends_on_a.as_bytes(), 0);
        store.put("c", version("3"), echo_b.as_bytes(), 0);

        let zero = payload_of(&[(0, 0)], "");
        let (_, _, status) = store.get("c", zero.as_bytes());
        assert_eq!(status, GetStatus::NotFound);
    }

    // ============================================================
    // DELETE
    // ============================================================

    #[test]
    fn test_delete_rewrites_dependencies() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo_a, _) = store.put("a", version("1"), zero.as_bytes(), 0);
        store.put("b", version("2"), echo_a.as_bytes(), 0);

        assert!(store.delete("a", payload_of(&[(0, 1)], "a").as_bytes()));

        // The version on "b" now depends on what "a" depended on (nothing),
        // so it stays reachable.
        let (value, _, status) = store.get("b", zero.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "2");

        let (_, _, status) = store.get("a", zero.as_bytes());
        assert_eq!(status, GetStatus::NotFound);
    }

    #[test]
    fn test_delete_preserves_concurrent_and_newer_siblings() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0), (1, 0)], "");

        let (_, echo_old, _) = store.put("k", version("old"), zero.as_bytes(), 0);
        let (_, echo_new, _) = store.put("k", version("new"), echo_old.as_bytes(), 0);
        store.put("k", version("side"), zero.as_bytes(), 1);

        // Tombstone at {0:1} removes only the version it covers.
        assert!(store.delete("k", payload_of(&[(0, 1)], "k").as_bytes()));
        assert_eq!(store.version_count(), 2);

        let (value, _, status) = store.get("k", echo_new.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "new");
    }

    #[test]
    fn test_delete_removes_covered_history() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo_first, _) = store.put("k", version("1"), zero.as_bytes(), 0);
        let (_, echo_second, _) = store.put("k", version("2"), echo_first.as_bytes(), 0);

        // Tombstone carrying the newest clock covers the whole chain.
        let context: CausalContext = serde_json::from_str(&echo_second).unwrap();
        let tombstone = serde_json::to_string(&context).unwrap();
        assert!(store.delete("k", tombstone.as_bytes()));

        let (_, _, status) = store.get("k", zero.as_bytes());
        assert_eq!(status, GetStatus::NotFound);
    }

    #[test]
    fn test_rewrite_keeps_unrelated_versions_available() {
        let store = CausalStore::new();
        let zero = payload_of(&[(0, 0)], "");

        let (_, echo_a, _) = store.put("a", version("1"), zero.as_bytes(), 0);
        let (_, echo_b, _) = store.put("b", version("2"), echo_a.as_bytes(), 0);
        let (chained, _, _) = store.put("c", version("3"), echo_b.as_bytes(), 0);
        let (independent, _, _) = store.put("d", version("4"), zero.as_bytes(), 0);

        let before_chained = store.is_available(chained.as_ref().unwrap());
        let before_independent = store.is_available(independent.as_ref().unwrap());

        assert!(store.delete("a", payload_of(&[(0, 1)], "a").as_bytes()));

        assert_eq!(store.is_available(chained.as_ref().unwrap()), before_chained);
        assert_eq!(
            store.is_available(independent.as_ref().unwrap()),
            before_independent
        );

        let (value, _, status) = store.get("c", zero.as_bytes());
        assert_eq!(status, GetStatus::Found);
        assert_eq!(value.unwrap().data, "3");
    }

    // ============================================================
    // WIRE SHAPES
    // ============================================================

    #[test]
    fn test_causal_context_round_trip() {
        let context = CausalContext {
            clock: clock_of(&[(0, 2), (3, 1)]),
            key: "orders".to_string(),
        };

        let json = serde_json::to_string(&context).unwrap();
        let decoded: CausalContext = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, context);
    }

    #[test]
    fn test_version_wire_field_names() {
        let stored = serde_json::to_value(version("payload")).unwrap();
        let object = stored.as_object().unwrap();

        for field in ["time", "clock", "depends", "available", "data"] {
            assert!(object.contains_key(field), "missing field {}", field);
        }
    }

    #[test]
    fn test_method_reply_omits_absent_fields() {
        let reply = MethodReply {
            result: Some("Success".to_string()),
            payload: Some("{}".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&reply).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("result"));
        assert!(object.contains_key("payload"));
    }

    #[test]
    fn test_replica_transmit_shape() {
        let transmit = ReplicaTransmit {
            value: Some(version("v")),
            payload: "{}".to_string(),
        };
        let json = serde_json::to_value(&transmit).unwrap();
        assert!(json.as_object().unwrap().contains_key("val"));

        // Delete fan-outs carry no version at all.
        let tombstone = ReplicaTransmit {
            value: None,
            payload: "{}".to_string(),
        };
        let json = serde_json::to_value(&tombstone).unwrap();
        assert!(!json.as_object().unwrap().contains_key("val"));

        let decoded: ReplicaTransmit = serde_json::from_str(r#"{"payload":"p"}"#).unwrap();
        assert!(decoded.value.is_none());
        assert_eq!(decoded.payload, "p");
    }

    // ============================================================
    // PAYLOAD CLEANING
    // ============================================================

    #[test]
    fn test_clean_payload_strips_outer_quotes() {
        assert_eq!(clean_payload("\"{}\""), "{}");
        assert_eq!(clean_payload("{}"), "{}");
    }

    #[test]
    fn test_clean_payload_unescapes_quotes() {
        assert_eq!(
            clean_payload("\"{\\\"clock\\\":[],\\\"key\\\":\\\"a\\\"}\""),
            "{\"clock\":[],\"key\":\"a\"}"
        );
    }

    #[test]
    fn test_clean_payload_leaves_short_strings() {
        assert_eq!(clean_payload(""), "");
        assert_eq!(clean_payload("\""), "\"");
    }
}
