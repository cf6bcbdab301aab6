//! Comprehensive tests for context module.

#[cfg(test)]
mod tests {
    use crate::context::{ExecutionContext, LogLevel, RequestIdentity, LOGS_FLAG, SESSION_PREFIX};
    use crate::events::{CollectingObserver, EventBus, EventKind};
    use crate::testing::test_context;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_flag_round_trip_for_every_value_kind() {
        let ctx = test_context();
        let values = [
            json!(null),
            json!(true),
            json!(-12),
            json!(3.25),
            json!("text"),
            json!([1, "two", {"three": 3}]),
            json!({"nested": {"list": [1, 2]}}),
        ];

        for (index, value) in values.iter().enumerate() {
            let key = format!("key-{index}");
            ctx.flag(key.as_str(), value.clone());
            assert_eq!(ctx.get_flag(&key), Some(value.clone()));
        }
    }

    #[test]
    fn test_clear_flag_is_idempotent() {
        let ctx = test_context();
        ctx.flag("a", 1);
        ctx.flag("b", 2);

        ctx.clear_flag(["a", "missing"]);
        ctx.clear_flag(["a"]);
        ctx.clear_flag(Vec::<String>::new());

        assert!(!ctx.has_flag("a"));
        assert!(ctx.has_flag("b"));
    }

    #[test]
    fn test_flags_with_prefix() {
        let ctx = test_context();
        ctx.flag(format!("{SESSION_PREFIX}name"), "Ada");
        ctx.flag("intent", "greet");

        let session = ctx.flags_with_prefix(SESSION_PREFIX);
        assert_eq!(session, vec![("sess:name".to_string(), json!("Ada"))]);
    }

    #[test]
    fn test_flag_serialized() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Booking {
            city: String,
            seats: u8,
        }

        let ctx = test_context();
        let booking = Booking {
            city: "Oslo".to_string(),
            seats: 2,
        };
        ctx.flag_serialized("booking", &booking).unwrap();

        assert_eq!(ctx.get_flag_as::<Booking>("booking").unwrap(), booking);
    }

    #[test]
    fn test_update_flag_is_atomic_across_threads() {
        let ctx = Arc::new(test_context());
        ctx.flag("counter", 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        ctx.update_flag("counter", |n: &mut i64| *n += 1).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ctx.get_int_flag("counter").unwrap(), 800);
    }

    #[tokio::test]
    async fn test_concurrent_contexts_do_not_share_flags() {
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                tokio::spawn(async move {
                    let ctx = test_context();
                    ctx.flag(format!("only-{i}"), i);
                    tokio::task::yield_now().await;
                    ctx
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let ctx = task.await.unwrap();
            let mut keys = ctx.flag_keys();
            keys.sort();
            assert_eq!(keys, vec![format!("only-{i}")]);
        }
    }

    #[test]
    fn test_identity_is_unique_per_context() {
        let first = test_context();
        let second = test_context();
        assert_ne!(first.request_id(), second.request_id());

        let fixed = test_context().with_identity(RequestIdentity::with_request_id("fixed123"));
        assert_eq!(fixed.request_id(), "fixed123");
    }

    #[test]
    fn test_logs_flag_holds_entries() {
        let ctx = test_context().with_log_level(LogLevel::ERROR);
        ctx.info("handler", "hello");
        ctx.log(LogLevel(35), "custom", "handler");

        let raw = ctx.get_flag(LOGS_FLAG).unwrap();
        assert_eq!(raw.as_array().map(Vec::len), Some(2));

        let logs = ctx.logs();
        assert_eq!(logs[1].level, LogLevel(35));
        assert!(logs[0].elapsed_ms <= logs[1].elapsed_ms);
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let ctx = test_context();
        let first = ctx.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert!(ctx.elapsed() > first);
    }

    #[tokio::test]
    async fn test_flag_operations_publish_events() {
        let observer = CollectingObserver::new();
        let bus = Arc::new(EventBus::with_observer(observer.clone()).unwrap());
        let ctx: ExecutionContext = test_context().with_event_bus(bus);

        ctx.flag("intent", "greet");
        let _ = ctx.has_flag("intent");
        let _ = ctx.get_flag("intent");
        ctx.clear_flag(["intent", "other"]);
        ctx.warn("test", "careful");

        assert!(observer.wait_for(5, Duration::from_secs(2)).await);
        let kinds: Vec<EventKind> = observer.events().into_iter().map(|e| e.kind).collect();

        assert_eq!(
            kinds,
            vec![
                EventKind::FlagSet {
                    flag: "intent".to_string(),
                    value: "\"greet\"".to_string(),
                },
                EventKind::FlagRead {
                    flag: "intent".to_string(),
                    existence_check: true,
                },
                EventKind::FlagRead {
                    flag: "intent".to_string(),
                    existence_check: false,
                },
                EventKind::FlagCleared {
                    flags: vec!["intent".to_string(), "other".to_string()],
                },
                EventKind::LogEmitted {
                    level: LogLevel::WARN,
                    source: "test".to_string(),
                    message: "careful".to_string(),
                },
            ]
        );

        let origin = &observer.events()[0].origin;
        assert_eq!(origin.request_id, ctx.request_id());
        assert_eq!(origin.user_id, ctx.user().id);
    }

    #[test]
    fn test_no_events_without_observer() {
        let ctx = test_context();
        ctx.flag("quiet", true);
        assert!(!ctx.event_bus().has_observer());
    }
}
