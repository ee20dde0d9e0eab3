//! Assembly-time wiring checks and idempotent initialization.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use {
    async_trait::async_trait,
    relay_channels::{DirectChannel, MessageHandler, QueueChannel},
    relay_common::Message,
    relay_endpoint::{
        EndpointFactory, EndpointHost, Error, PeriodicTrigger, PollingPolicy,
    },
    std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    },
};

struct CountingHandler {
    handled: AtomicUsize,
}

impl CountingHandler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            handled: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MessageHandler for CountingHandler {
    async fn handle(&self, _message: Message) -> anyhow::Result<()> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn test_policy() -> PollingPolicy {
    PollingPolicy::new(Arc::new(PeriodicTrigger::new(Duration::from_millis(10))))
        .with_receive_timeout(Duration::from_millis(10))
}

fn expect_err<T>(result: Result<T, Error>) -> Error {
    match result {
        Ok(_) => panic!("expected a wiring error"),
        Err(err) => err,
    }
}

#[tokio::test]
async fn policy_on_push_channel_is_rejected() {
    let host = EndpointHost::new();
    host.channels()
        .register(Arc::new(DirectChannel::new("orders")))
        .unwrap();
    let factory = host
        .add_consumer(
            EndpointFactory::new("orderEndpoint", CountingHandler::new(), "orders")
                .with_policy(test_policy()),
        )
        .unwrap();

    let err = expect_err(factory.endpoint(&host).await);
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("push-capable"));
}

#[tokio::test]
async fn pull_channel_without_policy_or_default_is_rejected() {
    let host = EndpointHost::new();
    host.channels()
        .register(Arc::new(QueueChannel::new("work")))
        .unwrap();
    let factory = host
        .add_consumer(EndpointFactory::new(
            "workEndpoint",
            CountingHandler::new(),
            "work",
        ))
        .unwrap();

    let err = expect_err(factory.endpoint(&host).await);
    assert!(matches!(err, Error::Configuration { .. }));
}

#[tokio::test]
async fn pull_channel_falls_back_to_default_policy() {
    let host = EndpointHost::new();
    host.channels()
        .register(Arc::new(QueueChannel::new("work")))
        .unwrap();
    host.set_default_policy(test_policy());
    let factory = host
        .add_consumer(EndpointFactory::new(
            "workEndpoint",
            CountingHandler::new(),
            "work",
        ))
        .unwrap();

    let endpoint = factory.endpoint(&host).await.unwrap();
    assert_eq!(endpoint.name(), "workEndpoint");
    assert!(!endpoint.is_running());
}

#[tokio::test]
async fn missing_channel_is_rejected() {
    let host = EndpointHost::new();
    let factory = host
        .add_consumer(EndpointFactory::new(
            "ghostEndpoint",
            CountingHandler::new(),
            "missing",
        ))
        .unwrap();

    let err = expect_err(factory.endpoint(&host).await);
    assert!(err.to_string().contains("no such input channel"));
}

#[tokio::test]
async fn handler_reuse_across_endpoints_is_rejected() {
    let host = EndpointHost::new();
    let handler = CountingHandler::new();
    host.add_consumer(EndpointFactory::new("first", handler.clone(), "a"))
        .unwrap();
    let err = expect_err(host.add_consumer(EndpointFactory::new("second", handler, "b")));
    assert!(err.to_string().contains("already bound"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assembly_builds_exactly_one_endpoint() {
    let host = Arc::new(EndpointHost::new());
    host.channels()
        .register(Arc::new(DirectChannel::new("orders")))
        .unwrap();
    let handler: Arc<dyn MessageHandler> = CountingHandler::new();
    let factory = host
        .add_consumer(EndpointFactory::new(
            "orderEndpoint",
            handler.clone(),
            "orders",
        ))
        .unwrap();

    // One clone is held by the factory itself; each assembled endpoint adds
    // exactly one more.
    let before = Arc::strong_count(&handler);

    let mut tasks = Vec::new();
    for _ in 0..50 {
        let host = Arc::clone(&host);
        let factory = Arc::clone(&factory);
        tasks.push(tokio::spawn(
            async move { factory.endpoint(&host).await },
        ));
    }
    let mut endpoints = Vec::new();
    for task in tasks {
        endpoints.push(task.await.unwrap().unwrap());
    }

    assert_eq!(Arc::strong_count(&handler), before + 1);
    let first = &endpoints[0];
    assert!(endpoints.iter().all(|ep| Arc::ptr_eq(first, ep)));
}

#[tokio::test]
async fn factory_reports_safe_defaults_before_assembly() {
    let host = EndpointHost::new();
    let factory = host
        .add_consumer(EndpointFactory::new(
            "lazyEndpoint",
            CountingHandler::new(),
            "work",
        ))
        .unwrap();

    assert!(factory.is_auto_startup());
    assert!(!factory.is_running());
    assert_eq!(factory.phase(), 0);
    factory.start().await.unwrap();
    assert!(!factory.is_running());

    let called = Arc::new(AtomicUsize::new(0));
    let witness = Arc::clone(&called);
    factory
        .stop_with_callback(Box::new(move || {
            witness.fetch_add(1, Ordering::SeqCst);
        }))
        .await;
    assert_eq!(called.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn anonymous_definitions_get_generated_names() {
    let host = EndpointHost::new();
    let first = host
        .add_consumer(EndpointFactory::anonymous(CountingHandler::new(), "a"))
        .unwrap();
    let second = host
        .add_consumer(EndpointFactory::anonymous(CountingHandler::new(), "b"))
        .unwrap();

    assert!(relay_common::naming::is_generated_name(first.name()));
    assert!(relay_common::naming::is_generated_name(second.name()));
    assert_ne!(first.name(), second.name());
}
