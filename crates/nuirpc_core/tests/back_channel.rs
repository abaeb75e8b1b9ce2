use futures::executor::block_on;
use futures::FutureExt;
use nuirpc_core::{
    BridgeConfig, CallArgs, CallError, ChannelKey, RpcClient, RpcObject, Value, MAX_CHANNEL_SEED,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Host whose `echo` answers on the channel before returning.
fn echo_host() -> Rc<RpcObject> {
    let object = Rc::new(RpcObject::new());
    let host = Rc::downgrade(&object);
    object
        .register_function("echo", move |args| {
            if let (Some(Value::String(channel)), Some(host)) = (args.first(), host.upgrade()) {
                let value = args.get(1).cloned().unwrap_or(Value::Null);
                host.call_remote(channel, value).expect("channel should be pending");
            }
            Value::Null
        })
        .expect("register echo");
    object
}

/// Host whose `defer` only records the channel; tests deliver later.
fn deferring_host() -> (Rc<RpcObject>, Rc<RefCell<Vec<Vec<Value>>>>) {
    let object = Rc::new(RpcObject::new());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    object
        .register_function("defer", move |args| {
            sink.borrow_mut().push(args.to_vec());
            json!("accepted")
        })
        .expect("register defer");
    (object, calls)
}

#[test]
fn call_async_resolves_with_echoed_value() {
    let client = RpcClient::new(echo_host());
    let value = block_on(client.call_async("echo", vec![json!(42)])).expect("echo resolves");
    assert_eq!(value, json!(42));
    assert!(client.pending_channels().is_empty());
}

#[test]
fn callback_call_prepends_channel_key_and_fires_once() {
    let (object, calls) = deferring_host();
    let client = RpcClient::new(object.clone());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let immediate = client
        .call(
            "defer",
            CallArgs::with_callback(
                move |value| sink.borrow_mut().push(value),
                vec![json!("a"), json!("b")],
            ),
        )
        .expect("defer resolves");
    assert_eq!(immediate, json!("accepted"));

    let recorded = calls.borrow()[0].clone();
    assert_eq!(recorded.len(), 3);
    assert_eq!(&recorded[1..], &[json!("a"), json!("b")]);
    let channel = recorded[0].as_str().expect("channel key string").to_string();
    assert!(ChannelKey::parse(&channel).is_some());
    assert!(object.frontend_registry().contains(&channel));

    object.call_remote(&channel, json!("v")).expect("first delivery");
    assert_eq!(*seen.borrow(), vec![json!("v")]);
    assert!(!object.frontend_registry().contains(&channel));
    assert!(object.call_remote(&channel, json!("again")).is_err());
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn call_async_stays_pending_until_host_delivers() {
    let (object, calls) = deferring_host();
    let client = RpcClient::new(object.clone());

    let mut pending = client.call_async("defer", vec![json!(1)]);
    let channel = pending.channel().expect("awaiting a channel");
    assert!((&mut pending).now_or_never().is_none());
    assert_eq!(client.pending_channels(), vec![channel]);

    let routed = calls.borrow()[0][0].clone();
    assert_eq!(routed, channel.to_value());
    object
        .call_remote(&channel.to_string(), json!({"ok": true}))
        .expect("delivery");
    assert_eq!(block_on(pending).expect("settled"), json!({"ok": true}));
}

#[test]
fn deliveries_may_arrive_out_of_issue_order() {
    let (object, calls) = deferring_host();
    let client = RpcClient::new(object.clone());

    let first = client.call_async("defer", vec![json!("first")]);
    let second = client.call_async("defer", vec![json!("second")]);
    let keys: Vec<String> = calls
        .borrow()
        .iter()
        .map(|args| args[0].as_str().expect("key").to_string())
        .collect();

    object.call_remote(&keys[1], json!(2)).expect("second delivered");
    object.call_remote(&keys[0], json!(1)).expect("first delivered");

    assert_eq!(block_on(second).expect("second"), json!(2));
    assert_eq!(block_on(first).expect("first"), json!(1));
}

#[test]
fn cancelled_call_settles_with_cancelled_error() {
    let (object, _) = deferring_host();
    let client = RpcClient::new(object.clone());

    let pending = client.call_async("defer", vec![]);
    let channel = pending.channel().expect("awaiting a channel");
    assert!(client.cancel(channel));
    assert!(!client.cancel(channel));

    assert_eq!(block_on(pending), Err(CallError::Cancelled(channel)));
    assert!(object.call_remote(&channel.to_string(), json!(0)).is_err());
}

#[test]
fn cancel_all_pending_drops_every_channel() {
    let (object, _) = deferring_host();
    let client = RpcClient::new(object);
    let first = client.call_async("defer", vec![]);
    let second = client.call_async("defer", vec![]);

    assert_eq!(client.cancel_all_pending(), 2);
    assert!(matches!(block_on(first), Err(CallError::Cancelled(_))));
    assert!(matches!(block_on(second), Err(CallError::Cancelled(_))));
}

#[test]
fn bound_back_channel_allocates_fresh_channel_per_invocation() {
    let client = RpcClient::new(echo_host());
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let bound = client.get_remote_callable_with_back_channel("echo", move |value| {
        sink.borrow_mut().push(value)
    });

    bound.invoke(vec![json!("x")]).expect("first");
    bound.invoke(vec![json!("y")]).expect("second");
    assert_eq!(*seen.borrow(), vec![json!("x"), json!("y")]);
    assert!(client.pending_channels().is_empty());
}

#[test]
fn channel_ids_follow_configured_seed_across_clients() {
    let config = BridgeConfig {
        channel_seed: 500,
        ..BridgeConfig::default()
    };
    let object = Rc::new(RpcObject::with_config(&config));
    object
        .register_function("defer", |_| Value::Null)
        .expect("register defer");
    let first_client = RpcClient::with_config(object.clone(), &config);
    let second_client = RpcClient::with_config(object.clone(), &config);

    let a = first_client.call_async("defer", vec![]);
    let b = second_client.call_async("defer", vec![]);
    assert_eq!(a.channel(), Some(ChannelKey::new(501)));
    assert_eq!(b.channel(), Some(ChannelKey::new(502)));
    assert_eq!(first_client.pending_channels().len(), 2);
}

#[test]
fn seed_near_counter_limit_never_wraps_channel_ids() {
    let document = format!(r#"{{"channel_seed": {}}}"#, u64::MAX - 1);
    assert!(BridgeConfig::from_json_str(&document).is_err());

    let config = BridgeConfig {
        channel_seed: u64::MAX - 1,
        ..BridgeConfig::default()
    };
    let object = Rc::new(RpcObject::with_config(&config));
    object
        .register_function("defer", |_| Value::Null)
        .expect("register defer");
    let client = RpcClient::with_config(object.clone(), &config);

    let a = client.call_async("defer", vec![]).channel().expect("first channel");
    let b = client.call_async("defer", vec![]).channel().expect("second channel");
    assert_eq!(a, ChannelKey::new(MAX_CHANNEL_SEED + 1));
    assert!(b > a, "ids must keep increasing: a={a} b={b}");
}
