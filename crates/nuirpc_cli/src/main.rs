//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire an in-process host to `nuirpc_core` and exercise every call shape.
//! - Keep output deterministic `key=value` lines for quick sanity checks.
//!
//! Configuration comes from the `NUIRPC_CONFIG` environment variable as a
//! JSON document; unset means defaults.

use futures::executor::block_on;
use log::{info, warn};
use nuirpc_core::{
    init_logging, BridgeConfig, CallArgs, ConfigError, RegistryError, RpcClient, RpcObject, Value,
};
use serde_json::json;
use std::cell::RefCell;
use std::env;
use std::process::ExitCode;
use std::rc::Rc;

const CONFIG_ENV: &str = "NUIRPC_CONFIG";

fn main() -> ExitCode {
    let config = match load_config(env::var(CONFIG_ENV).ok().as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("nuirpc config error={err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log_level, None) {
        eprintln!("nuirpc logging error={err}");
    }

    let host = match build_host(&config) {
        Ok(host) => host,
        Err(err) => {
            eprintln!("nuirpc register error={err}");
            return ExitCode::FAILURE;
        }
    };

    let client = RpcClient::with_config(host.clone(), &config);
    println!("nuirpc_core version={}", nuirpc_core::core_version());

    match client.call("version", Vec::new()) {
        Ok(value) => println!("direct version={value}"),
        Err(err) => println!("direct error={err}"),
    }

    let delivered = Rc::new(RefCell::new(Value::Null));
    let sink = Rc::clone(&delivered);
    let callback = client.call(
        "echo",
        CallArgs::with_callback(move |value| *sink.borrow_mut() = value, vec![json!("hello")]),
    );
    match callback {
        Ok(_) => println!("callback echo={}", delivered.borrow()),
        Err(err) => println!("callback error={err}"),
    }

    match block_on(client.call_async("echo", vec![json!(42)])) {
        Ok(value) => println!("async echo={value}"),
        Err(err) => println!("async error={err}"),
    }

    let missing = client.get_remote_callable("missing_fn");
    match missing.invoke(&[json!(1), json!(2)]) {
        Ok(value) => println!("missing unexpected={value}"),
        Err(err) => println!("missing kind={} name={}", err.kind(), missing.name()),
    }

    info!(
        "event=cli_done module=cli status=ok pending={}",
        client.pending_channels().len()
    );
    println!("pending channels={}", client.pending_channels().len());
    ExitCode::SUCCESS
}

/// Parses the optional JSON document; `None` yields the defaults.
fn load_config(raw: Option<&str>) -> Result<BridgeConfig, ConfigError> {
    match raw {
        Some(json) => BridgeConfig::from_json_str(json),
        None => Ok(BridgeConfig::default()),
    }
}

/// Shared object exposing `echo` (answers inline on its channel) and
/// `version`.
fn build_host(config: &BridgeConfig) -> Result<Rc<RpcObject>, RegistryError> {
    let host = Rc::new(RpcObject::with_config(config));
    let weak_host = Rc::downgrade(&host);
    host.register_function("echo", move |args| {
        if let (Some(Value::String(channel)), Some(host)) = (args.first(), weak_host.upgrade()) {
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            if let Err(err) = host.call_remote(channel, value) {
                warn!("event=echo_deliver module=cli status=error error={err}");
            }
        }
        Value::Null
    })?;
    host.register_function("version", |_| json!(nuirpc_core::core_version()))?;
    Ok(host)
}
