use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tracing::Level;

use vsql::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run vsql operations from a simulated host tick loop")]
struct Args {
    #[arg(long, value_enum, default_value = "sqlite")]
    backend: DatabaseType,
    /// Database path or connection string; read from $VSQL_CONNECTION_STRING when omitted
    #[arg(long)]
    target: Option<String>,
    /// Non-query to run (repeatable, run in order)
    #[arg(long = "execute")]
    execute: Vec<String>,
    /// Run every --execute statement in one transaction instead
    #[arg(long)]
    transaction: bool,
    /// Query whose first cell is printed (repeatable)
    #[arg(long = "scalar")]
    scalar: Vec<String>,
    /// Query whose rows are printed (repeatable)
    #[arg(long = "fetch")]
    fetch: Vec<String>,
    /// Parameter as name=value; ints, floats, true/false and null are typed, anything else is text
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, RowValues)>,
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Give up on an operation after this many ticks
    #[arg(long, default_value_t = 200)]
    max_ticks: u64,
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn parse_param(raw: &str) -> Result<(String, RowValues), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let value = if value.eq_ignore_ascii_case("null") {
        RowValues::Null
    } else if let Ok(b) = value.parse::<bool>() {
        RowValues::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        RowValues::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        RowValues::Float(f)
    } else {
        RowValues::Text(value.to_string())
    };
    Ok((name.to_string(), value))
}

/// Tick until the flagged callback has run, like a host frame loop would.
fn tick_until(bridge: &Bridge, done: &AtomicBool, tick: Duration, max_ticks: u64) -> bool {
    for _ in 0..max_ticks {
        bridge.on_tick();
        if done.load(Ordering::SeqCst) {
            return true;
        }
        std::thread::sleep(tick);
    }
    false
}

fn main() -> Result<(), VsqlError> {
    let args = Args::parse();

    init_host_logging(Arc::new(|line: &str| eprintln!("{line}")), args.log_level)?;

    let source: Box<dyn Fn(&str) -> Option<String> + Send + Sync> = match &args.target {
        Some(target) => {
            let fixed = StaticConfig(args.backend.connection_string(target));
            Box::new(move |key: &str| fixed.get(key))
        }
        None => Box::new(|key: &str| EnvConfig.get(key)),
    };
    let bridge = Bridge::builder().build(source)?;
    let params: ParamSet = args.params.iter().cloned().collect();
    let tick = Duration::from_millis(args.tick_ms);

    let ready = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ready);
    bridge.ready(move || flag.store(true, Ordering::SeqCst));
    tick_until(&bridge, &ready, tick, args.max_ticks);

    let mut pending: Vec<Box<dyn FnOnce(Arc<AtomicBool>) + '_>> = Vec::new();

    if args.transaction && !args.execute.is_empty() {
        let queries = args.execute.clone();
        let params = params.clone();
        let bridge = &bridge;
        pending.push(Box::new(move |done| {
            let shown = queries.clone();
            bridge.transaction(queries, params, move |committed| {
                println!("{}", json!({ "op": "transaction", "sql": shown, "committed": committed }));
                done.store(true, Ordering::SeqCst);
            });
        }));
    } else {
        for sql in &args.execute {
            let (sql, params, bridge) = (sql.clone(), params.clone(), &bridge);
            pending.push(Box::new(move |done| {
                bridge.execute(sql.clone(), params, move |affected| {
                    println!("{}", json!({ "op": "execute", "sql": sql, "affected": affected }));
                    done.store(true, Ordering::SeqCst);
                });
            }));
        }
    }

    for sql in &args.scalar {
        let (sql, params, bridge) = (sql.clone(), params.clone(), &bridge);
        pending.push(Box::new(move |done| {
            bridge.fetch_scalar(sql.clone(), params, move |value| {
                println!("{}", json!({ "op": "fetch_scalar", "sql": sql, "value": value }));
                done.store(true, Ordering::SeqCst);
            });
        }));
    }

    for sql in &args.fetch {
        let (sql, params, bridge) = (sql.clone(), params.clone(), &bridge);
        pending.push(Box::new(move |done| {
            bridge.fetch_all(sql.clone(), params, move |rows| {
                println!("{}", json!({ "op": "fetch_all", "sql": sql, "rows": rows }));
                done.store(true, Ordering::SeqCst);
            });
        }));
    }

    for submit in pending {
        let done = Arc::new(AtomicBool::new(false));
        submit(Arc::clone(&done));
        if !tick_until(&bridge, &done, tick, args.max_ticks) {
            tracing::warn!(max_ticks = args.max_ticks, "operation did not complete in time");
        }
    }

    let stats = bridge.stats();
    tracing::info!(
        opened = stats.opened(),
        closed = stats.closed(),
        "connections"
    );
    Ok(())
}
