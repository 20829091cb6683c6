//! Server Commands
//!
//! Connection checks, keyspace-wide maintenance and introspection.

use crate::commands::{Arity, CommandError, CommandResult, CommandSpec, Context, Reply};
use bytes::Bytes;
use std::fmt::Write as _;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "ping", arity: Arity::AtLeast(0), write: false, handler: ping },
    CommandSpec { name: "echo", arity: Arity::Exact(1), write: false, handler: echo },
    CommandSpec { name: "dbsize", arity: Arity::Exact(0), write: false, handler: dbsize },
    CommandSpec { name: "flushdb", arity: Arity::AtLeast(0), write: true, handler: flushdb },
    CommandSpec { name: "flushall", arity: Arity::AtLeast(0), write: true, handler: flushall },
    CommandSpec { name: "info", arity: Arity::AtLeast(0), write: false, handler: info },
    CommandSpec { name: "time", arity: Arity::Exact(0), write: false, handler: time },
    CommandSpec { name: "command", arity: Arity::AtLeast(0), write: false, handler: command },
];

/// PING [message]
fn ping(_ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    match args {
        [] => Ok(Reply::status("PONG")),
        [message] => Ok(Reply::Bulk(message.clone())),
        _ => Err(CommandError::arity("ping")),
    }
}

/// ECHO message
fn echo(_ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    Ok(Reply::Bulk(args[0].clone()))
}

/// DBSIZE
fn dbsize(ctx: &Context<'_>, _args: &[Bytes]) -> CommandResult {
    Ok(Reply::integer(ctx.keyspace.len()))
}

fn flush(ctx: &Context<'_>, args: &[Bytes], command: &str) -> CommandResult {
    match args {
        [] => {}
        [mode] if mode.eq_ignore_ascii_case(b"ASYNC") || mode.eq_ignore_ascii_case(b"SYNC") => {}
        [_] => return Err(CommandError::Syntax),
        _ => return Err(CommandError::arity(command)),
    }
    ctx.keyspace.flush();
    Ok(Reply::ok())
}

/// FLUSHDB [ASYNC|SYNC]
fn flushdb(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    flush(ctx, args, "flushdb")
}

/// FLUSHALL [ASYNC|SYNC]
///
/// There is a single database, so this is the same as `FLUSHDB`.
fn flushall(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    flush(ctx, args, "flushall")
}

/// INFO [section ...]
fn info(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let wanted = |section: &str| {
        args.is_empty()
            || args.iter().any(|arg| {
                arg.eq_ignore_ascii_case(section.as_bytes())
                    || arg.eq_ignore_ascii_case(b"all")
                    || arg.eq_ignore_ascii_case(b"everything")
            })
    };

    let stats = ctx.keyspace.stats();
    let mut out = String::new();

    // Writing into a String cannot fail
    if wanted("server") {
        let _ = write!(
            out,
            "# Server\r\n\
             tallykv_version:{}\r\n\
             os:{}\r\n\
             process_id:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::process::id(),
            ctx.uptime().as_secs(),
        );
    }
    if wanted("stats") {
        let _ = write!(
            out,
            "# Stats\r\n\
             total_commands_processed:{}\r\n\
             keyspace_hits:{}\r\n\
             keyspace_misses:{}\r\n\
             expired_keys:{}\r\n\
             \r\n",
            ctx.commands_processed(), stats.hits, stats.misses, stats.expired,
        );
    }
    if wanted("memory") || wanted("keyspace") {
        let mem = ctx.keyspace.memory_info();
        if wanted("memory") {
            let _ = write!(
                out,
                "# Memory\r\n\
                 used_memory:{}\r\n\
                 used_memory_human:{:.2}K\r\n\
                 \r\n",
                mem.used_memory, mem.used_memory as f64 / 1024.0,
            );
        }
        if wanted("keyspace") {
            out.push_str("# Keyspace\r\n");
            if mem.keys > 0 {
                let _ = write!(
                    out,
                    "db0:keys={},expires={}\r\n",
                    mem.keys, mem.volatile_keys
                );
            }
        }
    }

    Ok(Reply::bulk(out))
}

/// TIME
fn time(_ctx: &Context<'_>, _args: &[Bytes]) -> CommandResult {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);

    Ok(Reply::bulk_array([
        Bytes::from(now.as_secs().to_string()),
        Bytes::from(now.subsec_micros().to_string()),
    ]))
}

/// COMMAND [COUNT | LIST]
///
/// Without a subcommand, describes every command as
/// `[name, arity, [flag]]`, using the signed arity convention.
fn command(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let specs = ctx.commands();

    let Some(sub) = args.first() else {
        return Ok(Reply::Array(
            specs
                .iter()
                .map(|spec| {
                    let flag = if spec.write { "write" } else { "readonly" };
                    Reply::Array(vec![
                        Reply::bulk(spec.name),
                        Reply::Integer(spec.arity.as_signed()),
                        Reply::Array(vec![Reply::status(flag)]),
                    ])
                })
                .collect(),
        ));
    };

    match (sub.to_ascii_uppercase().as_slice(), args.len()) {
        (b"COUNT", 1) => Ok(Reply::integer(specs.len())),
        (b"LIST", 1) => {
            let names = specs.iter().map(|spec| spec.name.as_bytes());
            Ok(Reply::bulk_array(names.map(Bytes::from_static)))
        }
        _ => Err(CommandError::Syntax),
    }
}
