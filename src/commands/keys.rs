//! Key Commands
//!
//! Type-independent operations on whole keys: existence, deletion, type
//! inspection, TTL management and pattern listing. Multi-key forms act on
//! each key separately.

use crate::commands::numeric::parse_expire_time;
use crate::commands::{Arity, CommandResult, CommandSpec, Context, Reply};
use bytes::Bytes;

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "del", arity: Arity::AtLeast(1), write: true, handler: del },
    CommandSpec { name: "exists", arity: Arity::AtLeast(1), write: false, handler: exists },
    CommandSpec { name: "type", arity: Arity::Exact(1), write: false, handler: key_type },
    CommandSpec { name: "expire", arity: Arity::Exact(2), write: true, handler: expire },
    CommandSpec { name: "pexpire", arity: Arity::Exact(2), write: true, handler: pexpire },
    CommandSpec { name: "ttl", arity: Arity::Exact(1), write: false, handler: ttl },
    CommandSpec { name: "pttl", arity: Arity::Exact(1), write: false, handler: pttl },
    CommandSpec { name: "persist", arity: Arity::Exact(1), write: true, handler: persist },
    CommandSpec { name: "keys", arity: Arity::Exact(1), write: false, handler: keys },
];

/// DEL key [key ...]
fn del(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let deleted = args.iter().filter(|key| ctx.keyspace.delete(key)).count();
    Ok(Reply::integer(deleted))
}

/// EXISTS key [key ...]
///
/// A key named several times is counted each time.
fn exists(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let found = args.iter().filter(|key| ctx.keyspace.exists(key)).count();
    Ok(Reply::integer(found))
}

/// TYPE key
fn key_type(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let kind = ctx.keyspace.kind_of(&args[0]);
    Ok(Reply::status(kind.map_or("none", |kind| kind.name())))
}

fn expire_in(ctx: &Context<'_>, args: &[Bytes], unit_ms: i64, command: &str) -> CommandResult {
    let ttl = parse_expire_time(&args[1], unit_ms, command)?;

    let mut guard = ctx.keyspace.lock(&args[0]);
    let Some(object) = guard.get_mut() else {
        return Ok(Reply::Integer(0));
    };

    match ttl {
        Some(ttl) => object.set_expiry(ttl),
        // A deadline already in the past deletes the key right away
        None => {
            guard.delete();
        }
    }
    Ok(Reply::Integer(1))
}

/// EXPIRE key seconds
fn expire(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    expire_in(ctx, args, 1000, "expire")
}

/// PEXPIRE key milliseconds
fn pexpire(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    expire_in(ctx, args, 1, "pexpire")
}

/// Remaining TTL in milliseconds: -2 if the key is missing, -1 if it has no TTL.
fn remaining_millis(ctx: &Context<'_>, key: &[u8]) -> i64 {
    ctx.keyspace.view(key, |object| match object {
        None => -2,
        Some(object) => match object.ttl() {
            Some(ttl) => i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            None => -1,
        },
    })
}

/// TTL key
fn ttl(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let millis = remaining_millis(ctx, &args[0]);
    let seconds = if millis < 0 {
        millis
    } else {
        (millis + 500) / 1000
    };
    Ok(Reply::Integer(seconds))
}

/// PTTL key
fn pttl(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    Ok(Reply::Integer(remaining_millis(ctx, &args[0])))
}

/// PERSIST key
fn persist(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let cleared = guard.get_mut().is_some_and(|object| object.clear_expiry());
    Ok(Reply::Integer(cleared as i64))
}

/// KEYS pattern
fn keys(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    Ok(Reply::bulk_array(ctx.keyspace.keys(&args[0])))
}
