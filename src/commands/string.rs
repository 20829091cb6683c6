//! String Commands
//!
//! `SET` replaces whatever a key holds; every other command here requires the
//! key to be absent or a string. Numeric commands parse the stored text on
//! demand and keep the key's TTL when they write the result back.

use crate::commands::guard::{require, require_or_create};
use crate::commands::numeric::{
    format_float, parse_expire_time, parse_float_arg, parse_i64, parse_int_arg, parse_number,
};
use crate::commands::{Arity, CommandError, CommandResult, CommandSpec, Context, Reply};
use crate::storage::Object;
use bytes::{Bytes, BytesMut};
use std::time::Duration;

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "set", arity: Arity::AtLeast(2), write: true, handler: set },
    CommandSpec { name: "get", arity: Arity::Exact(1), write: false, handler: get },
    CommandSpec { name: "getdel", arity: Arity::Exact(1), write: true, handler: getdel },
    CommandSpec { name: "setnx", arity: Arity::Exact(2), write: true, handler: setnx },
    CommandSpec { name: "append", arity: Arity::Exact(2), write: true, handler: append },
    CommandSpec { name: "strlen", arity: Arity::Exact(1), write: false, handler: strlen },
    CommandSpec { name: "incr", arity: Arity::Exact(1), write: true, handler: incr },
    CommandSpec { name: "decr", arity: Arity::Exact(1), write: true, handler: decr },
    CommandSpec { name: "incrby", arity: Arity::Exact(2), write: true, handler: incrby },
    CommandSpec { name: "decrby", arity: Arity::Exact(2), write: true, handler: decrby },
    CommandSpec { name: "incrbyfloat", arity: Arity::Exact(2), write: true, handler: incrbyfloat },
    CommandSpec { name: "mset", arity: Arity::AtLeast(2), write: true, handler: mset },
    CommandSpec { name: "mget", arity: Arity::AtLeast(1), write: false, handler: mget },
];

// ============================================================================
// SET
// ============================================================================

/// Existence condition of `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Always,
    IfAbsent,
    IfPresent,
}

/// Expiry behavior of `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    Clear,
    Keep,
    After(Duration),
}

#[derive(Debug)]
struct SetOptions {
    condition: Condition,
    expiry: Expiry,
    get: bool,
}

fn parse_ttl(raw: &[u8], millis: bool) -> CommandResult<Duration> {
    let unit_ms = if millis { 1 } else { 1000 };
    parse_expire_time(raw, unit_ms, "set")?
        .ok_or_else(|| CommandError::InvalidExpireTime("set".into()))
}

fn parse_set_options(args: &[Bytes]) -> CommandResult<SetOptions> {
    let mut options = SetOptions {
        condition: Condition::Always,
        expiry: Expiry::Clear,
        get: false,
    };

    let mut i = 0;
    while i < args.len() {
        let opt = args[i].to_ascii_uppercase();
        match opt.as_slice() {
            b"NX" | b"XX" if options.condition != Condition::Always => {
                return Err(CommandError::Syntax)
            }
            b"NX" => options.condition = Condition::IfAbsent,
            b"XX" => options.condition = Condition::IfPresent,
            b"GET" => options.get = true,
            b"KEEPTTL" if options.expiry == Expiry::Clear => options.expiry = Expiry::Keep,
            b"EX" | b"PX" if options.expiry == Expiry::Clear => {
                let raw = args.get(i + 1).ok_or(CommandError::Syntax)?;
                options.expiry = Expiry::After(parse_ttl(raw, opt == b"PX")?);
                i += 1;
            }
            _ => return Err(CommandError::Syntax),
        }
        i += 1;
    }

    Ok(options)
}

/// SET key value [NX|XX] [GET] [EX seconds|PX milliseconds|KEEPTTL]
///
/// Replaces the object at `key` regardless of its type, unless `GET` is
/// given, in which case the old value must be a string.
fn set(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let options = parse_set_options(&args[2..])?;
    let mut guard = ctx.keyspace.lock(&args[0]);

    let old = if options.get {
        require::<Bytes>(guard.get())?.cloned()
    } else {
        None
    };
    let reply = |applied: bool| match (options.get, applied) {
        (true, _) => Reply::from_option(old.clone()),
        (false, true) => Reply::ok(),
        (false, false) => Reply::Nil,
    };

    let exists = guard.get().is_some();
    let skip = match options.condition {
        Condition::Always => false,
        Condition::IfAbsent => exists,
        Condition::IfPresent => !exists,
    };
    if skip {
        return Ok(reply(false));
    }

    let mut object = Object::string(args[1].clone());
    match options.expiry {
        Expiry::Clear => {}
        Expiry::Keep => {
            let deadline = guard.get().and_then(Object::expires_at);
            object.set_expires_at(deadline);
        }
        Expiry::After(ttl) => object.set_expiry(ttl),
    }
    guard.set(object);

    Ok(reply(true))
}

// ============================================================================
// Plain reads and writes
// ============================================================================

/// GET key
fn get(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        Ok(Reply::from_option(require::<Bytes>(object)?.cloned()))
    })
}

/// GETDEL key
fn getdel(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let value = require::<Bytes>(guard.get())?.cloned();
    if value.is_some() {
        guard.delete();
    }
    Ok(Reply::from_option(value))
}

/// SETNX key value
fn setnx(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    if guard.get().is_some() {
        return Ok(Reply::Integer(0));
    }
    guard.set(Object::string(args[1].clone()));
    Ok(Reply::Integer(1))
}

/// APPEND key value
fn append(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let data = require_or_create::<Bytes>(&mut guard)?;

    let mut buf = BytesMut::with_capacity(data.len() + args[1].len());
    buf.extend_from_slice(&data[..]);
    buf.extend_from_slice(&args[1]);
    *data = buf.freeze();

    Ok(Reply::integer(data.len()))
}

/// STRLEN key
fn strlen(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        let data = require::<Bytes>(object)?;
        Ok(Reply::integer(data.map_or(0, |d| d.len())))
    })
}

/// MSET key value [key value ...]
///
/// Each key is set on its own; the command is not atomic across keys.
fn mset(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    if args.len() % 2 != 0 {
        return Err(CommandError::arity("mset"));
    }
    for pair in args.chunks_exact(2) {
        ctx.keyspace
            .set(pair[0].clone(), Object::string(pair[1].clone()));
    }
    Ok(Reply::ok())
}

/// MGET key [key ...]
///
/// Keys that are missing or hold another type read as nil.
fn mget(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    Ok(Reply::Array(
        args.iter()
            .map(|key| {
                ctx.keyspace.view(key, |object| {
                    Reply::from_option(object.and_then(|o| o.payload::<Bytes>()).cloned())
                })
            })
            .collect(),
    ))
}

// ============================================================================
// Counters
// ============================================================================

fn incr_by(ctx: &Context<'_>, key: &Bytes, delta: i64) -> CommandResult {
    let mut guard = ctx.keyspace.lock(key);
    let current = match require::<Bytes>(guard.get())? {
        Some(raw) => parse_i64(raw).ok_or(CommandError::NotAnInteger)?,
        None => 0,
    };
    let next = current.checked_add(delta).ok_or(CommandError::Overflow)?;

    // Writing through the payload keeps any TTL on the key
    *require_or_create::<Bytes>(&mut guard)? = Bytes::from(next.to_string());
    Ok(Reply::Integer(next))
}

/// INCR key
fn incr(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    incr_by(ctx, &args[0], 1)
}

/// DECR key
fn decr(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    incr_by(ctx, &args[0], -1)
}

/// INCRBY key increment
fn incrby(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    incr_by(ctx, &args[0], parse_int_arg(&args[1])?)
}

/// DECRBY key decrement
fn decrby(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let delta = parse_int_arg(&args[1])?
        .checked_neg()
        .ok_or(CommandError::Overflow)?;
    incr_by(ctx, &args[0], delta)
}

/// INCRBYFLOAT key increment
fn incrbyfloat(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let delta = parse_float_arg(&args[1])?;

    let mut guard = ctx.keyspace.lock(&args[0]);
    let current = match require::<Bytes>(guard.get())? {
        Some(raw) => parse_number(raw).ok_or(CommandError::NotAFloat)?,
        None => 0.0,
    };

    let next = current + delta;
    if !next.is_finite() {
        return Err(CommandError::NanOrInfinity);
    }
    let formatted = format_float(next);

    *require_or_create::<Bytes>(&mut guard)? = Bytes::from(formatted.clone());
    Ok(Reply::Float(formatted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{dispatcher, run};

    fn bulk(s: &str) -> Reply {
        Reply::bulk(s.to_string())
    }

    #[test]
    fn test_set_get() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SET", "key", "value"]), Ok(Reply::ok()));
        assert_eq!(run(&d, &["GET", "key"]), Ok(bulk("value")));
        assert_eq!(run(&d, &["GET", "nokey"]), Ok(Reply::Nil));
    }

    #[test]
    fn test_set_replaces_other_types() {
        let d = dispatcher();

        run(&d, &["HSET", "k", "f", "v"]).unwrap();
        assert_eq!(run(&d, &["SET", "k", "plain"]), Ok(Reply::ok()));
        assert_eq!(run(&d, &["TYPE", "k"]), Ok(Reply::status("string")));
    }

    #[test]
    fn test_set_conditions() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SET", "k", "1", "XX"]), Ok(Reply::Nil));
        assert_eq!(run(&d, &["SET", "k", "1", "NX"]), Ok(Reply::ok()));
        assert_eq!(run(&d, &["SET", "k", "2", "NX"]), Ok(Reply::Nil));
        assert_eq!(run(&d, &["SET", "k", "3", "XX"]), Ok(Reply::ok()));
        assert_eq!(run(&d, &["GET", "k"]), Ok(bulk("3")));

        assert_eq!(
            run(&d, &["SET", "k", "4", "NX", "XX"]),
            Err(CommandError::Syntax)
        );
    }

    #[test]
    fn test_set_get_option() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SET", "k", "1", "GET"]), Ok(Reply::Nil));
        assert_eq!(run(&d, &["SET", "k", "2", "GET"]), Ok(bulk("1")));
        assert_eq!(run(&d, &["SET", "k", "3", "NX", "GET"]), Ok(bulk("2")));
        assert_eq!(run(&d, &["GET", "k"]), Ok(bulk("2")));

        run(&d, &["LPUSH", "list", "a"]).unwrap();
        assert_eq!(
            run(&d, &["SET", "list", "x", "GET"]),
            Err(CommandError::WrongType)
        );
        assert_eq!(run(&d, &["TYPE", "list"]), Ok(Reply::status("list")));
    }

    #[test]
    fn test_set_expiry_options() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SET", "k", "v", "EX", "100"]), Ok(Reply::ok()));
        let ttl = run(&d, &["TTL", "k"]).unwrap().as_integer().unwrap();
        assert!(ttl > 95 && ttl <= 100);

        assert_eq!(run(&d, &["SET", "k", "v2", "KEEPTTL"]), Ok(Reply::ok()));
        assert!(run(&d, &["TTL", "k"]).unwrap().as_integer().unwrap() > 0);

        assert_eq!(run(&d, &["SET", "k", "v3"]), Ok(Reply::ok()));
        assert_eq!(run(&d, &["TTL", "k"]), Ok(Reply::Integer(-1)));

        assert_eq!(
            run(&d, &["SET", "k", "v", "EX", "0"]),
            Err(CommandError::InvalidExpireTime("set".into()))
        );
        assert_eq!(
            run(&d, &["SET", "k", "v", "PX", "abc"]),
            Err(CommandError::InvalidInteger)
        );
        assert_eq!(run(&d, &["SET", "k", "v", "EX"]), Err(CommandError::Syntax));
        assert_eq!(
            run(&d, &["SET", "k", "v", "EX", "10", "PX", "10"]),
            Err(CommandError::Syntax)
        );
        assert_eq!(
            run(&d, &["SET", "k", "v", "BOGUS"]),
            Err(CommandError::Syntax)
        );
        assert_eq!(run(&d, &["GET", "k"]), Ok(bulk("v3")));
    }

    #[test]
    fn test_getdel_and_setnx() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SETNX", "k", "1"]), Ok(Reply::Integer(1)));
        assert_eq!(run(&d, &["SETNX", "k", "2"]), Ok(Reply::Integer(0)));
        assert_eq!(run(&d, &["GETDEL", "k"]), Ok(bulk("1")));
        assert_eq!(run(&d, &["GETDEL", "k"]), Ok(Reply::Nil));
    }

    #[test]
    fn test_append_strlen() {
        let d = dispatcher();

        assert_eq!(run(&d, &["APPEND", "k", "Hello"]), Ok(Reply::Integer(5)));
        assert_eq!(run(&d, &["APPEND", "k", " World"]), Ok(Reply::Integer(11)));
        assert_eq!(run(&d, &["GET", "k"]), Ok(bulk("Hello World")));
        assert_eq!(run(&d, &["STRLEN", "k"]), Ok(Reply::Integer(11)));
        assert_eq!(run(&d, &["STRLEN", "missing"]), Ok(Reply::Integer(0)));
    }

    #[test]
    fn test_incr_decr() {
        let d = dispatcher();

        assert_eq!(run(&d, &["INCR", "n"]), Ok(Reply::Integer(1)));
        assert_eq!(run(&d, &["INCRBY", "n", "10"]), Ok(Reply::Integer(11)));
        assert_eq!(run(&d, &["DECR", "n"]), Ok(Reply::Integer(10)));
        assert_eq!(run(&d, &["DECRBY", "n", "15"]), Ok(Reply::Integer(-5)));
        assert_eq!(run(&d, &["GET", "n"]), Ok(bulk("-5")));

        run(&d, &["SET", "s", "abc"]).unwrap();
        assert_eq!(run(&d, &["INCR", "s"]), Err(CommandError::NotAnInteger));
        assert_eq!(run(&d, &["GET", "s"]), Ok(bulk("abc")));

        run(&d, &["SET", "max", &i64::MAX.to_string()]).unwrap();
        assert_eq!(run(&d, &["INCR", "max"]), Err(CommandError::Overflow));
        assert_eq!(
            run(&d, &["DECRBY", "n", &i64::MIN.to_string()]),
            Err(CommandError::Overflow)
        );
    }

    #[test]
    fn test_incr_keeps_ttl() {
        let d = dispatcher();

        run(&d, &["SET", "n", "1", "EX", "100"]).unwrap();
        run(&d, &["INCR", "n"]).unwrap();
        assert!(run(&d, &["TTL", "n"]).unwrap().as_integer().unwrap() > 0);
    }

    #[test]
    fn test_incrbyfloat() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["INCRBYFLOAT", "f", "10.1"]),
            Ok(Reply::Float("10.1".into()))
        );
        assert_eq!(
            run(&d, &["INCRBYFLOAT", "f", "10.5"]),
            Ok(Reply::Float("20.6".into()))
        );

        run(&d, &["SET", "s", "abc"]).unwrap();
        assert_eq!(
            run(&d, &["INCRBYFLOAT", "s", "1"]),
            Err(CommandError::NotAFloat)
        );
        assert_eq!(
            run(&d, &["INCRBYFLOAT", "f", "x"]),
            Err(CommandError::InvalidFloat)
        );
    }

    #[test]
    fn test_mset_mget() {
        let d = dispatcher();

        assert_eq!(run(&d, &["MSET", "a", "1", "b", "2"]), Ok(Reply::ok()));
        run(&d, &["HSET", "h", "f", "v"]).unwrap();

        let expected = vec![bulk("1"), bulk("2"), Reply::Nil, Reply::Nil];
        assert_eq!(
            run(&d, &["MGET", "a", "b", "c", "h"]),
            Ok(Reply::Array(expected))
        );

        assert_eq!(run(&d, &["MSET", "a"]), Err(CommandError::arity("mset")));
        assert_eq!(
            run(&d, &["MSET", "a", "1", "b"]),
            Err(CommandError::arity("mset"))
        );
    }

    #[test]
    fn test_string_commands_reject_hashes() {
        let d = dispatcher();
        run(&d, &["HSET", "h", "f", "v"]).unwrap();

        let commands: [&[&str]; 6] = [
            &["GET", "h"],
            &["GETDEL", "h"],
            &["APPEND", "h", "x"],
            &["STRLEN", "h"],
            &["INCR", "h"],
            &["INCRBYFLOAT", "h", "1"],
        ];
        for command in commands {
            assert_eq!(run(&d, command), Err(CommandError::WrongType));
        }
        assert_eq!(run(&d, &["HGET", "h", "f"]), Ok(bulk("v")));
    }
}
