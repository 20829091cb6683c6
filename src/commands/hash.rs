//! Hash Commands
//!
//! A hash maps field names to values under a single key. Field values are
//! plain bytes; the increment commands parse them on demand and write the
//! result back in canonical decimal form.
//!
//! Every read-modify-write here runs under one [`KeyGuard`], and every failure
//! is detected before the first write, so a failed command leaves the hash
//! exactly as it was.
//!
//! [`KeyGuard`]: crate::storage::KeyGuard

use crate::commands::guard::{require, require_mut, require_or_create};
use crate::commands::numeric::{
    format_float, parse_float_arg, parse_i64, parse_int_arg, parse_number,
};
use crate::commands::{Arity, CommandError, CommandResult, CommandSpec, Context, Reply};
use crate::storage::HashValue;
use bytes::Bytes;

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "hset", arity: Arity::AtLeast(3), write: true, handler: hset },
    CommandSpec { name: "hmset", arity: Arity::AtLeast(3), write: true, handler: hmset },
    CommandSpec { name: "hsetnx", arity: Arity::Exact(3), write: true, handler: hsetnx },
    CommandSpec { name: "hget", arity: Arity::Exact(2), write: false, handler: hget },
    CommandSpec { name: "hmget", arity: Arity::AtLeast(2), write: false, handler: hmget },
    CommandSpec { name: "hdel", arity: Arity::AtLeast(2), write: true, handler: hdel },
    CommandSpec { name: "hexists", arity: Arity::Exact(2), write: false, handler: hexists },
    CommandSpec { name: "hlen", arity: Arity::Exact(1), write: false, handler: hlen },
    CommandSpec { name: "hstrlen", arity: Arity::Exact(2), write: false, handler: hstrlen },
    CommandSpec { name: "hkeys", arity: Arity::Exact(1), write: false, handler: hkeys },
    CommandSpec { name: "hvals", arity: Arity::Exact(1), write: false, handler: hvals },
    CommandSpec { name: "hgetall", arity: Arity::Exact(1), write: false, handler: hgetall },
    CommandSpec { name: "hincrby", arity: Arity::Exact(3), write: true, handler: hincrby },
    CommandSpec {
        name: "hincrbyfloat", arity: Arity::Exact(3), write: true, handler: hincrbyfloat,
    },
];

/// Runs a read-only closure against the hash at `key` (`None` if absent).
fn with_hash<R>(
    ctx: &Context<'_>,
    key: &[u8],
    f: impl FnOnce(Option<&HashValue>) -> R,
) -> CommandResult<R> {
    ctx.keyspace
        .view(key, |object| require::<HashValue>(object).map(f))
}

/// Stores field/value pairs, returning how many fields were new.
fn set_pairs(ctx: &Context<'_>, command: &str, args: &[Bytes]) -> CommandResult<usize> {
    let pairs = &args[1..];
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CommandError::arity(command));
    }

    let mut guard = ctx.keyspace.lock(&args[0]);
    let hash = require_or_create::<HashValue>(&mut guard)?;

    let mut added = 0;
    for pair in pairs.chunks_exact(2) {
        if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
            added += 1;
        }
    }
    Ok(added)
}

/// HSET key field value [field value ...]
fn hset(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    set_pairs(ctx, "hset", args).map(Reply::integer)
}

/// HMSET key field value [field value ...]
fn hmset(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    set_pairs(ctx, "hmset", args).map(|_| Reply::ok())
}

/// HSETNX key field value
fn hsetnx(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let hash = require_or_create::<HashValue>(&mut guard)?;

    if hash.contains_key(&args[1]) {
        return Ok(Reply::Integer(0));
    }
    hash.insert(args[1].clone(), args[2].clone());
    Ok(Reply::Integer(1))
}

/// HGET key field
fn hget(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::from_option(hash.and_then(|h| h.get(&args[1])).cloned())
    })
}

/// HMGET key field [field ...]
fn hmget(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::Array(
            args[1..]
                .iter()
                .map(|field| Reply::from_option(hash.and_then(|h| h.get(field)).cloned()))
                .collect(),
        )
    })
}

/// HDEL key field [field ...]
fn hdel(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let Some(hash) = require_mut::<HashValue>(&mut guard)? else {
        return Ok(Reply::Integer(0));
    };

    let removed = args[1..]
        .iter()
        .filter(|field| hash.remove(*field).is_some())
        .count();

    guard.remove_if_empty();
    Ok(Reply::integer(removed))
}

/// HEXISTS key field
fn hexists(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::Integer(hash.is_some_and(|h| h.contains_key(&args[1])) as i64)
    })
}

/// HLEN key
fn hlen(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::integer(hash.map_or(0, |h| h.len()))
    })
}

/// HSTRLEN key field
fn hstrlen(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::integer(hash.and_then(|h| h.get(&args[1])).map_or(0, |v| v.len()))
    })
}

/// HKEYS key
fn hkeys(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::bulk_array(hash.into_iter().flat_map(|h| h.keys().cloned()))
    })
}

/// HVALS key
fn hvals(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::bulk_array(hash.into_iter().flat_map(|h| h.values().cloned()))
    })
}

/// HGETALL key
fn hgetall(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    with_hash(ctx, &args[0], |hash| {
        Reply::bulk_array(
            hash.into_iter()
                .flat_map(|h| h.iter())
                .flat_map(|(field, value)| [field.clone(), value.clone()]),
        )
    })
}

/// HINCRBY key field increment
fn hincrby(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let (key, field) = (&args[0], &args[1]);
    let delta = parse_int_arg(&args[2])?;

    let mut guard = ctx.keyspace.lock(key);
    let hash = require::<HashValue>(guard.get())?;
    let current = match hash.and_then(|h| h.get(field)) {
        Some(raw) => parse_i64(raw).ok_or(CommandError::HashNotAnInteger)?,
        None => 0,
    };
    let next = current.checked_add(delta).ok_or(CommandError::Overflow)?;

    require_or_create::<HashValue>(&mut guard)?
        .insert(field.clone(), Bytes::from(next.to_string()));
    Ok(Reply::Integer(next))
}

/// HINCRBYFLOAT key field increment
///
/// The increment is validated before the key is touched. The current field
/// value (0 when absent) is read, summed and written back under the same
/// key lock; a non-numeric field or a non-finite sum fails without writing.
fn hincrbyfloat(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let (key, field) = (&args[0], &args[1]);
    let delta = parse_float_arg(&args[2])?;

    let mut guard = ctx.keyspace.lock(key);
    let hash = require::<HashValue>(guard.get())?;
    let current = match hash.and_then(|h| h.get(field)) {
        Some(raw) => parse_number(raw).ok_or(CommandError::NotANumber)?,
        None => 0.0,
    };

    let next = current + delta;
    if !next.is_finite() {
        return Err(CommandError::NanOrInfinity);
    }
    let formatted = format_float(next);

    require_or_create::<HashValue>(&mut guard)?
        .insert(field.clone(), Bytes::from(formatted.clone()));
    Ok(Reply::Float(formatted))
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::{dispatcher, run};
    use crate::commands::{CommandError, ErrorKind, Reply};
    use crate::storage::ValueKind;
    use std::sync::Arc;

    fn float(s: &str) -> Reply {
        Reply::Float(s.to_string())
    }

    fn bulk(s: &str) -> Reply {
        Reply::bulk(s.to_string())
    }

    #[test]
    fn test_hincrbyfloat_new_then_existing_field() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "key_hincrfloat", "field1", "10.1"]),
            Ok(float("10.1"))
        );
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "key_hincrfloat", "field1", "10.5"]),
            Ok(float("20.6"))
        );
        assert_eq!(
            run(&d, &["HGET", "key_hincrfloat", "field1"]),
            Ok(bulk("20.6"))
        );
    }

    #[test]
    fn test_hincrbyfloat_non_numeric_field() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HSET", "keys", "field", "value"]),
            Ok(Reply::Integer(1))
        );

        let err = run(&d, &["HINCRBYFLOAT", "keys", "field", "1.2"])
            .unwrap_err();
        assert_eq!(err.to_string(), "ERR value is not an integer or a float");
        assert_eq!(err.kind(), ErrorKind::NotANumber);

        assert_eq!(run(&d, &["HGET", "keys", "field"]), Ok(bulk("value")));
        assert_eq!(run(&d, &["HLEN", "keys"]), Ok(Reply::Integer(1)));
    }

    #[test]
    fn test_hincrbyfloat_wrong_type() {
        let d = dispatcher();

        assert_eq!(run(&d, &["SET", "key", "value"]), Ok(Reply::ok()));

        let err = run(&d, &["HINCRBYFLOAT", "key", "value", "10"])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );

        assert_eq!(run(&d, &["TYPE", "key"]), Ok(Reply::status("string")));
        assert_eq!(run(&d, &["GET", "key"]), Ok(bulk("value")));
    }

    #[test]
    fn test_hincrbyfloat_invalid_delta_touches_nothing() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "f", "abc"]),
            Err(CommandError::InvalidFloat)
        );
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "f", "inf"]),
            Err(CommandError::InvalidFloat)
        );
        // The key must not have been created by the failed attempts
        assert_eq!(run(&d, &["EXISTS", "h"]), Ok(Reply::Integer(0)));
    }

    #[test]
    fn test_hincrbyfloat_overflow_to_infinity() {
        let d = dispatcher();
        run(&d, &["HSET", "h", "f", "1.7976931348623157e308"])
            .unwrap();

        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "f", "1.7976931348623157e308"]),
            Err(CommandError::NanOrInfinity)
        );
        assert_eq!(
            run(&d, &["HGET", "h", "f"]),
            Ok(bulk("1.7976931348623157e308"))
        );
    }

    #[test]
    fn test_hincrbyfloat_infinity_on_fresh_key() {
        let d = dispatcher();
        let max = "1.7976931348623157e308";

        // The first increment on an absent key stores the largest finite value
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "fresh", "f", max]),
            Ok(float(max))
        );
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "fresh", "f", max]),
            Err(CommandError::NanOrInfinity)
        );
        assert_eq!(run(&d, &["EXISTS", "fresh"]), Ok(Reply::Integer(1)));
        assert_eq!(run(&d, &["HGET", "fresh", "f"]), Ok(bulk(max)));

        // A non-finite sum against a missing field leaves the hash unchanged
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "fresh", "g", "-1.7e308"]),
            Ok(float("-1.7e308"))
        );
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "fresh", "g", "-1e308"]),
            Err(CommandError::NanOrInfinity)
        );
        assert_eq!(run(&d, &["HLEN", "fresh"]), Ok(Reply::Integer(2)));
        assert_eq!(run(&d, &["HGET", "fresh", "g"]), Ok(bulk("-1.7e308")));

        // A huge delta on a never-created key writes nothing
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "other", "f", "1e309"]),
            Err(CommandError::InvalidFloat)
        );
        assert_eq!(run(&d, &["EXISTS", "other"]), Ok(Reply::Integer(0)));
    }

    #[test]
    fn test_hincrbyfloat_tiny_values_use_exponent_form() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "f", "1e-320"]),
            Ok(float("1e-320"))
        );
        assert_eq!(run(&d, &["HGET", "h", "f"]), Ok(bulk("1e-320")));
        // The stored exponent form is still numeric
        assert_eq!(run(&d, &["HINCRBYFLOAT", "h", "f", "1"]), Ok(float("1")));
    }

    #[test]
    fn test_hincrbyfloat_formatting() {
        let d = dispatcher();

        assert_eq!(run(&d, &["HINCRBYFLOAT", "h", "a", "5"]), Ok(float("5")));
        assert_eq!(run(&d, &["HINCRBYFLOAT", "h", "a", "-5"]), Ok(float("0")));
        // A zero result stays a present field
        assert_eq!(run(&d, &["HEXISTS", "h", "a"]), Ok(Reply::Integer(1)));

        assert_eq!(run(&d, &["HINCRBYFLOAT", "h", "b", "-0.0"]), Ok(float("0")));
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "c", "1e3"]),
            Ok(float("1000"))
        );

        // Integer-looking fields are numeric too
        run(&d, &["HSET", "h", "n", "7"]).unwrap();
        assert_eq!(
            run(&d, &["HINCRBYFLOAT", "h", "n", "0.5"]),
            Ok(float("7.5"))
        );
    }

    #[test]
    fn test_hincrby() {
        let d = dispatcher();

        assert_eq!(run(&d, &["HINCRBY", "h", "n", "5"]), Ok(Reply::Integer(5)));
        assert_eq!(
            run(&d, &["HINCRBY", "h", "n", "-7"]),
            Ok(Reply::Integer(-2))
        );

        assert_eq!(
            run(&d, &["HINCRBY", "h", "n", "1.5"]),
            Err(CommandError::InvalidInteger)
        );

        run(&d, &["HSET", "h", "f", "1.5"]).unwrap();
        assert_eq!(
            run(&d, &["HINCRBY", "h", "f", "1"]),
            Err(CommandError::HashNotAnInteger)
        );

        run(&d, &["HSET", "h", "max", &i64::MAX.to_string()])
            .unwrap();
        assert_eq!(
            run(&d, &["HINCRBY", "h", "max", "1"]),
            Err(CommandError::Overflow)
        );
        assert_eq!(
            run(&d, &["HGET", "h", "max"]),
            Ok(bulk(&i64::MAX.to_string()))
        );
    }

    #[test]
    fn test_hset_hget_hdel() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HSET", "h", "a", "1", "b", "2"]),
            Ok(Reply::Integer(2))
        );
        assert_eq!(run(&d, &["HSET", "h", "a", "3"]), Ok(Reply::Integer(0)));
        assert_eq!(run(&d, &["HGET", "h", "a"]), Ok(bulk("3")));
        assert_eq!(run(&d, &["HGET", "h", "zzz"]), Ok(Reply::Nil));
        assert_eq!(run(&d, &["HGET", "nokey", "a"]), Ok(Reply::Nil));

        assert_eq!(
            run(&d, &["HMGET", "h", "a", "x", "b"]),
            Ok(Reply::Array(vec![bulk("3"), Reply::Nil, bulk("2")]))
        );

        assert_eq!(run(&d, &["HDEL", "h", "a", "x"]), Ok(Reply::Integer(1)));
        assert_eq!(run(&d, &["HDEL", "h", "b"]), Ok(Reply::Integer(1)));

        // The last field removed deletes the key
        assert_eq!(run(&d, &["EXISTS", "h"]), Ok(Reply::Integer(0)));
    }

    #[test]
    fn test_hset_odd_pairs() {
        let d = dispatcher();
        assert_eq!(
            run(&d, &["HSET", "h", "a", "1", "b"]),
            Err(CommandError::arity("hset"))
        );
        assert_eq!(run(&d, &["EXISTS", "h"]), Ok(Reply::Integer(0)));
    }

    #[test]
    fn test_hsetnx_and_hmset() {
        let d = dispatcher();

        assert_eq!(
            run(&d, &["HMSET", "h", "a", "1", "b", "2"]),
            Ok(Reply::ok())
        );
        assert_eq!(run(&d, &["HSETNX", "h", "a", "9"]), Ok(Reply::Integer(0)));
        assert_eq!(run(&d, &["HSETNX", "h", "c", "3"]), Ok(Reply::Integer(1)));
        assert_eq!(run(&d, &["HGET", "h", "a"]), Ok(bulk("1")));
        assert_eq!(run(&d, &["HLEN", "h"]), Ok(Reply::Integer(3)));
        assert_eq!(run(&d, &["HSTRLEN", "h", "c"]), Ok(Reply::Integer(1)));
    }

    #[test]
    fn test_hgetall_keys_vals() {
        let d = dispatcher();
        run(&d, &["HSET", "h", "a", "1", "b", "2"]).unwrap();

        let mut keys: Vec<_> = run(&d, &["HKEYS", "h"])
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_bytes().unwrap().to_vec())
            .collect();
        keys.sort();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);

        assert_eq!(
            run(&d, &["HVALS", "h"]).unwrap().as_array().unwrap().len(),
            2
        );

        let all = run(&d, &["HGETALL", "h"]).unwrap();
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 4);
        for pair in all.chunks(2) {
            let expected = match pair[0].as_bytes() {
                Some(b"a") => "1",
                _ => "2",
            };
            assert_eq!(pair[1], bulk(expected));
        }

        assert_eq!(run(&d, &["HGETALL", "missing"]), Ok(Reply::Array(vec![])));
    }

    #[test]
    fn test_every_hash_command_rejects_strings() {
        let d = dispatcher();
        run(&d, &["SET", "s", "value"]).unwrap();

        let commands: &[&[&str]] = &[
            &["HSET", "s", "f", "v"],
            &["HMSET", "s", "f", "v"],
            &["HSETNX", "s", "f", "v"],
            &["HGET", "s", "f"],
            &["HMGET", "s", "f"],
            &["HDEL", "s", "f"],
            &["HEXISTS", "s", "f"],
            &["HLEN", "s"],
            &["HSTRLEN", "s", "f"],
            &["HKEYS", "s"],
            &["HVALS", "s"],
            &["HGETALL", "s"],
            &["HINCRBY", "s", "f", "1"],
            &["HINCRBYFLOAT", "s", "f", "1"],
        ];
        for command in commands {
            assert_eq!(
                run(&d, command),
                Err(CommandError::WrongType),
                "{:?}",
                command
            );
        }

        assert_eq!(run(&d, &["GET", "s"]), Ok(bulk("value")));
        assert_eq!(d.keyspace().kind_of(b"s"), Some(ValueKind::String));
    }

    #[test]
    fn test_concurrent_increments_serialize() {
        use std::thread;

        let d = Arc::new(dispatcher());
        let mut handles = vec![];

        for _ in 0..8 {
            let d = Arc::clone(&d);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    run(&d, &["HINCRBYFLOAT", "counter", "f", "1"]).unwrap();
                    run(&d, &["HINCRBY", "counter", "i", "1"]).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(run(&d, &["HGET", "counter", "f"]), Ok(bulk("2000")));
        assert_eq!(run(&d, &["HGET", "counter", "i"]), Ok(bulk("2000")));
    }
}
