//! List Commands
//!
//! Lists are double-ended queues of byte strings. Negative indices count from
//! the tail (`-1` is the last element). A list whose last element is popped
//! is removed from the keyspace.

use crate::commands::guard::{require, require_mut, require_or_create};
use crate::commands::numeric::parse_int_arg;
use crate::commands::{Arity, CommandError, CommandResult, CommandSpec, Context, Reply};
use crate::storage::ListValue;
use bytes::Bytes;

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "lpush", arity: Arity::AtLeast(2), write: true, handler: lpush },
    CommandSpec { name: "rpush", arity: Arity::AtLeast(2), write: true, handler: rpush },
    CommandSpec { name: "lpop", arity: Arity::AtLeast(1), write: true, handler: lpop },
    CommandSpec { name: "rpop", arity: Arity::AtLeast(1), write: true, handler: rpop },
    CommandSpec { name: "llen", arity: Arity::Exact(1), write: false, handler: llen },
    CommandSpec { name: "lindex", arity: Arity::Exact(2), write: false, handler: lindex },
    CommandSpec { name: "lrange", arity: Arity::Exact(3), write: false, handler: lrange },
    CommandSpec { name: "lset", arity: Arity::Exact(3), write: true, handler: lset },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum End {
    Head,
    Tail,
}

/// Resolves a possibly negative index against a list of `len` elements.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Clamps an inclusive `[start, stop]` range to a list of `len` elements.
fn resolve_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start
    };
    let stop = if stop < 0 {
        len + stop
    } else {
        stop.min(len - 1)
    };

    if start > stop || start >= len {
        None
    } else {
        Some((start as usize, stop as usize))
    }
}

fn push(ctx: &Context<'_>, args: &[Bytes], end: End) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let list = require_or_create::<ListValue>(&mut guard)?;

    for element in &args[1..] {
        match end {
            End::Head => list.push_front(element.clone()),
            End::Tail => list.push_back(element.clone()),
        }
    }
    Ok(Reply::integer(list.len()))
}

fn pop(ctx: &Context<'_>, args: &[Bytes], end: End, command: &str) -> CommandResult {
    let count = match args.len() {
        1 => None,
        2 => {
            let count = parse_int_arg(&args[1])?;
            if count < 0 {
                return Err(CommandError::NotPositive);
            }
            Some(count as usize)
        }
        _ => return Err(CommandError::arity(command)),
    };

    let mut guard = ctx.keyspace.lock(&args[0]);
    let Some(list) = require_mut::<ListValue>(&mut guard)? else {
        return Ok(Reply::Nil);
    };

    let mut take = || match end {
        End::Head => list.pop_front(),
        End::Tail => list.pop_back(),
    };
    let reply = match count {
        None => Reply::from_option(take()),
        Some(n) => Reply::bulk_array(std::iter::from_fn(take).take(n)),
    };

    guard.remove_if_empty();
    Ok(reply)
}

/// LPUSH key element [element ...]
fn lpush(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    push(ctx, args, End::Head)
}

/// RPUSH key element [element ...]
fn rpush(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    push(ctx, args, End::Tail)
}

/// LPOP key [count]
fn lpop(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    pop(ctx, args, End::Head, "lpop")
}

/// RPOP key [count]
fn rpop(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    pop(ctx, args, End::Tail, "rpop")
}

/// LLEN key
fn llen(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        let list = require::<ListValue>(object)?;
        Ok(Reply::integer(list.map_or(0, |l| l.len())))
    })
}

/// LINDEX key index
fn lindex(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let index = parse_int_arg(&args[1])?;
    ctx.keyspace.view(&args[0], |object| {
        let element = require::<ListValue>(object)?
            .and_then(|list| resolve_index(index, list.len()).and_then(|i| list.get(i)));
        Ok(Reply::from_option(element.cloned()))
    })
}

/// LRANGE key start stop
fn lrange(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let start = parse_int_arg(&args[1])?;
    let stop = parse_int_arg(&args[2])?;

    ctx.keyspace.view(&args[0], |object| {
        let Some(list) = require::<ListValue>(object)? else {
            return Ok(Reply::Array(vec![]));
        };
        Ok(match resolve_range(start, stop, list.len()) {
            Some((from, to)) => Reply::bulk_array(list.range(from..=to).cloned()),
            None => Reply::Array(vec![]),
        })
    })
}

/// LSET key index element
fn lset(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let index = parse_int_arg(&args[1])?;

    let mut guard = ctx.keyspace.lock(&args[0]);
    let list = require_mut::<ListValue>(&mut guard)?
        .ok_or(CommandError::NoSuchKey)?;
    let slot = resolve_index(index, list.len())
        .and_then(|i| list.get_mut(i))
        .ok_or(CommandError::IndexOutOfRange)?;

    *slot = args[2].clone();
    Ok(Reply::ok())
}
