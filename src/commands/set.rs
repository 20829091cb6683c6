//! Set Commands

use crate::commands::guard::{require, require_mut, require_or_create};
use crate::commands::{Arity, CommandResult, CommandSpec, Context, Reply};
use crate::storage::SetValue;
use bytes::Bytes;

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "sadd", arity: Arity::AtLeast(2), write: true, handler: sadd },
    CommandSpec { name: "srem", arity: Arity::AtLeast(2), write: true, handler: srem },
    CommandSpec { name: "sismember", arity: Arity::Exact(2), write: false, handler: sismember },
    CommandSpec { name: "smembers", arity: Arity::Exact(1), write: false, handler: smembers },
    CommandSpec { name: "scard", arity: Arity::Exact(1), write: false, handler: scard },
];

/// SADD key member [member ...]
fn sadd(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let set = require_or_create::<SetValue>(&mut guard)?;

    let added = args[1..]
        .iter()
        .filter(|member| set.insert((*member).clone()))
        .count();
    Ok(Reply::integer(added))
}

/// SREM key member [member ...]
fn srem(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    let mut guard = ctx.keyspace.lock(&args[0]);
    let Some(set) = require_mut::<SetValue>(&mut guard)? else {
        return Ok(Reply::Integer(0));
    };

    let removed = args[1..]
        .iter()
        .filter(|member| set.remove(*member))
        .count();

    guard.remove_if_empty();
    Ok(Reply::integer(removed))
}

/// SISMEMBER key member
fn sismember(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        let set = require::<SetValue>(object)?;
        let found = set.is_some_and(|set| set.contains(&args[1]));
        Ok(Reply::Integer(found as i64))
    })
}

/// SMEMBERS key
fn smembers(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        let set = require::<SetValue>(object)?;
        Ok(Reply::bulk_array(set.into_iter().flatten().cloned()))
    })
}

/// SCARD key
fn scard(ctx: &Context<'_>, args: &[Bytes]) -> CommandResult {
    ctx.keyspace.view(&args[0], |object| {
        let set = require::<SetValue>(object)?;
        Ok(Reply::integer(set.map_or(0, |s| s.len())))
    })
}
