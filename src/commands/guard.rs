//! Type Guard
//!
//! The single place where a command's expected value type is checked against
//! the object found at a key. Every handler goes through these functions, so
//! every command reports a type mismatch with the same [`CommandError::WrongType`].
//!
//! Absence is not an error here: the guard returns `None` and the handler
//! decides whether a missing key means "create" or "nothing to do".

use crate::commands::{CommandError, CommandResult};
use crate::storage::{KeyGuard, Object, Payload, ValueKind};

/// Checks that `object`, if present, has type `kind`.
pub fn require_kind(object: Option<&Object>, kind: ValueKind) -> CommandResult<Option<&Object>> {
    match object {
        Some(object) if object.kind() != kind => Err(CommandError::WrongType),
        other => Ok(other),
    }
}

/// Borrows the payload of `object` as `T`.
///
/// `Ok(None)` when the key is absent, `WrongType` when it holds another type.
pub fn require<T: Payload>(object: Option<&Object>) -> CommandResult<Option<&T>> {
    match object {
        None => Ok(None),
        Some(object) => object
            .payload::<T>()
            .map(Some)
            .ok_or(CommandError::WrongType),
    }
}

/// Mutably borrows the payload at a locked key as `T`.
pub fn require_mut<'g, T: Payload>(
    guard: &'g mut KeyGuard<'_>,
) -> CommandResult<Option<&'g mut T>> {
    match guard.get_mut() {
        None => Ok(None),
        Some(object) => object
            .payload_mut::<T>()
            .map(Some)
            .ok_or(CommandError::WrongType),
    }
}

/// Mutably borrows the payload at a locked key as `T`, creating an empty
/// object of that type if the key is absent.
///
/// The type is checked before anything is created, so a `WrongType` failure
/// leaves the keyspace untouched.
pub fn require_or_create<'g, T: Payload>(guard: &'g mut KeyGuard<'_>) -> CommandResult<&'g mut T> {
    require_kind(guard.get(), T::KIND)?;

    let (object, _) = guard.get_or_create(T::KIND);
    object.payload_mut::<T>().ok_or(CommandError::WrongType)
}
