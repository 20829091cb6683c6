//! Command Dispatcher
//!
//! Maps a decoded command name to its handler through a table built once at
//! startup. Each handler module contributes a static `COMMANDS` slice of
//! [`CommandSpec`]s; [`Dispatcher::new`] indexes them by lowercase name.
//!
//! ```text
//!   ["HINCRBYFLOAT", "k", "f", "1.5"]
//!            │
//!            ▼
//!   ┌──────────────────┐  unknown name  ──> ERR unknown command
//!   │ lookup (lower)   │
//!   └────────┬─────────┘
//!            ▼
//!   ┌──────────────────┐  bad count     ──> ERR wrong number of arguments
//!   │ arity check      │
//!   └────────┬─────────┘
//!            ▼
//!   ┌──────────────────┐
//!   │ handler(ctx,args)│ ──> Reply | CommandError
//!   └──────────────────┘
//! ```
//!
//! The dispatcher itself holds no per-call state; everything a command
//! changes lives in the [`Keyspace`].

use crate::commands::{hash, keys, list, server, set, string};
use crate::commands::{CommandError, CommandResult};
use crate::storage::Keyspace;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A command handler. `args` excludes the command name.
pub type HandlerFn = fn(&Context<'_>, &[Bytes]) -> CommandResult;

/// Number of arguments a command accepts, not counting its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    /// Arity in the conventional signed form that counts the command name:
    /// positive for exact, negative for a minimum.
    pub fn as_signed(self) -> i64 {
        match self {
            Arity::Exact(n) => n as i64 + 1,
            Arity::AtLeast(n) => -(n as i64 + 1),
        }
    }
}

/// Registration entry for one command.
#[derive(Debug)]
pub struct CommandSpec {
    /// Lowercase command name
    pub name: &'static str,
    pub arity: Arity,
    /// Whether the command may modify the keyspace
    pub write: bool,
    pub handler: HandlerFn,
}

/// What a handler can see while it runs.
pub struct Context<'a> {
    pub keyspace: &'a Keyspace,
    dispatcher: &'a Dispatcher,
}

impl Context<'_> {
    /// Time since the dispatcher was created.
    pub fn uptime(&self) -> Duration {
        self.dispatcher.started_at.elapsed()
    }

    /// Total commands dispatched so far.
    pub fn commands_processed(&self) -> u64 {
        self.dispatcher.processed.load(Ordering::Relaxed)
    }

    /// All registered commands, sorted by name.
    pub fn commands(&self) -> Vec<&'static CommandSpec> {
        self.dispatcher.commands()
    }
}

/// Resolves command names to handlers and runs them against the keyspace.
pub struct Dispatcher {
    keyspace: Arc<Keyspace>,
    table: HashMap<&'static str, &'static CommandSpec>,
    started_at: Instant,
    processed: AtomicU64,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.table.len())
            .field("keyspace", &self.keyspace)
            .finish()
    }
}

/// Every handler module's registration table.
static REGISTRY: &[&[CommandSpec]] = &[
    hash::COMMANDS,
    string::COMMANDS,
    list::COMMANDS,
    set::COMMANDS,
    keys::COMMANDS,
    server::COMMANDS,
];

impl Dispatcher {
    /// Builds the command table over `keyspace`.
    pub fn new(keyspace: Arc<Keyspace>) -> Self {
        let table = REGISTRY
            .iter()
            .flat_map(|specs| specs.iter())
            .map(|spec| (spec.name, spec))
            .collect();

        Self {
            keyspace,
            table,
            started_at: Instant::now(),
            processed: AtomicU64::new(0),
        }
    }

    /// The keyspace commands run against.
    pub fn keyspace(&self) -> &Arc<Keyspace> {
        &self.keyspace
    }

    /// Looks up a command by name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandSpec> {
        if let Some(spec) = self.table.get(name) {
            return Some(*spec);
        }
        self.table.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// All registered commands, sorted by name.
    pub fn commands(&self) -> Vec<&'static CommandSpec> {
        let mut specs: Vec<_> = self.table.values().copied().collect();
        specs.sort_by_key(|spec| spec.name);
        specs
    }

    /// Runs a decoded request frame: the command name followed by its arguments.
    pub fn execute(&self, frame: &[Bytes]) -> CommandResult {
        let Some((name, args)) = frame.split_first() else {
            return Err(CommandError::Syntax);
        };
        let name = String::from_utf8_lossy(name);
        self.dispatch(&name, args)
    }

    /// Runs command `name` with `args`.
    pub fn dispatch(&self, name: &str, args: &[Bytes]) -> CommandResult {
        self.processed.fetch_add(1, Ordering::Relaxed);

        let Some(spec) = self.lookup(name) else {
            debug!(command = name, "Unknown command");
            return Err(CommandError::UnknownCommand(name.to_string()));
        };

        if !spec.arity.accepts(args.len()) {
            debug!(
                command = spec.name,
                args = args.len(),
                "Wrong number of arguments"
            );
            return Err(CommandError::arity(spec.name));
        }

        trace!(
            command = spec.name,
            args = args.len(),
            write = spec.write,
            "Executing command"
        );

        let ctx = Context {
            keyspace: &self.keyspace,
            dispatcher: self,
        };
        let result = (spec.handler)(&ctx, args);

        if let Err(err) = &result {
            debug!(command = spec.name, error = %err, "Command failed");
        }
        result
    }
}
