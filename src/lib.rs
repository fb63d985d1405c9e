//! `propreg`: layered, reactively-observed configuration props assembled
//! from ordered sources (environment variables, system properties,
//! classpath-style bundled resources, on-disk property files, and whatever
//! else implements [`Source`]).
//!
//! A [`Registry`] assembles an ordered chain of [`Layer`]s and resolves, for
//! every key, which layer currently owns its effective value
//! ([`KeyOwnership`]). Consumers bind strongly-typed [`Prop`]s to the
//! registry and subscribe to value/error events; [`PropGroup2`]..
//! [`PropGroup5`] synchronize several props into one atomically-observable
//! tuple.

mod converter;
mod declaration;
mod error;
mod file_watch;
mod key;
mod layer;
mod ownership;
mod prop;
mod prop_group;
mod properties;
mod registry;
mod scheduler;
mod source;
mod sources;
mod subscriber;
mod value;
mod worker_pool;

pub use converter::{BoolConverter, Converter, DurationConverter, IntConverter, ListConverter, StringConverter};
pub use declaration::DeclarationParser;
pub use error::{ErrorCause, PropsError};
pub use file_watch::FileWatcher;
pub use key::{COMPOSITE_KEY_SEPARATOR, Key};
pub use layer::{LayerDelta, Operation};
pub use ownership::{EffectiveValue, KeyOwnership, OwnershipUpdate};
pub use prop::{ErasedProp, Prop, Validator};
pub use prop_group::{PropGroup2, PropGroup3, PropGroup4, PropGroup5};
pub use registry::{Registry, RegistryBuilder};
pub use scheduler::Scheduler;
pub use source::{CompletionHandle, Snapshot, Source, SourceSubscriber};
pub use sources::{ClasspathSource, EnvSource, FileSource, SystemPropertySource};
pub use value::RawValue;
pub use worker_pool::WorkerPool;
