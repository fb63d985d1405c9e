//! Synchronizes 2-5 independent props into an atomically-observable tuple
//! with converging update semantics (§4.6).
//!
//! The original source carried a small family of near-identical
//! `SynchronizedPair`/`Triple`/`Quad`/`Quintuple` classes (§9 open
//! question). Rather than translate each copy, the shared convergence
//! machinery lives once in `GroupCore`; `PropGroup2`..`PropGroup5` are thin,
//! arity-specific wrappers over it so each still reads as its own type with
//! its own tuple shape.

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::converter::{Converter, StringConverter};
use crate::error::PropsError;
use crate::key::Key;
use crate::prop::Prop;
use crate::subscriber::SubscriberProxy;

struct Holder<Tuple> {
    tuple: Tuple,
    error: Option<PropsError>,
    epoch: u64,
}

type GroupOp<Tuple> = Box<dyn Fn(&mut Tuple, &mut Option<PropsError>) + Send + Sync>;

/// The convergence engine shared by every arity: a CAS-updated holder, an
/// operation queue fed by member subscriptions, and a send-stage mutex that
/// re-drains the queue before delivering (§4.6, §9 mandates both duplicate
/// suppression and post-lock re-draining as the canonical behavior).
struct GroupCore<Tuple> {
    holder: ArcSwap<Holder<Tuple>>,
    ops: Mutex<VecDeque<GroupOp<Tuple>>>,
    send_stage: Mutex<()>,
    last_sent: Mutex<Option<Tuple>>,
    proxy: SubscriberProxy<Tuple>,
}

impl<Tuple> GroupCore<Tuple>
where
    Tuple: Clone + PartialEq + Send + Sync + 'static,
{
    fn new(initial_tuple: Tuple, initial_error: Option<PropsError>) -> Self {
        Self {
            holder: ArcSwap::new(Arc::new(Holder {
                tuple: initial_tuple,
                error: initial_error,
                epoch: 0,
            })),
            ops: Mutex::new(VecDeque::new()),
            send_stage: Mutex::new(()),
            last_sent: Mutex::new(None),
            proxy: SubscriberProxy::new(),
        }
    }

    fn enqueue(&self, op: impl Fn(&mut Tuple, &mut Option<PropsError>) + Send + Sync + 'static) {
        self.ops.lock().push_back(Box::new(op));
    }

    fn drain_and_apply(&self) {
        let batch: Vec<GroupOp<Tuple>> = self.ops.lock().drain(..).collect();
        if batch.is_empty() {
            return;
        }
        self.holder.rcu(|old| {
            let mut tuple = old.tuple.clone();
            let mut error = old.error.clone();
            for op in &batch {
                op(&mut tuple, &mut error);
            }
            Arc::new(Holder {
                tuple,
                error,
                epoch: old.epoch + 1,
            })
        });
    }

    /// Drains queued ops, and if the resulting state differs from what was
    /// last delivered, re-drains under `send_stage` (absorbing anything
    /// that landed in the meantime) and delivers the final state once.
    fn apply_ops_and_notify(&self) {
        self.drain_and_apply();
        let snapshot = self.holder.load();
        let unchanged = {
            let last = self.last_sent.lock();
            match (&snapshot.error, last.as_ref()) {
                (None, Some(last_tuple)) => snapshot.tuple == *last_tuple,
                _ => false,
            }
        };
        if unchanged {
            return;
        }

        let _guard = self.send_stage.lock();
        self.drain_and_apply();
        let snapshot = self.holder.load();
        if let Some(err) = snapshot.error.clone() {
            self.proxy.handle_error(err);
        } else {
            self.proxy.send_update(snapshot.tuple.clone());
            *self.last_sent.lock() = Some(snapshot.tuple.clone());
        }
    }

    fn get(&self) -> Result<Tuple, PropsError> {
        let snapshot = self.holder.load();
        match &snapshot.error {
            Some(err) => Err(err.clone()),
            None => Ok(snapshot.tuple.clone()),
        }
    }

    fn subscribe(
        &self,
        on_update: impl Fn(Tuple) + Send + Sync + 'static,
        on_error: impl Fn(PropsError) + Send + Sync + 'static,
    ) {
        self.proxy.subscribe(on_update, on_error);
    }
}

/// Replaces sequential `%s` placeholders in `format` with `parts`, in
/// order. Extra placeholders past the last part render as empty.
fn substitute_percent_s(format: &str, parts: &[String]) -> String {
    let mut result = String::with_capacity(format.len());
    let mut remaining = format;
    let mut parts = parts.iter();
    while let Some(pos) = remaining.find("%s") {
        result.push_str(&remaining[..pos]);
        result.push_str(parts.next().map(String::as_str).unwrap_or(""));
        remaining = &remaining[pos + 2..];
    }
    result.push_str(remaining);
    result
}

fn encoded_or_null<T: Clone + Send + Sync + 'static>(prop: &Prop<T>) -> String {
    prop.encoded_string().unwrap_or_else(|| "null".to_string())
}

macro_rules! prop_group {
    ($name:ident, $doc:literal, [$($idx:tt : $field:ident : $member:ident : $ty:ident),+ $(,)?]) => {
        #[doc = $doc]
        pub struct $name<$($ty),+>
        where
            $($ty: Clone + PartialEq + Send + Sync + 'static),+
        {
            $($field: Arc<Prop<$ty>>,)+
            core: GroupCore<($(Option<$ty>),+,)>,
        }

        impl<$($ty),+> $name<$($ty),+>
        where
            $($ty: Clone + PartialEq + Send + Sync + 'static),+
        {
            /// Builds the group, synchronously reading every member. If any
            /// read errors, the initial holder carries a `MultiValueRead`
            /// error listing every encountered cause (§7).
            pub fn new($($field: Arc<Prop<$ty>>),+) -> Arc<Self> {
                let mut causes = Vec::new();
                $(
                    let $member = match $field.get() {
                        Ok(value) => value,
                        Err(err) => {
                            causes.push(err);
                            None
                        }
                    };
                )+
                let initial_error = if causes.is_empty() {
                    None
                } else {
                    Some(PropsError::MultiValueRead { causes })
                };
                let initial_tuple = ($($member),+,);

                let group = Arc::new(Self {
                    $($field: $field.clone(),)+
                    core: GroupCore::new(initial_tuple, initial_error),
                });

                $(
                    {
                        let weak = Arc::downgrade(&group);
                        let weak_err = weak.clone();
                        $field.subscribe(
                            move |value| {
                                if let Some(group) = weak.upgrade() {
                                    group.core.enqueue(move |tuple, error| {
                                        tuple.$idx = value.clone();
                                        *error = None;
                                    });
                                    group.core.apply_ops_and_notify();
                                }
                            },
                            move |err| {
                                if let Some(group) = weak_err.upgrade() {
                                    group.core.enqueue(move |_tuple, error| {
                                        *error = Some(err.clone());
                                    });
                                    group.core.apply_ops_and_notify();
                                }
                            },
                        );
                    }
                )+

                group
            }

            /// The current tuple, or the most recent cause if any member is
            /// in an error state.
            pub fn get(&self) -> Result<($(Option<$ty>),+,), PropsError> {
                self.core.get()
            }

            /// Subscribes to converged tuple/error events. Carries no
            /// ordering guarantee relative to the individual member props'
            /// own subscriptions (§5).
            pub fn subscribe(
                &self,
                on_update: impl Fn(($(Option<$ty>),+,)) + Send + Sync + 'static,
                on_error: impl Fn(PropsError) + Send + Sync + 'static,
            ) {
                self.core.subscribe(on_update, on_error);
            }

            /// The composite key: member keys joined with `\u{222A}` in
            /// construction order (§3, §6).
            pub fn composite_key(&self) -> Key {
                Key::composite([$(self.$field.key()),+])
            }

            /// Derives a `Prop<String>` whose value is `format` with
            /// positional `%s` placeholders filled in by each member's
            /// converter-encoded string form; a member currently unset or
            /// errored renders as the literal `"null"`.
            pub fn render_template(self: &Arc<Self>, format: impl Into<String>) -> Arc<Prop<String>> {
                let format = format.into();
                let rendered = Arc::new(Prop::new(
                    format!("{}::template", self.composite_key()),
                    Arc::new(StringConverter) as Arc<dyn Converter<String>>,
                ));

                let render_now: Arc<dyn Fn() -> String + Send + Sync> = {
                    $(let $member = self.$field.clone();)+
                    let format = format.clone();
                    Arc::new(move || {
                        let parts = vec![$(encoded_or_null(&$member)),+];
                        substitute_percent_s(&format, &parts)
                    })
                };

                rendered.set_value(Some(render_now()));

                let rendered_for_update = rendered.clone();
                let render_now_for_update = render_now.clone();
                let rendered_for_error = rendered.clone();
                self.core.subscribe(
                    move |_tuple| rendered_for_update.set_value(Some(render_now_for_update())),
                    move |err| rendered_for_error.set_value(Some(format!("error: {err}"))),
                );

                rendered
            }
        }
    };
}

prop_group!(
    PropGroup2,
    "Atomic tuple of 2 props.",
    [0: p1: m1: A, 1: p2: m2: B]
);
prop_group!(
    PropGroup3,
    "Atomic tuple of 3 props.",
    [0: p1: m1: A, 1: p2: m2: B, 2: p3: m3: C]
);
prop_group!(
    PropGroup4,
    "Atomic tuple of 4 props.",
    [0: p1: m1: A, 1: p2: m2: B, 2: p3: m3: C, 3: p4: m4: D]
);
prop_group!(
    PropGroup5,
    "Atomic tuple of 5 props.",
    [0: p1: m1: A, 1: p2: m2: B, 2: p3: m3: C, 3: p4: m4: D, 4: p5: m5: E]
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::IntConverter;
    use std::sync::Mutex as StdMutex;

    fn int_prop(key: &'static str) -> Arc<Prop<i64>> {
        Arc::new(Prop::new(key, Arc::new(IntConverter) as Arc<dyn Converter<i64>>))
    }

    #[test]
    fn converges_on_sequential_member_updates() {
        let p1 = int_prop("p1");
        let p2 = int_prop("p2");
        let group = PropGroup2::new(p1.clone(), p2.clone());

        let observed = Arc::new(StdMutex::new(Vec::new()));
        let observed2 = observed.clone();
        group.subscribe(move |tuple| observed2.lock().unwrap().push(tuple), |_| {});

        p1.set_value(Some("1".to_string()));
        p2.set_value(Some("2".to_string()));

        assert_eq!(group.get().unwrap(), (Some(1), Some(2)));
        let history = observed.lock().unwrap();
        assert_eq!(*history.last().unwrap(), (Some(1), Some(2)));
        for tuple in history.iter() {
            assert!(tuple.0.is_none() || tuple.0 == Some(1));
            assert!(tuple.1.is_none() || tuple.1 == Some(2));
        }
    }

    #[test]
    fn template_renders_member_values() {
        let p1 = int_prop("p1");
        let p2 = int_prop("p2");
        p1.set_value(Some("1".to_string()));
        p2.set_value(Some("2".to_string()));
        let group = PropGroup2::new(p1.clone(), p2.clone());
        let rendered = group.render_template("%s and %s");
        assert_eq!(rendered.get().unwrap(), Some("1 and 2".to_string()));
    }

    #[test]
    fn multi_value_read_error_on_construction_carries_all_causes() {
        let p1: Arc<Prop<i64>> = int_prop("p1");
        let p2: Arc<Prop<i64>> = int_prop("p2");
        p1.set_value(Some("not-a-number".to_string()));
        p2.set_value(Some("also-not-a-number".to_string()));
        let group = PropGroup2::new(p1, p2);
        match group.get() {
            Err(PropsError::MultiValueRead { causes }) => assert_eq!(causes.len(), 2),
            other => panic!("expected MultiValueRead, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_tuples_are_not_redelivered() {
        let p1 = int_prop("p1");
        let p2 = int_prop("p2");
        let group = PropGroup2::new(p1.clone(), p2.clone());
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2 = count.clone();
        group.subscribe(
            move |_| {
                count2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            },
            |_| {},
        );
        p1.set_value(Some("1".to_string()));
        p1.set_value(Some("1".to_string()));
        assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
