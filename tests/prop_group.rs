//! End-to-end `PropGroup` scenarios (§8 scenarios 3-4) plus error
//! propagation across a registry-bound pair of props.

use std::sync::{Arc, Mutex};

use propreg::{Converter, IntConverter, Prop, PropGroup2, PropsError, RegistryBuilder, SystemPropertySource};

fn int_prop(key: &'static str) -> Arc<Prop<i64>> {
    Arc::new(Prop::new(key, Arc::new(IntConverter) as Arc<dyn Converter<i64>>))
}

#[test]
fn sequential_member_updates_converge_to_final_tuple() {
    let p1 = int_prop("p1");
    let p2 = int_prop("p2");
    let group = PropGroup2::new(p1.clone(), p2.clone());

    let observed = Arc::new(Mutex::new(Vec::new()));
    let observed2 = observed.clone();
    group.subscribe(move |tuple| observed2.lock().unwrap().push(tuple), |_| {});

    p1.set_value(Some("1".to_string()));
    p2.set_value(Some("2".to_string()));

    assert_eq!(group.get().unwrap(), (Some(1), Some(2)));

    // Every intermediate observation is a prefix of the final tuple: no
    // slot ever regresses to a value other than None or its final one.
    let history = observed.lock().unwrap();
    assert_eq!(*history.last().unwrap(), (Some(1), Some(2)));
    for tuple in history.iter() {
        assert!(matches!(tuple.0, None | Some(1)));
        assert!(matches!(tuple.1, None | Some(2)));
    }
}

#[test]
fn template_renders_current_member_values_and_updates_on_change() {
    let p1 = int_prop("p1");
    let p2 = int_prop("p2");
    p1.set_value(Some("1".to_string()));
    p2.set_value(Some("2".to_string()));

    let group = PropGroup2::new(p1.clone(), p2.clone());
    let rendered = group.render_template("%s and %s");
    assert_eq!(rendered.get().unwrap(), Some("1 and 2".to_string()));

    p2.set_value(Some("3".to_string()));
    assert_eq!(rendered.get().unwrap(), Some("3 and 3".to_string()));
}

#[test]
fn template_substitutes_null_for_unset_members() {
    let p1 = int_prop("p1");
    let p2 = int_prop("p2");
    p1.set_value(Some("1".to_string()));
    // p2 is never set.

    let group = PropGroup2::new(p1.clone(), p2.clone());
    let rendered = group.render_template("%s and %s");
    assert_eq!(rendered.get().unwrap(), Some("1 and null".to_string()));
}

#[test]
fn member_error_surfaces_on_group_and_clears_on_recovery() {
    let p1 = int_prop("p1");
    let p2 = int_prop("p2");
    p1.set_value(Some("1".to_string()));
    p2.set_value(Some("2".to_string()));
    let group = PropGroup2::new(p1.clone(), p2.clone());

    let errors = Arc::new(Mutex::new(Vec::new()));
    let updates = Arc::new(Mutex::new(Vec::new()));
    let errors2 = errors.clone();
    let updates2 = updates.clone();
    group.subscribe(
        move |tuple| updates2.lock().unwrap().push(tuple),
        move |err| errors2.lock().unwrap().push(err),
    );

    p1.set_value(Some("not-a-number".to_string()));
    assert!(group.get().is_err());
    assert_eq!(errors.lock().unwrap().len(), 1);
    assert!(matches!(
        errors.lock().unwrap()[0],
        PropsError::ConversionFailed { .. }
    ));

    p1.set_value(Some("9".to_string()));
    assert_eq!(group.get().unwrap(), (Some(9), Some(2)));
    assert!(!updates.lock().unwrap().is_empty());
}

#[test]
fn registry_bound_members_converge_through_a_real_registry() {
    let source = Arc::new(SystemPropertySource::new());
    let registry = RegistryBuilder::new().add_source(source.clone()).build();

    let p1 = int_prop("g1");
    let p2 = int_prop("g2");
    registry.bind(p1.clone());
    registry.bind(p2.clone());
    let group = PropGroup2::new(p1, p2);

    source.set("g1", "10");
    source.set("g2", "20");
    source.push_update();

    assert_eq!(group.get().unwrap(), (Some(10), Some(20)));
}
