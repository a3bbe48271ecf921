//! Integration tests for the service-order registry.

mod common;

use pv_monitor::error::ModelError;
use pv_monitor::orders::{NewServiceOrder, OrderStatus, Priority, ServiceOrderRegistry};

fn cleaning_order() -> NewServiceOrder {
    NewServiceOrder {
        title: "Panel cleaning".to_string(),
        equipment: "String Box 03".to_string(),
        priority: Priority::Low,
        scheduled_at: common::midnight(2025, 6, 2),
        description: "Remove dust build-up from row 3".to_string(),
        ..NewServiceOrder::default()
    }
}

#[test]
fn ids_continue_after_sample_and_are_never_reused() {
    let mut registry = ServiceOrderRegistry::sample();
    let created_at = common::midnight(2025, 6, 1);

    let first = registry
        .create(cleaning_order(), created_at)
        .map(|o| o.id.clone());
    assert_eq!(first.as_deref(), Ok("OS006"));

    let removed = registry.delete("OS006").expect("OS006 exists");
    assert_eq!(removed.title, "Panel cleaning");

    let second = registry
        .create(cleaning_order(), created_at)
        .map(|o| o.id.clone());
    assert_eq!(second.as_deref(), Ok("OS007"));
    assert_eq!(registry.len(), 6);
}

#[test]
fn seeded_registry_starts_after_highest_id() {
    let mut sample = ServiceOrderRegistry::sample();
    sample.delete("OS002").expect("OS002 exists");
    let orders = sample.list().to_vec();

    let mut registry = ServiceOrderRegistry::from_orders(orders).expect("valid ids");
    let id = registry
        .create(cleaning_order(), common::midnight(2025, 6, 1))
        .map(|o| o.id.clone());
    assert_eq!(id.as_deref(), Ok("OS006"));
}

#[test]
fn lifecycle_updates_and_filters() {
    let mut registry = ServiceOrderRegistry::sample();
    let pending_before = registry.filter(Some(OrderStatus::Pending)).len();

    registry
        .set_status("OS004", OrderStatus::Completed)
        .expect("OS004 exists");
    registry
        .assign("OS004", Some("Maria Silva".to_string()))
        .expect("OS004 exists");
    registry
        .reschedule("OS004", common::midnight(2025, 7, 1))
        .expect("OS004 exists");

    let order = registry.get("OS004").expect("OS004 exists");
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.assignee.as_deref(), Some("Maria Silva"));
    assert_eq!(order.scheduled_at, common::midnight(2025, 7, 1));

    let completed = registry.filter(Some(OrderStatus::Completed));
    assert!(completed.iter().any(|o| o.id == "OS004"));
    assert_eq!(registry.filter(None).len(), registry.len());
    assert!(registry.filter(Some(OrderStatus::Pending)).len() <= pending_before);
}

#[test]
fn missing_fields_and_unknown_ids_are_rejected() {
    let mut registry = ServiceOrderRegistry::new();
    let blank = NewServiceOrder {
        description: "  ".to_string(),
        ..cleaning_order()
    };
    assert!(matches!(
        registry.create(blank, common::midnight(2025, 6, 1)),
        Err(ModelError::InvalidInput(_))
    ));
    assert!(registry.is_empty());

    assert!(matches!(
        registry.get("OS999"),
        Err(ModelError::OrderNotFound(_))
    ));
    assert!(matches!(
        registry.delete("OS999"),
        Err(ModelError::OrderNotFound(_))
    ));
    assert!(matches!(
        registry.set_status("OS999", OrderStatus::Scheduled),
        Err(ModelError::OrderNotFound(_))
    ));
}

#[test]
fn status_names_parse_loosely() {
    assert_eq!("in_progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
    assert_eq!("In progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
    assert_eq!("HIGH".parse::<Priority>(), Ok(Priority::High));
    assert!("urgent".parse::<Priority>().is_err());
}
