//! Integration tests for the Order aggregate.
//!
//! These tests drive the aggregate through whole lifecycles through its
//! public API only and check the total invariant and the raised events.

use domain::{
    AggregateRoot, DomainEvent, ErrorKind, Money, Order, OrderError, OrderEvent, OrderItem,
    OrderStatus,
};

fn sum_of_subtotals(order: &Order) -> Money {
    order.items().iter().map(OrderItem::subtotal).sum()
}

fn assert_total_invariant(order: &Order) {
    assert_eq!(order.total(), sum_of_subtotals(order));
}

mod order_lifecycle {
    use super::*;

    #[test]
    fn ana_widget_gadget_scenario() {
        let mut order = Order::create("Ana").unwrap();

        let widget = order.add_line("Widget", Money::from_cents(1000), 3).unwrap();
        assert_eq!(order.total().to_string(), "30.00");
        assert_eq!(order.status(), OrderStatus::Open);
        assert_total_invariant(&order);

        let merged = order.add_line("Widget", Money::from_cents(1000), 1).unwrap();
        assert_eq!(merged, widget);
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.get_item(&widget).unwrap().quantity(), 4);
        assert_eq!(order.total().to_string(), "40.00");
        assert_total_invariant(&order);

        let quantity = i64::from(order.get_item(&widget).unwrap().quantity());
        order.update_item_quantity(&widget, -quantity).unwrap();
        assert_eq!(order.total().to_string(), "0.00");
        assert!(order.items().is_empty());

        let err = order.close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        order.add_line("Gadget", Money::from_cents(500), 1).unwrap();
        order.close().unwrap();
        assert_eq!(order.status(), OrderStatus::Closed);
        assert!(order.closed_at().is_some());
        assert_eq!(order.total().to_string(), "5.00");
        assert_eq!(order.items().len(), 1);
        assert_total_invariant(&order);

        let types: Vec<_> = order.take_events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "OrderCreated",
                "ItemAdded",
                "ItemQuantityChanged",
                "ItemRemoved",
                "ItemAdded",
                "OrderClosed",
            ]
        );
    }

    #[test]
    fn events_carry_order_identity() {
        let mut order = Order::create("Bruno").unwrap();
        order.add_line("Widget", Money::from_cents(100), 1).unwrap();
        order.close().unwrap();

        for event in order.pending_events() {
            assert_eq!(event.order_id(), order.id());
            assert_eq!(event.order_number(), order.number());
        }
    }
}

mod invariants {
    use super::*;

    #[test]
    fn total_tracks_subtotals_through_mixed_mutations() {
        let mut order = Order::create("Carla").unwrap();
        let a = order.add_line("A", Money::from_cents(199), 5).unwrap();
        let b = order.add_line("B", Money::from_cents(1), 100).unwrap();
        let c = order.add_line("C", Money::from_cents(4999), 2).unwrap();

        let steps: Vec<(&domain::ProductId, i64)> =
            vec![(&a, -2), (&b, 50), (&c, -1), (&a, 7), (&b, -150), (&c, 3)];

        for (pid, delta) in steps {
            order.update_item_quantity(pid, delta).unwrap();
            assert_total_invariant(&order);
        }

        assert!(order.get_item(&b).is_none());
        assert_eq!(order.items().len(), 2);
    }

    #[test]
    fn rejected_mutations_do_not_change_total() {
        let mut order = Order::create("Dora").unwrap();
        let pid = order.add_line("Widget", Money::from_cents(1000), 1).unwrap();
        let before = order.total();

        assert!(order.update_item_quantity(&pid, -2).is_err());
        assert!(order.add_line("", Money::from_cents(1000), 1).is_err());
        assert!(order.add_line("Widget", Money::from_cents(1000), 0).is_err());
        assert!(order.add_line("Widget", Money::from_cents(-5), 1).is_err());

        assert_eq!(order.total(), before);
        assert_total_invariant(&order);
    }

    #[test]
    fn closing_empty_order_always_fails() {
        let mut order = Order::create("Eva").unwrap();
        for _ in 0..3 {
            assert!(matches!(order.close(), Err(OrderError::NoItems { .. })));
        }
        assert_eq!(order.status(), OrderStatus::Open);
    }

    #[test]
    fn closed_order_rejects_item_events() {
        let mut order = Order::create("Fabio").unwrap();
        order.add_line("Widget", Money::from_cents(100), 1).unwrap();
        order.close().unwrap();
        order.take_events();

        let _ = order.add_line("Gadget", Money::from_cents(100), 1);

        assert!(
            !order
                .pending_events()
                .iter()
                .any(|e| matches!(e, OrderEvent::ItemAdded(_)))
        );
    }
}
