//! Benchmarks for order aggregation.

use common::{CustomerId, GridPosition, LocationId, Money, OrderId};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use domain::{LineItem, Order, OrderItem, OrderLine};

fn build_items(order_id: OrderId, count: usize) -> Vec<OrderItem> {
    (0..count)
        .map(|i| {
            OrderItem::new(
                order_id,
                format!("SKU-{i:04}"),
                (i % 5 + 1) as u32,
                Money::from_cents(1000 + i as i64),
            )
        })
        .collect()
}

fn bench_order_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_totals");
    for count in [10, 100, 1000] {
        let order_id = OrderId::new();
        let items = build_items(order_id, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &items, |b, items| {
            b.iter(|| {
                let mut total_price = Money::zero();
                let mut total_quantity = 0u32;
                for item in items {
                    total_price += item.total_price();
                    total_quantity += item.quantity;
                }
                black_box(Order::place(
                    CustomerId::new(),
                    GridPosition::new(0.0, 0.0),
                    GridPosition::new(0.0, 0.0),
                    total_price,
                    total_quantity,
                ))
            })
        });
    }
    group.finish();
}

fn bench_line_quantity(c: &mut Criterion) {
    let line = OrderLine::new(
        OrderId::new(),
        LocationId::new(),
        (0..100u32)
            .map(|i| LineItem::new(format!("SKU-{i:04}"), i % 7 + 1))
            .collect(),
    );
    c.bench_function("line_quantity_100_items", |b| {
        b.iter(|| black_box(line.quantity()))
    });
}

criterion_group!(benches, bench_order_totals, bench_line_quantity);
criterion_main!(benches);
