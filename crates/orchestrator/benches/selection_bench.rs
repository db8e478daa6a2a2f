//! Benchmarks for nearest-location selection under growing location sets.

use common::{CustomerId, GridPosition, LocationId, Money, ProductId};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use locations::{InMemoryLocationDirectory, LocationCache, OrderLocation};
use orchestrator::{
    InMemoryLocationService, InMemoryNotifier, OrderPlacementOrchestrator, PlacementRequest,
    RequestedItem,
};
use order_store::InMemoryOrderStore;
use tokio::runtime::Runtime;

fn build_orchestrator(
    location_count: usize,
) -> (
    OrderPlacementOrchestrator<InMemoryOrderStore, InMemoryLocationService, InMemoryNotifier>,
    Vec<OrderLocation>,
    InMemoryLocationService,
) {
    let locations: Vec<OrderLocation> = (0..location_count)
        .map(|i| {
            OrderLocation::new(
                LocationId::new(),
                GridPosition::new(i as f64, (location_count - i) as f64),
            )
        })
        .collect();

    let rt = Runtime::new().unwrap();
    let cache = LocationCache::new();
    rt.block_on(async {
        let directory = InMemoryLocationDirectory::new(locations.clone());
        cache.refresh(&directory).await.unwrap();
    });

    let service = InMemoryLocationService::new();
    for location in &locations {
        service.set_stock(location.id, "SKU-001", u32::MAX / 2);
    }

    let orchestrator = OrderPlacementOrchestrator::new(
        InMemoryOrderStore::new(),
        cache,
        service.clone(),
        InMemoryNotifier::new(),
    );
    (orchestrator, locations, service)
}

fn request() -> PlacementRequest {
    PlacementRequest {
        customer_id: CustomerId::new(),
        shipping: GridPosition::new(0.0, 0.0),
        billing: GridPosition::new(0.0, 0.0),
        items: vec![RequestedItem {
            product_id: ProductId::new("SKU-001"),
            quantity: 1,
            unit_price: Money::from_cents(1000),
        }],
    }
}

fn bench_placement_over_location_counts(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("placement_selection");

    for count in [10, 100, 1000] {
        let (orchestrator, _, _) = build_orchestrator(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.to_async(&rt)
                .iter(|| async { black_box(orchestrator.place(request()).await.unwrap()) })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_placement_over_location_counts);
criterion_main!(benches);
