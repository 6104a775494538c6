use std::sync::{Arc, Barrier};
use std::thread;

use chrono::Duration;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use storefront_auth::{Actor, RoleRegistry};
use storefront_basket::BasketEntry;
use storefront_catalog::{Address, NewProduct};
use storefront_core::{ProductId, ShopId, SystemClock, UserId};
use storefront_infra::{ReservationManager, StorefrontConfig, StorefrontServices};
use storefront_orders::{DeliveryType, PaymentType};

fn stock() -> ReservationManager {
    ReservationManager::new(Arc::new(SystemClock), Duration::minutes(15))
}

/// Single-threaded reserve + release round trip on one row.
fn bench_reserve_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_release");
    group.throughput(Throughput::Elements(1));

    let stock = stock();
    let (product, shop) = (ProductId::new(), ShopId::new());
    stock.register_availability(product, shop, i64::MAX / 2).unwrap();
    let user = UserId::new();

    group.bench_function("one_row", |b| {
        b.iter(|| {
            let r = stock.reserve(user, product, shop, black_box(1)).unwrap();
            stock.release(r.id).unwrap();
        })
    });

    group.finish();
}

/// Parallel reservations: all threads on one row vs. one row per thread.
fn bench_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("reserve_contention");
    let per_thread = 500;

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * per_thread) as u64));

        for shared in [true, false] {
            let label = if shared { "shared_row" } else { "row_per_thread" };
            group.bench_with_input(BenchmarkId::new(label, threads), &threads, |b, &threads| {
                b.iter(|| {
                    let stock = Arc::new(stock());
                    let shop = ShopId::new();
                    let shared_product = ProductId::new();
                    stock.register_availability(shared_product, shop, i64::MAX / 2).unwrap();

                    let barrier = Arc::new(Barrier::new(threads));
                    let handles: Vec<_> = (0..threads)
                        .map(|_| {
                            let stock = stock.clone();
                            let barrier = barrier.clone();
                            let product = if shared {
                                shared_product
                            } else {
                                let own = ProductId::new();
                                stock.register_availability(own, shop, i64::MAX / 2).unwrap();
                                own
                            };
                            thread::spawn(move || {
                                let user = UserId::new();
                                barrier.wait();
                                for _ in 0..per_thread {
                                    black_box(stock.reserve(user, product, shop, 1).unwrap());
                                }
                            })
                        })
                        .collect();
                    for h in handles {
                        h.join().unwrap();
                    }
                })
            });
        }
    }

    group.finish();
}

/// Place + finish an order end to end.
fn bench_order_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_lifecycle");
    group.sample_size(200);

    let app = StorefrontServices::build(
        StorefrontConfig::default(),
        Arc::new(SystemClock),
        Arc::new(RoleRegistry::new()),
    );
    let category = app.catalog.add_category(Actor::System, "Bench", false).unwrap();
    let shop = app.catalog.add_shop(Actor::System, "Bench shop", Address::default()).unwrap();
    let items: Vec<BasketEntry> = (0..5)
        .map(|i| {
            let product = app
                .catalog
                .add_product(Actor::System, NewProduct::new(format!("Item {i}"), 100, category.id))
                .unwrap();
            app.catalog
                .register_availability(Actor::System, product.id, shop.id, i64::MAX / 2)
                .unwrap();
            BasketEntry {
                product: product.id,
                amount: 1,
            }
        })
        .collect();

    group.bench_function("place_and_finish_5_lines", |b| {
        b.iter(|| {
            let user = UserId::new();
            let order = app
                .workflow
                .place_order(
                    Actor::System,
                    user,
                    shop.id,
                    black_box(&items),
                    DeliveryType::Pickup,
                    PaymentType::Postpayment,
                )
                .unwrap();
            app.workflow.mark_ready(Actor::System, order.id_typed()).unwrap();
            app.workflow.dispatch(Actor::System, order.id_typed()).unwrap();
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_reserve_release,
    bench_contention,
    bench_order_lifecycle
);
criterion_main!(benches);
