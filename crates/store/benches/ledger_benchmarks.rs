use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;

use bookstall_core::{BookId, CreditLevelId, CustomerId, OrderId, OrderItemId};
use bookstall_parties::Customer;
use bookstall_sales::{OrderStatus, SalesOrder, SalesOrderItem, price_line};
use bookstall_store::{InMemoryLedger, LedgerStore};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn test_order(customer_id: CustomerId) -> (SalesOrder, SalesOrderItem) {
    let order_id = OrderId::new();
    let price = price_line(dec("100.00"), dec("0.85"), 2).unwrap();
    let item = SalesOrderItem::new(
        OrderItemId::new(),
        order_id,
        BookId::from("B1001"),
        2,
        price,
    )
    .unwrap();
    let order = SalesOrder::new(
        order_id,
        customer_id,
        dec("0.85"),
        std::slice::from_ref(&item),
        Utc::now(),
    )
    .unwrap();
    (order, item)
}

fn setup_ledger(rt: &Runtime) -> (InMemoryLedger, CustomerId) {
    let ledger = InMemoryLedger::new();
    // A balance large enough that iterations never drain it.
    let customer = Customer::new(
        CustomerId::new(),
        "Bench Customer",
        dec("1000000000000.00"),
        CreditLevelId::new(1),
    )
    .unwrap();
    let customer_id = customer.id();
    rt.block_on(async {
        let mut tx = ledger.begin().await.unwrap();
        tx.insert_customer(&customer).await.unwrap();
        tx.commit().await.unwrap();
    });
    (ledger, customer_id)
}

fn bench_transaction_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("ledger_transaction_latency");
    group.sample_size(1000);

    group.bench_function("begin_commit_empty", |b| {
        let ledger = InMemoryLedger::new();
        b.iter(|| {
            rt.block_on(async {
                let tx = ledger.begin().await.unwrap();
                tx.commit().await.unwrap();
            });
        });
    });

    // The settlement write shape: CAS the order status, then a guarded debit.
    group.bench_function("settle_order_fresh", |b| {
        let (ledger, customer_id) = setup_ledger(&rt);
        b.iter(|| {
            rt.block_on(async {
                let (order, item) = test_order(customer_id);
                let mut tx = ledger.begin().await.unwrap();
                tx.insert_order(&order).await.unwrap();
                tx.insert_order_item(&item).await.unwrap();
                let flipped = tx
                    .transition_order(
                        order.id(),
                        OrderStatus::PendingPayment,
                        OrderStatus::PendingShipment,
                        Utc::now(),
                    )
                    .await
                    .unwrap();
                assert!(flipped);
                let debited = tx
                    .debit_customer_balance(customer_id, black_box(order.payable_amount()))
                    .await
                    .unwrap();
                assert!(debited);
                tx.commit().await.unwrap();
            });
        });
    });

    group.finish();
}

fn bench_write_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("ledger_write_throughput");

    for batch_size in [1, 10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::new("insert_order_lines", batch_size),
            batch_size,
            |b, &size| {
                let (ledger, customer_id) = setup_ledger(&rt);
                b.iter(|| {
                    rt.block_on(async {
                        let order_id = OrderId::new();
                        let mut items = Vec::with_capacity(size);
                        for _ in 0..size {
                            let price = price_line(dec("10.00"), dec("0.85"), 1).unwrap();
                            items.push(
                                SalesOrderItem::new(
                                    OrderItemId::new(),
                                    order_id,
                                    BookId::from("B1001"),
                                    1,
                                    price,
                                )
                                .unwrap(),
                            );
                        }
                        let order = SalesOrder::new(
                            order_id,
                            customer_id,
                            dec("0.85"),
                            &items,
                            Utc::now(),
                        )
                        .unwrap();

                        let mut tx = ledger.begin().await.unwrap();
                        tx.insert_order(&order).await.unwrap();
                        for item in &items {
                            tx.insert_order_item(black_box(item)).await.unwrap();
                        }
                        tx.commit().await.unwrap();
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_transaction_latency, bench_write_throughput);
criterion_main!(benches);
