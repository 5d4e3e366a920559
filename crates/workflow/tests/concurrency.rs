//! Races on one shared ledger: claim transitions and stock guards under
//! concurrent engines.

use anyhow::Result;
use rust_decimal::Decimal;

use bookstall_catalog::Book;
use bookstall_core::{BookId, CreditLevelId, CustomerId, DomainError, OrderId};
use bookstall_inventory::{OutOfStockSource, OutOfStockStatus, Priority, StockLevel};
use bookstall_parties::{CreditLevel, Customer};
use bookstall_sales::OrderStatus;
use bookstall_store::{InMemoryLedger, LedgerStore};
use bookstall_workflow::{OrderBuilder, PaymentSettlement, ReplenishmentEngine, ShipmentEngine};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

const LEVEL: CreditLevelId = CreditLevelId::new(1);

struct Race {
    ledger: InMemoryLedger,
    customer_id: CustomerId,
    book: BookId,
}

async fn seed(stock: i64) -> Result<Race> {
    bookstall_observability::init();

    let ledger = InMemoryLedger::new();
    let customer_id = CustomerId::new();
    let book = BookId::from("B-RACE");

    let mut tx = ledger.begin().await?;
    tx.insert_credit_level(&CreditLevel::new(LEVEL, "Standard", dec("0.85"), dec("0"))?)
        .await?;
    tx.insert_customer(&Customer::new(customer_id, "Robin", dec("1000.00"), LEVEL)?)
        .await?;
    tx.insert_book(&Book::new(book.clone(), "The Contested Copy", dec("10.00"))?)
        .await?;
    tx.upsert_stock(&StockLevel::new(book.clone(), stock, 0)?)
        .await?;
    tx.commit().await?;

    Ok(Race {
        ledger,
        customer_id,
        book,
    })
}

async fn balance_of(ledger: &InMemoryLedger, id: CustomerId) -> Result<Decimal> {
    let mut tx = ledger.begin().await?;
    Ok(tx.find_customer(id).await?.expect("customer").balance())
}

async fn stock_of(ledger: &InMemoryLedger, book: &BookId) -> Result<i64> {
    let mut tx = ledger.begin().await?;
    Ok(tx.find_stock(book).await?.map_or(0, |s| s.quantity()))
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_settlements_claim_an_order_exactly_once() -> Result<()> {
    let race = seed(10).await?;
    let order_id = OrderBuilder::new(race.ledger.clone())
        .build_order(race.customer_id, &[(race.book.clone(), 1)])
        .await?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let settlement = PaymentSettlement::new(race.ledger.clone());
        handles.push(tokio::spawn(
            async move { settlement.pay_order(order_id).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(
                err.as_domain(),
                Some(DomainError::InvalidState { .. })
            )),
        }
    }
    assert_eq!(successes, 1);

    // One claim, one debit: 1000.00 less a single 8.50 payable.
    assert_eq!(
        balance_of(&race.ledger, race.customer_id).await?,
        dec("991.50")
    );
    let mut tx = race.ledger.begin().await?;
    let order = tx.find_order(order_id).await?.expect("order");
    assert_eq!(order.status(), OrderStatus::PendingShipment);
    assert!(order.paid_at().is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn racing_shipments_never_drive_stock_negative() -> Result<()> {
    let race = seed(5).await?;
    let builder = OrderBuilder::new(race.ledger.clone());
    let settlement = PaymentSettlement::new(race.ledger.clone());

    // Four settled orders of two copies each contend for five on hand.
    let mut order_ids: Vec<OrderId> = Vec::new();
    for _ in 0..4 {
        let id = builder
            .build_order(race.customer_id, &[(race.book.clone(), 2)])
            .await?;
        settlement.pay_order(id).await?;
        order_ids.push(id);
    }

    let mut handles = Vec::new();
    for (n, order_id) in order_ids.iter().copied().enumerate() {
        let shipping = ShipmentEngine::new(race.ledger.clone());
        let tracking = format!("CF-{n:05}");
        handles.push(tokio::spawn(async move {
            shipping
                .ship_order(order_id, "Coastal Freight", &tracking, "alex")
                .await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => winners += 1,
            Err(err) => assert!(matches!(
                err.as_domain(),
                Some(DomainError::InsufficientStock { .. })
            )),
        }
    }

    // Two orders of two fit into five copies; the rest must lose, and the
    // shelf never goes below zero.
    assert_eq!(winners, 2);
    let remaining = stock_of(&race.ledger, &race.book).await?;
    assert_eq!(remaining, 5 - 2 * winners);
    assert!(remaining >= 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_registrations_fold_into_one_record() -> Result<()> {
    let race = seed(0).await?;

    let mut handles = Vec::new();
    for quantity in 1..=8i64 {
        let replenishment = ReplenishmentEngine::new(race.ledger.clone());
        let book = race.book.clone();
        handles.push(tokio::spawn(async move {
            replenishment
                .register_out_of_stock(book, quantity, OutOfStockSource::Manual, Priority::Normal)
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await??);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1, "every registration merged into one record");

    let mut tx = race.ledger.begin().await?;
    let record = tx.find_out_of_stock(ids[0]).await?.expect("record");
    assert_eq!(record.required_quantity(), (1..=8).sum::<i64>());
    assert_eq!(record.status(), OutOfStockStatus::Pending);
    Ok(())
}
