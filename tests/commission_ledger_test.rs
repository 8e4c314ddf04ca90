//! End-to-end ledger flows against a real SQLite file.

use commission_ledger::db::init_db;
use commission_ledger::{
    CommissionLedger, CommissionRule, CommissionStatus, CreateOutcome, Decimal, LedgerError,
    OrderId, ProductId, Repository, ShopId, SkipReason, StoredRuleResolver, UserId,
};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

struct TestLedger {
    rules: Arc<StoredRuleResolver>,
    ledger: CommissionLedger,
    _temp_dir: TempDir,
}

async fn setup() -> TestLedger {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));
    let rules = Arc::new(StoredRuleResolver::new(repo.clone()));
    let ledger = CommissionLedger::new(repo, rules.clone());
    TestLedger {
        rules,
        ledger,
        _temp_dir: temp_dir,
    }
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn link(t: &TestLedger, shop: &str, owner: &str, product: &str, rule: CommissionRule) {
    t.rules
        .register_shop(ShopId::new(shop), UserId::new(owner), shop, true)
        .await
        .unwrap();
    t.rules
        .upsert_rule(ShopId::new(shop), ProductId::new(product), rule, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fifteen_percent_order_flow() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::percentage(d("15")).unwrap()).await;
    let shop = ShopId::new("S1");

    let outcome = t
        .ledger
        .create_commission(&shop, &OrderId::new("O1"), &ProductId::new("P1"), d("10000"), 2)
        .await
        .unwrap();
    let record = outcome.into_record().unwrap();
    assert_eq!(record.amount, d("3000"));
    assert_eq!(record.status, CommissionStatus::Pending);

    let summary = t.ledger.summarize(&shop).await.unwrap();
    assert_eq!(summary.total_pending, d("3000"));
    assert_eq!(summary.total_approved, d("0"));
    assert_eq!(summary.total_earnings, d("3000"));
    assert_eq!(summary.commissions_count, 1);

    t.ledger.approve(record.id).await.unwrap();
    let summary = t.ledger.summarize(&shop).await.unwrap();
    assert_eq!(summary.total_pending, d("0"));
    assert_eq!(summary.total_approved, d("3000"));

    let by_user = t.ledger.summarize_user(&UserId::new("U1")).await.unwrap();
    assert_eq!(by_user, summary);
}

#[tokio::test]
async fn test_rule_change_does_not_touch_existing_records() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::percentage(d("10")).unwrap()).await;
    let (shop, product) = (ShopId::new("S1"), ProductId::new("P1"));

    let first = t
        .ledger
        .create_commission(&shop, &OrderId::new("O1"), &product, d("1000"), 1)
        .await
        .unwrap()
        .into_record()
        .unwrap();

    t.rules
        .upsert_rule(
            shop.clone(),
            product.clone(),
            CommissionRule::fixed(d("7")).unwrap(),
            true,
        )
        .await
        .unwrap();

    let second = t
        .ledger
        .create_commission(&shop, &OrderId::new("O2"), &product, d("1000"), 1)
        .await
        .unwrap()
        .into_record()
        .unwrap();

    assert_eq!(t.ledger.get(first.id).await.unwrap().amount, d("100"));
    assert_eq!(second.amount, d("7"));
}

#[tokio::test]
async fn test_retry_after_deactivation_returns_existing() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::fixed(d("50")).unwrap()).await;
    let (shop, order, product) = (ShopId::new("S1"), OrderId::new("O1"), ProductId::new("P1"));

    let created = t
        .ledger
        .create_commission(&shop, &order, &product, d("10"), 2)
        .await
        .unwrap();
    assert!(created.is_created());

    t.rules
        .register_shop(shop.clone(), UserId::new("U1"), "S1", false)
        .await
        .unwrap();

    let retried = t
        .ledger
        .create_commission(&shop, &order, &product, d("10"), 2)
        .await
        .unwrap();
    assert_eq!(retried, CreateOutcome::Existing(created.into_record().unwrap()));

    let other = t
        .ledger
        .create_commission(&shop, &OrderId::new("O2"), &product, d("10"), 2)
        .await
        .unwrap();
    assert_eq!(other, CreateOutcome::Skipped(SkipReason::NotEligible));
}

#[tokio::test]
async fn test_concurrent_creates_yield_one_record() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::percentage(d("10")).unwrap()).await;
    let ledger = t.ledger.clone();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .create_commission(
                        &ShopId::new("S1"),
                        &OrderId::new("O1"),
                        &ProductId::new("P1"),
                        d("1000"),
                        3,
                    )
                    .await
            })
        })
        .collect();

    let outcomes: Vec<CreateOutcome> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let created = outcomes.iter().filter(|o| o.is_created()).count();
    assert_eq!(created, 1);

    let ids: std::collections::HashSet<_> = outcomes
        .iter()
        .map(|o| o.record().unwrap().id)
        .collect();
    assert_eq!(ids.len(), 1);

    let records = ledger.list_by_order(&OrderId::new("O1")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, d("300"));
}

#[tokio::test]
async fn test_concurrent_approve_and_cancel_one_wins() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::fixed(d("100")).unwrap()).await;

    let record = t
        .ledger
        .create_commission(
            &ShopId::new("S1"),
            &OrderId::new("O1"),
            &ProductId::new("P1"),
            d("0"),
            1,
        )
        .await
        .unwrap()
        .into_record()
        .unwrap();

    let (a, b) = (t.ledger.clone(), t.ledger.clone());
    let approve = tokio::spawn(async move { a.approve(record.id).await });
    let cancel = tokio::spawn(async move { b.cancel(record.id).await });
    let results = [approve.await.unwrap(), cancel.await.unwrap()];

    let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(ok.len(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LedgerError::InvalidStateTransition { .. })
    )));

    let stored = t.ledger.get(record.id).await.unwrap();
    assert_eq!(stored.status, ok[0].status);
}

#[tokio::test]
async fn test_cancel_for_order_leaves_approved() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::fixed(d("10")).unwrap()).await;
    t.rules
        .upsert_rule(
            ShopId::new("S1"),
            ProductId::new("P2"),
            CommissionRule::fixed(d("20")).unwrap(),
            true,
        )
        .await
        .unwrap();

    let shop = ShopId::new("S1");
    let order = OrderId::new("O1");
    let approved = t
        .ledger
        .create_commission(&shop, &order, &ProductId::new("P1"), d("0"), 1)
        .await
        .unwrap()
        .into_record()
        .unwrap();
    t.ledger.approve(approved.id).await.unwrap();
    t.ledger
        .create_commission(&shop, &order, &ProductId::new("P2"), d("0"), 1)
        .await
        .unwrap();

    let cancelled = t.ledger.cancel_for_order(&order).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].product_id, ProductId::new("P2"));

    let summary = t.ledger.summarize(&shop).await.unwrap();
    assert_eq!(summary.total_approved, d("10"));
    assert_eq!(summary.total_pending, d("0"));
    assert_eq!(summary.commissions_count, 2);

    assert!(t.ledger.cancel_for_order(&order).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_shop_newest_first_with_filter() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::fixed(d("1")).unwrap()).await;
    let shop = ShopId::new("S1");

    let mut ids = Vec::new();
    for n in 0..3 {
        let r = t
            .ledger
            .create_commission(&shop, &OrderId::new(format!("O{}", n)), &ProductId::new("P1"), d("0"), 1)
            .await
            .unwrap()
            .into_record()
            .unwrap();
        ids.push(r.id);
    }
    t.ledger.cancel(ids[1]).await.unwrap();

    let all = t.ledger.list_by_shop(&shop, None).await.unwrap();
    let listed: Vec<_> = all.iter().map(|r| r.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);

    let pending = t
        .ledger
        .list_by_shop(&shop, Some(CommissionStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|r| r.status == CommissionStatus::Pending));

    assert_eq!(t.ledger.list_all_pending().await.unwrap().len(), 2);
}

/// Deterministic step generator so failures replay identically.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

async fn assert_summary_matches_records(t: &TestLedger, shop: &ShopId) {
    let summary = t.ledger.summarize(shop).await.unwrap();
    let records = t.ledger.list_by_shop(shop, None).await.unwrap();

    let live: Decimal = records
        .iter()
        .filter(|r| r.status != CommissionStatus::Cancelled)
        .map(|r| r.amount)
        .sum();
    let pending: Decimal = records
        .iter()
        .filter(|r| r.status == CommissionStatus::Pending)
        .map(|r| r.amount)
        .sum();

    assert_eq!(summary.total_earnings, live);
    assert_eq!(summary.total_pending, pending);
    assert_eq!(summary.total_pending + summary.total_approved, summary.total_earnings);
    assert_eq!(summary.commissions_count, records.len() as i64);
}

#[tokio::test]
async fn test_summary_consistent_over_mixed_operations() {
    let t = setup().await;
    link(&t, "S1", "U1", "P1", CommissionRule::percentage(d("12.5")).unwrap()).await;
    t.rules
        .upsert_rule(
            ShopId::new("S1"),
            ProductId::new("P2"),
            CommissionRule::fixed(d("40")).unwrap(),
            true,
        )
        .await
        .unwrap();
    let shop = ShopId::new("S1");
    let products = [ProductId::new("P1"), ProductId::new("P2")];

    let mut rng = Lcg(7);
    let mut ids = Vec::new();
    let mut rejected_transitions = 0;

    for step in 0..80 {
        match rng.next(4) {
            // create, sometimes repeating an earlier order line
            0 | 1 => {
                let order = OrderId::new(format!("O{}", rng.next(20)));
                let product = &products[rng.next(2) as usize];
                let price = Decimal::from_units(rng.next(5000) as i64);
                let quantity = rng.next(5) as i64;
                let outcome = t
                    .ledger
                    .create_commission(&shop, &order, product, price, quantity)
                    .await
                    .unwrap();
                if let CreateOutcome::Created(record) = outcome {
                    ids.push(record.id);
                }
            }
            op @ (2 | 3) if !ids.is_empty() => {
                let id = ids[rng.next(ids.len() as u64) as usize];
                let result = if op == 2 {
                    t.ledger.approve(id).await
                } else {
                    t.ledger.cancel(id).await
                };
                match result {
                    Ok(_) => {}
                    Err(LedgerError::InvalidStateTransition { .. }) => rejected_transitions += 1,
                    Err(e) => panic!("step {}: unexpected error {:?}", step, e),
                }
            }
            _ => {
                let err = t.ledger.approve(uuid::Uuid::new_v4()).await.unwrap_err();
                assert!(matches!(err, LedgerError::NotFound { .. }));
            }
        }

        assert_summary_matches_records(&t, &shop).await;
    }

    assert!(!ids.is_empty());
    // At most one of these can succeed on the same record.
    for result in [t.ledger.cancel(ids[0]).await, t.ledger.approve(ids[0]).await] {
        if let Err(e) = result {
            assert!(matches!(e, LedgerError::InvalidStateTransition { .. }));
            rejected_transitions += 1;
        }
    }
    assert!(rejected_transitions > 0);
    assert_summary_matches_records(&t, &shop).await;
}
