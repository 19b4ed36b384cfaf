//! End-to-end trading flow over the seeded world.
//!
//! Exercises the documented scenarios: the fee arithmetic on a known buy,
//! revaluation after price movement, conservation invariants across mixed
//! order/tick sequences, and the risk surface over real portfolio state.

use brokerd::config::Config;
use brokerd::engine::{
    run_market_pass, Brokerage, EngineError, MarketEvent, OrderExecutionEngine, OrderKind,
    PriceMove, RiskAnalysisEngine, RiskTier,
};

fn seeded(seed: u64) -> (Brokerage, OrderExecutionEngine) {
    let config = Config {
        rng_seed: Some(seed),
        ..Config::default()
    };
    let store = Brokerage::seeded(&config);
    let engine = OrderExecutionEngine::from_config(&config);
    (store, engine)
}

#[test]
fn documented_buy_scenario_hits_the_exact_numbers() {
    let (mut store, engine) = seeded(1);

    let txn = engine
        .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
        .unwrap();

    // gross 1500, fee max(1.5, 1.0) = 1.5, total 1501.5
    assert_eq!(txn.execution_price, 150.0);
    assert!((txn.fee - 1.5).abs() < 1e-9);
    assert!(
        (store.accounts.get("demo_user").unwrap().cash_balance - (10_000.0 - 1_501.5)).abs()
            < 1e-9
    );

    let holding = store
        .portfolios
        .portfolio("demo_user")
        .unwrap()
        .holding("AAPL")
        .unwrap()
        .clone();
    assert_eq!(holding.quantity, 10.0);
    assert_eq!(holding.average_cost, 150.0);
}

#[test]
fn revaluation_scenario_after_a_price_move() {
    let (mut store, engine) = seeded(2);
    engine
        .execute(&mut store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
        .unwrap();

    // Market impact from a 10-unit order is sub-cent; pin the quote to the
    // documented 160.0 and revalue.
    store.assets.apply_price_change("AAPL", 160.0, 0).unwrap();
    store.portfolios.revalue(&store.assets, "demo_user").unwrap();

    let portfolio = store.portfolios.portfolio("demo_user").unwrap();
    let holding = portfolio.holding("AAPL").unwrap();
    assert!((holding.current_value - 1_600.0).abs() < 1e-9);
    assert!((holding.unrealized_return - 100.0).abs() < 1e-9);
    assert!((holding.unrealized_return_pct - 6.666_666_666_666_667).abs() < 1e-6);
    assert!((portfolio.total_return - 100.0).abs() < 1e-9);
}

#[test]
fn mixed_session_preserves_conservation_invariants() {
    let (mut store, engine) = seeded(3);

    engine
        .execute(&mut store, OrderKind::Buy, "admin_user", "GOOGL", 4.0)
        .unwrap();
    engine
        .execute(&mut store, OrderKind::Buy, "admin_user", "TSLA", 10.0)
        .unwrap();
    run_market_pass(&mut store, PriceMove::Random, 0.05);
    engine
        .execute(&mut store, OrderKind::Sell, "admin_user", "TSLA", 3.0)
        .unwrap();
    run_market_pass(&mut store, PriceMove::Bear, 0.05);

    let portfolio = store.portfolios.portfolio("admin_user").unwrap();
    let invested: f64 = portfolio
        .holdings
        .iter()
        .map(|h| h.quantity * h.average_cost)
        .sum();
    let value: f64 = portfolio
        .holdings
        .iter()
        .map(|h| h.quantity * store.assets.get(&h.symbol).unwrap().price)
        .sum();
    assert!((portfolio.total_invested - invested).abs() < 1e-6);
    assert!((portfolio.total_value - value).abs() < 1e-6);
    assert!(store.accounts.get("admin_user").unwrap().cash_balance >= 0.0);
}

#[test]
fn rejected_orders_leave_the_world_unchanged() {
    let (mut store, engine) = seeded(4);

    let balance = store.accounts.get("demo_user").unwrap().cash_balance;
    let price = store.assets.get("GOOGL").unwrap().price;

    // 10 GOOGL at 2500 needs 25k; demo_user has 10k.
    let err = engine
        .execute(&mut store, OrderKind::Buy, "demo_user", "GOOGL", 10.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));

    let err = engine
        .execute(&mut store, OrderKind::Sell, "demo_user", "GOOGL", 1.0)
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientHoldings { .. }));

    assert_eq!(store.accounts.get("demo_user").unwrap().cash_balance, balance);
    assert_eq!(store.assets.get("GOOGL").unwrap().price, price);
    assert!(store.transactions.is_empty());
}

#[test]
fn crash_event_drops_every_quote_and_revalues_holders() {
    let (mut store, engine) = seeded(5);
    engine
        .execute(&mut store, OrderKind::Buy, "trader_user", "JNJ", 20.0)
        .unwrap();

    let before: Vec<f64> = store.assets.all().iter().map(|q| q.price).collect();
    run_market_pass(&mut store, MarketEvent::Crash.into(), 0.02);
    let after: Vec<f64> = store.assets.all().iter().map(|q| q.price).collect();

    for (b, a) in before.iter().zip(&after) {
        assert!(a < b, "crash must decrease every quote");
        assert!(*a >= b * 0.65 - 1e-9 && *a <= b * 0.85 + 1e-9);
    }

    let portfolio = store.portfolios.portfolio("trader_user").unwrap();
    let jnj = store.assets.get("JNJ").unwrap().price;
    assert!((portfolio.total_value - 20.0 * jnj).abs() < 1e-6);
    assert!(portfolio.total_return < 0.0);
}

#[test]
fn risk_surface_reflects_portfolio_composition() {
    let (mut store, engine) = seeded(6);
    let risk = RiskAnalysisEngine::new();

    // Everything in one technology name: poor diversification, high tier.
    engine
        .execute(&mut store, OrderKind::Buy, "admin_user", "MSFT", 30.0)
        .unwrap();
    let profile = risk.analyze(&store, "admin_user").unwrap();
    assert_eq!(profile.tier, RiskTier::High);
    assert!(profile.diversification_score < 40.0);

    let recommendations = risk.recommend(&mut store, "admin_user").unwrap();
    assert!(recommendations.len() <= 5);
    assert!(recommendations.iter().all(|r| r.symbol != "MSFT"));
}

#[test]
fn identical_seeds_replay_identically() {
    let (mut a, engine_a) = seeded(7);
    let (mut b, engine_b) = seeded(7);

    for (store, engine) in [(&mut a, &engine_a), (&mut b, &engine_b)] {
        engine
            .execute(store, OrderKind::Buy, "demo_user", "AAPL", 10.0)
            .unwrap();
        run_market_pass(store, PriceMove::Random, 0.02);
        run_market_pass(store, PriceMove::Recovery, 0.02);
    }

    let prices_a: Vec<f64> = a.assets.all().iter().map(|q| q.price).collect();
    let prices_b: Vec<f64> = b.assets.all().iter().map(|q| q.price).collect();
    assert_eq!(prices_a, prices_b);

    let pa = a.portfolios.portfolio("demo_user").unwrap();
    let pb = b.portfolios.portfolio("demo_user").unwrap();
    assert_eq!(pa.total_value, pb.total_value);
}
