use super::*;
use promo_watcher::models::{ExtractedObservation, PromotionDecision};

#[tokio::test]
async fn test_failing_product_does_not_stop_cycle() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let broken = product_url("MLB-2-broken");
    let healthy = product_url("MLB-3-healthy");

    let broken_id = ctx.store.add_product(&broken, "Broken", 100.0, 0.0).await?;
    let healthy_id = ctx.store.add_product(&healthy, "Healthy", 100.0, 0.0).await?;
    ctx.store.update_price(broken_id, 150.0).await?;

    ctx.source.script(&broken, vec![Page::Status(503)]);
    ctx.source.script(&healthy, vec![Page::Offer(ExtractedObservation::new(120.0))]);

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);

    // failed product keeps its stale price and check time
    let broken = ctx.store.get_by_id(broken_id).await?;
    assert_eq!(broken.current_price, 150.0);

    let healthy = ctx.store.get_by_id(healthy_id).await?;
    assert_eq!(healthy.current_price, 120.0);
    assert!(healthy.last_checked_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_missing_price_keeps_previous_value() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-4-no-price");
    let id = ctx.store.add_product(&url, "Headphones", 200.0, 0.0).await?;
    ctx.store.update_price(id, 250.0).await?;
    ctx.source.script(&url, vec![Page::NoPrice]);

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.failed, 1);
    assert_eq!(ctx.store.get_by_id(id).await?.current_price, 250.0);
    assert!(ctx.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_target_price_notifies_once() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-5-notebook");
    let id = ctx.store.add_product(&url, "Notebook", 3000.0, 0.0).await?;
    ctx.store.update_price(id, 3200.0).await?;
    ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(2999.0))]);

    let first = ctx.tracker.check_one(id).await?;
    assert!(first.notified);
    match first.decision {
        PromotionDecision::TargetPriceReached {
            effective_price,
            target,
            ..
        } => {
            assert_eq!(effective_price, 2999.0);
            assert_eq!(target, 3000.0);
        }
        other => panic!("unexpected decision {:?}", other),
    }

    // same price on the following cycles stays silent
    for _ in 0..2 {
        let summary = ctx.tracker.run_cycle().await?;
        assert_eq!(summary.notifications_sent, 0);
    }
    assert_eq!(ctx.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_target_discount_notifies_once() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-6-phone");
    let id = ctx.store.add_product(&url, "Phone", 0.0, 15.0).await?;
    ctx.store.update_price(id, 1000.0).await?;
    ctx.source.script(
        &url,
        vec![Page::Offer(
            ExtractedObservation::new(800.0)
                .with_original_price(1000.0)
                .with_discount(20.0)
                .with_name("Phone"),
        )],
    );

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.notifications_sent, 1);

    let stored = ctx.store.get_by_id(id).await?;
    assert_eq!(stored.current_price, 800.0);
    assert_eq!(stored.original_price, 1000.0);
    assert_eq!(stored.discount_percent, 20.0);

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.notifications_sent, 0);

    let sent = ctx.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("Discount: 20.0% (target: 15.0%)"));
    assert!(sent[0].message.contains("Original price: R$ 1000.00"));
    Ok(())
}

#[tokio::test]
async fn test_discount_below_target_is_silent() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-7-tv");
    ctx.store.add_product(&url, "TV", 0.0, 30.0).await?;
    ctx.source.script(
        &url,
        vec![Page::Offer(ExtractedObservation::new(900.0).with_original_price(1000.0).with_discount(10.0))],
    );

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.notifications_sent, 0);
    Ok(())
}

#[tokio::test]
async fn test_inactive_products_are_skipped() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-8-removed");
    let id = ctx.store.add_product(&url, "Removed", 10.0, 0.0).await?;
    ctx.store.deactivate(id).await?;

    let summary = ctx.tracker.run_cycle().await?;
    assert_eq!(summary.checked, 0);
    assert_eq!(ctx.source.fetch_count(&url), 0);
    assert!(ctx.tracker.check_one(id).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_concurrent_checks_of_one_product_notify_once() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-9-console");
    let id = ctx.store.add_product(&url, "Console", 2500.0, 0.0).await?;
    ctx.store.update_price(id, 2700.0).await?;
    ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(2400.0))]);

    let (cycle, manual) = tokio::join!(ctx.tracker.run_cycle(), ctx.tracker.check_one(id));
    cycle?;
    manual?;

    assert_eq!(ctx.source.fetch_count(&url), 2);
    assert_eq!(ctx.notifier.sent().len(), 1);
    Ok(())
}
