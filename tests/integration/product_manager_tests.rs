use super::*;
use promo_watcher::AppError;
use promo_watcher::models::{ExtractedObservation, TargetSpec, UNNAMED_PRODUCT};

#[tokio::test]
async fn test_add_records_first_observation() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-10-monitor");
    ctx.source.script(
        &url,
        vec![Page::Offer(
            ExtractedObservation::new(899.0)
                .with_original_price(1099.0)
                .with_discount(18.0)
                .with_name("Monitor 27"),
        )],
    );

    let outcome = ctx.manager.add_tracking(&url, TargetSpec::discount(25.0)).await?;
    let product = outcome.product;
    assert_eq!(product.name, "Monitor 27");
    assert_eq!(product.current_price, 899.0);
    assert_eq!(product.original_price, 1099.0);
    assert_eq!(product.discount_percent, 18.0);
    assert_eq!(product.target_discount_percent, 25.0);
    assert!(product.is_active);
    assert!(outcome.observation.is_some());

    // adding never alerts, even when a goal is already met
    assert!(ctx.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_add_duplicate_url_rejected() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-11-chair");
    ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(500.0))]);

    ctx.manager.add_tracking(&url, TargetSpec::price(450.0)).await?;
    let err = ctx.manager.add_tracking(&url, TargetSpec::price(400.0)).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateTracking { .. }));
    assert_eq!(ctx.manager.list_active().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_removed_url_can_be_tracked_again() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-12-desk");
    ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(700.0))]);

    let first = ctx.manager.add_tracking(&url, TargetSpec::price(650.0)).await?;
    let removed = ctx.manager.remove_tracking(first.product.id).await?;
    assert_eq!(removed.id, first.product.id);

    let second = ctx.manager.add_tracking(&url, TargetSpec::price(600.0)).await?;
    assert_ne!(second.product.id, first.product.id);

    let active = ctx.manager.list_active().await?;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].target_price, 600.0);
    assert_eq!(ctx.store.list_all().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_add_survives_unreachable_page() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    let url = product_url("MLB-13-offline");
    ctx.source.script(&url, vec![Page::Status(500)]);

    let outcome = ctx.manager.add_tracking(&url, TargetSpec::price(100.0)).await?;
    assert!(outcome.observation.is_none());
    assert_eq!(outcome.product.name, UNNAMED_PRODUCT);
    assert_eq!(outcome.product.current_price, 0.0);
    assert!(!outcome.product.has_been_checked());
    Ok(())
}

#[tokio::test]
async fn test_add_unsupported_url() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;

    let err = ctx
        .manager
        .add_tracking("https://www.amazon.com.br/dp/B000", TargetSpec::price(10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnsupportedSource { .. }));
    assert!(ctx.store.list_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_active_in_id_order() -> anyhow::Result<()> {
    let ctx = create_test_context().await?;
    for slug in ["MLB-20-a", "MLB-21-b", "MLB-22-c"] {
        let url = product_url(slug);
        ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(10.0))]);
        ctx.manager.add_tracking(&url, TargetSpec::price(5.0)).await?;
    }

    let middle = ctx.manager.list_active().await?[1].id;
    ctx.manager.remove_tracking(middle).await?;

    let ids: Vec<i64> = ctx.manager.list_active().await?.iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] < ids[1]);
    assert!(!ids.contains(&middle));

    let err = ctx.manager.remove_tracking(middle).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn test_cycle_during_add_does_not_alert() -> anyhow::Result<()> {
    // the first reading already meets the goal; adding must stay silent even
    // when a cycle runs at the same time
    let ctx = create_test_context().await?;
    for n in 0..20 {
        let url = product_url(&format!("MLB-30{}-race", n));
        ctx.source.script(&url, vec![Page::Offer(ExtractedObservation::new(2999.0))]);

        let (added, cycle) = tokio::join!(
            ctx.manager.add_tracking(&url, TargetSpec::price(3000.0)),
            ctx.tracker.run_cycle()
        );
        added?;
        cycle?;
    }

    assert!(ctx.notifier.sent().is_empty());
    Ok(())
}
