//! In-memory integration tests for print-queue bulk operations and paging.

use super::helpers::{empty_repository, open_courier_request, operator};
use card_delivery::delivery::{
    domain::{DeliveryRequest, DeliveryState, PrintBatchId, ResidentId, ServiceAreaCode},
    ports::{DeliveryFilter, PageCursor},
    services::DeliveryConfig,
};
use eyre::{WrapErr, ensure};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn a_print_run_moves_the_whole_queue() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(open_courier_request(&repository, ResidentId::new()).await?.id());
    }
    let batch_id = PrintBatchId::new();

    let sent = repository
        .send_to_print(&ids, Some(batch_id), operator()?)
        .await?;
    let printed = repository.mark_printed(&ids, operator()?).await?;

    ensure!(sent.transitioned == ids);
    ensure!(printed.transitioned == ids);
    ensure!(printed.skipped.is_empty());
    let queue = repository.list_by_state(DeliveryState::Printed);
    ensure!(queue.len() == 3);
    ensure!(
        queue
            .iter()
            .all(|request| request.print_batch_id() == Some(batch_id)
                && request.milestones().printed_at.is_some())
    );
    for id in &ids {
        ensure!(repository.history(*id).await?.len() == 3);
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeating_a_print_run_skips_rows_already_moved() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let id = open_courier_request(&repository, ResidentId::new()).await?.id();
    repository.send_to_print(&[id], None, operator()?).await?;

    let repeated = repository.send_to_print(&[id], None, operator()?).await?;

    ensure!(repeated.transitioned.is_empty());
    ensure!(repeated.skipped == vec![id]);
    ensure!(repository.history(id).await?.len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn storage_pages_continue_past_the_view() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default().with_page_size(2)).await?;
    let mut created = Vec::new();
    for _ in 0..3 {
        created.push(open_courier_request(&repository, ResidentId::new()).await?);
    }
    created.sort_by_key(|request| std::cmp::Reverse((request.created_at(), request.id())));
    let area = ServiceAreaCode::new("JKT-PUSAT").wrap_err("build service area code")?;

    let first = repository
        .list_page(DeliveryFilter::ServiceArea(area.clone()), None)
        .await?;
    let cursor = first.last().map(PageCursor::at);
    let second = repository
        .list_page(DeliveryFilter::ServiceArea(area.clone()), cursor)
        .await?;

    ensure!(repository.list_by_service_area(&area).len() == 2);
    ensure!(first.len() == 2);
    let newest_first: Vec<_> = first.iter().chain(&second).map(DeliveryRequest::id).collect();
    let expected: Vec<_> = created.iter().map(DeliveryRequest::id).collect();
    ensure!(newest_first == expected, "pages out of order");
    Ok(())
}
