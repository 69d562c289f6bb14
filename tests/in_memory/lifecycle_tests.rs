//! In-memory integration tests for the delivery lifecycle.

use super::helpers::{dispatch, edges, empty_repository, fire, open_courier_request, operator};
use card_delivery::delivery::{
    domain::{
        Actor, DeliveryEvidence, DeliveryPreferences, DeliveryState, FailureReason,
        ResidentId, StreetCorrection, TimeSlot, Trigger,
    },
    services::{DeliveryConfig, DeliveryServiceError},
};
use chrono::NaiveDate;
use eyre::{WrapErr, bail, ensure};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_attempt_rescheduled_then_confirmed_by_resident() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let owner = ResidentId::new();
    let created = open_courier_request(&repository, owner).await?;
    let id = created.id();

    dispatch(&repository, id).await?;
    fire(
        &repository,
        id,
        Trigger::MarkFailed(FailureReason::NotHome),
        operator()?,
    )
    .await?;
    let Some(date) = NaiveDate::from_ymd_opt(2026, 3, 14) else {
        bail!("valid reschedule date");
    };
    let rescheduled = fire(
        &repository,
        id,
        Trigger::Reschedule(DeliveryPreferences::on(date, Some(TimeSlot::Morning))),
        Actor::resident(owner),
    )
    .await?;
    ensure!(rescheduled.state() == DeliveryState::Printed);
    ensure!(rescheduled.failed_attempts() == 1);
    ensure!(rescheduled.failure_reason().is_none());
    ensure!(rescheduled.milestones().out_for_delivery_at.is_none());

    fire(&repository, id, Trigger::Dispatch, operator()?).await?;
    let evidence = DeliveryEvidence::new("proof/handover.jpg", "proof/signature.png")
        .wrap_err("build delivery evidence")?;
    let delivered = fire(
        &repository,
        id,
        Trigger::ConfirmDelivery(evidence),
        Actor::resident(owner),
    )
    .await?;

    ensure!(delivered.state() == DeliveryState::Delivered);
    ensure!(delivered.confirmation().is_some());
    ensure!(delivered.milestones().delivered_at.is_some());
    let history = repository.history(id).await?;
    ensure!(
        edges(&history)
            == vec![
                (None, DeliveryState::Requested),
                (Some(DeliveryState::Requested), DeliveryState::Printing),
                (Some(DeliveryState::Printing), DeliveryState::Printed),
                (Some(DeliveryState::Printed), DeliveryState::OutForDelivery),
                (Some(DeliveryState::OutForDelivery), DeliveryState::DeliveryFailed),
                (Some(DeliveryState::DeliveryFailed), DeliveryState::Printed),
                (Some(DeliveryState::Printed), DeliveryState::OutForDelivery),
                (Some(DeliveryState::OutForDelivery), DeliveryState::Delivered),
            ],
        "unexpected history {:?}",
        edges(&history)
    );
    ensure!(
        history
            .windows(2)
            .all(|pair| matches!(pair, [earlier, later] if earlier.recorded_at() <= later.recorded_at()))
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn two_failures_escalate_and_staff_can_retry() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let owner = ResidentId::new();
    let id = open_courier_request(&repository, owner).await?.id();

    dispatch(&repository, id).await?;
    fire(
        &repository,
        id,
        Trigger::MarkFailed(FailureReason::WrongAddress),
        operator()?,
    )
    .await?;
    let corrected = fire(
        &repository,
        id,
        Trigger::UpdateAddress(StreetCorrection::new("Jl. Cikini Raya 75")),
        Actor::resident(owner),
    )
    .await?;
    ensure!(
        corrected
            .destination()
            .address()
            .is_some_and(|address| address.street_line() == "Jl. Cikini Raya 75")
    );

    fire(&repository, id, Trigger::Dispatch, operator()?).await?;
    let escalated = fire(
        &repository,
        id,
        Trigger::MarkFailed(FailureReason::NotHome),
        operator()?,
    )
    .await?;
    ensure!(escalated.state() == DeliveryState::PickupRequired);
    ensure!(escalated.failed_attempts() == 2);
    ensure!(escalated.failure_reason() == Some(FailureReason::NotHome));
    ensure!(
        repository.list_by_state(DeliveryState::PickupRequired) == vec![escalated.clone()]
    );

    let retried = fire(&repository, id, Trigger::RetryFromPickup, operator()?).await?;
    ensure!(retried.state() == DeliveryState::Printed);
    ensure!(retried.failed_attempts() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delivered_requests_are_final() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let owner = ResidentId::new();
    let id = open_courier_request(&repository, owner).await?.id();
    dispatch(&repository, id).await?;
    let delivered = fire(&repository, id, Trigger::MarkDelivered, operator()?).await?;

    let result = fire(
        &repository,
        id,
        Trigger::MarkFailed(FailureReason::Refused),
        operator()?,
    )
    .await;

    let Err(report) = result else {
        bail!("a delivered request accepted another transition");
    };
    ensure!(matches!(
        report.downcast_ref::<DeliveryServiceError>(),
        Some(DeliveryServiceError::InvalidTransition(_))
    ));
    ensure!(repository.get_by_id(id)? == delivered);
    ensure!(repository.history(id).await?.len() == 5);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn residents_only_see_their_own_requests() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let first_owner = ResidentId::new();
    let second_owner = ResidentId::new();
    let mine = open_courier_request(&repository, first_owner).await?;
    open_courier_request(&repository, second_owner).await?;

    let listed = repository.list_by_owner(first_owner);

    ensure!(listed == vec![mine]);
    ensure!(repository.list_by_state(DeliveryState::Requested).len() == 2);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn staff_handover_after_reschedule_records_every_step() -> eyre::Result<()> {
    let repository = empty_repository(DeliveryConfig::default()).await?;
    let owner = ResidentId::new();
    let id = open_courier_request(&repository, owner).await?.id();
    dispatch(&repository, id).await?;
    let failed = fire(
        &repository,
        id,
        Trigger::MarkFailed(FailureReason::NotHome),
        operator()?,
    )
    .await?;
    ensure!(failed.state() == DeliveryState::DeliveryFailed);
    ensure!(failed.failed_attempts() == 1);
    let Some(date) = NaiveDate::from_ymd_opt(2026, 3, 16) else {
        bail!("valid reschedule date");
    };
    fire(
        &repository,
        id,
        Trigger::Reschedule(DeliveryPreferences::on(date, None)),
        operator()?,
    )
    .await?;
    fire(&repository, id, Trigger::Dispatch, operator()?).await?;

    let delivered = fire(&repository, id, Trigger::MarkDelivered, operator()?).await?;

    ensure!(delivered.state() == DeliveryState::Delivered);
    ensure!(delivered.milestones().delivered_at.is_some());
    ensure!(delivered.confirmation().is_none());
    let history = repository.history(id).await?;
    ensure!(history.len() == 8);
    ensure!(
        history.last().map(|entry| entry.new_state()) == Some(DeliveryState::Delivered)
    );
    Ok(())
}
