//! When steps for delivery lifecycle BDD scenarios.

use super::world::{DeliveryWorld, operator};
use card_delivery::delivery::domain::{
    Actor, DeliveryEvidence, DeliveryPreferences, FailureReason, Trigger,
};
use chrono::NaiveDate;
use rstest_bdd_macros::when;

#[when("the resident confirms receipt")]
fn resident_confirms(world: &mut DeliveryWorld) -> Result<(), eyre::Report> {
    let evidence = DeliveryEvidence::new("uploads/handover.jpg", "uploads/signature.png")
        .map_err(|err| eyre::eyre!("invalid evidence: {err}"))?;
    let owner = world.owner;
    world.fire(Trigger::ConfirmDelivery(evidence), Actor::resident(owner))
}

#[when(r#"the courier reports "{reason}""#)]
fn courier_reports(world: &mut DeliveryWorld, reason: String) -> Result<(), eyre::Report> {
    let failure = FailureReason::try_from(reason.as_str())
        .map_err(|err| eyre::eyre!("invalid failure reason in scenario: {err}"))?;
    world.fire(Trigger::MarkFailed(failure), operator()?)
}

#[when(r#"the resident reschedules for "{date}""#)]
fn resident_reschedules(world: &mut DeliveryWorld, date: String) -> Result<(), eyre::Report> {
    let preferred = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|err| eyre::eyre!("invalid date in scenario: {err}"))?;
    let owner = world.owner;
    world.fire(
        Trigger::Reschedule(DeliveryPreferences::on(preferred, None)),
        Actor::resident(owner),
    )
}

#[when("staff dispatch the request")]
fn staff_dispatch(world: &mut DeliveryWorld) -> Result<(), eyre::Report> {
    world.fire(Trigger::Dispatch, operator()?)
}

#[when("the resident sends the request to print")]
fn resident_sends_to_print(world: &mut DeliveryWorld) -> Result<(), eyre::Report> {
    let owner = world.owner;
    world.fire(
        Trigger::SendToPrint { batch_id: None },
        Actor::resident(owner),
    )
}
