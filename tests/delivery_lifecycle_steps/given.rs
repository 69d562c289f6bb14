//! Given steps for delivery lifecycle BDD scenarios.

use super::world::{DeliveryWorld, operator, run_async};
use card_delivery::delivery::{
    domain::{Actor, AddressInput, CardId, Trigger},
    services::CreateDeliveryRequest,
};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given("a courier delivery request for a resident")]
fn courier_request(world: &mut DeliveryWorld) -> Result<(), eyre::Report> {
    let request = CreateDeliveryRequest::courier(
        CardId::new(),
        world.owner,
        "BDG-KOTA",
        AddressInput::new("32", "3273", "3273020", "Jl. Braga 88"),
    );
    let created = run_async(
        world
            .repository
            .create(request, Actor::resident(world.owner)),
    )
    .wrap_err("create delivery request for scenario")?;
    world.request = Some(created);
    Ok(())
}

#[given("the request has been dispatched")]
fn request_dispatched(world: &mut DeliveryWorld) -> Result<(), eyre::Report> {
    for trigger in [
        Trigger::SendToPrint { batch_id: None },
        Trigger::MarkPrinted,
        Trigger::Dispatch,
    ] {
        world.fire(trigger, operator()?)?;
        world
            .last_result
            .take()
            .transpose()
            .wrap_err("advance request in scenario setup")?;
    }
    Ok(())
}
