//! Then steps for delivery lifecycle BDD scenarios.

use super::world::{DeliveryWorld, run_async};
use card_delivery::delivery::{
    domain::{DeliveryState, DeliveryValidationError, InvalidTransition},
    services::DeliveryServiceError,
};
use rstest_bdd_macros::then;

#[then(r#"the request state is "{state}""#)]
fn request_state_is(world: &DeliveryWorld, state: String) -> Result<(), eyre::Report> {
    let expected = DeliveryState::try_from(state.as_str())
        .map_err(|err| eyre::eyre!("invalid expected state in scenario: {err}"))?;
    let stored = world.repository.get_by_id(world.current()?.id())?;

    if stored.state() != expected {
        return Err(eyre::eyre!(
            "expected state {expected}, found {}",
            stored.state()
        ));
    }
    Ok(())
}

#[then("the request records a delivery confirmation")]
fn records_confirmation(world: &DeliveryWorld) -> Result<(), eyre::Report> {
    if world.current()?.confirmation().is_none() {
        return Err(eyre::eyre!("expected a stored delivery confirmation"));
    }
    Ok(())
}

#[then("the request history has {count:usize} entries")]
fn history_length(world: &DeliveryWorld, count: usize) -> Result<(), eyre::Report> {
    let history = run_async(world.repository.history(world.current()?.id()))?;
    if history.len() != count {
        return Err(eyre::eyre!(
            "expected {count} history entries, found {}",
            history.len()
        ));
    }
    Ok(())
}

#[then("the request has {attempts:u32} failed attempts")]
fn failed_attempts(world: &DeliveryWorld, attempts: u32) -> Result<(), eyre::Report> {
    let found = world.current()?.failed_attempts();
    if found != attempts {
        return Err(eyre::eyre!(
            "expected {attempts} failed attempts, found {found}"
        ));
    }
    Ok(())
}

#[then("the transition is blocked by a guard")]
fn blocked_by_guard(world: &DeliveryWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    if !matches!(
        result,
        Err(DeliveryServiceError::InvalidTransition(InvalidTransition {
            guard: Some(_),
            ..
        }))
    ) {
        return Err(eyre::eyre!("expected a guard rejection, got {result:?}"));
    }
    Ok(())
}

#[then("the transition is refused for the actor")]
fn refused_for_actor(world: &DeliveryWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing transition result"))?;

    if !matches!(
        result,
        Err(DeliveryServiceError::Validation(
            DeliveryValidationError::ActorNotPermitted { .. }
        ))
    ) {
        return Err(eyre::eyre!("expected a permission error, got {result:?}"));
    }
    Ok(())
}
