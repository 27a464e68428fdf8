//! Ledger invariants checked after every simulated block.

use anyhow::{bail, ensure, Result};
use conduit_crypto::Address;
use conduit_econ::min_deposit;
use conduit_ops::ServiceKeeper;
use conduit_store::{KvStore, ServiceStore};
use conduit_types::{BlockHeight, Coins, RequestContextState};

fn sum<'a>(coins: impl IntoIterator<Item = &'a Coins>) -> Result<Coins> {
    let mut total = Coins::new();
    for c in coins {
        total = match total.checked_add(c) {
            Some(t) => t,
            None => bail!("coin overflow while summing"),
        };
    }
    Ok(total)
}

/// Check every invariant at the end of block `height`.
///
/// - total supply equals what was minted
/// - the deposit account holds exactly the binding deposits
/// - the request account holds exactly escrowed fees plus earnings
/// - available bindings cover their minimum deposit
/// - no request outlives its expiration height
/// - completed contexts hold no requests and are not scheduled
pub fn check(
    keeper: &ServiceKeeper,
    store: &dyn KvStore,
    height: BlockHeight,
    providers: &[Address],
    supply: &Coins,
    current_supply: &Coins,
) -> Result<()> {
    ensure!(
        current_supply == supply,
        "supply changed: expected {}, found {}",
        supply,
        current_supply
    );

    let bindings = store.all_bindings()?;
    let deposits = sum(bindings.iter().map(|b| &b.deposit))?;
    let deposit_pool = keeper.deposit_pool(store)?;
    ensure!(
        deposit_pool == deposits,
        "deposit account holds {}, bindings hold {}",
        deposit_pool,
        deposits
    );

    let params = keeper.params();
    for binding in bindings.iter().filter(|b| b.available) {
        let pricing = keeper.query_pricing(store, &binding.service_name, &binding.provider)?;
        let required = min_deposit(&pricing, &params);
        ensure!(
            binding.deposit.is_all_gte(&required),
            "binding {}/{} available with deposit {} below {}",
            binding.service_name,
            binding.provider,
            binding.deposit,
            required
        );
    }

    let requests = store.all_requests()?;
    let escrowed = sum(requests.iter().map(|r| &r.service_fee))?;
    let earned: Vec<Coins> = providers
        .iter()
        .map(|p| store.get_earned_fees(p))
        .collect::<Result<_, _>>()?;
    let owed = sum(std::iter::once(&escrowed).chain(&earned))?;
    let request_pool = keeper.request_pool(store)?;
    ensure!(
        request_pool == owed,
        "request account holds {}, escrow plus earnings is {}",
        request_pool,
        owed
    );

    for request in &requests {
        ensure!(
            request.expiration_height > height,
            "request {} expiring at {} survived block {}",
            request.id,
            request.expiration_height,
            height
        );
    }

    for ctx in store.all_request_contexts()? {
        if ctx.state != RequestContextState::Completed {
            continue;
        }
        ensure!(
            store.active_requests_of(&ctx.id)?.is_empty(),
            "completed context {} still has requests",
            ctx.id
        );
        ensure!(
            ctx.scheduled_height.is_none(),
            "completed context {} is still scheduled",
            ctx.id
        );
    }
    Ok(())
}
