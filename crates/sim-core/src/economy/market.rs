//! Market trades and per-team price dynamics.

use crate::config::SimConfig;
use crate::state::{CarryItem, EntityId, Resource, World};

/// Use on a friendly market. Two legs execute in the same action:
///
/// 1. the agent's carried wood sells for stockpile gold at the team's wood
///    price, nudging that price down, and
/// 2. the agent's carried gold buys stockpile food at the team's food
///    price, nudging that price up.
///
/// The spread between the two legs means a wood -> gold -> food round trip
/// returns less food than the wood put in. The market building then goes on
/// cooldown; prices drift back toward base during the decay phase.
pub(crate) fn attempt_trade(world: &mut World, trader: EntityId, market: EntityId) {
    let Some(trader_entity) = world.arena.alive(trader) else {
        return;
    };
    let Some(team) = world.effective_team_of(trader_entity) else {
        return;
    };
    let Some(market_entity) = world.arena.alive(market) else {
        return;
    };
    if market_entity.team != Some(team) {
        return;
    }
    let Some(building) = market_entity.building() else {
        return;
    };
    if building.market_cooldown > 0 {
        return;
    }

    let (wood, gold) = {
        let Some(unit) = trader_entity.unit() else {
            return;
        };
        (
            unit.inventory.count(CarryItem::Wood),
            unit.inventory.count(CarryItem::Gold),
        )
    };
    if wood == 0 && gold == 0 {
        return;
    }

    let mut traded = false;

    if wood > 0 {
        let price = world.teams[team as usize].price(Resource::Wood);
        let gained =
            (wood as u32 * price as u32 / SimConfig::SELL_DENOM as u32).max(1);
        if let Some(unit) = world.arena.get_mut(trader).and_then(|e| e.unit_mut()) {
            unit.inventory.take(CarryItem::Wood, wood);
        }
        let team_state = &mut world.teams[team as usize];
        team_state.credit(Resource::Gold, gained);
        team_state.shift_price(Resource::Wood, -(SimConfig::PRICE_DECREASE as i16));
        traded = true;
    }

    if gold > 0 {
        let price = world.teams[team as usize].price(Resource::Food).max(1);
        let gained = (gold as u32 * SimConfig::BUY_NUM as u32 / price as u32).max(1);
        if let Some(unit) = world.arena.get_mut(trader).and_then(|e| e.unit_mut()) {
            unit.inventory.take(CarryItem::Gold, gold);
        }
        let team_state = &mut world.teams[team as usize];
        team_state.credit(Resource::Food, gained);
        team_state.shift_price(Resource::Food, SimConfig::PRICE_INCREASE as i16);
        traded = true;
    }

    if traded {
        if let Some(building) = world.arena.get_mut(market).and_then(|e| e.building_mut()) {
            building.market_cooldown = SimConfig::MARKET_COOLDOWN;
        }
    }
}
