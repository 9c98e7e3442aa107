use crate::query::formatters::{
    OutputFormat, format_activities, format_balances, format_stats, format_tracked,
};
use crate::repository::{ActivityRepository, AddressRepository, BalanceRepository};
use alloy_primitives::Address;
use anyhow::Result;
use std::str::FromStr;

pub fn parse_address(address: &str) -> Result<Address> {
    Address::from_str(address).map_err(|_| anyhow::anyhow!("Invalid address format: {}", address))
}

pub fn cmd_track(repo: &AddressRepository, address: &str, owner_id: i64) -> Result<()> {
    let address = parse_address(address)?;
    repo.track(&address, owner_id)?;
    println!("Tracking {address:?} for owner {owner_id}");
    Ok(())
}

pub fn cmd_untrack(repo: &AddressRepository, address: &str, owner_id: i64) -> Result<()> {
    let address = parse_address(address)?;
    if repo.untrack(&address, owner_id)? {
        println!("Stopped tracking {address:?} for owner {owner_id}");
    } else {
        println!("{address:?} was not tracked for owner {owner_id}");
    }
    Ok(())
}

pub fn cmd_list(repo: &AddressRepository, owner_id: Option<i64>, format: &OutputFormat) -> Result<()> {
    let tracked = match owner_id {
        Some(owner) => repo.list_for_owner(owner)?,
        None => repo.list_active()?,
    };
    println!("{}", format_tracked(&tracked, format));
    Ok(())
}

pub struct HistoryQuery {
    pub address: String,
    pub owner_id: Option<i64>,
    pub limit: usize,
    pub offset: usize,
}

pub fn cmd_history(
    repo: &ActivityRepository,
    query: HistoryQuery,
    native_symbol: &str,
    format: &OutputFormat,
) -> Result<()> {
    let address = parse_address(&query.address)?;
    let activities =
        repo.get_address_history(&address, query.owner_id, query.limit, query.offset)?;
    println!("{}", format_activities(&activities, native_symbol, format));
    Ok(())
}

pub fn cmd_balances(
    repo: &BalanceRepository,
    address: &str,
    owner_id: i64,
    limit: usize,
    native_symbol: &str,
    format: &OutputFormat,
) -> Result<()> {
    let address = parse_address(address)?;
    let snapshots = repo.history(&address, owner_id, None, limit)?;
    println!("{}", format_balances(&snapshots, native_symbol, format));
    Ok(())
}

pub fn cmd_status(
    activity_repo: &ActivityRepository,
    address_repo: &AddressRepository,
    format: &OutputFormat,
) -> Result<()> {
    let stats = activity_repo.get_statistics()?;
    let tracked = address_repo.list_active()?.len();
    println!("{}", format_stats(&stats, tracked, format));
    Ok(())
}
