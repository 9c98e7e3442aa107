use crate::activity::ActivityEvent;
use crate::repository::{ActivityStats, BalanceSnapshot, StoredActivity, TrackedAddress};
use alloy_primitives::U256;
use alloy_primitives::utils::format_units;
use comfy_table::{Cell, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use csv::Writer;
use serde_json::json;

const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(header);
    table
}

fn units(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

fn finish_csv(wtr: Writer<Vec<u8>>) -> String {
    String::from_utf8(wtr.into_inner().unwrap_or_default()).unwrap_or_default()
}

/// Human-readable one-liner for the history views.
pub fn describe(event: &ActivityEvent, native_symbol: &str) -> String {
    match event {
        ActivityEvent::Native { value_wei, .. } => {
            format!("{} {native_symbol}", units(*value_wei, NATIVE_DECIMALS))
        }
        ActivityEvent::Erc20Transfer {
            amount_raw,
            decimals,
            symbol,
            ..
        } => format!("{} {symbol}", units(*amount_raw, *decimals)),
        ActivityEvent::Erc721Transfer {
            token_id, symbol, ..
        } => format!("{symbol} #{token_id}"),
        ActivityEvent::Erc1155Batch {
            token, ids, values, ..
        } => {
            let items: Vec<String> = ids
                .iter()
                .zip(values)
                .map(|(id, value)| format!("#{id} x{value}"))
                .collect();
            format!("{} on {token:#}", items.join(", "))
        }
        ActivityEvent::ContractInteraction {
            contract, function, ..
        } => format!("{function} on {contract:#}"),
        ActivityEvent::ContractDeployment { new_contract, .. } => {
            format!("deployed {new_contract:#}")
        }
    }
}

pub fn format_tracked(tracked: &[TrackedAddress], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Table => {
            if tracked.is_empty() {
                return "No tracked addresses.".to_string();
            }
            let mut table = new_table(vec!["Address", "Owner", "Last Processed Block"]);
            for entry in tracked {
                table.add_row(vec![
                    Cell::new(format!("{:?}", entry.address)),
                    Cell::new(entry.owner_id),
                    Cell::new(entry.last_processed_block),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(tracked).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["address", "owner_id", "last_processed_block"]);
            for entry in tracked {
                let _ = wtr.write_record([
                    &format!("{:?}", entry.address),
                    &entry.owner_id.to_string(),
                    &entry.last_processed_block.to_string(),
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_activities(
    activities: &[StoredActivity],
    native_symbol: &str,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => format_activities_table(activities, native_symbol),
        OutputFormat::Json => format_activities_json(activities),
        OutputFormat::Csv => format_activities_csv(activities, native_symbol),
    }
}

fn format_activities_table(activities: &[StoredActivity], native_symbol: &str) -> String {
    if activities.is_empty() {
        return "No activity found.".to_string();
    }

    let mut table = new_table(vec!["Block", "Kind", "From", "To", "Details", "Tx Hash"]);
    for activity in activities {
        let event = &activity.event;
        let (from, to) = event.parties();
        table.add_row(vec![
            Cell::new(event.block()),
            Cell::new(event.kind()),
            Cell::new(from.map_or("-".to_string(), |a| format!("{a:#}"))),
            Cell::new(to.map_or("-".to_string(), |a| format!("{a:#}"))),
            Cell::new(describe(event, native_symbol)),
            Cell::new(format_tx_hash(&format!("{:?}", event.tx_hash()))),
        ]);
    }

    table.to_string()
}

fn format_activities_json(activities: &[StoredActivity]) -> String {
    let json_activities: Vec<_> = activities
        .iter()
        .map(|a| {
            json!({
                "address": format!("{:?}", a.address),
                "owner_id": a.owner_id,
                "recorded_at": a.recorded_at,
                "event": a.event,
            })
        })
        .collect();

    serde_json::to_string_pretty(&json_activities).unwrap_or_else(|_| "[]".to_string())
}

fn format_activities_csv(activities: &[StoredActivity], native_symbol: &str) -> String {
    let mut wtr = Writer::from_writer(vec![]);
    let _ = wtr.write_record([
        "block_number",
        "kind",
        "from",
        "to",
        "details",
        "transaction_hash",
        "recorded_at",
    ]);

    for activity in activities {
        let event = &activity.event;
        let (from, to) = event.parties();
        let _ = wtr.write_record([
            &event.block().to_string(),
            &event.kind().to_string(),
            &from.map(|a| format!("{a:?}")).unwrap_or_default(),
            &to.map(|a| format!("{a:?}")).unwrap_or_default(),
            &describe(event, native_symbol),
            &format!("{:?}", event.tx_hash()),
            &activity.recorded_at,
        ]);
    }

    finish_csv(wtr)
}

pub fn format_balances(
    snapshots: &[BalanceSnapshot],
    native_symbol: &str,
    format: &OutputFormat,
) -> String {
    match format {
        OutputFormat::Table => {
            if snapshots.is_empty() {
                return "No balance snapshots.".to_string();
            }
            let mut table = new_table(vec!["Block", "Balance", "Balance (Wei)", "Observed At"]);
            for snapshot in snapshots {
                table.add_row(vec![
                    Cell::new(snapshot.block_number),
                    Cell::new(format!(
                        "{} {native_symbol}",
                        units(snapshot.balance, NATIVE_DECIMALS)
                    )),
                    Cell::new(snapshot.balance.to_string()),
                    Cell::new(&snapshot.observed_at),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Json => {
            let json_snapshots: Vec<_> = snapshots
                .iter()
                .map(|s| {
                    json!({
                        "address": format!("{:?}", s.address),
                        "block_number": s.block_number,
                        "balance": units(s.balance, NATIVE_DECIMALS),
                        "balance_wei": s.balance.to_string(),
                        "observed_at": s.observed_at,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&json_snapshots).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["block_number", "balance", "balance_wei", "observed_at"]);
            for s in snapshots {
                let _ = wtr.write_record([
                    &s.block_number.to_string(),
                    &units(s.balance, NATIVE_DECIMALS),
                    &s.balance.to_string(),
                    &s.observed_at,
                ]);
            }
            finish_csv(wtr)
        }
    }
}

pub fn format_stats(stats: &ActivityStats, tracked: usize, format: &OutputFormat) -> String {
    let block = |b: Option<u64>| b.map_or("N/A".to_string(), |b| b.to_string());

    match format {
        OutputFormat::Table => {
            let mut table = new_table(vec!["Metric", "Value"]);
            table.add_row(vec![Cell::new("Tracked Addresses"), Cell::new(tracked)]);
            table.add_row(vec![
                Cell::new("Total Activities"),
                Cell::new(stats.total_activities),
            ]);
            for (kind, count) in &stats.by_kind {
                table.add_row(vec![Cell::new(format!("  {kind}")), Cell::new(count)]);
            }
            table.add_row(vec![
                Cell::new("Earliest Block"),
                Cell::new(block(stats.earliest_block)),
            ]);
            table.add_row(vec![
                Cell::new("Latest Block"),
                Cell::new(block(stats.latest_block)),
            ]);
            table.to_string()
        }
        OutputFormat::Json => {
            let by_kind: serde_json::Map<String, serde_json::Value> = stats
                .by_kind
                .iter()
                .map(|(kind, count)| (kind.clone(), json!(count)))
                .collect();
            serde_json::to_string_pretty(&json!({
                "tracked_addresses": tracked,
                "total_activities": stats.total_activities,
                "by_kind": by_kind,
                "earliest_block": stats.earliest_block,
                "latest_block": stats.latest_block,
            }))
            .unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Csv => {
            let mut wtr = Writer::from_writer(vec![]);
            let _ = wtr.write_record(["metric", "value"]);
            let _ = wtr.write_record(["tracked_addresses", &tracked.to_string()]);
            let _ = wtr.write_record(["total_activities", &stats.total_activities.to_string()]);
            for (kind, count) in &stats.by_kind {
                let _ = wtr.write_record([kind.as_str(), &count.to_string()]);
            }
            let _ = wtr.write_record(["earliest_block", &block(stats.earliest_block)]);
            let _ = wtr.write_record(["latest_block", &block(stats.latest_block)]);
            finish_csv(wtr)
        }
    }
}

fn format_tx_hash(hash: &str) -> String {
    format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256, address};

    fn native_activity() -> StoredActivity {
        StoredActivity {
            address: Address::ZERO,
            owner_id: 1,
            event: ActivityEvent::Native {
                tx_hash: B256::repeat_byte(0xab),
                from: Address::ZERO,
                to: Some(address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb")),
                value_wei: U256::from(1_500_000_000_000_000_000u64),
                block: 42,
                gas_used: 21_000,
            },
            recorded_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn describes_amounts_in_token_units() {
        assert_eq!(
            describe(&native_activity().event, "MON"),
            "1.500000000000000000 MON"
        );

        let erc20 = ActivityEvent::Erc20Transfer {
            tx_hash: B256::ZERO,
            token: Address::ZERO,
            from: Address::ZERO,
            to: Address::ZERO,
            amount_raw: U256::from(2_500_000u64),
            decimals: 6,
            symbol: "USDC".to_string(),
            name: "USD Coin".to_string(),
            block: 1,
        };
        assert_eq!(describe(&erc20, "MON"), "2.500000 USDC");
    }

    #[test]
    fn csv_has_header_and_one_row_per_activity() {
        let csv = format_activities(&[native_activity()], "MON", &OutputFormat::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("block_number,kind"));
        assert!(lines[1].starts_with("42,native"));
    }

    #[test]
    fn json_embeds_tagged_event() {
        let json = format_activities(&[native_activity()], "MON", &OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["event"]["kind"], "native");
        assert_eq!(value[0]["event"]["block"], 42);
    }

    #[test]
    fn empty_table_has_placeholder() {
        assert_eq!(
            format_activities(&[], "MON", &OutputFormat::Table),
            "No activity found."
        );
        assert_eq!(
            format_tracked(&[], &OutputFormat::Table),
            "No tracked addresses."
        );
    }
}
