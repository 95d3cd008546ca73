use bitcoin::{Amount, SignedAmount};

use crate::engine::enricher::{resolve_input, FundingCache};
use crate::engine::error::ExplorerError;
use crate::engine::scanner::{ChainScan, ScanLimits};
use crate::engine::types::{AddressActivity, AddressUtxo, AddressView, Direction};
use crate::node::api::{NodeGateway, NodeQueries};
use crate::node::types::UtxoScan;

/// Balance, UTXOs and recent history of `address`.
///
/// Two independent reads: a UTXO-set scan (exact, current) and a walk over
/// the last `window` blocks (history). Activity older than the window still
/// counts towards the balance but is absent from the history.
pub fn address_view<G: NodeGateway + ?Sized>(
    node: &G,
    address: &str,
    window: u64,
) -> Result<AddressView, ExplorerError> {
    let snapshot = node
        .scan_utxos(address)
        .map_err(ExplorerError::lookup("address", address))?;
    let (balance, utxos) = utxos_from_snapshot(snapshot);

    let mut scan = ChainScan::start(node, ScanLimits::blocks(window))?;
    let mut cache = FundingCache::default();
    let mut history = Vec::new();

    for scanned in scan.by_ref() {
        let scanned = scanned?;

        let incoming: Amount = scanned
            .tx
            .vout
            .iter()
            .filter(|output| output.pays_to(address))
            .map(|output| output.value)
            .sum();

        let outgoing: Amount = scanned
            .tx
            .vin
            .iter()
            .filter(|input| !input.is_coinbase())
            .map(|input| resolve_input(node, &mut cache, input))
            .filter(|resolved| resolved.address() == Some(address))
            .filter_map(|resolved| resolved.value())
            .sum();

        let (Ok(incoming), Ok(outgoing)) = (incoming.to_signed(), outgoing.to_signed()) else {
            log::warn!("[ADDRESS] {}: amounts out of range, skipped", scanned.tx.txid);
            continue;
        };
        let net = incoming - outgoing;
        if net == SignedAmount::ZERO {
            continue;
        }

        history.push((scanned.block.height, scanned.time, scanned.tx.txid, net));
    }

    let tip_height = scan.tip().unwrap_or_default();
    let scanned_from_height = scan.floor_height().unwrap_or(tip_height);

    let mut history: Vec<AddressActivity> = history
        .into_iter()
        .map(|(block_height, time, txid, net)| AddressActivity {
            txid,
            block_height,
            time,
            direction: if net.is_positive() {
                Direction::Incoming
            } else {
                Direction::Outgoing
            },
            net,
            amount: net.unsigned_abs(),
            confirmations: tip_height - block_height + 1,
        })
        .collect();
    // Stable: equal timestamps keep the walk's newest-first order.
    history.sort_by(|a, b| b.time.cmp(&a.time));

    log::debug!(
        "[ADDRESS] {}: {} utxo(s), {} history entries in heights {}..={}",
        address,
        utxos.len(),
        history.len(),
        scanned_from_height,
        tip_height
    );

    Ok(AddressView {
        address: address.to_string(),
        balance,
        utxo_count: utxos.len(),
        utxos,
        history,
        tip_height,
        scanned_from_height,
    })
}

/// Balance is re-summed from the listed unspents so both come from the
/// same snapshot.
fn utxos_from_snapshot(snapshot: UtxoScan) -> (Amount, Vec<AddressUtxo>) {
    let utxos: Vec<AddressUtxo> = snapshot
        .unspents
        .into_iter()
        .map(|utxo| AddressUtxo {
            txid: utxo.txid,
            vout: utxo.vout,
            value: utxo.amount,
            height: utxo.height,
            is_coinbase: utxo.coinbase,
        })
        .collect();
    let balance = utxos.iter().map(|utxo| utxo.value).sum();
    (balance, utxos)
}
