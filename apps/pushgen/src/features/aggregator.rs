//! Feature Aggregator: one `ClientFeatureProfile` per client.
//!
//! Rows are grouped by client id and put into a canonical order before any
//! floating point reduction, so the result never depends on input row order.
//! Clients without activity still get a profile with zero-filled aggregates.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

use crate::features::categories::{
    is_online, is_premium, is_travel, ATM_WITHDRAWAL, FAVORITE_CATEGORY_COUNT, FX_TYPES,
    PAYMENT_TYPES,
};
use crate::models::activity::{Direction, Transaction, Transfer};
use crate::models::client::{Client, ClientId};

/// Calendar month `[start, end)` the features are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    pub fn month_containing(dt: NaiveDateTime) -> Self {
        let date = dt.date();
        let start = date.with_day(1).unwrap_or(date);
        let end = if start.month() == 12 {
            NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
        }
        .unwrap_or(start);
        Self { start, end }
    }

    pub fn contains(&self, dt: &NaiveDateTime) -> bool {
        let d = dt.date();
        d >= self.start && d < self.end
    }

    /// Month number (1–12) of the window.
    pub fn month(&self) -> u32 {
        self.start.month()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientFeatureProfile {
    pub client_id: ClientId,
    /// `None` when the client has no dated activity at all.
    pub window: Option<AnalysisWindow>,

    pub total_spend: f64,
    pub travel_spend: f64,
    pub premium_spend: f64,
    pub online_spend: f64,
    pub category_spend: BTreeMap<String, f64>,
    pub favorite_categories: Vec<String>,
    pub favorite_spend: f64,

    pub atm_withdrawals: u32,
    pub outgoing_payments: u32,
    pub inflows: f64,
    pub outflows: f64,
    /// outflows / inflows; `None` when there were no inflows.
    pub need_ratio: Option<f64>,
    pub shortfall: f64,
    pub fx_turnover: f64,

    pub avg_monthly_balance: f64,
    /// Balance that could sit on a deposit for a quarter: balance × 3/12.
    pub free_balance_3m: f64,

    pub transaction_count: usize,
    pub transfer_count: usize,
}

impl ClientFeatureProfile {
    /// Zero-filled profile. Balance-derived fields are still populated.
    pub fn empty(client: &Client) -> Self {
        Self {
            client_id: client.id.clone(),
            window: None,
            total_spend: 0.0,
            travel_spend: 0.0,
            premium_spend: 0.0,
            online_spend: 0.0,
            category_spend: BTreeMap::new(),
            favorite_categories: Vec::new(),
            favorite_spend: 0.0,
            atm_withdrawals: 0,
            outgoing_payments: 0,
            inflows: 0.0,
            outflows: 0.0,
            need_ratio: None,
            shortfall: 0.0,
            fx_turnover: 0.0,
            avg_monthly_balance: client.avg_monthly_balance,
            free_balance_3m: client.avg_monthly_balance * 3.0 / 12.0,
            transaction_count: 0,
            transfer_count: 0,
        }
    }

    pub fn has_activity(&self) -> bool {
        self.transaction_count > 0 || self.transfer_count > 0
    }
}

/// Output of the aggregation stage.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// One profile per client, in client source order.
    pub profiles: Vec<ClientFeatureProfile>,
    pub orphan_transactions: usize,
    pub orphan_transfers: usize,
    /// Clients resolved with zero-filled activity aggregates.
    pub idle_clients: usize,
}

pub fn aggregate(
    clients: &[Client],
    transactions: &[Transaction],
    transfers: &[Transfer],
) -> Aggregation {
    let mut tx_by_client: HashMap<&ClientId, Vec<&Transaction>> = HashMap::new();
    let mut tr_by_client: HashMap<&ClientId, Vec<&Transfer>> = HashMap::new();
    for c in clients {
        tx_by_client.entry(&c.id).or_default();
        tr_by_client.entry(&c.id).or_default();
    }

    let mut orphan_transactions = 0;
    for tx in transactions {
        match tx_by_client.get_mut(&tx.client_id) {
            Some(rows) => rows.push(tx),
            None => orphan_transactions += 1,
        }
    }
    let mut orphan_transfers = 0;
    for tr in transfers {
        match tr_by_client.get_mut(&tr.client_id) {
            Some(rows) => rows.push(tr),
            None => orphan_transfers += 1,
        }
    }

    let mut idle_clients = 0;
    let profiles = clients
        .iter()
        .map(|client| {
            let txs = tx_by_client.remove(&client.id).unwrap_or_default();
            let trs = tr_by_client.remove(&client.id).unwrap_or_default();
            let profile = compute_profile(client, txs, trs);
            if !profile.has_activity() {
                debug!("Client {} has no usable activity, zero-filled", client.id);
                idle_clients += 1;
            }
            profile
        })
        .collect();

    Aggregation {
        profiles,
        orphan_transactions,
        orphan_transfers,
        idle_clients,
    }
}

fn cmp_transactions(a: &&Transaction, b: &&Transaction) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.amount.total_cmp(&b.amount))
        .then_with(|| a.currency.cmp(&b.currency))
}

fn cmp_transfers(a: &&Transfer, b: &&Transfer) -> Ordering {
    let dir = |d: Direction| matches!(d, Direction::Out) as u8;
    a.date
        .cmp(&b.date)
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| dir(a.direction).cmp(&dir(b.direction)))
        .then_with(|| a.amount.total_cmp(&b.amount))
        .then_with(|| a.currency.cmp(&b.currency))
}

/// Computes the profile for one client from that client's rows only.
///
/// The window is the calendar month of the most recent activity across both
/// sources. Transfer amounts are treated as magnitudes; the sign is carried by
/// `direction`.
pub fn compute_profile(
    client: &Client,
    mut txs: Vec<&Transaction>,
    mut trs: Vec<&Transfer>,
) -> ClientFeatureProfile {
    let mut profile = ClientFeatureProfile::empty(client);

    let latest = txs
        .iter()
        .map(|t| t.date)
        .chain(trs.iter().map(|t| t.date))
        .max();
    let Some(latest) = latest else {
        return profile;
    };
    let window = AnalysisWindow::month_containing(latest);
    profile.window = Some(window);

    txs.retain(|t| window.contains(&t.date));
    trs.retain(|t| window.contains(&t.date));
    txs.sort_by(cmp_transactions);
    trs.sort_by(cmp_transfers);

    for tx in &txs {
        profile.total_spend += tx.amount;
        if is_travel(&tx.category) {
            profile.travel_spend += tx.amount;
        }
        if is_premium(&tx.category) {
            profile.premium_spend += tx.amount;
        }
        if is_online(&tx.category) {
            profile.online_spend += tx.amount;
        }
        *profile
            .category_spend
            .entry(tx.category.clone())
            .or_insert(0.0) += tx.amount;
    }

    let mut ranked: Vec<(&String, f64)> = profile
        .category_spend
        .iter()
        .filter(|&(_, &v)| v > 0.0)
        .map(|(k, &v)| (k, v))
        .collect();
    // BTreeMap iteration is name-ordered and the sort is stable: ties resolve by name
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(FAVORITE_CATEGORY_COUNT);
    profile.favorite_spend = ranked.iter().map(|(_, v)| v).sum();
    profile.favorite_categories = ranked.into_iter().map(|(k, _)| k.clone()).collect();

    for tr in &trs {
        let amount = tr.amount.abs();
        match tr.direction {
            Direction::In => profile.inflows += amount,
            Direction::Out => {
                profile.outflows += amount;
                if tr.kind == ATM_WITHDRAWAL {
                    profile.atm_withdrawals += 1;
                }
                if PAYMENT_TYPES.contains(&tr.kind.as_str()) {
                    profile.outgoing_payments += 1;
                }
            }
        }
        if FX_TYPES.contains(&tr.kind.as_str()) {
            profile.fx_turnover += amount;
        }
    }

    profile.need_ratio = (profile.inflows > 0.0).then(|| profile.outflows / profile.inflows);
    profile.shortfall = (profile.outflows - profile.inflows).max(0.0);
    profile.transaction_count = txs.len();
    profile.transfer_count = trs.len();

    profile
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::client::ClientStatus;

    pub(crate) fn client(id: &str, balance: f64) -> Client {
        Client {
            id: ClientId::parse(id).unwrap(),
            name: Some("Тест".to_string()),
            segment: None,
            status: ClientStatus::Standard,
            age: None,
            city: None,
            avg_monthly_balance: balance,
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        crate::ingest::parse::parse_date(s).unwrap()
    }

    pub(crate) fn tx(id: &str, date: &str, category: &str, amount: f64) -> Transaction {
        Transaction {
            client_id: ClientId::parse(id).unwrap(),
            date: dt(date),
            category: category.to_string(),
            amount,
            currency: "KZT".to_string(),
        }
    }

    pub(crate) fn tr(id: &str, date: &str, kind: &str, direction: Direction, amount: f64) -> Transfer {
        Transfer {
            client_id: ClientId::parse(id).unwrap(),
            date: dt(date),
            kind: kind.to_string(),
            direction,
            amount,
            currency: "KZT".to_string(),
        }
    }

    #[test]
    fn test_window_month_boundaries() {
        let w = AnalysisWindow::month_containing(dt("2025-12-17"));
        assert_eq!(w.start, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert_eq!(w.end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert!(w.contains(&dt("2025-12-31 23:59:59")));
        assert!(!w.contains(&dt("2026-01-01")));
        assert_eq!(w.month(), 12);
    }

    #[test]
    fn test_every_client_gets_a_profile() {
        let clients = vec![client("1", 0.0), client("2", 120_000.0)];
        let txs = vec![tx("1", "2025-08-01", "Такси", 1000.0)];
        let agg = aggregate(&clients, &txs, &[]);

        assert_eq!(agg.profiles.len(), 2);
        assert_eq!(agg.profiles[0].client_id.as_str(), "1");
        assert_eq!(agg.profiles[1].client_id.as_str(), "2");
        assert_eq!(agg.idle_clients, 1);
        assert!(agg.profiles[1].window.is_none());
        assert_eq!(agg.profiles[1].free_balance_3m, 30_000.0);
    }

    #[test]
    fn test_orphan_rows_counted_not_aggregated() {
        let clients = vec![client("1", 0.0)];
        let txs = vec![
            tx("1", "2025-08-01", "Такси", 1000.0),
            tx("99", "2025-08-01", "Такси", 5000.0),
        ];
        let trs = vec![tr("42", "2025-08-01", "p2p_out", Direction::Out, 10.0)];
        let agg = aggregate(&clients, &txs, &trs);

        assert_eq!(agg.orphan_transactions, 1);
        assert_eq!(agg.orphan_transfers, 1);
        assert_eq!(agg.profiles[0].total_spend, 1000.0);
    }

    #[test]
    fn test_category_clusters_and_favorites() {
        let c = client("1", 0.0);
        let rows = vec![
            tx("1", "2025-08-01", "Такси", 3000.0),
            tx("1", "2025-08-02", "Отели", 20000.0),
            tx("1", "2025-08-03", "Кафе и рестораны", 15000.0),
            tx("1", "2025-08-04", "Смотрим дома", 4000.0),
            tx("1", "2025-08-05", "Продукты питания", 15000.0),
        ];
        let p = compute_profile(&c, rows.iter().collect(), vec![]);

        assert_eq!(p.total_spend, 57000.0);
        assert_eq!(p.travel_spend, 23000.0);
        assert_eq!(p.premium_spend, 15000.0);
        assert_eq!(p.online_spend, 4000.0);
        // 15 000 tie between two categories resolves by name
        assert_eq!(
            p.favorite_categories,
            vec!["Отели", "Кафе и рестораны", "Продукты питания"]
        );
        assert_eq!(p.favorite_spend, 50000.0);
        assert_eq!(p.transaction_count, 5);
    }

    #[test]
    fn test_only_latest_month_counts() {
        let c = client("1", 0.0);
        let txs = vec![
            tx("1", "2025-07-30", "Такси", 9999.0),
            tx("1", "2025-08-02", "Такси", 100.0),
        ];
        let trs = vec![tr("1", "2025-09-01", "p2p_out", Direction::Out, 50.0)];
        let p = compute_profile(&c, txs.iter().collect(), trs.iter().collect());

        // most recent activity is the September transfer
        assert_eq!(p.window.unwrap().month(), 9);
        assert_eq!(p.total_spend, 0.0);
        assert_eq!(p.transaction_count, 0);
        assert_eq!(p.transfer_count, 1);
    }

    #[test]
    fn test_transfer_aggregates() {
        let c = client("1", 0.0);
        let trs = vec![
            tr("1", "2025-08-01", "salary_in", Direction::In, 100_000.0),
            tr("1", "2025-08-02", "atm_withdrawal", Direction::Out, 50_000.0),
            tr("1", "2025-08-03", "atm_withdrawal", Direction::Out, 20_000.0),
            tr("1", "2025-08-04", "p2p_out", Direction::Out, 30_000.0),
            tr("1", "2025-08-05", "utilities_out", Direction::Out, 40_000.0),
            tr("1", "2025-08-06", "fx_buy", Direction::Out, 10_000.0),
            tr("1", "2025-08-07", "fx_sell", Direction::In, -5_000.0),
        ];
        let p = compute_profile(&c, vec![], trs.iter().collect());

        assert_eq!(p.atm_withdrawals, 2);
        assert_eq!(p.outgoing_payments, 2);
        assert_eq!(p.inflows, 105_000.0);
        assert_eq!(p.outflows, 150_000.0);
        assert_eq!(p.shortfall, 45_000.0);
        assert_eq!(p.fx_turnover, 15_000.0);
        let ratio = p.need_ratio.unwrap();
        assert!((ratio - 150.0 / 105.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_inflows_leaves_need_ratio_unbounded() {
        let c = client("1", 0.0);
        let trs = vec![tr("1", "2025-08-02", "p2p_out", Direction::Out, 500.0)];
        let p = compute_profile(&c, vec![], trs.iter().collect());
        assert!(p.need_ratio.is_none());
        assert_eq!(p.shortfall, 500.0);
    }

    #[test]
    fn test_aggregation_independent_of_row_order() {
        let clients = vec![client("1", 50_000.0)];
        let mut txs = vec![
            tx("1", "2025-08-01", "Такси", 0.1),
            tx("1", "2025-08-01", "Такси", 0.2),
            tx("1", "2025-08-03", "Кафе и рестораны", 0.3),
            tx("1", "2025-08-04", "Отели", 1e16),
            tx("1", "2025-08-04", "Отели", 1.0),
        ];
        let trs = vec![
            tr("1", "2025-08-01", "fx_buy", Direction::Out, 0.7),
            tr("1", "2025-08-01", "fx_sell", Direction::In, 0.1),
        ];
        let forward = aggregate(&clients, &txs, &trs);
        txs.reverse();
        let mut trs_rev = trs.clone();
        trs_rev.reverse();
        let backward = aggregate(&clients, &txs, &trs_rev);

        assert_eq!(forward.profiles, backward.profiles);
    }
}
