//! Analytic accounting types and the analytic distribution model.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

use super::{AccountId, PlanId, StageKind};
use crate::errors::{Result, TransitDeskError};
use crate::impl_domain_status_conversions;

/// One weighted entry of an analytic distribution.
///
/// Composite entries spread the same weight over several accounts.
#[derive(Debug, Clone)]
pub struct DistributionEntry {
    pub account_ids: Vec<AccountId>,
    pub weight: f64,
    /// Key and weight as read from JSON, written back unchanged.
    wire: Option<(String, Number)>,
}

impl DistributionEntry {
    fn new(account_ids: Vec<AccountId>, weight: f64) -> Self {
        Self { account_ids, weight, wire: None }
    }
}

impl PartialEq for DistributionEntry {
    fn eq(&self, other: &Self) -> bool {
        self.account_ids == other.account_ids && self.weight == other.weight
    }
}

/// Ordered mapping from account ids to percentage weights.
///
/// The wire form is a JSON object whose keys are decimal account ids, or
/// several ids joined by commas for a composite entry:
/// `{"12": 60.0, "13,14": 40.0}`. Entry order is preserved both ways, and
/// parsed entries are written back with their original key and number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticDistribution {
    entries: Vec<DistributionEntry>,
}

impl AnalyticDistribution {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Distribution that books everything on one account.
    pub fn single(account_id: AccountId, weight: f64) -> Self {
        Self { entries: vec![DistributionEntry::new(vec![account_id], weight)] }
    }

    /// Append an entry. Empty id lists are rejected.
    pub fn push(&mut self, account_ids: Vec<AccountId>, weight: f64) -> Result<()> {
        if account_ids.is_empty() {
            return Err(TransitDeskError::InvalidInput(
                "distribution entry needs at least one account".into(),
            ));
        }
        self.entries.push(DistributionEntry::new(account_ids, weight));
        Ok(())
    }

    pub fn entries(&self) -> &[DistributionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of every account id referenced by any entry.
    pub fn account_ids(&self) -> BTreeSet<AccountId> {
        self.entries.iter().flat_map(|entry| entry.account_ids.iter().copied()).collect()
    }

    /// First account of the first entry, the folder's own account.
    pub fn first_account_id(&self) -> Option<AccountId> {
        self.entries.first().and_then(|entry| entry.account_ids.first().copied())
    }

    /// Parse the JSON object form.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| {
            TransitDeskError::InvalidInput(format!("invalid analytic distribution: {err}"))
        })
    }

    /// Render the JSON object form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| {
            TransitDeskError::Internal(format!("failed to encode analytic distribution: {err}"))
        })
    }
}

/// Parse a distribution key such as `"7"` or `"7,9"`.
pub fn parse_distribution_key(key: &str) -> Result<Vec<AccountId>> {
    key.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<AccountId>().map_err(|_| {
                TransitDeskError::InvalidInput(format!(
                    "invalid account id '{part}' in distribution key '{key}'"
                ))
            })
        })
        .collect()
}

fn format_distribution_key(account_ids: &[AccountId]) -> String {
    account_ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

impl Serialize for AnalyticDistribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            match &entry.wire {
                Some((key, weight)) => map.serialize_entry(key, weight)?,
                None => map
                    .serialize_entry(&format_distribution_key(&entry.account_ids), &entry.weight)?,
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnalyticDistribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct DistributionVisitor;

        impl<'de> Visitor<'de> for DistributionVisitor {
            type Value = AnalyticDistribution;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of account id keys to percentage weights")
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(AnalyticDistribution::new())
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut distribution = AnalyticDistribution::new();
                while let Some((key, number)) = access.next_entry::<String, Number>()? {
                    let account_ids =
                        parse_distribution_key(&key).map_err(serde::de::Error::custom)?;
                    let weight = number.as_f64().ok_or_else(|| {
                        serde::de::Error::custom(format!("weight of '{key}' is out of range"))
                    })?;
                    distribution.push(account_ids, weight).map_err(serde::de::Error::custom)?;
                    if let Some(entry) = distribution.entries.last_mut() {
                        entry.wire = Some((key, number));
                    }
                }
                Ok(distribution)
            }
        }

        deserializer.deserialize_any(DistributionVisitor)
    }
}

/// Analytic plan; at most one per stage kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticPlan {
    pub id: PlanId,
    pub name: String,
    pub stage_kind: Option<StageKind>,
}

/// Analytic account a folder books its costs and revenue on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub id: AccountId,
    pub name: String,
    pub plan_id: PlanId,
}

/// Posted analytic line. Positive amounts are revenue, negative are expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticLine {
    pub id: i64,
    pub name: String,
    pub amount: f64,
    pub account_ids: Vec<AccountId>,
}

/// Accounting document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveType {
    OutInvoice,
    OutRefund,
    OutReceipt,
    InInvoice,
    InRefund,
    InReceipt,
    Entry,
}

impl_domain_status_conversions!(MoveType {
    OutInvoice => "out_invoice",
    OutRefund => "out_refund",
    OutReceipt => "out_receipt",
    InInvoice => "in_invoice",
    InRefund => "in_refund",
    InReceipt => "in_receipt",
    Entry => "entry",
});

impl MoveType {
    pub const SALE: [Self; 3] = [Self::OutInvoice, Self::OutRefund, Self::OutReceipt];
    pub const PURCHASE: [Self; 3] = [Self::InInvoice, Self::InRefund, Self::InReceipt];
}
