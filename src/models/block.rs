use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;

/// IPs whose request count inside a window crossed the threshold, with that count
pub type ThresholdResult = HashMap<IpAddr, u64>;

/// Block log entry for an IP that crossed its threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
    pub ip: IpAddr,
    pub reason: String,
    /// Assigned by the store on insert
    pub created_at: Option<NaiveDateTime>,
}

impl BlockRecord {
    pub fn new(ip: IpAddr, reason: impl Into<String>) -> Self {
        BlockRecord {
            ip,
            reason: reason.into(),
            created_at: None,
        }
    }
}

/// One row of a rendered threshold report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedIp {
    pub ip: IpAddr,
    pub count: u64,
}

/// Flatten a threshold result into rows ordered by IP
pub fn sorted_flagged(results: &ThresholdResult) -> Vec<FlaggedIp> {
    let mut rows: Vec<FlaggedIp> = results
        .iter()
        .map(|(ip, count)| FlaggedIp { ip: *ip, count: *count })
        .collect();
    rows.sort_by(|a, b| a.ip.cmp(&b.ip));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_flagged_orders_by_ip() {
        let mut results = ThresholdResult::new();
        results.insert("10.0.0.2".parse().unwrap(), 5);
        results.insert("1.1.1.1".parse().unwrap(), 7);
        results.insert("2.2.2.2".parse().unwrap(), 6);

        let rows = sorted_flagged(&results);
        let ips: Vec<String> = rows.iter().map(|r| r.ip.to_string()).collect();
        assert_eq!(ips, vec!["1.1.1.1", "2.2.2.2", "10.0.0.2"]);
        assert_eq!(rows[0].count, 7);
    }

    #[test]
    fn test_new_block_record_has_no_creation_time() {
        let record = BlockRecord::new("1.1.1.1".parse().unwrap(), "reason");
        assert!(record.created_at.is_none());
        assert_eq!(record.reason, "reason");
    }
}
