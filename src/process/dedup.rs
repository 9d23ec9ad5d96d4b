use std::collections::HashSet;

use crate::table::CanonicalRecord;

/// Keep the first record of every (Startup_Name, Year, Amount) triple, in order.
pub fn dedup_records(records: Vec<CanonicalRecord>) -> Vec<CanonicalRecord> {
    let mut seen: HashSet<(String, i32, u64)> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| {
            let (name, year, amount) = r.dedup_key();
            seen.insert((name.to_string(), year, amount))
        })
        .collect()
}
