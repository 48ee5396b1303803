use crate::calc;
use crate::records::StudentRecord;

/// Name matches case-insensitively, id matches case-sensitively. An empty
/// query keeps every record. Order is always the store order.
pub fn search<'a>(records: &'a [StudentRecord], query: &str) -> Vec<&'a StudentRecord> {
    if query.is_empty() {
        return records.iter().collect();
    }
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&needle) || r.id.contains(query))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate<'a> {
    pub best: &'a StudentRecord,
    pub worst: &'a StudentRecord,
    pub average_percent: f64,
}

/// Best/worst by reported percentage; on ties the earlier record wins.
/// Returns `None` for an empty collection.
pub fn aggregate(records: &[StudentRecord]) -> Option<Aggregate<'_>> {
    let mut iter = records.iter().map(|r| (r, calc::derive(r).percentage));
    let (first, first_pct) = iter.next()?;

    let mut best = (first, first_pct);
    let mut worst = (first, first_pct);
    let mut sum = first_pct;
    for (r, pct) in iter {
        if pct > best.1 {
            best = (r, pct);
        }
        if pct < worst.1 {
            worst = (r, pct);
        }
        sum += pct;
    }

    Some(Aggregate {
        best: best.0,
        worst: worst.0,
        average_percent: sum / records.len() as f64,
    })
}
