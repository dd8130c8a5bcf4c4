//! Rendering of query results for the command line.

use std::fmt::Write;

use api_types::VolumeStats;

const HEADERS: [&str; 8] = [
    "BROKER",
    "POD",
    "NODE",
    "CLAIM",
    "CAPACITY",
    "USED",
    "AVAILABLE",
    "USE%",
];

/// Aligned text table, one row per broker, ordered by broker id.
pub fn render_table(volumes: &[VolumeStats]) -> String {
    let mut sorted: Vec<&VolumeStats> = volumes.iter().collect();
    sorted.sort_by(|a, b| a.broker_id.cmp(&b.broker_id).then(a.pod.cmp(&b.pod)));

    let rows: Vec<[String; 8]> = sorted
        .into_iter()
        .map(|volume| {
            [
                volume.broker_id.to_string(),
                volume.pod.clone(),
                volume.node.clone(),
                volume.persistent_volume_claim.clone(),
                volume.capacity_bytes.to_string(),
                volume.used_bytes.to_string(),
                volume.available_bytes.to_string(),
                volume
                    .used_percent()
                    .map(|percent| format!("{percent:.1}%"))
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &HEADERS.map(str::to_string), &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    out
}

fn write_row(out: &mut String, cells: &[String; 8], widths: &[usize; 8]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{}", line.trim_end());
}

/// Pretty-printed JSON array of the results.
pub fn render_json(volumes: &[VolumeStats]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(broker_id: u64, pod: &str, capacity_bytes: u64, used_bytes: u64) -> VolumeStats {
        VolumeStats {
            pod: pod.to_string(),
            node: "node-a".to_string(),
            broker_id,
            persistent_volume_claim: format!("{pod}-claim"),
            available_bytes: capacity_bytes - used_bytes,
            capacity_bytes,
            used_bytes,
        }
    }

    #[test]
    fn table_sorted_by_broker_id() {
        let table = render_table(&[
            volume(103, "broker-3", 200000, 40000),
            volume(101, "broker-1", 1000, 400),
        ]);

        let expected = "\
BROKER  POD       NODE    CLAIM           CAPACITY  USED   AVAILABLE  USE%
101     broker-1  node-a  broker-1-claim  1000      400    600        40.0%
103     broker-3  node-a  broker-3-claim  200000    40000  160000     20.0%
";
        assert_eq!(table, expected);
    }

    #[test]
    fn table_zero_capacity() {
        let table = render_table(&[volume(1, "b", 0, 0)]);
        assert!(table.lines().nth(1).unwrap().ends_with('-'));
    }

    #[test]
    fn empty_table_has_header_only() {
        assert_eq!(render_table(&[]).lines().count(), 1);
    }

    #[test]
    fn json_array() {
        let json = render_json(&[volume(101, "broker-1", 1000, 400)]).unwrap();
        let parsed: Vec<VolumeStats> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0].broker_id, 101);
        assert!(json.contains("\"usedBytes\": 400"));
    }
}
