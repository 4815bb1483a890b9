//! Textual projections of a track for operator download. Both formats
//! are deterministic and lossless over the recorded samples.

use std::fmt::Write;

use chrono::SecondsFormat;

use crate::models::location::LocationEntry;

const CSV_HEADER: &str = "recorded_at;lat;lng;speed;heading";

/// Semicolon-delimited export, one line per sample, fixed column order.
/// Absent speed/heading stay as empty fields.
pub fn track_csv(points: &[LocationEntry]) -> String {
    let mut out = String::with_capacity(64 * (points.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');

    for point in points {
        let _ = writeln!(
            out,
            "{};{};{};{};{}",
            point.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            point.lat,
            point.lng,
            point.speed.map(|v| v.to_string()).unwrap_or_default(),
            point.heading.map(|v| v.to_string()).unwrap_or_default(),
        );
    }

    out
}

/// GPX 1.1 export: one `<trkpt>` per sample, speed/heading carried as
/// extensions when present.
pub fn track_gpx(order_id: u64, points: &[LocationEntry]) -> String {
    let mut out = String::with_capacity(160 * points.len() + 256);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(
        "<gpx version=\"1.1\" creator=\"dispatch-core\" xmlns=\"http://www.topografix.com/GPX/1/1\">\n",
    );
    let _ = writeln!(out, "  <trk>\n    <name>order-{order_id}</name>\n    <trkseg>");

    for point in points {
        let _ = write!(
            out,
            "      <trkpt lat=\"{}\" lon=\"{}\">\n        <time>{}</time>\n",
            point.lat,
            point.lng,
            point.recorded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        if point.speed.is_some() || point.heading.is_some() {
            out.push_str("        <extensions>\n");
            if let Some(speed) = point.speed {
                let _ = writeln!(out, "          <speed>{speed}</speed>");
            }
            if let Some(heading) = point.heading {
                let _ = writeln!(out, "          <heading>{heading}</heading>");
            }
            out.push_str("        </extensions>\n");
        }
        out.push_str("      </trkpt>\n");
    }

    out.push_str("    </trkseg>\n  </trk>\n</gpx>\n");
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{track_csv, track_gpx};
    use crate::models::location::LocationEntry;

    fn sample(lat: f64, lng: f64, speed: Option<f64>) -> LocationEntry {
        LocationEntry {
            order_id: 9,
            lat,
            lng,
            speed,
            heading: Some(270.0),
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
            driver_id: None,
        }
    }

    #[test]
    fn csv_of_empty_track_is_header_only() {
        assert_eq!(track_csv(&[]), "recorded_at;lat;lng;speed;heading\n");
    }

    #[test]
    fn csv_keeps_column_order_and_blank_optionals() {
        let csv = track_csv(&[sample(52.52, 13.405, None)]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("recorded_at;lat;lng;speed;heading"));
        assert_eq!(lines.next(), Some("2026-03-01T08:30:00Z;52.52;13.405;;270"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn gpx_emits_one_trkpt_per_sample_with_extensions() {
        let gpx = track_gpx(9, &[sample(52.52, 13.405, Some(18.5))]);

        assert!(gpx.contains("<name>order-9</name>"));
        assert_eq!(gpx.matches("<trkpt ").count(), 1);
        assert!(gpx.contains("<trkpt lat=\"52.52\" lon=\"13.405\">"));
        assert!(gpx.contains("<time>2026-03-01T08:30:00Z</time>"));
        assert!(gpx.contains("<speed>18.5</speed>"));
        assert!(gpx.contains("<heading>270</heading>"));
    }

    #[test]
    fn identical_tracks_export_identically() {
        let track = vec![sample(52.52, 13.405, Some(18.5)), sample(52.53, 13.41, None)];
        assert_eq!(track_csv(&track), track_csv(&track));
        assert_eq!(track_gpx(1, &track), track_gpx(1, &track));
    }
}
